//! Persisted state codec
//!
//! Fixed-order, fixed-width little-endian fields:
//!
//! ```text
//! offset  size  field
//!      0    12  mixer[3]            i32
//!     12    12  volume[3]           i32
//!     24    12  pan[3]              f32
//!     36     4  envelope period     i32
//!     40     4  envelope shape      i32
//!     44     4  noise period        i32
//!     48     4  clock rate          i32
//!     52   156  per channel: point count i32, 6 x (time f32, ratio f32)
//! ```
//!
//! The first 52 bytes form the legacy layout; hosts that saved before the
//! software envelope existed only wrote that part.

use nom::multi::count;
use nom::number::complete::{le_f32, le_i32};
use nom::sequence::tuple;
use nom::IResult;

use crate::backend::NUM_CHANNELS;
use crate::envelope::{EnvelopeForm, EnvelopePoint, MAX_POINTS};
use crate::state::{
    ChannelState, DriverState, GlobalState, MixerFlags, StateOrigin, DEFAULT_CLOCK_RATE,
    MAX_ENVELOPE_SHAPE, MAX_NOISE_PERIOD, MAX_VOLUME,
};
use crate::{DriverError, Result};

/// Size of the legacy layout in bytes
pub const LEGACY_STATE_SIZE: usize = 13 * 4;
/// Size of one channel's software envelope block in bytes
pub const ENVELOPE_BLOCK_SIZE: usize = 4 + MAX_POINTS * 8;
/// Size of the extended layout in bytes
pub const EXTENDED_STATE_SIZE: usize = LEGACY_STATE_SIZE + NUM_CHANNELS * ENVELOPE_BLOCK_SIZE;

/// Persisted layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StateLayout {
    /// 52 bytes, registers only
    Legacy,
    /// 208 bytes, registers plus software envelopes
    #[default]
    Extended,
}

impl StateLayout {
    /// Encoded size in bytes
    pub const fn size(self) -> usize {
        match self {
            StateLayout::Legacy => LEGACY_STATE_SIZE,
            StateLayout::Extended => EXTENDED_STATE_SIZE,
        }
    }

    /// Largest layout that fits in `len` bytes
    pub fn for_len(len: usize) -> Option<Self> {
        if len >= EXTENDED_STATE_SIZE {
            Some(StateLayout::Extended)
        } else if len >= LEGACY_STATE_SIZE {
            Some(StateLayout::Legacy)
        } else {
            None
        }
    }
}

/// Encode the persisted fields of `state`
pub fn encode(state: &DriverState, layout: StateLayout) -> Vec<u8> {
    let mut out = Vec::with_capacity(layout.size());

    for ch in &state.channels {
        put_i32(&mut out, ch.mixer.bits() as i32);
    }
    for ch in &state.channels {
        put_i32(&mut out, ch.volume as i32);
    }
    for ch in &state.channels {
        out.extend_from_slice(&ch.pan.to_le_bytes());
    }

    let global = &state.global;
    put_i32(&mut out, global.envelope_period as i32);
    put_i32(&mut out, global.envelope_shape as i32);
    put_i32(&mut out, global.noise_period as i32);
    put_i32(&mut out, global.clock_rate.min(i32::MAX as u32) as i32);

    if layout == StateLayout::Extended {
        for ch in &state.channels {
            put_i32(&mut out, ch.envelope.num_points as i32);
            for point in &ch.envelope.points {
                out.extend_from_slice(&point.time.to_le_bytes());
                out.extend_from_slice(&point.ratio.to_le_bytes());
            }
        }
    }

    debug_assert_eq!(out.len(), layout.size());
    out
}

fn put_i32(out: &mut Vec<u8>, value: i32) {
    out.extend_from_slice(&value.to_le_bytes());
}

/// Decode a persisted blob
///
/// Blobs shorter than the legacy layout are rejected. A legacy blob leaves
/// every software envelope at its default form. Values are clamped into
/// register ranges; the returned state is marked [`StateOrigin::Loaded`].
pub fn decode(bytes: &[u8]) -> Result<(DriverState, StateLayout)> {
    let layout = StateLayout::for_len(bytes.len()).ok_or(DriverError::StateTooShort {
        len: bytes.len(),
        min: LEGACY_STATE_SIZE,
    })?;

    let too_short = |_| DriverError::StateTooShort {
        len: bytes.len(),
        min: layout.size(),
    };

    let (rest, registers) = registers(bytes).map_err(too_short)?;
    let mut state = registers.into_state();

    if layout == StateLayout::Extended {
        let (_, forms) = count(envelope_form, NUM_CHANNELS)(rest).map_err(too_short)?;
        for (channel, form) in state.channels.iter_mut().zip(forms) {
            channel.envelope = form;
        }
    }

    state.origin = StateOrigin::Loaded;
    Ok((state, layout))
}

/// Raw legacy block as stored
struct Registers {
    mixer: Vec<i32>,
    volume: Vec<i32>,
    pan: Vec<f32>,
    envelope_period: i32,
    envelope_shape: i32,
    noise_period: i32,
    clock_rate: i32,
}

impl Registers {
    fn into_state(self) -> DriverState {
        let clock_rate = if self.clock_rate > 0 {
            self.clock_rate as u32
        } else {
            DEFAULT_CLOCK_RATE
        };

        let mut state = DriverState {
            origin: StateOrigin::Uninitialized,
            global: GlobalState {
                clock_rate,
                envelope_period: self.envelope_period.clamp(0, u16::MAX as i32) as u16,
                envelope_shape: (self.envelope_shape & MAX_ENVELOPE_SHAPE as i32) as u8,
                noise_period: (self.noise_period & MAX_NOISE_PERIOD as i32) as u8,
            },
            channels: [ChannelState::default(); NUM_CHANNELS],
        };

        for (ch, channel) in state.channels.iter_mut().enumerate() {
            channel.mixer = MixerFlags::from_bits_truncate((self.mixer[ch] & 0x07) as u8);
            channel.volume = self.volume[ch].clamp(0, MAX_VOLUME as i32) as u8;
            channel.pan = clamp_unit(self.pan[ch], 0.5);
        }
        state
    }
}

fn registers(input: &[u8]) -> IResult<&[u8], Registers> {
    let (input, (mixer, volume, pan)) = tuple((
        count(le_i32, NUM_CHANNELS),
        count(le_i32, NUM_CHANNELS),
        count(le_f32, NUM_CHANNELS),
    ))(input)?;
    let (input, (envelope_period, envelope_shape, noise_period, clock_rate)) =
        tuple((le_i32, le_i32, le_i32, le_i32))(input)?;

    Ok((
        input,
        Registers {
            mixer,
            volume,
            pan,
            envelope_period,
            envelope_shape,
            noise_period,
            clock_rate,
        },
    ))
}

fn envelope_form(input: &[u8]) -> IResult<&[u8], EnvelopeForm> {
    let (input, num_points) = le_i32(input)?;
    let (input, points) = count(tuple((le_f32, le_f32)), MAX_POINTS)(input)?;

    let mut form = EnvelopeForm::DISABLED;
    form.num_points = num_points.clamp(0, MAX_POINTS as i32) as u8;
    for (slot, (time, ratio)) in form.points.iter_mut().zip(points) {
        let time = if time.is_finite() { time.max(0.0) } else { 0.0 };
        *slot = EnvelopePoint::new(time, clamp_unit(ratio, 0.0));
    }
    Ok((input, form))
}

/// Clamp into `0.0..=1.0`, replacing NaN with `fallback`
fn clamp_unit(value: f32, fallback: f32) -> f32 {
    if value.is_nan() {
        fallback
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_state() -> DriverState {
        let mut state = DriverState::default();
        state.reset();
        state.global = GlobalState {
            clock_rate: 1_773_400,
            envelope_period: 0xBEEF,
            envelope_shape: 9,
            noise_period: 17,
        };
        state.channels[0].mixer = MixerFlags::TONE | MixerFlags::ENVELOPE;
        state.channels[1].volume = 3;
        state.channels[2].pan = 0.1;
        state.channels[2].envelope = EnvelopeForm::from_points(&[
            EnvelopePoint::new(0.01, 0.9),
            EnvelopePoint::new(0.5, 0.3),
            EnvelopePoint::new(1.5, 0.7),
        ]);
        state
    }

    #[test]
    fn test_layout_sizes() {
        assert_eq!(LEGACY_STATE_SIZE, 52);
        assert_eq!(EXTENDED_STATE_SIZE, 208);
        let state = sample_state();
        assert_eq!(encode(&state, StateLayout::Legacy).len(), 52);
        assert_eq!(encode(&state, StateLayout::Extended).len(), 208);
    }

    #[test]
    fn test_extended_round_trip() {
        let state = sample_state();
        let (decoded, layout) = decode(&encode(&state, StateLayout::Extended)).unwrap();
        assert_eq!(layout, StateLayout::Extended);
        assert_eq!(decoded.origin, StateOrigin::Loaded);
        assert!(decoded.same_settings(&state));
    }

    #[test]
    fn test_legacy_round_trip() {
        let state = sample_state();
        let (decoded, layout) = decode(&encode(&state, StateLayout::Legacy)).unwrap();
        assert_eq!(layout, StateLayout::Legacy);
        assert_eq!(decoded.global, state.global);
        for (a, b) in decoded.channels.iter().zip(&state.channels) {
            assert_eq!(a.mixer, b.mixer);
            assert_eq!(a.volume, b.volume);
            assert_eq!(a.pan.to_bits(), b.pan.to_bits());
            assert_eq!(a.envelope, EnvelopeForm::default());
        }
    }

    #[test]
    fn test_field_offsets() {
        let bytes = encode(&sample_state(), StateLayout::Extended);
        assert_eq!(&bytes[0..4], &5i32.to_le_bytes());
        assert_eq!(&bytes[16..20], &3i32.to_le_bytes());
        assert_eq!(&bytes[32..36], &0.1f32.to_le_bytes());
        assert_eq!(&bytes[36..40], &0xBEEFi32.to_le_bytes());
        assert_eq!(&bytes[48..52], &1_773_400i32.to_le_bytes());
        // Channel 2 envelope block
        assert_eq!(&bytes[156..160], &3i32.to_le_bytes());
        assert_eq!(&bytes[160..164], &0.01f32.to_le_bytes());
    }

    #[test]
    fn test_short_blob_is_rejected() {
        let bytes = encode(&sample_state(), StateLayout::Legacy);
        assert!(matches!(
            decode(&bytes[..51]),
            Err(DriverError::StateTooShort { len: 51, min: 52 })
        ));
        assert!(decode(&[]).is_err());
    }

    #[test]
    fn test_between_layouts_reads_legacy() {
        let mut bytes = encode(&sample_state(), StateLayout::Extended);
        bytes.truncate(120);
        let (decoded, layout) = decode(&bytes).unwrap();
        assert_eq!(layout, StateLayout::Legacy);
        assert_eq!(decoded.channels[2].envelope, EnvelopeForm::default());
    }

    #[test]
    fn test_out_of_range_values_are_clamped() {
        let mut bytes = encode(&sample_state(), StateLayout::Extended);
        bytes[12..16].copy_from_slice(&99i32.to_le_bytes()); // volume 0
        bytes[24..28].copy_from_slice(&f32::NAN.to_le_bytes()); // pan 0
        bytes[36..40].copy_from_slice(&(-5i32).to_le_bytes()); // envelope period
        bytes[48..52].copy_from_slice(&0i32.to_le_bytes()); // clock
        bytes[52..56].copy_from_slice(&40i32.to_le_bytes()); // point count 0

        let (decoded, _) = decode(&bytes).unwrap();
        assert_eq!(decoded.channels[0].volume, 14);
        assert_eq!(decoded.channels[0].pan, 0.5);
        assert_eq!(decoded.global.envelope_period, 0);
        assert_eq!(decoded.global.clock_rate, DEFAULT_CLOCK_RATE);
        assert_eq!(decoded.channels[0].envelope.num_points, 6);
    }
}
