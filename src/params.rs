//! Host parameter surface
//!
//! 52 scalar parameters at fixed indices, each with a normalized
//! `0.0..=1.0` mapping. Parameter writes use the same register setters as
//! in-block controllers.
//!
//! | Index            | Parameter                         |
//! |------------------|-----------------------------------|
//! | 0-2              | mixer byte of channel 0-2         |
//! | 3-5              | volume of channel 0-2             |
//! | 6-8              | pan of channel 0-2                |
//! | 9                | hardware envelope period          |
//! | 10               | hardware envelope shape           |
//! | 11               | noise period                      |
//! | 12               | clock rate                        |
//! | 13 + 13c         | soft envelope point count of `c`  |
//! | 14 + 13c + 2k    | time of point `k` of channel `c`  |
//! | 15 + 13c + 2k    | ratio of point `k` of channel `c` |

use crate::backend::{SynthEngine, NUM_CHANNELS};
use crate::envelope::MAX_POINTS;
use crate::state::{DriverState, MixerFlags, MAX_ENVELOPE_SHAPE, MAX_NOISE_PERIOD, MAX_VOLUME};
use crate::VoiceDriver;

/// Number of scalar parameters before the soft envelope block
pub const NUM_SCALAR_PARAMS: usize = 13;
/// Parameters per channel in the soft envelope block
pub const PARAMS_PER_ENVELOPE: usize = 1 + 2 * MAX_POINTS;
/// Total parameter count
pub const NUM_PARAMS: usize = NUM_SCALAR_PARAMS + NUM_CHANNELS * PARAMS_PER_ENVELOPE;

/// Highest clock rate reachable through the parameter surface
pub const MAX_CLOCK_RATE: u32 = 16_777_215;
/// Longest soft envelope breakpoint time in seconds
pub const MAX_POINT_TIME: f32 = 4096.0;

/// Skew used by the wide-range parameters
const WIDE_SKEW: f32 = 0.2;

/// Mapping between a plain parameter value and `0.0..=1.0`
///
/// `value = start + (end - start) * p^(1/skew)`, snapped to `interval` when
/// it is non-zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalisableRange {
    /// Lowest plain value
    pub start: f32,
    /// Highest plain value
    pub end: f32,
    /// Snapping step (0 = continuous)
    pub interval: f32,
    /// Skew factor (1 = linear, < 1 expands the low end)
    pub skew: f32,
}

impl NormalisableRange {
    /// Linear range
    pub const fn new(start: f32, end: f32, interval: f32) -> Self {
        Self {
            start,
            end,
            interval,
            skew: 1.0,
        }
    }

    /// Skewed range
    pub const fn with_skew(start: f32, end: f32, interval: f32, skew: f32) -> Self {
        Self {
            start,
            end,
            interval,
            skew,
        }
    }

    /// Map a normalized position onto a plain value
    pub fn convert_from_0to1(&self, proportion: f32) -> f32 {
        let mut p = proportion.clamp(0.0, 1.0);
        if self.skew != 1.0 && p > 0.0 {
            p = (p.ln() / self.skew).exp();
        }
        self.snap(self.start + (self.end - self.start) * p)
    }

    /// Map a plain value onto a normalized position
    pub fn convert_to_0to1(&self, value: f32) -> f32 {
        let span = self.end - self.start;
        if span <= 0.0 {
            return 0.0;
        }
        let p = ((value - self.start) / span).clamp(0.0, 1.0);
        if self.skew == 1.0 {
            p
        } else {
            p.powf(self.skew)
        }
    }

    /// Snap to the interval and clamp into the range
    pub fn snap(&self, value: f32) -> f32 {
        let value = if self.interval > 0.0 {
            self.start + ((value - self.start) / self.interval).round() * self.interval
        } else {
            value
        };
        value.clamp(self.start, self.end)
    }
}

/// Typed parameter identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamId {
    /// Mixer byte of a channel
    Mixer(usize),
    /// Fixed volume of a channel
    Volume(usize),
    /// Stereo position of a channel
    Pan(usize),
    /// Hardware envelope period
    EnvelopePeriod,
    /// Hardware envelope shape
    EnvelopeShape,
    /// Noise period
    NoiseFrequency,
    /// Oscillator reference clock
    ClockRate,
    /// Active soft envelope breakpoints of a channel
    EnvelopePointCount(usize),
    /// Time of breakpoint `k` of channel `c`
    EnvelopePointTime(usize, usize),
    /// Ratio of breakpoint `k` of channel `c`
    EnvelopePointRatio(usize, usize),
}

impl ParamId {
    /// Identifier at a host parameter index
    pub fn from_index(index: usize) -> Option<Self> {
        let id = match index {
            0..=2 => ParamId::Mixer(index),
            3..=5 => ParamId::Volume(index - 3),
            6..=8 => ParamId::Pan(index - 6),
            9 => ParamId::EnvelopePeriod,
            10 => ParamId::EnvelopeShape,
            11 => ParamId::NoiseFrequency,
            12 => ParamId::ClockRate,
            i if i < NUM_PARAMS => {
                let rel = i - NUM_SCALAR_PARAMS;
                let (ch, slot) = (rel / PARAMS_PER_ENVELOPE, rel % PARAMS_PER_ENVELOPE);
                match slot {
                    0 => ParamId::EnvelopePointCount(ch),
                    s if s % 2 == 1 => ParamId::EnvelopePointTime(ch, s / 2),
                    s => ParamId::EnvelopePointRatio(ch, s / 2 - 1),
                }
            }
            _ => return None,
        };
        Some(id)
    }

    /// Host parameter index
    pub fn index(&self) -> usize {
        let envelope_base = |ch: usize| NUM_SCALAR_PARAMS + ch * PARAMS_PER_ENVELOPE;
        match *self {
            ParamId::Mixer(ch) => ch,
            ParamId::Volume(ch) => 3 + ch,
            ParamId::Pan(ch) => 6 + ch,
            ParamId::EnvelopePeriod => 9,
            ParamId::EnvelopeShape => 10,
            ParamId::NoiseFrequency => 11,
            ParamId::ClockRate => 12,
            ParamId::EnvelopePointCount(ch) => envelope_base(ch),
            ParamId::EnvelopePointTime(ch, k) => envelope_base(ch) + 1 + 2 * k,
            ParamId::EnvelopePointRatio(ch, k) => envelope_base(ch) + 2 + 2 * k,
        }
    }

    /// Display name
    pub fn name(&self) -> String {
        match *self {
            ParamId::Mixer(ch) => format!("Mixer {ch}"),
            ParamId::Volume(ch) => format!("Volume {ch}"),
            ParamId::Pan(ch) => format!("Pan {ch}"),
            ParamId::EnvelopePeriod => "Envelope".to_string(),
            ParamId::EnvelopeShape => "EnvelopeShape".to_string(),
            ParamId::NoiseFrequency => "NoiseFrequency".to_string(),
            ParamId::ClockRate => "ClockRate".to_string(),
            ParamId::EnvelopePointCount(ch) => format!("SoftEnvelope {ch} Points"),
            ParamId::EnvelopePointTime(ch, k) => format!("SoftEnvelope {ch} Time {k}"),
            ParamId::EnvelopePointRatio(ch, k) => format!("SoftEnvelope {ch} Ratio {k}"),
        }
    }

    /// Plain value range
    pub fn range(&self) -> NormalisableRange {
        match self {
            ParamId::Mixer(_) => NormalisableRange::new(0.0, 7.0, 1.0),
            ParamId::Volume(_) => NormalisableRange::new(0.0, MAX_VOLUME as f32, 1.0),
            ParamId::Pan(_) => NormalisableRange::new(0.0, 1.0, 0.0),
            ParamId::EnvelopePeriod => {
                NormalisableRange::with_skew(0.0, u16::MAX as f32, 1.0, WIDE_SKEW)
            }
            ParamId::EnvelopeShape => NormalisableRange::new(0.0, MAX_ENVELOPE_SHAPE as f32, 1.0),
            ParamId::NoiseFrequency => NormalisableRange::new(0.0, MAX_NOISE_PERIOD as f32, 1.0),
            ParamId::ClockRate => {
                NormalisableRange::with_skew(0.0, MAX_CLOCK_RATE as f32, 1.0, WIDE_SKEW)
            }
            ParamId::EnvelopePointCount(_) => NormalisableRange::new(0.0, MAX_POINTS as f32, 1.0),
            ParamId::EnvelopePointTime(..) => {
                NormalisableRange::with_skew(0.0, MAX_POINT_TIME, 0.01, WIDE_SKEW)
            }
            ParamId::EnvelopePointRatio(..) => NormalisableRange::new(0.0, 1.0, 0.0),
        }
    }

    /// Whether the channel and breakpoint indices exist
    pub fn is_valid(&self) -> bool {
        match *self {
            ParamId::Mixer(ch)
            | ParamId::Volume(ch)
            | ParamId::Pan(ch)
            | ParamId::EnvelopePointCount(ch) => ch < NUM_CHANNELS,
            ParamId::EnvelopePointTime(ch, k) | ParamId::EnvelopePointRatio(ch, k) => {
                ch < NUM_CHANNELS && k < MAX_POINTS
            }
            ParamId::EnvelopePeriod
            | ParamId::EnvelopeShape
            | ParamId::NoiseFrequency
            | ParamId::ClockRate => true,
        }
    }

    /// Plain value of this parameter in `state`
    ///
    /// `None` for identifiers addressing a missing channel or breakpoint.
    pub fn value_in(&self, state: &DriverState) -> Option<f32> {
        if !self.is_valid() {
            return None;
        }
        let value = match *self {
            ParamId::Mixer(ch) => state.channels[ch].mixer.bits() as f32,
            ParamId::Volume(ch) => state.channels[ch].volume as f32,
            ParamId::Pan(ch) => state.channels[ch].pan,
            ParamId::EnvelopePeriod => state.global.envelope_period as f32,
            ParamId::EnvelopeShape => state.global.envelope_shape as f32,
            ParamId::NoiseFrequency => state.global.noise_period as f32,
            ParamId::ClockRate => state.global.clock_rate as f32,
            ParamId::EnvelopePointCount(ch) => state.channels[ch].envelope.num_points as f32,
            ParamId::EnvelopePointTime(ch, k) => state.channels[ch].envelope.points[k].time,
            ParamId::EnvelopePointRatio(ch, k) => state.channels[ch].envelope.points[k].ratio,
        };
        Some(value)
    }
}

/// Host-facing description of one parameter
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterInfo {
    /// Identifier
    pub id: ParamId,
    /// Display name
    pub name: String,
    /// Plain value range
    pub range: NormalisableRange,
    /// Plain default value
    pub default: f32,
    /// Host may record and play back automation for it
    pub automatable: bool,
}

impl<E: SynthEngine> VoiceDriver<E> {
    /// Describe every parameter in index order
    pub fn parameters(&self) -> Vec<ParameterInfo> {
        let mut defaults = DriverState::default();
        defaults.reset();

        (0..NUM_PARAMS)
            .filter_map(ParamId::from_index)
            .map(|id| ParameterInfo {
                id,
                name: id.name(),
                range: id.range(),
                default: id.value_in(&defaults).unwrap_or_default(),
                automatable: id != ParamId::ClockRate || self.config.expose_clock_rate,
            })
            .collect()
    }

    /// Current normalized value of the parameter at `index`
    pub fn parameter(&self, index: usize) -> Option<f32> {
        let id = ParamId::from_index(index)?;
        Some(id.range().convert_to_0to1(id.value_in(&self.state)?))
    }

    /// Set the parameter at `index` from a normalized position
    ///
    /// Unknown indices are ignored.
    pub fn set_parameter(&mut self, index: usize, normalized: f32) {
        if let Some(id) = ParamId::from_index(index) {
            let value = id.range().convert_from_0to1(normalized);
            self.set_parameter_value(id, value);
        }
    }

    /// Set a parameter from a plain value (clamped into its range)
    ///
    /// The clock rate is only writable when the configuration exposes it.
    /// Identifiers addressing a missing channel or breakpoint are ignored.
    pub fn set_parameter_value(&mut self, id: ParamId, value: f32) {
        if !id.is_valid() {
            return;
        }
        let value = id.range().snap(value);
        self.runtime.now = self.runtime.elapsed_seconds;

        match id {
            ParamId::Mixer(ch) => {
                self.set_channel_mixer(ch, MixerFlags::from_bits_truncate(value as u8))
            }
            ParamId::Volume(ch) => self.set_channel_volume(ch, value as u8),
            ParamId::Pan(ch) => self.set_channel_pan(ch, value),
            ParamId::EnvelopePeriod => {
                let period = value as u16;
                self.runtime.sync_envelope_fragments(period as u32);
                self.set_envelope_period(period);
            }
            ParamId::EnvelopeShape => self.set_envelope_shape(value as u8),
            ParamId::NoiseFrequency => self.set_noise_period(value as u8),
            ParamId::ClockRate => {
                if !self.config.expose_clock_rate {
                    return;
                }
                let clock_rate = value as u32;
                if clock_rate != self.state.global.clock_rate {
                    // Rejected rates are logged and leave the previous clock in place
                    let _ = self.set_clock_rate(clock_rate);
                }
            }
            ParamId::EnvelopePointCount(ch) => {
                self.state.channels[ch].envelope.set_num_points(value as u8)
            }
            ParamId::EnvelopePointTime(ch, k) => {
                self.state.channels[ch].envelope.points[k].time = value
            }
            ParamId::EnvelopePointRatio(ch, k) => {
                self.state.channels[ch].envelope.points[k].ratio = value
            }
        }
    }
}
