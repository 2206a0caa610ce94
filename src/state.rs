//! Driver state model
//!
//! Persisted state ([`GlobalState`] + three [`ChannelState`]s) mirrors the
//! chip registers the host can save and restore. Runtime state
//! ([`ChannelRuntime`], [`EngineRuntime`]) lives only while the engine is
//! configured.

use bitflags::bitflags;

use crate::backend::NUM_CHANNELS;
use crate::envelope::{EnvelopeForm, EnvelopeInstance};

/// Default oscillator reference frequency (Atari ST)
pub const DEFAULT_CLOCK_RATE: u32 = 2_000_000;
/// Default output sample rate
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;
/// Default hardware envelope period (somewhat slow)
pub const DEFAULT_ENVELOPE_PERIOD: u16 = 0x40;
/// Default hardware envelope shape (triangle, starting upwards)
pub const DEFAULT_ENVELOPE_SHAPE: u8 = 14;
/// Highest volume accepted by the engine
pub const MAX_VOLUME: u8 = 14;
/// Highest hardware envelope shape
pub const MAX_ENVELOPE_SHAPE: u8 = 15;
/// Highest noise period
pub const MAX_NOISE_PERIOD: u8 = 31;

bitflags! {
    /// Per-channel mixer byte (positive logic: set = audible)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MixerFlags: u8 {
        /// Square tone enabled
        const TONE = 0x01;
        /// Noise enabled
        const NOISE = 0x02;
        /// Hardware envelope drives the volume
        const ENVELOPE = 0x04;
    }
}

impl MixerFlags {
    /// Build flags from the three enable switches
    pub fn from_switches(tone: bool, noise: bool, envelope: bool) -> Self {
        let mut flags = MixerFlags::empty();
        flags.set(MixerFlags::TONE, tone);
        flags.set(MixerFlags::NOISE, noise);
        flags.set(MixerFlags::ENVELOPE, envelope);
        flags
    }

    /// Check if tone is enabled
    pub fn tone(&self) -> bool {
        self.contains(MixerFlags::TONE)
    }

    /// Check if noise is enabled
    pub fn noise(&self) -> bool {
        self.contains(MixerFlags::NOISE)
    }

    /// Check if the hardware envelope is enabled
    pub fn envelope(&self) -> bool {
        self.contains(MixerFlags::ENVELOPE)
    }
}

impl Default for MixerFlags {
    fn default() -> Self {
        MixerFlags::TONE
    }
}

/// Where the persisted state came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StateOrigin {
    /// Never configured nor loaded
    #[default]
    Uninitialized,
    /// Reset to compiled-in defaults
    Defaulted,
    /// Successfully decoded from a persisted blob
    Loaded,
}

/// Chip-wide persisted registers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlobalState {
    /// Oscillator reference frequency in Hz
    pub clock_rate: u32,
    /// Hardware envelope period (16 bit)
    pub envelope_period: u16,
    /// Hardware envelope shape (0-15)
    pub envelope_shape: u8,
    /// Noise period (0-31)
    pub noise_period: u8,
}

impl Default for GlobalState {
    fn default() -> Self {
        Self {
            clock_rate: DEFAULT_CLOCK_RATE,
            envelope_period: DEFAULT_ENVELOPE_PERIOD,
            envelope_shape: DEFAULT_ENVELOPE_SHAPE,
            noise_period: 0,
        }
    }
}

/// Per-voice persisted registers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelState {
    /// Tone / noise / envelope enables used at note-on
    pub mixer: MixerFlags,
    /// Fixed volume (0-14)
    pub volume: u8,
    /// Stereo position, 0.0 = left ... 1.0 = right
    pub pan: f32,
    /// Software envelope definition
    pub envelope: EnvelopeForm,
}

impl Default for ChannelState {
    fn default() -> Self {
        Self {
            mixer: MixerFlags::default(),
            volume: MAX_VOLUME,
            pan: 0.5,
            envelope: EnvelopeForm::default(),
        }
    }
}

/// Complete persisted state of one driver instance
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DriverState {
    /// Validity marker
    pub origin: StateOrigin,
    /// Chip-wide registers
    pub global: GlobalState,
    /// Voice registers
    pub channels: [ChannelState; NUM_CHANNELS],
}

impl DriverState {
    /// Reset every field to its default and mark the state as defaulted
    pub fn reset(&mut self) {
        *self = DriverState {
            origin: StateOrigin::Defaulted,
            ..DriverState::default()
        };
    }

    /// Persisted fields compare equal, ignoring the validity marker
    pub fn same_settings(&self, other: &DriverState) -> bool {
        self.global == other.global && self.channels == other.channels
    }
}

/// Per-voice runtime state (not persisted)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ChannelRuntime {
    /// Voice is sounding
    pub note_on: bool,
    /// Last tone period written to the engine
    pub tone_period: u32,
    /// Software envelope of the sounding note, if its form was enabled
    pub envelope: Option<EnvelopeInstance>,
    /// Last volume written by the software envelope
    pub applied_volume: Option<u8>,
    /// Pitch bend (14 bit, 0x2000 = centre); stored only
    pub pitch_bend: u16,
}

/// Engine-wide runtime state (not persisted)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineRuntime {
    /// Output sample rate in Hz
    pub sample_rate: u32,
    /// Engine configured and allowed to render
    pub active: bool,
    /// Seconds rendered since configuration, advanced once per block
    pub elapsed_seconds: f64,
    /// Engine time of the event being applied
    pub now: f64,
    /// Samples left before the next software envelope refresh
    pub envelope_countdown: usize,
    /// Cached high/mid/low 7-bit fragments of the envelope period
    pub envelope_fragments: [u8; 3],
    /// Voice runtime state
    pub channels: [ChannelRuntime; NUM_CHANNELS],
}

impl EngineRuntime {
    /// Fresh runtime state for a configured engine
    pub fn new(sample_rate: u32, envelope_period: u16) -> Self {
        let mut runtime = Self {
            sample_rate,
            active: false,
            elapsed_seconds: 0.0,
            now: 0.0,
            envelope_countdown: 0,
            envelope_fragments: [0; 3],
            channels: [ChannelRuntime {
                pitch_bend: 0x2000,
                ..ChannelRuntime::default()
            }; NUM_CHANNELS],
        };
        runtime.sync_envelope_fragments(envelope_period as u32);
        runtime
    }

    /// Split a period into the cached 7-bit fragments
    pub fn sync_envelope_fragments(&mut self, period: u32) {
        self.envelope_fragments = [
            ((period >> 14) & 0x7F) as u8,
            ((period >> 7) & 0x7F) as u8,
            (period & 0x7F) as u8,
        ];
    }

    /// 21-bit period composed from the cached fragments
    pub fn composed_envelope_period(&self) -> u32 {
        let [high, mid, low] = self.envelope_fragments;
        ((high as u32) << 14) | ((mid as u32) << 7) | low as u32
    }

    /// Engine time at `offset` samples into the current block
    #[inline]
    pub fn time_at(&self, offset: usize) -> f64 {
        self.elapsed_seconds + offset as f64 / self.sample_rate.max(1) as f64
    }

    /// Any voice currently sounding
    #[inline]
    pub fn any_note_on(&self) -> bool {
        self.channels.iter().any(|c| c.note_on)
    }
}

impl Default for EngineRuntime {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_RATE, DEFAULT_ENVELOPE_PERIOD)
    }
}
