//! Performance event protocol
//!
//! Raw channel-voice messages are decoded once at the boundary into
//! [`PerformanceEvent`]. The two historical bit layouts for mixer enables
//! (program change vs. bank select) are isolated in
//! [`mixer_from_program`] and [`mixer_from_bank_select`].

use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

use crate::envelope::MAX_POINTS;
use crate::state::MixerFlags;

/// Status nibble of a channel-voice message
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
enum StatusKind {
    NoteOff = 0x8,
    NoteOn = 0x9,
    PolyPressure = 0xA,
    ControlChange = 0xB,
    ProgramChange = 0xC,
    ChannelPressure = 0xD,
    PitchBend = 0xE,
}

/// Controller numbers with a fixed meaning
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
enum FixedController {
    BankSelect = 0x00,
    Volume = 0x07,
    Pan = 0x0A,
    EnvelopeHigh = 0x10,
    EnvelopeMid = 0x11,
    EnvelopeLow = 0x12,
    EnvelopeShape = 0x13,
    RemoveDc = 0x50,
}

/// First controller of the software envelope block
pub const SOFT_ENVELOPE_CC_BASE: u8 = 0x66;
/// Last controller of the software envelope block
pub const SOFT_ENVELOPE_CC_LAST: u8 = SOFT_ENVELOPE_CC_BASE + 2 * MAX_POINTS as u8;

/// Decoded controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Controller {
    /// 0x00: mixer enables in bits 0/1/2
    BankSelect,
    /// 0x07: channel volume
    Volume,
    /// 0x0A: stereo position
    Pan,
    /// 0x10: envelope period bits 14-20
    EnvelopeHigh,
    /// 0x11: envelope period bits 7-13
    EnvelopeMid,
    /// 0x12: envelope period bits 0-6
    EnvelopeLow,
    /// 0x13: hardware envelope shape (low 4 bits)
    EnvelopeShape,
    /// 0x50: one-shot DC reset
    RemoveDc,
    /// 0x66: active software envelope point count
    SoftEnvelopeCount,
    /// 0x67 + 2i: time of software envelope point `i`
    SoftEnvelopeTime(usize),
    /// 0x68 + 2i: ratio of software envelope point `i`
    SoftEnvelopeRatio(usize),
    /// Anything else (ignored)
    Other(u8),
}

impl Controller {
    /// Decode a controller number
    pub fn from_number(number: u8) -> Self {
        if let Some(fixed) = FixedController::from_u8(number) {
            return match fixed {
                FixedController::BankSelect => Controller::BankSelect,
                FixedController::Volume => Controller::Volume,
                FixedController::Pan => Controller::Pan,
                FixedController::EnvelopeHigh => Controller::EnvelopeHigh,
                FixedController::EnvelopeMid => Controller::EnvelopeMid,
                FixedController::EnvelopeLow => Controller::EnvelopeLow,
                FixedController::EnvelopeShape => Controller::EnvelopeShape,
                FixedController::RemoveDc => Controller::RemoveDc,
            };
        }

        match number {
            SOFT_ENVELOPE_CC_BASE => Controller::SoftEnvelopeCount,
            n if n > SOFT_ENVELOPE_CC_BASE && n <= SOFT_ENVELOPE_CC_LAST => {
                let slot = (n - SOFT_ENVELOPE_CC_BASE - 1) as usize;
                if slot % 2 == 0 {
                    Controller::SoftEnvelopeTime(slot / 2)
                } else {
                    Controller::SoftEnvelopeRatio(slot / 2)
                }
            }
            n => Controller::Other(n),
        }
    }

    /// Controller number on the wire
    pub fn number(&self) -> u8 {
        match *self {
            Controller::BankSelect => FixedController::BankSelect as u8,
            Controller::Volume => FixedController::Volume as u8,
            Controller::Pan => FixedController::Pan as u8,
            Controller::EnvelopeHigh => FixedController::EnvelopeHigh as u8,
            Controller::EnvelopeMid => FixedController::EnvelopeMid as u8,
            Controller::EnvelopeLow => FixedController::EnvelopeLow as u8,
            Controller::EnvelopeShape => FixedController::EnvelopeShape as u8,
            Controller::RemoveDc => FixedController::RemoveDc as u8,
            Controller::SoftEnvelopeCount => SOFT_ENVELOPE_CC_BASE,
            Controller::SoftEnvelopeTime(i) => SOFT_ENVELOPE_CC_BASE + 1 + 2 * i as u8,
            Controller::SoftEnvelopeRatio(i) => SOFT_ENVELOPE_CC_BASE + 2 + 2 * i as u8,
            Controller::Other(n) => n,
        }
    }
}

/// One performance event addressed to a channel
///
/// Channel numbers are kept as received; the translator drops events for
/// channels the chip does not have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PerformanceEvent {
    /// Release the voice
    NoteOff {
        /// Target channel
        channel: u8,
    },
    /// Start a note; velocity 0 releases instead
    NoteOn {
        /// Target channel
        channel: u8,
        /// Key number (57 = A 440 Hz)
        key: u8,
        /// Velocity (0 aliases note-off)
        velocity: u8,
    },
    /// Packed noise period (bits 0-4) and mixer enables (bits 5-7)
    ProgramChange {
        /// Target channel
        channel: u8,
        /// Packed program value
        program: u8,
    },
    /// Controller write
    ControlChange {
        /// Target channel
        channel: u8,
        /// Decoded controller
        controller: Controller,
        /// 7-bit value
        value: u8,
    },
    /// 14-bit pitch bend (stored only), high fragment first on the wire
    PitchBend {
        /// Target channel
        channel: u8,
        /// Bend value, 0x2000 = centre
        value: u16,
    },
}

impl PerformanceEvent {
    /// Decode a raw channel-voice message
    ///
    /// Returns `None` for truncated messages and for statuses the driver has
    /// no use for (pressure, system messages).
    pub fn from_midi(bytes: &[u8]) -> Option<Self> {
        let status = *bytes.first()?;
        let channel = status & 0x0F;
        let data = |i: usize| bytes.get(i).map(|b| b & 0x7F);

        let event = match StatusKind::from_u8(status >> 4)? {
            StatusKind::NoteOff => PerformanceEvent::NoteOff { channel },
            StatusKind::NoteOn => PerformanceEvent::NoteOn {
                channel,
                key: data(1)?,
                velocity: data(2)?,
            },
            StatusKind::ProgramChange => PerformanceEvent::ProgramChange {
                channel,
                program: data(1)?,
            },
            StatusKind::ControlChange => PerformanceEvent::ControlChange {
                channel,
                controller: Controller::from_number(data(1)?),
                value: data(2)?,
            },
            StatusKind::PitchBend => {
                // First data byte carries the high fragment
                let high = data(1)? as u16;
                let low = data(2)? as u16;
                PerformanceEvent::PitchBend {
                    channel,
                    value: (high << 7) | low,
                }
            }
            StatusKind::PolyPressure | StatusKind::ChannelPressure => return None,
        };
        Some(event)
    }

    /// Channel the event addresses
    pub fn channel(&self) -> u8 {
        match *self {
            PerformanceEvent::NoteOff { channel }
            | PerformanceEvent::NoteOn { channel, .. }
            | PerformanceEvent::ProgramChange { channel, .. }
            | PerformanceEvent::ControlChange { channel, .. }
            | PerformanceEvent::PitchBend { channel, .. } => channel,
        }
    }
}

/// Event scheduled at a sample offset inside the current block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimedEvent {
    /// Offset from the block start, in samples
    pub offset: usize,
    /// The event
    pub event: PerformanceEvent,
}

impl TimedEvent {
    /// Pair an event with its block offset
    pub const fn new(offset: usize, event: PerformanceEvent) -> Self {
        Self { offset, event }
    }
}

/// Mixer enables packed by a program change (bits 5/6/7)
///
/// A 7-bit program number cannot carry bit 7, so the caller decides what to
/// do with the envelope switch.
#[inline]
pub fn mixer_from_program(program: u8) -> MixerFlags {
    MixerFlags::from_switches(
        (program >> 5) & 1 != 0,
        (program >> 6) & 1 != 0,
        (program >> 7) & 1 != 0,
    )
}

/// Noise period packed by a program change (bits 0-4)
#[inline]
pub fn noise_from_program(program: u8) -> u8 {
    program & 0x1F
}

/// Mixer enables packed by a bank-select controller (bits 0/1/2)
#[inline]
pub fn mixer_from_bank_select(value: u8) -> MixerFlags {
    MixerFlags::from_bits_truncate(value & 0x07)
}
