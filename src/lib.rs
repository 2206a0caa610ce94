//! Three-voice MIDI-style driver for the YM2149 / AY-3-8910 PSG
//!
//! Converts a stream of timestamped performance events (note on/off, program
//! and control changes, pitch bend) into PSG register writes and renders the
//! chip output block by block, splitting each block at event offsets so that
//! every register change lands on the right sample.
//!
//! # Features
//! - Per-channel state machine mapping the event protocol onto chip registers
//! - Sample-accurate event scheduling inside each audio block
//! - Per-note software volume envelope (piecewise linear, up to 6 breakpoints)
//! - Fixed-layout persisted state (52-byte legacy and 208-byte extended)
//! - 52-parameter host surface with normalized ranges
//! - Hardware-style YM2149 engine behind the [`SynthEngine`] trait
//!
//! # Quick start
//! ```no_run
//! use ym2149_voice_driver::{PerformanceEvent, TimedEvent, VoiceDriver, Ym2149Engine};
//!
//! let mut driver = VoiceDriver::new(Ym2149Engine::new(), Default::default());
//! driver.prepare(44_100).unwrap();
//!
//! let events = [TimedEvent::new(0, PerformanceEvent::NoteOn { channel: 0, key: 57, velocity: 100 })];
//! let mut left = vec![0.0f32; 512];
//! let mut right = vec![0.0f32; 512];
//! driver.render_block(&mut [&mut left[..], &mut right[..]], &events);
//! ```

#![warn(missing_docs)]

pub mod backend; // Synthesis engine seam
pub mod codec; // Persisted state blobs
pub mod config; // Driver configuration
pub mod driver; // Owning facade
pub mod envelope; // Software envelope curve
pub mod event; // Performance event protocol
pub mod params; // Host parameter surface
pub mod renderer; // Block splitting and sample loop
pub mod state; // Global / per-channel register mirror
pub mod translator; // Event -> register mapping
pub mod ym2149; // Concrete PSG engine

/// Error types for driver operations
///
/// Only the control path (configuration, state decoding, file I/O in the
/// command-line renderer) produces errors. Rendering never fails.
#[derive(thiserror::Error, Debug)]
pub enum DriverError {
    /// Invalid engine or driver configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Persisted state blob shorter than the smallest known layout
    #[error("State blob too short: {len} bytes (need at least {min})")]
    StateTooShort {
        /// Length of the rejected blob
        len: usize,
        /// Minimum accepted length
        min: usize,
    },

    /// IO error from filesystem
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON configuration or score
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WAV writer failure
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
}

/// Result type for driver operations
pub type Result<T> = std::result::Result<T, DriverError>;

// Public API exports
pub use backend::{ChipModel, SynthEngine};
pub use codec::StateLayout;
pub use config::DriverConfig;
pub use driver::VoiceDriver;
pub use envelope::{EnvelopeForm, EnvelopePoint};
pub use event::{Controller, PerformanceEvent, TimedEvent};
pub use params::{NormalisableRange, ParamId, ParameterInfo};
pub use state::{ChannelState, DriverState, GlobalState, MixerFlags, StateOrigin};
pub use ym2149::Ym2149Engine;
