//! Shared fixtures for the driver integration tests

#![allow(dead_code)]

use ym2149_voice_driver::{
    ChipModel, Controller, DriverConfig, DriverError, PerformanceEvent, Result, SynthEngine,
    VoiceDriver,
};

/// Fixed left output of [`RecordingEngine`]
pub const LEFT_LEVEL: f32 = 0.25;
/// Fixed right output of [`RecordingEngine`]
pub const RIGHT_LEVEL: f32 = -0.25;

/// One control-path call received by the engine
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Call {
    Configure {
        model: ChipModel,
        clock_rate: u32,
        sample_rate: u32,
    },
    Tone(usize, u32),
    Noise(u8),
    Mixer(usize, bool, bool, bool),
    Volume(usize, u8),
    Pan(usize, f32, bool),
    Envelope(u16),
    EnvelopeShape(u8),
    ResetDc,
}

/// Engine that records register writes and outputs a constant pair
///
/// Per-sample calls are only counted so the call log stays readable.
#[derive(Debug, Default)]
pub struct RecordingEngine {
    pub calls: Vec<Call>,
    pub processed: usize,
    pub dc_removed: usize,
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget everything recorded so far
    pub fn clear(&mut self) {
        self.calls.clear();
        self.processed = 0;
        self.dc_removed = 0;
    }

    /// Volumes written to `channel`, in order
    pub fn volumes(&self, channel: usize) -> Vec<u8> {
        self.calls
            .iter()
            .filter_map(|call| match *call {
                Call::Volume(ch, v) if ch == channel => Some(v),
                _ => None,
            })
            .collect()
    }
}

impl SynthEngine for RecordingEngine {
    fn configure(&mut self, model: ChipModel, clock_rate: u32, sample_rate: u32) -> Result<()> {
        if sample_rate == 0 || clock_rate < sample_rate {
            return Err(DriverError::Config(format!(
                "unsupported clock {clock_rate} Hz at {sample_rate} Hz"
            )));
        }
        self.calls.push(Call::Configure {
            model,
            clock_rate,
            sample_rate,
        });
        Ok(())
    }

    fn set_tone(&mut self, channel: usize, period: u32) {
        self.calls.push(Call::Tone(channel, period));
    }

    fn set_noise(&mut self, period: u8) {
        self.calls.push(Call::Noise(period));
    }

    fn set_mixer(&mut self, channel: usize, tone_on: bool, noise_on: bool, envelope_on: bool) {
        self.calls
            .push(Call::Mixer(channel, tone_on, noise_on, envelope_on));
    }

    fn set_volume(&mut self, channel: usize, volume: u8) {
        self.calls.push(Call::Volume(channel, volume));
    }

    fn set_pan(&mut self, channel: usize, pan: f32, equal_power: bool) {
        self.calls.push(Call::Pan(channel, pan, equal_power));
    }

    fn set_envelope(&mut self, period: u16) {
        self.calls.push(Call::Envelope(period));
    }

    fn set_envelope_shape(&mut self, shape: u8) {
        self.calls.push(Call::EnvelopeShape(shape));
    }

    fn remove_dc(&mut self) {
        self.dc_removed += 1;
    }

    fn reset_dc(&mut self) {
        self.calls.push(Call::ResetDc);
    }

    fn process(&mut self) {
        self.processed += 1;
    }

    fn left(&self) -> f32 {
        LEFT_LEVEL
    }

    fn right(&self) -> f32 {
        RIGHT_LEVEL
    }
}

/// Prepared driver with an empty call log
pub fn prepared(sample_rate: u32) -> VoiceDriver<RecordingEngine> {
    prepared_with(DriverConfig::default(), sample_rate)
}

/// Prepared driver with a custom configuration and an empty call log
pub fn prepared_with(config: DriverConfig, sample_rate: u32) -> VoiceDriver<RecordingEngine> {
    let mut driver = VoiceDriver::new(RecordingEngine::new(), config);
    driver.prepare(sample_rate).unwrap();
    driver.engine_mut().clear();
    driver
}

pub fn note_on(channel: u8, key: u8, velocity: u8) -> PerformanceEvent {
    PerformanceEvent::NoteOn {
        channel,
        key,
        velocity,
    }
}

pub fn note_off(channel: u8) -> PerformanceEvent {
    PerformanceEvent::NoteOff { channel }
}

pub fn cc(channel: u8, number: u8, value: u8) -> PerformanceEvent {
    PerformanceEvent::ControlChange {
        channel,
        controller: Controller::from_number(number),
        value,
    }
}
