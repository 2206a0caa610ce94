//! Event translator
//!
//! Maps one [`PerformanceEvent`] onto the stored registers, the voice
//! runtime and the engine's live registers. The register setters at the
//! bottom of this file are shared with the host parameter surface so that a
//! live parameter tweak and a recorded controller take the same path.

use crate::backend::{SynthEngine, NUM_CHANNELS};
use crate::envelope::{decode_point_ratio, decode_point_time, EnvelopeInstance, MAX_POINTS};
use crate::event::{
    mixer_from_bank_select, mixer_from_program, noise_from_program, Controller, PerformanceEvent,
};
use crate::state::{MixerFlags, MAX_ENVELOPE_SHAPE, MAX_NOISE_PERIOD, MAX_VOLUME};
use crate::VoiceDriver;

/// Key number of the A 440 Hz reference
pub const REFERENCE_KEY: u8 = 57;
/// Reference frequency in Hz
pub const REFERENCE_FREQUENCY: f64 = 440.0;
/// Equal-temperament semitone ratio
const SEMITONE: f64 = 1.059463;

/// Tone period register for `key` at `clock_rate`
///
/// `clock / (16 * freq)`, truncated.
#[inline]
pub fn tone_period(clock_rate: u32, key: u8) -> u32 {
    let freq = REFERENCE_FREQUENCY * SEMITONE.powi(key as i32 - REFERENCE_KEY as i32);
    (clock_rate as f64 / (16.0 * freq)) as u32
}

/// Volume register for a 0-127 controller value (0-14)
#[inline]
pub fn volume_from_controller(value: u8) -> u8 {
    value.min(119) / 8
}

/// Pan position for a 0-127 controller value
#[inline]
pub fn pan_from_controller(value: u8) -> f32 {
    value as f32 / 128.0
}

impl<E: SynthEngine> VoiceDriver<E> {
    /// Apply an event outside of a render call
    ///
    /// The event takes effect at the start of the next block.
    pub fn apply_event(&mut self, event: PerformanceEvent) {
        self.runtime.now = self.runtime.elapsed_seconds;
        self.translate(event);
    }

    /// Apply an event at `runtime.now`
    pub(crate) fn translate(&mut self, event: PerformanceEvent) {
        let ch = event.channel() as usize;
        if ch >= NUM_CHANNELS {
            return;
        }

        match event {
            PerformanceEvent::NoteOff { .. } => self.note_off(ch),
            PerformanceEvent::NoteOn { key, velocity, .. } => {
                if velocity == 0 {
                    self.note_off(ch);
                } else {
                    self.note_on(ch, key);
                }
            }
            PerformanceEvent::ProgramChange { program, .. } => self.program_change(ch, program),
            PerformanceEvent::ControlChange {
                controller, value, ..
            } => self.control_change(ch, controller, value),
            PerformanceEvent::PitchBend { value, .. } => {
                // Stored only; the oscillator ignores it
                self.runtime.channels[ch].pitch_bend = value & 0x3FFF;
            }
        }
    }

    fn note_on(&mut self, ch: usize, key: u8) {
        if self.runtime.channels[ch].note_on {
            return;
        }

        let stored = self.state.channels[ch];
        let global = self.state.global;

        self.engine
            .set_mixer(ch, stored.mixer.tone(), stored.mixer.noise(), stored.mixer.envelope());
        self.engine.set_envelope_shape(global.envelope_shape);

        let period = tone_period(global.clock_rate, key);
        self.engine.set_tone(ch, period);

        let runtime = &mut self.runtime.channels[ch];
        runtime.tone_period = period;
        runtime.applied_volume = None;
        runtime.envelope = stored.envelope.is_enabled().then_some(EnvelopeInstance {
            form: stored.envelope,
            started_at: self.runtime.now,
        });
        runtime.note_on = true;

        if runtime.envelope.is_some() {
            self.refresh_envelope_volume(ch, self.runtime.now);
        } else {
            self.engine.set_volume(ch, stored.volume);
        }
    }

    fn note_off(&mut self, ch: usize) {
        if !self.runtime.channels[ch].note_on {
            return;
        }

        self.engine.set_mixer(ch, false, false, false);
        if self.config.cycle_envelope_shape_on_note_off {
            let next = (self.state.global.envelope_shape + 1) & MAX_ENVELOPE_SHAPE;
            self.engine.set_envelope_shape(next);
        }

        let runtime = &mut self.runtime.channels[ch];
        runtime.note_on = false;
        runtime.envelope = None;
        runtime.applied_volume = None;
    }

    fn program_change(&mut self, ch: usize, program: u8) {
        self.set_noise_period(noise_from_program(program));

        let mut mixer = mixer_from_program(program);
        if program & 0x80 == 0 {
            // 7-bit programs cannot reach the envelope bit; keep the stored one
            let envelope = self.state.channels[ch].mixer.envelope();
            mixer.set(MixerFlags::ENVELOPE, envelope);
        }
        self.set_channel_mixer(ch, mixer);
    }

    fn control_change(&mut self, ch: usize, controller: Controller, value: u8) {
        match controller {
            Controller::BankSelect => self.set_channel_mixer(ch, mixer_from_bank_select(value)),
            Controller::Volume => self.set_channel_volume(ch, volume_from_controller(value)),
            Controller::Pan => self.set_channel_pan(ch, pan_from_controller(value)),
            Controller::EnvelopeHigh => self.set_envelope_fragment(0, value),
            Controller::EnvelopeMid => self.set_envelope_fragment(1, value),
            Controller::EnvelopeLow => self.set_envelope_fragment(2, value),
            Controller::EnvelopeShape => self.set_envelope_shape(value),
            Controller::RemoveDc => self.engine.reset_dc(),
            Controller::SoftEnvelopeCount => {
                self.state.channels[ch].envelope.set_num_points(value);
            }
            Controller::SoftEnvelopeTime(i) if i < MAX_POINTS => {
                self.state.channels[ch].envelope.points[i].time = decode_point_time(value);
            }
            Controller::SoftEnvelopeRatio(i) if i < MAX_POINTS => {
                self.state.channels[ch].envelope.points[i].ratio = decode_point_ratio(value);
            }
            _ => {}
        }
    }

    fn set_envelope_fragment(&mut self, slot: usize, value: u8) {
        self.runtime.envelope_fragments[slot] = value & 0x7F;
        let period = self.runtime.composed_envelope_period().min(u16::MAX as u32);
        self.set_envelope_period(period as u16);
    }

    /// Re-evaluate the software envelope of a sounding voice and write the
    /// volume if it moved
    pub(crate) fn refresh_envelope_volume(&mut self, ch: usize, now: f64) {
        let runtime = &mut self.runtime.channels[ch];
        let Some(instance) = runtime.envelope else {
            return;
        };

        let volume = self.state.channels[ch].volume as f32;
        let level = (volume * instance.ratio_at(now))
            .round()
            .clamp(0.0, MAX_VOLUME as f32) as u8;

        if runtime.applied_volume != Some(level) {
            runtime.applied_volume = Some(level);
            self.engine.set_volume(ch, level);
        }
    }

    // Register setters shared by controllers and host parameters

    pub(crate) fn set_channel_mixer(&mut self, ch: usize, mixer: MixerFlags) {
        self.state.channels[ch].mixer = mixer;
        self.engine
            .set_mixer(ch, mixer.tone(), mixer.noise(), mixer.envelope());
    }

    pub(crate) fn set_channel_volume(&mut self, ch: usize, volume: u8) {
        let volume = volume.min(MAX_VOLUME);
        self.state.channels[ch].volume = volume;

        let runtime = &mut self.runtime.channels[ch];
        if runtime.note_on && runtime.envelope.is_some() {
            runtime.applied_volume = None;
            self.refresh_envelope_volume(ch, self.runtime.now);
        } else {
            self.engine.set_volume(ch, volume);
        }
    }

    pub(crate) fn set_channel_pan(&mut self, ch: usize, pan: f32) {
        let pan = pan.clamp(0.0, 1.0);
        self.state.channels[ch].pan = pan;
        self.engine.set_pan(ch, pan, self.config.equal_power_pan);
    }

    pub(crate) fn set_noise_period(&mut self, period: u8) {
        let period = period.min(MAX_NOISE_PERIOD);
        self.state.global.noise_period = period;
        self.engine.set_noise(period);
    }

    pub(crate) fn set_envelope_period(&mut self, period: u16) {
        self.state.global.envelope_period = period;
        self.engine.set_envelope(period);
    }

    pub(crate) fn set_envelope_shape(&mut self, shape: u8) {
        let shape = shape & MAX_ENVELOPE_SHAPE;
        self.state.global.envelope_shape = shape;
        self.engine.set_envelope_shape(shape);
    }
}
