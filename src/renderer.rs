//! Block renderer
//!
//! Splits an output block at every event offset so that register writes
//! land on the exact sample, and runs the per-sample engine loop in between.
//! Nothing here allocates, locks or logs.

use crate::backend::{SynthEngine, NUM_CHANNELS};
use crate::event::TimedEvent;
use crate::VoiceDriver;

/// Samples between two software envelope evaluations
///
/// The countdown lives in the runtime, so the stride keeps its phase across
/// event splits and block boundaries.
pub const ENVELOPE_UPDATE_STRIDE: usize = 25;

impl<E: SynthEngine> VoiceDriver<E> {
    /// Render one block
    ///
    /// `outputs` holds planar sample slots: slot 0 receives the left output,
    /// slot 1 the right output; further slots are left untouched. A single
    /// slot receives the left output only. The block length is the length of
    /// the shortest slot.
    ///
    /// `events` must be ordered by non-decreasing offset. Offsets at or past
    /// the block end apply after the last sample.
    ///
    /// When the engine is inactive or no voice is sounding, the affected
    /// samples are not written at all.
    pub fn render_block(&mut self, outputs: &mut [&mut [f32]], events: &[TimedEvent]) {
        let len = outputs.iter().map(|slot| slot.len()).min().unwrap_or(0);
        let mut cursor = 0;

        for timed in events {
            self.runtime.now = self.runtime.time_at(timed.offset.min(len));
            if timed.offset > cursor {
                let end = timed.offset.min(len);
                self.render_range(outputs, cursor, end);
                cursor = end;
            }
            self.translate(timed.event);
        }
        self.render_range(outputs, cursor, len);

        self.runtime.elapsed_seconds += len as f64 / self.runtime.sample_rate.max(1) as f64;
        self.runtime.now = self.runtime.elapsed_seconds;
    }

    fn render_range(&mut self, outputs: &mut [&mut [f32]], start: usize, end: usize) {
        if start >= end || !self.runtime.active || !self.runtime.any_note_on() {
            return;
        }

        for i in start..end {
            if self.runtime.envelope_countdown == 0 {
                self.runtime.envelope_countdown = ENVELOPE_UPDATE_STRIDE;
                let now = self.runtime.time_at(i);
                for ch in 0..NUM_CHANNELS {
                    if self.runtime.channels[ch].note_on {
                        self.refresh_envelope_volume(ch, now);
                    }
                }
            }
            self.runtime.envelope_countdown -= 1;

            self.engine.process();
            self.engine.remove_dc();

            match &mut *outputs {
                [] => {}
                [mono] => mono[i] = self.engine.left(),
                [left, right, ..] => {
                    left[i] = self.engine.left();
                    right[i] = self.engine.right();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::{EnvelopeForm, EnvelopePoint};
    use crate::event::PerformanceEvent;
    use crate::{DriverConfig, Ym2149Engine};

    const NOTE_ON: PerformanceEvent = PerformanceEvent::NoteOn {
        channel: 0,
        key: 57,
        velocity: 100,
    };

    fn driver() -> VoiceDriver<Ym2149Engine> {
        let mut driver = VoiceDriver::new(Ym2149Engine::new(), DriverConfig::default());
        driver.prepare(44_100).unwrap();
        driver.state.channels[0].envelope = EnvelopeForm::DISABLED;
        driver
    }

    #[test]
    fn test_silent_block_is_untouched() {
        let mut d = driver();
        let mut left = [7.0f32; 100];
        let mut right = [7.0f32; 100];
        d.render_block(&mut [&mut left[..], &mut right[..]], &[]);
        assert!(left.iter().chain(right.iter()).all(|&s| s == 7.0));
    }

    #[test]
    fn test_samples_before_note_on_are_untouched() {
        let mut d = driver();
        let mut left = [7.0f32; 64];
        let mut right = [7.0f32; 64];
        d.render_block(
            &mut [&mut left[..], &mut right[..]],
            &[TimedEvent::new(32, NOTE_ON)],
        );
        assert!(left[..32].iter().all(|&s| s == 7.0));
        assert!(left[32..].iter().any(|&s| s != 7.0));
        assert!(d.runtime.channels[0].note_on);
    }

    #[test]
    fn test_elapsed_time_advances_per_block() {
        let mut d = driver();
        let mut left = [0.0f32; 441];
        let mut right = [0.0f32; 441];
        d.render_block(&mut [&mut left[..], &mut right[..]], &[]);
        d.render_block(&mut [&mut left[..], &mut right[..]], &[]);
        assert!((d.runtime.elapsed_seconds - 0.02).abs() < 1e-12);
    }

    #[test]
    fn test_note_start_is_sample_accurate() {
        let mut d = driver();
        d.state.channels[0].envelope = EnvelopeForm::default();
        let mut left = [0.0f32; 441];
        d.render_block(&mut [&mut left[..]], &[]);
        d.render_block(&mut [&mut left[..]], &[TimedEvent::new(441, NOTE_ON)]);
        let started = d.runtime.channels[0].envelope.unwrap().started_at;
        assert!((started - 0.02).abs() < 1e-12);
    }

    #[test]
    fn test_mono_slot_gets_left() {
        let mut d = driver();
        d.state.channels[0].pan = 0.0;
        d.prepare(44_100).unwrap();
        let mut mono = [0.0f32; 256];
        d.render_block(&mut [&mut mono[..]], &[TimedEvent::new(0, NOTE_ON)]);
        assert!(mono.iter().any(|&s| s != 0.0));
    }

    #[test]
    fn test_envelope_volume_follows_curve() {
        let mut d = driver();
        d.state.channels[0].envelope = EnvelopeForm::from_points(&[EnvelopePoint::new(0.01, 1.0)]);
        let mut left = [0.0f32; 882];
        let mut right = [0.0f32; 882];
        d.render_block(
            &mut [&mut left[..], &mut right[..]],
            &[TimedEvent::new(0, NOTE_ON)],
        );
        // 20 ms in, the 10 ms attack has finished
        assert_eq!(d.runtime.channels[0].applied_volume, Some(14));
    }
}
