//! YM2149 PSG engine
//!
//! Generators run at the internal clock rate of `clock / 8` (250kHz at
//! 2MHz). Each output sample is the average of the generator ticks it
//! spans, mixed to stereo with the per-channel pan gains.

use super::constants::{dac_level, fixed_volume_level, CLOCK_DIVIDER};
use super::dc_filter::DcFilter;
use super::generators::{EnvelopeGenerator, NoiseGenerator, ToneGenerator};
use super::mixer::Mixer;
use crate::backend::{ChipModel, SynthEngine, NUM_CHANNELS};
use crate::state::{DEFAULT_CLOCK_RATE, DEFAULT_SAMPLE_RATE, MAX_VOLUME};
use crate::{DriverError, Result};

/// YM2149 / AY-3-8910 engine
///
/// # Example
///
/// ```
/// use ym2149_voice_driver::{ChipModel, SynthEngine, Ym2149Engine};
///
/// let mut chip = Ym2149Engine::new();
/// chip.configure(ChipModel::Ym2149, 2_000_000, 44_100).unwrap();
///
/// // Channel A: 440 Hz square at full volume
/// chip.set_tone(0, 284);
/// chip.set_volume(0, 14);
/// chip.set_mixer(0, true, false, false);
///
/// chip.process();
/// let (left, right) = (chip.left(), chip.right());
/// # let _ = (left, right);
/// ```
#[derive(Clone)]
pub struct Ym2149Engine {
    // Clock and timing
    model: ChipModel,
    internal_clock: u32,
    sample_rate: u32,
    cycle_accumulator: u32,

    // Generators
    tone_generators: [ToneGenerator; NUM_CHANNELS],
    noise_generator: NoiseGenerator,
    envelope_generator: EnvelopeGenerator,

    // Output processing
    mixer: Mixer,
    dc_left: DcFilter,
    dc_right: DcFilter,

    // Last output pair
    left: f32,
    right: f32,
}

impl Ym2149Engine {
    /// Create an engine with default Atari ST clocks
    pub fn new() -> Self {
        Self {
            model: ChipModel::default(),
            internal_clock: DEFAULT_CLOCK_RATE / CLOCK_DIVIDER,
            sample_rate: DEFAULT_SAMPLE_RATE,
            cycle_accumulator: 0,
            tone_generators: Default::default(),
            noise_generator: NoiseGenerator::new(),
            envelope_generator: EnvelopeGenerator::new(),
            mixer: Mixer::new(),
            dc_left: DcFilter::new(),
            dc_right: DcFilter::new(),
            left: 0.0,
            right: 0.0,
        }
    }

    /// Reset generators, mixer and filters
    pub fn reset(&mut self) {
        for tone in self.tone_generators.iter_mut() {
            tone.reset();
        }
        self.noise_generator.reset();
        self.envelope_generator.reset();
        self.mixer = Mixer::new();
        self.dc_left.reset();
        self.dc_right.reset();
        self.cycle_accumulator = 0;
        self.left = 0.0;
        self.right = 0.0;
    }

    /// DAC model in use
    pub fn model(&self) -> ChipModel {
        self.model
    }

    /// Output sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Tone period of a channel
    pub fn tone_period(&self, channel: usize) -> Option<u32> {
        self.tone_generators.get(channel).map(|t| t.period())
    }

    /// Tick every generator once and return the stereo level
    #[inline]
    fn tick_generators(&mut self) -> (f32, f32) {
        let noise_high = self.noise_generator.tick();
        self.envelope_generator.tick();
        let envelope_level = self.envelope_generator.level();

        let mut left = 0.0;
        let mut right = 0.0;
        for (ch, tone) in self.tone_generators.iter_mut().enumerate() {
            let tone_high = tone.tick();
            if !self.mixer.gate(ch, tone_high, noise_high) {
                continue;
            }

            let level = if self.mixer.envelope_on(ch) {
                envelope_level
            } else {
                fixed_volume_level(self.mixer.volume(ch))
            };
            let amplitude = dac_level(self.model, level);
            let gains = self.mixer.gains(ch);
            left += amplitude * gains.left;
            right += amplitude * gains.right;
        }
        (left, right)
    }
}

impl Default for Ym2149Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Ym2149Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ym2149Engine")
            .field("model", &self.model)
            .field("sample_rate", &self.sample_rate)
            .field("internal_clock", &self.internal_clock)
            .finish_non_exhaustive()
    }
}

impl SynthEngine for Ym2149Engine {
    fn configure(&mut self, model: ChipModel, clock_rate: u32, sample_rate: u32) -> Result<()> {
        if sample_rate == 0 {
            return Err(DriverError::Config("sample rate must be non-zero".into()));
        }
        if clock_rate < sample_rate {
            return Err(DriverError::Config(format!(
                "clock rate {clock_rate} Hz is below the sample rate {sample_rate} Hz"
            )));
        }

        self.model = model;
        self.internal_clock = (clock_rate / CLOCK_DIVIDER).max(1);
        self.sample_rate = sample_rate;
        self.reset();
        Ok(())
    }

    fn set_tone(&mut self, channel: usize, period: u32) {
        if let Some(tone) = self.tone_generators.get_mut(channel) {
            tone.set_period(period);
        }
    }

    fn set_noise(&mut self, period: u8) {
        self.noise_generator.set_period(period as u32);
    }

    fn set_mixer(&mut self, channel: usize, tone_on: bool, noise_on: bool, envelope_on: bool) {
        self.mixer.set_enables(channel, tone_on, noise_on, envelope_on);
    }

    fn set_volume(&mut self, channel: usize, volume: u8) {
        self.mixer.set_volume(channel, volume.min(MAX_VOLUME));
    }

    fn set_pan(&mut self, channel: usize, pan: f32, equal_power: bool) {
        self.mixer.set_pan(channel, pan, equal_power);
    }

    fn set_envelope(&mut self, period: u16) {
        self.envelope_generator.set_period(period as u32);
    }

    fn set_envelope_shape(&mut self, shape: u8) {
        self.envelope_generator.set_shape(shape);
    }

    fn remove_dc(&mut self) {
        self.left = self.dc_left.process(self.left);
        self.right = self.dc_right.process(self.right);
    }

    fn reset_dc(&mut self) {
        self.dc_left.reset();
        self.dc_right.reset();
    }

    fn process(&mut self) {
        let mut left = 0.0;
        let mut right = 0.0;
        let mut ticks = 0u32;

        // Box filter over the internal ticks inside this sample
        loop {
            let (l, r) = self.tick_generators();
            left += l;
            right += r;
            ticks += 1;

            self.cycle_accumulator += self.sample_rate;
            if self.cycle_accumulator >= self.internal_clock {
                break;
            }
        }
        // Clocks below the sample rate repeat ticks instead of overflowing
        self.cycle_accumulator %= self.internal_clock;

        let scale = 1.0 / (ticks as f32 * NUM_CHANNELS as f32);
        self.left = left * scale;
        self.right = right * scale;
    }

    fn left(&self) -> f32 {
        self.left
    }

    fn right(&self) -> f32 {
        self.right
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> Ym2149Engine {
        let mut chip = Ym2149Engine::new();
        chip.configure(ChipModel::Ym2149, 2_000_000, 44_100).unwrap();
        chip
    }

    /// Count rising edges of the left output over `samples`
    fn rising_edges(chip: &mut Ym2149Engine, samples: usize) -> usize {
        let mut edges = 0;
        let mut high = false;
        for _ in 0..samples {
            chip.process();
            // Idle channels leave a tiny DC floor
            let now_high = chip.left() > 0.1;
            if now_high && !high {
                edges += 1;
            }
            high = now_high;
        }
        edges
    }

    #[test]
    fn test_configure_rejects_bad_rates() {
        let mut chip = Ym2149Engine::new();
        assert!(chip.configure(ChipModel::Ym2149, 2_000_000, 0).is_err());
        assert!(chip.configure(ChipModel::Ym2149, 1_000, 44_100).is_err());
        assert!(chip.configure(ChipModel::Ay8910, 1_773_400, 48_000).is_ok());
        assert_eq!(chip.model(), ChipModel::Ay8910);
    }

    #[test]
    fn test_silent_after_configure() {
        let mut chip = configured();
        for ch in 0..NUM_CHANNELS {
            chip.set_volume(ch, 0);
            chip.set_mixer(ch, true, false, false);
        }
        chip.process();
        assert!(chip.left() < 0.01);
    }

    #[test]
    fn test_tone_frequency() {
        let mut chip = configured();
        chip.set_pan(0, 0.0, false);
        chip.set_tone(0, 284);
        chip.set_volume(0, 14);
        chip.set_mixer(0, true, false, false);
        // 440 Hz for one second
        let edges = rising_edges(&mut chip, 44_100);
        assert!((438..=442).contains(&edges), "edges: {edges}");
    }

    #[test]
    fn test_pan_routes_output() {
        let mut chip = configured();
        chip.set_pan(0, 1.0, false);
        chip.set_tone(0, 284);
        chip.set_volume(0, 14);
        chip.set_mixer(0, true, false, false);
        let mut right_energy = 0.0;
        for _ in 0..1000 {
            chip.process();
            assert!(chip.left() < 0.001);
            right_energy += chip.right();
        }
        assert!(right_energy > 0.0);
    }

    #[test]
    fn test_remove_dc_centres_output() {
        let mut chip = configured();
        chip.set_tone(0, 284);
        chip.set_volume(0, 14);
        chip.set_mixer(0, true, false, false);
        let mut sum = 0.0f64;
        for i in 0..20_000 {
            chip.process();
            chip.remove_dc();
            if i >= 10_000 {
                sum += chip.left() as f64;
            }
        }
        assert!((sum / 10_000.0).abs() < 0.01, "mean: {}", sum / 10_000.0);
    }

    #[test]
    fn test_hardware_envelope_drives_volume() {
        let mut chip = configured();
        chip.set_pan(0, 0.0, false);
        chip.set_mixer(0, false, false, true);
        chip.set_envelope(0x40);
        // Attack then hold top
        chip.set_envelope_shape(13);
        chip.process();
        let start = chip.left();
        for _ in 0..2000 {
            chip.process();
        }
        assert!(chip.left() > start);
    }

    #[test]
    fn test_out_of_range_channel_is_ignored() {
        let mut chip = configured();
        chip.set_tone(3, 100);
        chip.set_volume(7, 14);
        assert_eq!(chip.tone_period(3), None);
    }
}
