//! Tone, noise and envelope generators
//!
//! All three tick at the internal rate (`clock / 8`). The noise generator
//! advances every second tick.

use super::constants::{ENVELOPE_STEPS, MAX_TONE_PERIOD};

/// Square tone generator for one channel
///
/// The output flips each time the counter reaches the 12-bit period, giving
/// `clock / (16 * period)` Hz.
#[derive(Clone, Debug)]
pub struct ToneGenerator {
    counter: u32,
    period: u32,
    high: bool,
}

impl ToneGenerator {
    /// Idle generator at the shortest period
    pub fn new() -> Self {
        Self {
            counter: 0,
            period: 1,
            high: false,
        }
    }

    /// Set the period, clamped to `1..=0xFFF`
    #[inline]
    pub fn set_period(&mut self, period: u32) {
        self.period = period.clamp(1, MAX_TONE_PERIOD);
    }

    /// Current period
    #[inline]
    pub fn period(&self) -> u32 {
        self.period
    }

    /// Tick the generator, returns the output level
    #[inline]
    pub fn tick(&mut self) -> bool {
        self.counter += 1;
        if self.counter >= self.period {
            self.high = !self.high;
            self.counter = 0;
        }
        self.high
    }

    /// Reset counter and output
    pub fn reset(&mut self) {
        self.counter = 0;
        self.high = false;
    }
}

impl Default for ToneGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Noise generator using a 17-bit LFSR
#[derive(Clone, Debug)]
pub struct NoiseGenerator {
    counter: u32,
    period: u32,
    lfsr: u32,
    high: bool,
    half_tick: bool,
}

impl NoiseGenerator {
    /// Seeded generator at period 0
    pub fn new() -> Self {
        Self {
            counter: 0,
            period: 0,
            lfsr: 1,
            high: false,
            half_tick: false,
        }
    }

    /// Set the 5-bit period
    #[inline]
    pub fn set_period(&mut self, period: u32) {
        self.period = period & 0x1F;
    }

    /// Tick the generator (runs at half rate), returns the output level
    ///
    /// Galois LFSR with taps at bits 13 and 16.
    #[inline]
    pub fn tick(&mut self) -> bool {
        self.half_tick ^= true;

        if self.half_tick {
            self.counter += 1;
            // Period 0 behaves as period 1
            if self.counter >= self.period.max(1) {
                let lsb = self.lfsr & 1;
                self.lfsr >>= 1;
                if lsb != 0 {
                    self.lfsr ^= 0x12000;
                }
                self.high = lsb != 0;
                self.counter = 0;
            }
        }

        self.high
    }

    /// Reseed the shift register
    pub fn reset(&mut self) {
        self.counter = 0;
        self.lfsr = 1;
        self.high = false;
        self.half_tick = false;
    }
}

impl Default for NoiseGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// One half of a hardware envelope shape
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Segment {
    Up,
    Down,
    HoldTop,
    HoldBottom,
}

use Segment::{Down, HoldBottom, HoldTop, Up};

/// The 16 hardware shapes as two segments each
///
/// Sliding segments alternate forever; a hold segment stops the envelope.
const SHAPES: [[Segment; 2]; 16] = [
    [Down, HoldBottom],
    [Down, HoldBottom],
    [Down, HoldBottom],
    [Down, HoldBottom],
    [Up, HoldBottom],
    [Up, HoldBottom],
    [Up, HoldBottom],
    [Up, HoldBottom],
    [Down, Down],
    [Down, HoldBottom],
    [Down, Up],
    [Down, HoldTop],
    [Up, Up],
    [Up, HoldTop],
    [Up, Down],
    [Up, HoldBottom],
];

/// Hardware envelope generator
#[derive(Clone, Debug)]
pub struct EnvelopeGenerator {
    counter: u32,
    period: u32,
    shape: usize,
    segment: usize,
    step: u32,
}

impl EnvelopeGenerator {
    /// Create a new envelope generator (shape 0)
    pub fn new() -> Self {
        Self {
            counter: 0,
            period: 0,
            shape: 0,
            segment: 0,
            step: 0,
        }
    }

    /// Set the 16-bit period
    #[inline]
    pub fn set_period(&mut self, period: u32) {
        self.period = period & 0xFFFF;
    }

    /// Select a shape and restart the envelope
    #[inline]
    pub fn set_shape(&mut self, shape: u8) {
        self.shape = (shape & 0x0F) as usize;
        self.trigger();
    }

    /// Restart the envelope without changing shape
    #[inline]
    pub fn trigger(&mut self) {
        self.segment = 0;
        self.step = 0;
        self.counter = 0;
    }

    /// Tick the generator
    #[inline]
    pub fn tick(&mut self) {
        self.counter += 1;
        if self.counter < self.period.max(1) {
            return;
        }
        self.counter = 0;

        match SHAPES[self.shape][self.segment] {
            Up | Down => {
                self.step += 1;
                if self.step >= ENVELOPE_STEPS {
                    self.step = 0;
                    self.segment ^= 1;
                }
            }
            HoldTop | HoldBottom => {}
        }
    }

    /// Current level (0-31)
    #[inline]
    pub fn level(&self) -> u32 {
        match SHAPES[self.shape][self.segment] {
            Up => self.step,
            Down => ENVELOPE_STEPS - 1 - self.step,
            HoldTop => ENVELOPE_STEPS - 1,
            HoldBottom => 0,
        }
    }

    /// Back to shape 0, period 0
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for EnvelopeGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_envelope(shape: u8, ticks: usize) -> Vec<u32> {
        let mut envelope = EnvelopeGenerator::new();
        envelope.set_period(1);
        envelope.set_shape(shape);
        (0..ticks)
            .map(|_| {
                let level = envelope.level();
                envelope.tick();
                level
            })
            .collect()
    }

    #[test]
    fn test_tone_generator_half_period() {
        let mut tone = ToneGenerator::new();
        tone.set_period(4);
        let levels: Vec<bool> = (0..16).map(|_| tone.tick()).collect();
        // Flips every 4 ticks: one full cycle per 8 ticks
        assert_eq!(levels.iter().filter(|&&h| h).count(), 8);
        assert!(levels[3]);
        assert!(!levels[7]);
    }

    #[test]
    fn test_tone_period_is_clamped() {
        let mut tone = ToneGenerator::new();
        tone.set_period(0);
        assert_eq!(tone.period(), 1);
        tone.set_period(0x10000);
        assert_eq!(tone.period(), 0xFFF);
    }

    #[test]
    fn test_noise_generator_varies() {
        let mut noise = NoiseGenerator::new();
        let outputs: Vec<bool> = (0..200).map(|_| noise.tick()).collect();
        assert!(outputs.windows(2).any(|w| w[0] != w[1]));
    }

    #[test]
    fn test_decay_then_hold() {
        let levels = run_envelope(0, 40);
        assert_eq!(levels[0], 31);
        assert_eq!(levels[31], 0);
        assert!(levels[32..].iter().all(|&l| l == 0));
    }

    #[test]
    fn test_sawtooth_repeats() {
        let levels = run_envelope(8, 64);
        assert_eq!(levels[0], 31);
        assert_eq!(levels[31], 0);
        assert_eq!(levels[32], 31);
    }

    #[test]
    fn test_triangle_turns_around() {
        let levels = run_envelope(14, 64);
        assert_eq!(levels[0], 0);
        assert_eq!(levels[31], 31);
        assert_eq!(levels[32], 31);
        assert_eq!(levels[63], 0);
    }

    #[test]
    fn test_attack_then_hold_top() {
        let levels = run_envelope(13, 40);
        assert_eq!(levels[31], 31);
        assert!(levels[32..].iter().all(|&l| l == 31));
    }

    #[test]
    fn test_shape_write_restarts() {
        let mut envelope = EnvelopeGenerator::new();
        envelope.set_period(1);
        envelope.set_shape(12);
        for _ in 0..10 {
            envelope.tick();
        }
        assert_eq!(envelope.level(), 10);
        envelope.set_shape(12);
        assert_eq!(envelope.level(), 0);
    }
}
