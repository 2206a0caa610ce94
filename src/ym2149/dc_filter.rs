//! Running-average DC blocker
//!
//! The PSG output never goes negative. Subtracting the mean of the last
//! [`WINDOW`] samples centres it around zero without touching the wave shape
//! inside one tone period.

/// Averaging window (2048 samples, ~46ms at 44.1kHz)
const WINDOW: usize = 1 << 11;

/// DC blocker for one output side
#[derive(Clone)]
pub struct DcFilter {
    history: Box<[f32; WINDOW]>,
    cursor: usize,
    // f64 keeps the add/subtract drift below audible levels
    sum: f64,
}

impl DcFilter {
    /// Empty window
    pub fn new() -> Self {
        Self {
            history: Box::new([0.0; WINDOW]),
            cursor: 0,
            sum: 0.0,
        }
    }

    /// Push `sample` into the window and return it minus the window mean
    #[inline]
    pub fn process(&mut self, sample: f32) -> f32 {
        let oldest = std::mem::replace(&mut self.history[self.cursor], sample);
        self.sum += sample as f64 - oldest as f64;
        self.cursor = (self.cursor + 1) % WINDOW;

        (sample as f64 - self.sum / WINDOW as f64) as f32
    }

    /// Clear the window
    pub fn reset(&mut self) {
        self.history.fill(0.0);
        self.cursor = 0;
        self.sum = 0.0;
    }
}

impl Default for DcFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DcFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DcFilter")
            .field("cursor", &self.cursor)
            .field("mean", &(self.sum / WINDOW as f64))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn settled(level: f32) -> DcFilter {
        let mut filter = DcFilter::new();
        (0..WINDOW * 2).for_each(|_| {
            filter.process(level);
        });
        filter
    }

    #[test]
    fn test_constant_input_settles_to_zero() {
        let mut filter = settled(0.4);
        assert_abs_diff_eq!(filter.process(0.4), 0.0, epsilon = 1e-4);
    }

    #[test]
    fn test_step_passes_through() {
        let mut filter = settled(0.2);
        assert!(filter.process(0.6) > 0.35);
    }

    #[test]
    fn test_square_wave_is_centred() {
        let mut filter = DcFilter::new();
        let mut sum = 0.0f64;
        for i in 0..WINDOW * 4 {
            let input = if (i / 50) % 2 == 0 { 0.8 } else { 0.0 };
            let out = filter.process(input);
            if i >= WINDOW * 2 {
                sum += out as f64;
            }
        }
        assert_abs_diff_eq!(sum / (WINDOW * 2) as f64, 0.0, epsilon = 0.01);
    }

    #[test]
    fn test_reset_forgets_history() {
        let mut filter = settled(0.9);
        filter.reset();
        assert_eq!(filter.cursor, 0);
        assert_abs_diff_eq!(filter.process(0.5), 0.5 - 0.5 / WINDOW as f32, epsilon = 1e-7);
    }
}
