//! Software volume envelope
//!
//! A per-note volume curve defined by up to six breakpoints. Each breakpoint
//! is a `(time, ratio)` pair; the curve starts at an implicit origin
//! `(0 s, 0.0)`, interpolates linearly between consecutive breakpoints and
//! holds the last ratio once the final breakpoint has passed.
//!
//! Breakpoint times are expected to be non-decreasing. Ratios may rise or
//! fall freely, so attack/decay/sustain and custom shapes all fit.

use serde::{Deserialize, Serialize};

/// Maximum number of breakpoints per envelope form
pub const MAX_POINTS: usize = 6;

/// One breakpoint of the software envelope
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EnvelopePoint {
    /// Offset from note-on in seconds (>= 0)
    pub time: f32,
    /// Volume ratio reached at `time` (0.0-1.0)
    pub ratio: f32,
}

impl EnvelopePoint {
    /// Create a breakpoint
    pub const fn new(time: f32, ratio: f32) -> Self {
        Self { time, ratio }
    }
}

/// Envelope definition stored per channel
///
/// Only the first `num_points` entries are meaningful. `num_points == 0`
/// bypasses the software envelope entirely.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeForm {
    /// Number of active breakpoints (0-6)
    pub num_points: u8,
    /// Breakpoint storage
    pub points: [EnvelopePoint; MAX_POINTS],
}

impl EnvelopeForm {
    /// Form with the software envelope disabled
    pub const DISABLED: EnvelopeForm = EnvelopeForm {
        num_points: 0,
        points: [EnvelopePoint::new(0.0, 0.0); MAX_POINTS],
    };

    /// Build a form from a slice of breakpoints (extra points are dropped)
    pub fn from_points(points: &[EnvelopePoint]) -> Self {
        let mut form = Self::DISABLED;
        let count = points.len().min(MAX_POINTS);
        form.points[..count].copy_from_slice(&points[..count]);
        form.num_points = count as u8;
        form
    }

    /// Whether the envelope takes part in rendering
    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.num_points > 0
    }

    /// Active breakpoints
    #[inline]
    pub fn active_points(&self) -> &[EnvelopePoint] {
        &self.points[..(self.num_points as usize).min(MAX_POINTS)]
    }

    /// Set the active breakpoint count, clamped to 0-6
    pub fn set_num_points(&mut self, count: u8) {
        self.num_points = count.min(MAX_POINTS as u8);
    }

    /// Volume ratio at `elapsed` seconds after note-on
    ///
    /// Callers must not evaluate a disabled form; doing so returns 1.0 so the
    /// channel plays at its raw volume.
    pub fn ratio(&self, elapsed: f64) -> f32 {
        let points = self.active_points();
        let Some(last) = points.last() else {
            return 1.0;
        };

        let Some(index) = points.iter().position(|p| elapsed < p.time as f64) else {
            return last.ratio.clamp(0.0, 1.0);
        };

        let (start_time, start_ratio) = match index {
            0 => (0.0, 0.0),
            i => (points[i - 1].time as f64, points[i - 1].ratio),
        };
        let target = points[index];
        let span = target.time as f64 - start_time;

        // Zero-length segment snaps to its target
        let progress = if span > 0.0 {
            ((elapsed - start_time) / span).clamp(0.0, 1.0) as f32
        } else {
            1.0
        };

        (start_ratio + progress * (target.ratio - start_ratio)).clamp(0.0, 1.0)
    }
}

impl Default for EnvelopeForm {
    /// Short attack to full level, then a three second fade
    fn default() -> Self {
        Self::from_points(&[EnvelopePoint::new(0.3, 1.0), EnvelopePoint::new(3.0, 0.0)])
    }
}

/// Per-note envelope instance
///
/// Captures the form at note-on so later edits only affect the next note.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopeInstance {
    /// Snapshot of the channel's form at note-on
    pub form: EnvelopeForm,
    /// Engine time (seconds) at which the note started
    pub started_at: f64,
}

impl EnvelopeInstance {
    /// Volume ratio at engine time `now`
    #[inline]
    pub fn ratio_at(&self, now: f64) -> f32 {
        self.form.ratio((now - self.started_at).max(0.0))
    }
}

/// Decode a 0-127 controller value into a breakpoint time in seconds
///
/// Quadratic so that short times get finer resolution: `t = v^2 * 0.001`.
#[inline]
pub fn decode_point_time(value: u8) -> f32 {
    let v = (value & 0x7F) as f32;
    v * v * 0.001
}

/// Decode a 0-127 controller value into a volume ratio
///
/// The lower half maps over 128 steps, the upper half over 127 so that 127
/// lands exactly on 1.0.
#[inline]
pub fn decode_point_ratio(value: u8) -> f32 {
    let v = value & 0x7F;
    if v <= 64 {
        v as f32 / 128.0
    } else {
        v as f32 / 127.0
    }
}
