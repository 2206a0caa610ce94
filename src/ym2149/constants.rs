//! DAC tables and clock constants

use crate::backend::ChipModel;

/// Internal generator clock divider (generators tick at `clock / 8`)
pub const CLOCK_DIVIDER: u32 = 8;

/// Number of envelope steps per segment
pub const ENVELOPE_STEPS: u32 = 32;

/// Highest 12-bit tone period
pub const MAX_TONE_PERIOD: u32 = 0x0FFF;

/// Hardware volume table (16 fixed levels, STSound reference values)
pub const VOLUME_TABLE: [u16; 16] = [
    20, 53, 88, 125, 193, 258, 385, 525, 753, 1029, 1523, 2077, 3110, 4395, 7073, 10922,
];

/// Scale factor from table values to `0.0..=1.0`
pub const VOLUME_SCALE: f32 = 1.0 / 10922.0;

/// Amplitude of a 5-bit level index for the given DAC model
///
/// Odd YM2149 steps are the 16 fixed levels and even steps sit halfway
/// between their neighbours. The AY-3-8910 only has 16 steps, so envelope
/// levels collapse in pairs.
#[inline]
pub fn dac_level(model: ChipModel, level: u32) -> f32 {
    let level = (level & 0x1F) as usize;
    let upper = VOLUME_TABLE[level >> 1] as f32;
    let value = match model {
        ChipModel::Ym2149 if level & 1 == 0 => {
            let lower = if level == 0 {
                0.0
            } else {
                VOLUME_TABLE[(level >> 1) - 1] as f32
            };
            (lower + upper) * 0.5
        }
        _ => upper,
    };
    value * VOLUME_SCALE
}

/// 5-bit level index of a fixed 4-bit volume
#[inline]
pub fn fixed_volume_level(volume: u8) -> u32 {
    ((volume & 0x0F) as u32) * 2 + 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_dac_monotonic() {
        for model in [ChipModel::Ym2149, ChipModel::Ay8910] {
            for level in 1..32 {
                assert!(dac_level(model, level) >= dac_level(model, level - 1));
            }
        }
    }

    #[test]
    fn test_dac_edges() {
        assert_relative_eq!(dac_level(ChipModel::Ym2149, 31), 1.0);
        assert_relative_eq!(dac_level(ChipModel::Ay8910, 31), 1.0);
        assert!(dac_level(ChipModel::Ym2149, 0) < 0.001);
        // Envelope steps pair up on the AY
        assert_eq!(
            dac_level(ChipModel::Ay8910, 30),
            dac_level(ChipModel::Ay8910, 31)
        );
        assert!(dac_level(ChipModel::Ym2149, 30) < dac_level(ChipModel::Ym2149, 31));
    }

    #[test]
    fn test_fixed_volume_uses_odd_steps() {
        assert_eq!(fixed_volume_level(0), 1);
        assert_eq!(fixed_volume_level(14), 29);
        assert_eq!(
            dac_level(ChipModel::Ym2149, fixed_volume_level(7)),
            dac_level(ChipModel::Ay8910, fixed_volume_level(7))
        );
    }
}
