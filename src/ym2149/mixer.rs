//! Output mixer
//!
//! Holds the mixer control register in hardware form (set bit = source
//! disabled), the per-channel volume mode and the stereo gains.
//!
//! Features:
//! - Tone/noise gating with the chip's inverted enable bits
//! - Fixed volume or hardware envelope per channel
//! - Linear or equal-power panning

use bitflags::bitflags;

use crate::backend::NUM_CHANNELS;

bitflags! {
    /// Mixer control register (R7): 1 = disable, 0 = enable
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MixerControl: u8 {
        /// Channel A tone disable
        const CH_A_TONE = 0x01;
        /// Channel B tone disable
        const CH_B_TONE = 0x02;
        /// Channel C tone disable
        const CH_C_TONE = 0x04;
        /// Channel A noise disable
        const CH_A_NOISE = 0x08;
        /// Channel B noise disable
        const CH_B_NOISE = 0x10;
        /// Channel C noise disable
        const CH_C_NOISE = 0x20;
    }
}

impl MixerControl {
    /// Tone disable bit of a channel
    #[inline]
    fn tone_bit(channel: usize) -> Self {
        MixerControl::from_bits_truncate(0x01 << channel)
    }

    /// Noise disable bit of a channel
    #[inline]
    fn noise_bit(channel: usize) -> Self {
        MixerControl::from_bits_truncate(0x08 << channel)
    }

    /// Check if tone is enabled on a channel
    #[inline]
    pub fn is_tone_enabled(&self, channel: usize) -> bool {
        !self.contains(Self::tone_bit(channel))
    }

    /// Check if noise is enabled on a channel
    #[inline]
    pub fn is_noise_enabled(&self, channel: usize) -> bool {
        !self.contains(Self::noise_bit(channel))
    }
}

impl Default for MixerControl {
    /// Everything disabled, as after power-on
    fn default() -> Self {
        MixerControl::all()
    }
}

/// Stereo gains of one channel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanGains {
    /// Left gain
    pub left: f32,
    /// Right gain
    pub right: f32,
}

impl PanGains {
    /// Gains for a pan position (0.0 = left ... 1.0 = right)
    pub fn new(pan: f32, equal_power: bool) -> Self {
        let pan = pan.clamp(0.0, 1.0);
        if equal_power {
            Self {
                left: (1.0 - pan).sqrt(),
                right: pan.sqrt(),
            }
        } else {
            Self {
                left: 1.0 - pan,
                right: pan,
            }
        }
    }
}

impl Default for PanGains {
    fn default() -> Self {
        Self::new(0.5, false)
    }
}

/// Per-channel mixer state and register R7
#[derive(Debug, Clone, Default)]
pub struct Mixer {
    control: MixerControl,
    envelope_on: [bool; NUM_CHANNELS],
    volume: [u8; NUM_CHANNELS],
    gains: [PanGains; NUM_CHANNELS],
}

impl Mixer {
    /// Create a mixer with every source disabled
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable the sources of a channel
    pub fn set_enables(&mut self, channel: usize, tone: bool, noise: bool, envelope: bool) {
        if channel >= NUM_CHANNELS {
            return;
        }
        self.control.set(MixerControl::tone_bit(channel), !tone);
        self.control.set(MixerControl::noise_bit(channel), !noise);
        self.envelope_on[channel] = envelope;
    }

    /// Set the fixed volume of a channel
    pub fn set_volume(&mut self, channel: usize, volume: u8) {
        if let Some(slot) = self.volume.get_mut(channel) {
            *slot = volume;
        }
    }

    /// Set the stereo gains of a channel
    pub fn set_pan(&mut self, channel: usize, pan: f32, equal_power: bool) {
        if let Some(slot) = self.gains.get_mut(channel) {
            *slot = PanGains::new(pan, equal_power);
        }
    }

    /// Register R7 value
    #[inline]
    pub fn control(&self) -> MixerControl {
        self.control
    }

    /// Whether the hardware envelope drives a channel's volume
    #[inline]
    pub fn envelope_on(&self, channel: usize) -> bool {
        self.envelope_on[channel]
    }

    /// Fixed volume of a channel
    #[inline]
    pub fn volume(&self, channel: usize) -> u8 {
        self.volume[channel]
    }

    /// Stereo gains of a channel
    #[inline]
    pub fn gains(&self, channel: usize) -> PanGains {
        self.gains[channel]
    }

    /// Gate of a channel for the current tone and noise outputs
    ///
    /// A disabled source counts as permanently high, so a channel with both
    /// sources disabled outputs its volume level as DC.
    #[inline]
    pub fn gate(&self, channel: usize, tone_high: bool, noise_high: bool) -> bool {
        (tone_high || !self.control.is_tone_enabled(channel))
            && (noise_high || !self.control.is_noise_enabled(channel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_power_on_disables_everything() {
        let mixer = Mixer::new();
        assert_eq!(mixer.control().bits(), 0x3F);
        for ch in 0..NUM_CHANNELS {
            assert!(!mixer.control().is_tone_enabled(ch));
            assert!(!mixer.control().is_noise_enabled(ch));
        }
    }

    #[test]
    fn test_enables_map_to_inverted_bits() {
        let mut mixer = Mixer::new();
        mixer.set_enables(1, true, false, true);
        assert_eq!(mixer.control().bits(), 0x3F & !0x02);
        assert!(mixer.envelope_on(1));
        mixer.set_enables(2, false, true, false);
        assert_eq!(mixer.control().bits(), 0x3F & !0x02 & !0x20);
    }

    #[test]
    fn test_gate() {
        let mut mixer = Mixer::new();
        mixer.set_enables(0, true, false, false);
        assert!(mixer.gate(0, true, false));
        assert!(!mixer.gate(0, false, true));
        // Both disabled: always open
        assert!(mixer.gate(1, false, false));
    }

    #[test]
    fn test_pan_laws() {
        let linear = PanGains::new(0.25, false);
        assert_relative_eq!(linear.left, 0.75);
        assert_relative_eq!(linear.right, 0.25);

        let power = PanGains::new(0.5, true);
        assert_relative_eq!(power.left * power.left + power.right * power.right, 1.0);
    }

    #[test]
    fn test_out_of_range_channel_is_ignored() {
        let mut mixer = Mixer::new();
        mixer.set_enables(3, true, true, true);
        mixer.set_volume(5, 9);
        mixer.set_pan(7, 0.0, false);
        assert_eq!(mixer.control().bits(), 0x3F);
    }
}
