//! Synthesis engine abstraction
//!
//! The driver never touches chip internals. It talks to a register-level
//! engine through [`SynthEngine`], so a hardware-style emulation, a test
//! recorder or any other generator can sit behind the same event logic.

use serde::{Deserialize, Serialize};

use crate::Result;

/// Number of tone channels driven by the engine
pub const NUM_CHANNELS: usize = 3;

/// DAC curve the engine should emulate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChipModel {
    /// General Instrument AY-3-8910 (16-step volume DAC)
    Ay8910,
    /// Yamaha YM2149 (32-step envelope DAC)
    #[default]
    Ym2149,
}

/// Register-level interface of a three-voice square/noise/envelope generator
///
/// All channel setters ignore channel indices outside `0..3`.
///
/// # Example
///
/// ```
/// use ym2149_voice_driver::{ChipModel, SynthEngine, Ym2149Engine};
///
/// fn beep<E: SynthEngine>(engine: &mut E) {
///     engine.configure(ChipModel::Ym2149, 2_000_000, 44_100).unwrap();
///     engine.set_tone(0, 284);
///     engine.set_volume(0, 14);
///     engine.set_mixer(0, true, false, false);
///     engine.process();
///     let _ = (engine.left(), engine.right());
/// }
///
/// beep(&mut Ym2149Engine::new());
/// ```
pub trait SynthEngine {
    /// Configure clocks and DAC model, resetting generator state
    ///
    /// Rates the engine cannot run at must be rejected before anything is
    /// reset, leaving the previous configuration in place.
    ///
    /// # Arguments
    ///
    /// * `model` - DAC curve to emulate
    /// * `clock_rate` - Oscillator reference frequency in Hz
    /// * `sample_rate` - Output sample rate in Hz
    fn configure(&mut self, model: ChipModel, clock_rate: u32, sample_rate: u32) -> Result<()>;

    /// Set the 12-bit tone period of a channel
    fn set_tone(&mut self, channel: usize, period: u32);

    /// Set the 5-bit noise period
    fn set_noise(&mut self, period: u8);

    /// Enable or disable tone, noise and hardware envelope for a channel
    fn set_mixer(&mut self, channel: usize, tone_on: bool, noise_on: bool, envelope_on: bool);

    /// Set the fixed volume (0-14) of a channel
    fn set_volume(&mut self, channel: usize, volume: u8);

    /// Set the stereo position of a channel
    ///
    /// * `pan` - 0.0 = left ... 1.0 = right
    /// * `equal_power` - use an equal-power law instead of linear gains
    fn set_pan(&mut self, channel: usize, pan: f32, equal_power: bool);

    /// Set the 16-bit hardware envelope period
    fn set_envelope(&mut self, period: u16);

    /// Set the hardware envelope shape (0-15), restarting the envelope
    fn set_envelope_shape(&mut self, shape: u8);

    /// Apply the DC-removal step to the current output pair
    fn remove_dc(&mut self);

    /// Forget the DC-removal history
    ///
    /// Default implementation is a no-op for engines without DC tracking.
    fn reset_dc(&mut self) {}

    /// Advance the engine by one output sample
    fn process(&mut self);

    /// Left output of the last processed sample
    fn left(&self) -> f32;

    /// Right output of the last processed sample
    fn right(&self) -> f32;
}
