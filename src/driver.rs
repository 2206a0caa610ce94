//! Driver facade
//!
//! [`VoiceDriver`] owns everything one instance needs: the engine, the
//! persisted state, the runtime state and the configuration. Event
//! translation (`translator`), block rendering (`renderer`) and the host
//! parameter surface (`params`) are implemented as methods on this one
//! aggregate, so there is no shared or static state between instances.
//!
//! Configuration changes ([`prepare`](VoiceDriver::prepare),
//! [`load_state`](VoiceDriver::load_state), clock-rate changes) must not
//! overlap with [`render_block`](VoiceDriver::render_block); the caller
//! serializes them.

use crate::backend::{SynthEngine, NUM_CHANNELS};
use crate::codec::{self, StateLayout};
use crate::config::DriverConfig;
use crate::state::{DriverState, EngineRuntime, StateOrigin};
use crate::Result;

/// Three-voice event-driven PSG driver
#[derive(Debug)]
pub struct VoiceDriver<E: SynthEngine> {
    pub(crate) engine: E,
    pub(crate) state: DriverState,
    pub(crate) runtime: EngineRuntime,
    pub(crate) config: DriverConfig,
}

impl<E: SynthEngine> VoiceDriver<E> {
    /// Create an unconfigured driver around `engine`
    ///
    /// The driver stays inactive until [`prepare`](Self::prepare) succeeds.
    pub fn new(engine: E, config: DriverConfig) -> Self {
        Self {
            engine,
            state: DriverState::default(),
            runtime: EngineRuntime::default(),
            config,
        }
    }

    /// Configure the engine for playback at `sample_rate`
    ///
    /// Resets the persisted state to defaults unless it was loaded from a
    /// blob or defaulted before, configures the engine, pushes every stored
    /// register, silences all voices and activates rendering.
    pub fn prepare(&mut self, sample_rate: u32) -> Result<()> {
        self.runtime.active = false;

        if self.state.origin == StateOrigin::Uninitialized {
            self.state.reset();
        }

        self.runtime = EngineRuntime::new(sample_rate, self.state.global.envelope_period);
        self.configure_engine()?;
        self.runtime.active = true;

        tracing::info!(
            sample_rate,
            clock_rate = self.state.global.clock_rate,
            origin = ?self.state.origin,
            "voice driver prepared"
        );
        Ok(())
    }

    /// Stop rendering; state is kept for the next [`prepare`](Self::prepare)
    pub fn release(&mut self) {
        self.runtime.active = false;
        tracing::info!("voice driver released");
    }

    /// Configure the engine and push the stored registers
    ///
    /// Must run with `runtime.active == false`.
    pub(crate) fn configure_engine(&mut self) -> Result<()> {
        debug_assert!(!self.runtime.active, "engine reconfigured while active");

        let global = self.state.global;
        self.engine
            .configure(self.config.chip, global.clock_rate, self.runtime.sample_rate)?;
        self.engine.set_noise(global.noise_period);

        for (ch, channel) in self.state.channels.iter().enumerate() {
            self.engine
                .set_pan(ch, channel.pan, self.config.equal_power_pan);
            // Quiet until the first note-on
            self.engine.set_mixer(ch, false, false, false);
            self.engine.set_volume(ch, channel.volume);
        }

        self.engine.set_envelope_shape(global.envelope_shape);
        self.engine.set_envelope(global.envelope_period);
        Ok(())
    }

    /// Change the oscillator reference clock and reconfigure the engine
    ///
    /// Sounding voices are released; their tone periods were derived from
    /// the old clock. A rejected clock returns the error and leaves the
    /// engine, the stored clock and the voices as they were.
    pub fn set_clock_rate(&mut self, clock_rate: u32) -> Result<()> {
        let was_active = self.runtime.active;
        self.runtime.active = false;

        let previous = self.state.global.clock_rate;
        self.state.global.clock_rate = clock_rate;
        // Engines reject a clock before resetting anything
        if let Err(err) = self.configure_engine() {
            tracing::warn!(clock_rate, %err, "clock rate rejected, keeping previous");
            self.state.global.clock_rate = previous;
            self.runtime.active = was_active;
            return Err(err);
        }

        for runtime in self.runtime.channels.iter_mut() {
            runtime.note_on = false;
            runtime.envelope = None;
            runtime.applied_volume = None;
        }

        tracing::info!(clock_rate, "clock rate changed");
        self.runtime.active = was_active;
        Ok(())
    }

    /// Serialize the persisted state
    pub fn save_state(&self, layout: StateLayout) -> Vec<u8> {
        codec::encode(&self.state, layout)
    }

    /// Restore persisted state from a blob
    ///
    /// Malformed blobs are logged and ignored; the state is left as it was.
    /// A successful load is kept by the next [`prepare`](Self::prepare).
    /// Registers reach the engine on that next prepare.
    pub fn load_state(&mut self, bytes: &[u8]) {
        match codec::decode(bytes) {
            Ok((state, layout)) => {
                self.state = state;
                self.runtime
                    .sync_envelope_fragments(self.state.global.envelope_period as u32);
                tracing::debug!(?layout, len = bytes.len(), "state loaded");
            }
            Err(err) => {
                tracing::warn!(%err, "ignoring persisted state");
            }
        }
    }

    /// Persisted state
    pub fn state(&self) -> &DriverState {
        &self.state
    }

    /// Runtime state
    pub fn runtime(&self) -> &EngineRuntime {
        &self.runtime
    }

    /// Driver configuration
    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// The synthesis engine
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Mutable access to the synthesis engine
    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    /// Whether the driver renders audio
    pub fn is_active(&self) -> bool {
        self.runtime.active
    }

    /// Note-on flags of the three voices
    pub fn note_states(&self) -> [bool; NUM_CHANNELS] {
        let mut states = [false; NUM_CHANNELS];
        for (slot, runtime) in states.iter_mut().zip(&self.runtime.channels) {
            *slot = runtime.note_on;
        }
        states
    }
}
