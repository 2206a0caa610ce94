//! Driver configuration
//!
//! Small serde-backed settings that shape how events reach the engine.
//! Every field has a default so partial JSON documents are accepted.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::backend::ChipModel;
use crate::Result;

/// Driver-wide settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// DAC curve requested from the engine
    pub chip: ChipModel,
    /// Use the equal-power pan law instead of linear gains
    pub equal_power_pan: bool,
    /// On note-off, nudge the envelope shape register so the next note-on
    /// restarts the hardware envelope from a clean edge
    pub cycle_envelope_shape_on_note_off: bool,
    /// Allow the host to automate the clock-rate parameter
    pub expose_clock_rate: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            chip: ChipModel::Ym2149,
            equal_power_pan: false,
            cycle_envelope_shape_on_note_off: false,
            expose_clock_rate: false,
        }
    }
}

impl DriverConfig {
    /// Parse a configuration from JSON text
    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Load a configuration from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let config = Self::from_json_str(&text)?;
        tracing::debug!(path = %path.display(), ?config, "loaded driver configuration");
        Ok(config)
    }

    /// Serialize the configuration as pretty JSON
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
