// src/config.rs

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use log::warn;
use serde::{Deserialize, Serialize};

use crate::metrics::DEFAULT_WINDOW_SECS;

pub const DEFAULT_WARM_UP_SECS: f64 = 1.0;

pub const WARM_UP_ENV: &str = "FRAME_TELEMETRY_WARM_UP_SECS";
pub const WINDOW_ENV: &str = "FRAME_TELEMETRY_WINDOW_SECS";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    // Wall-clock delay between start() and the first report
    pub warm_up_secs: f64,
    // Span of the FPS window
    pub window_secs: f64,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        SamplerConfig {
            warm_up_secs: DEFAULT_WARM_UP_SECS,
            window_secs: DEFAULT_WINDOW_SECS,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(PathBuf, serde_json::Error),
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(path, err) => {
                write!(f, "failed to read {}: {}", path.display(), err)
            }
            ConfigError::Parse(path, err) => {
                write!(f, "failed to parse {}: {}", path.display(), err)
            }
            ConfigError::Invalid(msg) => write!(f, "invalid sampler config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

impl SamplerConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
        let config: SamplerConfig =
            serde_json::from_str(&raw).map_err(|err| ConfigError::Parse(path.to_path_buf(), err))?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults, overridden by the environment where a variable holds a
    /// usable value. Bad values are logged and skipped.
    pub fn from_env() -> Self {
        let mut config = SamplerConfig::default();
        if let Some(value) = read_secs_env(WARM_UP_ENV) {
            config.warm_up_secs = value;
        }
        if let Some(value) = read_secs_env(WINDOW_ENV) {
            config.window_secs = value;
        }
        config
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_valid_secs(self.warm_up_secs) {
            return Err(ConfigError::Invalid(format!(
                "warm_up_secs must be finite and >= 0, got {}",
                self.warm_up_secs
            )));
        }
        if !is_valid_secs(self.window_secs) {
            return Err(ConfigError::Invalid(format!(
                "window_secs must be finite and >= 0, got {}",
                self.window_secs
            )));
        }
        Ok(())
    }
}

fn is_valid_secs(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

fn read_secs_env(name: &str) -> Option<f64> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse::<f64>() {
        Ok(value) if is_valid_secs(value) => Some(value),
        _ => {
            warn!("ignoring {}={:?}: not a non-negative number of seconds", name, raw);
            None
        }
    }
}
