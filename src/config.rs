//! Configuration
//!
//! `ManagerConfig` tunes the stream manager. `AppConfig` is the file
//! format of the demo host and wraps the manager settings together with
//! the pipeline it builds. Every field has a default, so a config file
//! only needs the values it changes.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::ConfigError;

/// Stream manager tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Maximum frames moved per pump invocation
    pub pump_batch: usize,
    /// Sleep between pump invocations of a worker thread
    pub worker_sleep_ms: u64,
    /// Weight of a new sample in the interval and byte rate averages
    pub interval_ema_weight: f32,
    /// Tick hint when no main thread connection reports timing
    pub idle_tick_interval_secs: f32,
    /// Lower bound of the tick hint
    pub min_tick_interval_ms: u64,
    /// Whether connect-to-default wiring spawns worker threads
    pub auto_connect_threaded: bool,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            pump_batch: DEFAULT_PUMP_BATCH,
            worker_sleep_ms: DEFAULT_WORKER_SLEEP_MS,
            interval_ema_weight: DEFAULT_INTERVAL_EMA_WEIGHT,
            idle_tick_interval_secs: DEFAULT_IDLE_TICK_SECS,
            min_tick_interval_ms: DEFAULT_MIN_TICK_MS,
            auto_connect_threaded: true,
        }
    }
}

impl ManagerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pump_batch == 0 {
            return Err(ConfigError::Invalid("pump_batch must be > 0".into()));
        }
        if !(self.interval_ema_weight > 0.0 && self.interval_ema_weight <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "interval_ema_weight must be in (0, 1], got {}",
                self.interval_ema_weight
            )));
        }
        if !(self.idle_tick_interval_secs.is_finite() && self.idle_tick_interval_secs > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "idle_tick_interval_secs must be positive, got {}",
                self.idle_tick_interval_secs
            )));
        }
        Ok(())
    }

    pub fn worker_sleep(&self) -> Duration {
        Duration::from_millis(self.worker_sleep_ms)
    }

    pub fn idle_tick_interval(&self) -> Duration {
        Duration::from_secs_f32(self.idle_tick_interval_secs)
    }

    pub fn min_tick_interval(&self) -> Duration {
        Duration::from_millis(self.min_tick_interval_ms)
    }
}

/// The test pipeline the demo host builds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub sample_rate: u32,
    pub channels: u16,
    /// Chunk length delivered to the level meter
    pub frame_length_ms: u32,
    pub tone_frequency_hz: f32,
    /// Seconds between status dumps, 0 disables them
    pub status_interval_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            channels: DEFAULT_CHANNELS,
            frame_length_ms: DEFAULT_FRAME_LENGTH_MS,
            tone_frequency_hz: 440.0,
            status_interval_secs: 5,
        }
    }
}

/// Demo host configuration file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Log filter used when `RUST_LOG` is not set
    pub log_level: String,
    pub manager: ManagerConfig,
    pub pipeline: PipelineConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            manager: ManagerConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl AppConfig {
    /// Default location of the config file
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "framewire").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load from `path`, or from [`AppConfig::default_path`]
    ///
    /// An explicit path must exist. A missing file at the default
    /// location yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, required) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => match Self::default_path() {
                Some(path) => (path, false),
                None => return Ok(Self::default()),
            },
        };

        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound && !required => {
                tracing::debug!("no config at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(source) => return Err(ConfigError::Io { path, source }),
        };

        let config = Self::from_toml(&text)?;
        tracing::info!("loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.manager.validate()?;
        if self.pipeline.channels == 0 || self.pipeline.sample_rate == 0 {
            return Err(ConfigError::Invalid(
                "pipeline needs a sample rate and at least one channel".into(),
            ));
        }
        if self.pipeline.frame_length_ms == 0 {
            return Err(ConfigError::Invalid("frame_length_ms must be > 0".into()));
        }
        Ok(())
    }
}
