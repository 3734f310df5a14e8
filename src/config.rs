//! # Kettle Configuration
//!
//! Heaters and the kettles that drive them are declared in one TOML file,
//! loaded once at startup and never changed afterwards.
//!
//! ## Example: TOML Configuration
//!
//! ```toml
//! [logging]
//! level = "info"
//!
//! [[heater]]
//! id = "hlt"
//! channels = [17, 27, 22]
//! polarity = "low"
//!
//! [[kettle]]
//! name = "hot liquor tank"
//! heater = "hlt"
//! sensor_path = "/sys/bus/w1/devices/28-0316a2790cff/w1_slave"
//! target_temp = 78.0
//! tick_interval_ms = 1000
//!
//! [[kettle.phases]]
//! on_offset = 5.0
//! off_offset = 2.0
//!
//! [[kettle.phases]]
//! on_offset = 10.0
//! off_offset = 5.0
//!
//! [[kettle.phases]]
//! on_offset = 15.0
//! off_offset = 8.0
//! ```
//!
//! - Channels are listed in phase order; level 1 energizes the first one.
//! - Each heater may be driven by at most one kettle.

use crate::controller::{PhaseThreshold, PhaseThresholds};
use crate::hardware::sysfs::DEFAULT_GPIO_ROOT;
use crate::hardware::{ChannelId, Polarity};
use crate::power::PHASE_COUNT;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default, rename = "heater")]
    pub heaters: Vec<HeaterConfig>,
    #[serde(default, rename = "kettle")]
    pub kettles: Vec<KettleConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// One physical multi-phase heater.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HeaterConfig {
    pub id: String,
    pub channels: Vec<ChannelId>,
    #[serde(default)]
    pub polarity: Polarity,
    #[serde(default = "default_gpio_root")]
    pub gpio_root: PathBuf,
}

/// One controlled vessel.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct KettleConfig {
    pub name: String,
    pub heater: String,
    pub sensor_path: PathBuf,
    pub target_temp: f64,
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    #[serde(default)]
    pub phases: Vec<PhaseThreshold>,
}

impl KettleConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn thresholds(&self) -> Result<PhaseThresholds, ConfigError> {
        PhaseThresholds::new(&self.phases)
            .map_err(|e| ConfigError::Invalid(format!("kettle '{}': {}", self.name, e)))
    }
}

impl Config {
    pub fn heater(&self, id: &str) -> Option<&HeaterConfig> {
        self.heaters.iter().find(|h| h.id == id)
    }

    pub fn kettle(&self, name: &str) -> Option<&KettleConfig> {
        self.kettles.iter().find(|k| k.name == name)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.kettles.is_empty() {
            return Err(ConfigError::Invalid("no kettles configured".to_string()));
        }

        let mut heater_ids = HashSet::new();
        for heater in &self.heaters {
            if !heater_ids.insert(heater.id.as_str()) {
                return Err(ConfigError::Invalid(format!("duplicate heater id '{}'", heater.id)));
            }
            if heater.channels.len() != PHASE_COUNT {
                return Err(ConfigError::Invalid(format!(
                    "heater '{}': expected {} channels, got {}",
                    heater.id,
                    PHASE_COUNT,
                    heater.channels.len()
                )));
            }
            let distinct: HashSet<_> = heater.channels.iter().collect();
            if distinct.len() != heater.channels.len() {
                return Err(ConfigError::Invalid(format!(
                    "heater '{}': channels must be distinct",
                    heater.id
                )));
            }
        }

        let mut kettle_names = HashSet::new();
        let mut driven = HashSet::new();
        for kettle in &self.kettles {
            if !kettle_names.insert(kettle.name.as_str()) {
                return Err(ConfigError::Invalid(format!("duplicate kettle name '{}'", kettle.name)));
            }
            if !heater_ids.contains(kettle.heater.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "kettle '{}': unknown heater '{}'",
                    kettle.name, kettle.heater
                )));
            }
            if !driven.insert(kettle.heater.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "heater '{}' is driven by more than one kettle",
                    kettle.heater
                )));
            }
            if kettle.tick_interval_ms == 0 {
                return Err(ConfigError::Invalid(format!(
                    "kettle '{}': tick_interval_ms must be positive",
                    kettle.name
                )));
            }
            if !kettle.target_temp.is_finite() {
                return Err(ConfigError::Invalid(format!(
                    "kettle '{}': target_temp must be finite",
                    kettle.name
                )));
            }
            kettle.thresholds()?;
        }
        Ok(())
    }
}

/// Parse and validate configuration from a TOML string.
pub fn parse_config(contents: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(contents)?;
    config.validate()?;
    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_gpio_root() -> PathBuf {
    PathBuf::from(DEFAULT_GPIO_ROOT)
}

fn default_tick_interval_ms() -> u64 {
    1000
}
