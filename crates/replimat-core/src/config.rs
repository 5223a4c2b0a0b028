//! Tunable constants for terminals, tanks and wardens.
//!
//! Defaults match the stock mod. A JSON file can override any subset of
//! fields; missing fields keep their default.

use serde::{Deserialize, Serialize};

use crate::components::FoodPreferability;

/// Simulation tuning for the Replimat slice
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplimatConfig {
    /// Simulation ticks per in-game second
    pub ticks_per_second: u32,
    /// Length of the dispense glow in seconds
    pub collect_duration_secs: f32,
    /// Watts drawn while idle
    pub idle_power_draw: f32,
    /// Watts drawn while the glow runs
    pub dispensing_power_draw: f32,
    /// Litres of feedstock per kilogram of food
    pub feedstock_litres_per_kg: f32,
    /// Probe volume used when a terminal has no meal selected
    pub minimum_probe_volume: f32,
    /// Tier new terminals pick meals from
    pub max_preferability: FoodPreferability,
    /// Pawn walking speed in map units per tick
    pub pawn_speed: f32,
}

impl Default for ReplimatConfig {
    fn default() -> Self {
        Self {
            ticks_per_second: 60,
            collect_duration_secs: 2.0,
            idle_power_draw: 125.0,
            dispensing_power_draw: 1500.0,
            feedstock_litres_per_kg: 1.6,
            minimum_probe_volume: 1.0,
            max_preferability: FoodPreferability::MealLavish,
            pawn_speed: 0.1,
        }
    }
}

impl ReplimatConfig {
    /// Parse from JSON and validate
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a JSON file
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Reject values the simulation cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ticks_per_second == 0 {
            return Err(ConfigError::Invalid("ticks_per_second must be positive"));
        }
        if !(self.collect_duration_secs >= 0.0) {
            return Err(ConfigError::Invalid("collect_duration_secs must not be negative"));
        }
        if !(self.feedstock_litres_per_kg > 0.0) {
            return Err(ConfigError::Invalid("feedstock_litres_per_kg must be positive"));
        }
        if !(self.minimum_probe_volume >= 0.0) {
            return Err(ConfigError::Invalid("minimum_probe_volume must not be negative"));
        }
        if !(self.pawn_speed > 0.0) {
            return Err(ConfigError::Invalid("pawn_speed must be positive"));
        }
        Ok(())
    }

    /// Dispense glow length in ticks
    pub fn collect_duration_ticks(&self) -> u32 {
        (self.collect_duration_secs * self.ticks_per_second as f32).round() as u32
    }
}

/// Errors that can occur while loading configuration
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Json(serde_json::Error),
    Invalid(&'static str),
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Json(e)
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Json(e) => write!(f, "Config parse error: {}", e),
            ConfigError::Invalid(msg) => write!(f, "Invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}
