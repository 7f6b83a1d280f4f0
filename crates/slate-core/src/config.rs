//! Engine configuration loaded from TOML.
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! playable setup. Values are validated after parsing.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Smallest tick interval the scheduler accepts, in milliseconds.
pub const MIN_TICK_INTERVAL_MS: u64 = 100;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Tunables for a simulation session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Milliseconds between ticks while the scheduler runs.
    pub tick_interval_ms: u64,
    /// Maximum agents the pool can hold.
    pub agent_cap: u32,
    /// Agents resting in the pool at session start. Clamped to `agent_cap`.
    pub initial_agents: u32,
    /// Cap of resource slots auto-created when agents are collected.
    pub resource_default_cap: u32,
    /// Cap of item slots auto-created when agents are collected.
    pub item_default_cap: u32,
    /// Grid cell size that node positions snap to.
    pub cell_size: u32,
    /// Seed for agent name generation.
    pub name_seed: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1000,
            agent_cap: 5,
            initial_agents: 5,
            resource_default_cap: crate::pool::DEFAULT_RESOURCE_CAP,
            item_default_cap: crate::pool::DEFAULT_ITEM_CAP,
            cell_size: 32,
            name_seed: 0x5EED,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval_ms < MIN_TICK_INTERVAL_MS {
            return Err(ConfigError::Invalid(format!(
                "tick_interval_ms must be at least {MIN_TICK_INTERVAL_MS}, got {}",
                self.tick_interval_ms
            )));
        }
        if self.cell_size == 0 {
            return Err(ConfigError::Invalid("cell_size must be positive".into()));
        }
        Ok(())
    }
}
