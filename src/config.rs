//! Configuration loading from TOML.
//!
//! Reads `config.toml` into strongly-typed structs. Every section and field
//! has a default, so a missing file or a partial file is fine.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::types::{AllocationInput, RoundingStep};

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub allocation: AllocationConfig,
    pub storage: StorageConfig,
    pub server: ServerConfig,
}

/// Default allocation parameters used when a request omits them.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AllocationConfig {
    pub budget: f64,
    pub odds_a: f64,
    pub odds_b: f64,
    pub bonus_percent_a: f64,
    pub bonus_percent_b: f64,
    pub min_odds_for_bonus_a: f64,
    pub rounding_step: RoundingStep,
    pub random_mode: bool,
}

impl Default for AllocationConfig {
    fn default() -> Self {
        let input = AllocationInput::default();
        Self {
            budget: input.budget,
            odds_a: input.odds_a,
            odds_b: input.odds_b,
            bonus_percent_a: input.bonus_percent_a,
            bonus_percent_b: input.bonus_percent_b,
            min_odds_for_bonus_a: input.min_odds_for_bonus_a,
            rounding_step: input.rounding_step,
            random_mode: input.random_mode,
        }
    }
}

impl AllocationConfig {
    pub fn to_input(&self) -> AllocationInput {
        AllocationInput {
            budget: self.budget,
            odds_a: self.odds_a,
            odds_b: self.odds_b,
            bonus_percent_a: self.bonus_percent_a,
            bonus_percent_b: self.bonus_percent_b,
            min_odds_for_bonus_a: self.min_odds_for_bonus_a,
            rounding_step: self.rounding_step,
            random_mode: self.random_mode,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    #[default]
    File,
    Sqlite,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Directory for `file`, connection URL for `sqlite`, ignored for `memory`.
    pub path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::File,
            path: "journeys".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::parse(&contents).with_context(|| format!("Failed to parse config file: {path}"))
    }

    /// Load `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        config
            .allocation
            .to_input()
            .validate()
            .context("Invalid [allocation] defaults")?;
        Ok(config)
    }
}
