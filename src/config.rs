//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs. The
//! database URL may be overridden by the env var named in
//! `storage.database_url_env`.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::fs;
use std::time::Duration;

use crate::strategy::autobet::AutoBetSizing;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub auto_bet: AutoBetSettings,
    #[serde(default)]
    pub auto_odds: AutoOddsSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    pub name: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "wagerbook".into(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub database_url: String,
    /// Env var that, when set, replaces `database_url`.
    #[serde(default)]
    pub database_url_env: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    1
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite::memory:".into(),
            database_url_env: None,
            max_connections: default_max_connections(),
        }
    }
}

impl StorageConfig {
    /// The database URL, env override first.
    pub fn resolved_url(&self) -> String {
        self.database_url_env
            .as_deref()
            .and_then(|name| AppConfig::resolve_env(name).ok())
            .unwrap_or_else(|| self.database_url.clone())
    }
}

/// Settings for the periodic auto-bet worker.
#[derive(Debug, Deserialize, Clone)]
pub struct AutoBetSettings {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_min_stake", with = "rust_decimal::serde::str")]
    pub min_stake: Decimal,
    /// Truncate stakes to this many decimal places. Unset: no truncation.
    #[serde(default)]
    pub stake_dp: Option<u32>,
}

impl Default for AutoBetSettings {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            interval_secs: default_interval_secs(),
            min_stake: default_min_stake(),
            stake_dp: None,
        }
    }
}

impl AutoBetSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }

    pub fn sizing(&self) -> AutoBetSizing {
        AutoBetSizing {
            min_stake: self.min_stake,
            stake_dp: self.stake_dp,
        }
    }
}

/// Settings for the periodic odds worker.
#[derive(Debug, Deserialize, Clone)]
pub struct AutoOddsSettings {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

impl Default for AutoOddsSettings {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            interval_secs: default_interval_secs(),
        }
    }
}

impl AutoOddsSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}

fn default_enabled() -> bool {
    true
}

fn default_interval_secs() -> u64 {
    60
}

fn default_min_stake() -> Decimal {
    dec!(1)
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::parse(&contents).with_context(|| format!("Failed to parse config file: {path}"))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Resolve an environment variable name to its value.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }
}
