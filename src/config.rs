//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Secrets (API keys) are referenced by env-var name in the config and
//! resolved at runtime via `std::env::var`. Tuning knobs for the optimizer
//! default to the values the pick generator was calibrated against, so a
//! minimal config file stays valid.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub store: StoreConfig,
    pub market_data: MarketDataConfig,
    #[serde(default)]
    pub scanner: ScannerConfig,
    #[serde(default)]
    pub verifier: VerifierConfig,
    #[serde(default)]
    pub optimizer: OptimizerConfig,
}

/// Locations of every on-disk artifact, relative to the working directory.
#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    pub index_file: String,
    pub history_dir: String,
    pub performance_dir: String,
    pub report_file: String,
    pub engine_config_file: String,
    pub tuning_results_file: String,
    pub live_stats_file: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MarketDataConfig {
    /// Provider identifier; only "finnhub" is currently implemented.
    pub provider: String,
    pub api_key_env: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScannerConfig {
    /// Required days for picks with a missing or unparsable timeframe.
    #[serde(default = "default_timeframe_days")]
    pub default_timeframe_days: i64,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            default_timeframe_days: default_timeframe_days(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct VerifierConfig {
    /// Quote fetches issued concurrently per group.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Pause between fetch groups, respecting provider quotas.
    #[serde(default = "default_batch_delay_ms")]
    pub batch_delay_ms: u64,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            batch_delay_ms: default_batch_delay_ms(),
        }
    }
}

/// Optimizer knobs. Sample gates and step/cap values are tunable here, not
/// hard-wired into the phases.
#[derive(Debug, Deserialize, Clone)]
pub struct OptimizerConfig {
    #[serde(default = "default_min_simulated_trades")]
    pub min_simulated_trades: u32,
    #[serde(default = "default_step")]
    pub simulation_step: f64,
    #[serde(default = "default_step")]
    pub min_move: f64,
    #[serde(default = "default_min_verified")]
    pub min_verified: u64,
    #[serde(default = "default_win_rate_floor")]
    pub win_rate_floor: f64,
    #[serde(default = "default_step")]
    pub tighten_step: f64,
    #[serde(default = "default_threshold_cap")]
    pub threshold_cap: f64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            min_simulated_trades: default_min_simulated_trades(),
            simulation_step: default_step(),
            min_move: default_step(),
            min_verified: default_min_verified(),
            win_rate_floor: default_win_rate_floor(),
            tighten_step: default_step(),
            threshold_cap: default_threshold_cap(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_timeframe_days() -> i64 {
    7
}

fn default_batch_size() -> usize {
    5
}

fn default_batch_delay_ms() -> u64 {
    1_000
}

fn default_min_simulated_trades() -> u32 {
    3
}

fn default_step() -> f64 {
    5.0
}

fn default_min_verified() -> u64 {
    5
}

fn default_win_rate_floor() -> f64 {
    40.0
}

fn default_threshold_cap() -> f64 {
    90.0
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))?;
        Ok(config)
    }

    /// Resolve an environment variable name to its value.
    /// Useful for loading secrets referenced in the config.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }
}
