//! TOML configuration loading and validation.

use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Decision constants, fixed at initialization (the only tunable surface).
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Lookback window for the moving-average buy-basis price.
    #[serde(default = "default_sma_window")]
    pub sma_window: usize,
    /// Minimum order notional; smaller buys are dropped.
    #[serde(default = "default_min_buy")]
    pub min_buy: f64,
    /// Margin facility added to both portfolio value and deployable cash.
    #[serde(default = "default_margin")]
    pub margin_capacity: f64,
    /// Trim when current weight exceeds target by more than this.
    #[serde(default = "default_rebalance_thresh")]
    pub rebalance_threshold: f64,
    /// Harvest when unrealized return falls below this (negative).
    #[serde(default = "default_harvest_thresh")]
    pub harvest_threshold: f64,
    /// Days a position must be held before it can be harvested.
    #[serde(default = "default_harvest_days")]
    pub harvest_min_days: u32,
}

fn default_sma_window() -> usize {
    10
}
fn default_min_buy() -> f64 {
    100.0
}
fn default_margin() -> f64 {
    0.0
}
fn default_rebalance_thresh() -> f64 {
    0.01
}
fn default_harvest_thresh() -> f64 {
    -0.01
}
fn default_harvest_days() -> u32 {
    25
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sma_window: default_sma_window(),
            min_buy: default_min_buy(),
            margin_capacity: default_margin(),
            rebalance_threshold: default_rebalance_thresh(),
            harvest_threshold: default_harvest_thresh(),
            harvest_min_days: default_harvest_days(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_dir")]
    pub dir: String,
    #[serde(default = "default_audit_file")]
    pub audit_file: String,
    #[serde(default = "default_state_file")]
    pub state_file: String,
}

fn default_log_dir() -> String {
    "./logs".into()
}
fn default_audit_file() -> String {
    "audit.jsonl".into()
}
fn default_state_file() -> String {
    "registry.json".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: default_log_dir(),
            audit_file: default_audit_file(),
            state_file: default_state_file(),
        }
    }
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::ConfigRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate config invariants.
    pub fn validate(&self) -> Result<()> {
        let e = &self.engine;
        if e.sma_window == 0 {
            return Err(Error::Config("sma_window must be >= 1".into()));
        }
        if e.min_buy < 0.0 {
            return Err(Error::Config("min_buy must be >= 0".into()));
        }
        if e.margin_capacity < 0.0 {
            return Err(Error::Config("margin_capacity must be >= 0".into()));
        }
        if e.rebalance_threshold <= 0.0 {
            return Err(Error::Config("rebalance_threshold must be > 0".into()));
        }
        if e.harvest_threshold >= 0.0 {
            return Err(Error::Config("harvest_threshold must be < 0".into()));
        }
        if self.logging.dir.is_empty() || self.logging.audit_file.is_empty() {
            return Err(Error::Config("logging paths must not be empty".into()));
        }
        if self.logging.state_file.is_empty() {
            return Err(Error::Config("state_file must not be empty".into()));
        }
        Ok(())
    }

    /// Full path to the audit log file.
    pub fn audit_path(&self) -> std::path::PathBuf {
        Path::new(&self.logging.dir).join(&self.logging.audit_file)
    }

    /// Full path to the persisted registry state file.
    pub fn state_path(&self) -> std::path::PathBuf {
        Path::new(&self.logging.dir).join(&self.logging.state_file)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example_toml() -> &'static str {
        r#"
[engine]
sma_window = 10
min_buy = 100.0
margin_capacity = 0.0
rebalance_threshold = 0.01
harvest_threshold = -0.01
harvest_min_days = 25

[logging]
dir = "./logs"
audit_file = "audit.jsonl"
state_file = "registry.json"
"#
    }

    #[test]
    fn parse_example_config() {
        let config: Config = toml::from_str(example_toml()).unwrap();
        assert_eq!(config.engine.sma_window, 10);
        assert_eq!(config.engine.min_buy, 100.0);
        assert_eq!(config.engine.harvest_min_days, 25);
        assert_eq!(config.logging.state_file, "registry.json");
    }

    #[test]
    fn defaults_fill_missing_fields() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.engine.sma_window, 10);
        assert_eq!(config.engine.rebalance_threshold, 0.01);
        assert_eq!(config.engine.harvest_threshold, -0.01);
        assert_eq!(config.logging.dir, "./logs");
    }

    #[test]
    fn validate_catches_zero_window() {
        let mut config: Config = toml::from_str(example_toml()).unwrap();
        config.engine.sma_window = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_catches_positive_harvest_threshold() {
        let mut config: Config = toml::from_str(example_toml()).unwrap();
        config.engine.harvest_threshold = 0.01;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_catches_negative_min_buy() {
        let mut config: Config = toml::from_str(example_toml()).unwrap();
        config.engine.min_buy = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn paths() {
        let config: Config = toml::from_str(example_toml()).unwrap();
        assert_eq!(
            config.audit_path(),
            std::path::PathBuf::from("./logs/audit.jsonl")
        );
        assert_eq!(
            config.state_path(),
            std::path::PathBuf::from("./logs/registry.json")
        );
    }
}
