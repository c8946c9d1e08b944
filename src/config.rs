// Environment configuration

use crate::error::{LedgerError, Result};
use log::LevelFilter;
use std::path::PathBuf;

pub const DATA_DIR_ENV: &str = "LEDGER_DATA_DIR";
pub const LOG_LEVEL_ENV: &str = "LOG_LEVEL";
pub const DEVELOPMENT_LOGGER_ENV: &str = "DEVELOPMENT_LOGGER";

const DEFAULT_DATA_DIR: &str = "./tmp";

/// Logger settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Explicit level; None defers to RUST_LOG, then `info`
    pub level: Option<LevelFilter>,
    /// Verbose format with module path and line
    pub development: bool,
}

/// Runtime configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub data_dir: PathBuf,
    pub log: LogConfig,
}

impl Config {
    /// Read configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`, which maps a variable name to its value
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let data_dir = lookup(DATA_DIR_ENV)
            .filter(|dir| !dir.is_empty())
            .unwrap_or_else(|| DEFAULT_DATA_DIR.to_string());

        let level = match lookup(LOG_LEVEL_ENV) {
            Some(raw) => Some(raw.parse::<LevelFilter>().map_err(|_| {
                LedgerError::Config(format!("{}: unknown level '{}'", LOG_LEVEL_ENV, raw))
            })?),
            None => None,
        };

        let development = match lookup(DEVELOPMENT_LOGGER_ENV) {
            Some(raw) => parse_bool(DEVELOPMENT_LOGGER_ENV, &raw)?,
            None => false,
        };

        Ok(Self {
            data_dir: PathBuf::from(data_dir),
            log: LogConfig { level, development },
        })
    }

    /// sled directory holding the blocks
    pub fn blocks_path(&self) -> PathBuf {
        self.data_dir.join("blocks")
    }

    /// Keystore file
    pub fn wallets_path(&self) -> PathBuf {
        self.data_dir.join("wallets.json")
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(LedgerError::Config(format!("{}: expected a boolean, got '{}'", key, raw))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("./tmp"));
        assert_eq!(config.log.level, None);
        assert!(!config.log.development);
        assert_eq!(config.blocks_path(), PathBuf::from("./tmp/blocks"));
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            (DATA_DIR_ENV, "/var/ledger"),
            (LOG_LEVEL_ENV, "debug"),
            (DEVELOPMENT_LOGGER_ENV, "TRUE"),
        ])
        .unwrap();
        assert_eq!(config.wallets_path(), PathBuf::from("/var/ledger/wallets.json"));
        assert_eq!(config.log.level, Some(LevelFilter::Debug));
        assert!(config.log.development);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            config_from(&[(LOG_LEVEL_ENV, "loud")]),
            Err(LedgerError::Config(_))
        ));
        assert!(matches!(
            config_from(&[(DEVELOPMENT_LOGGER_ENV, "maybe")]),
            Err(LedgerError::Config(_))
        ));
    }
}
