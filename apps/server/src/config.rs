//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tickarb_alerts::TelegramConfig;
use tickarb_core::{BotConfig, ConfigError};

#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid bot settings: {0}")]
    Invalid(#[from] ConfigError),
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Runtime bot settings; editable later through the control API.
    pub bot: BotConfig,
    /// HTTP control API port.
    pub port: u16,
    pub opportunities_path: PathBuf,
    pub trades_path: PathBuf,
    /// Telegram alerts. Empty fields fall back to the environment.
    pub telegram: TelegramConfig,
    /// Timeout for each exchange REST call.
    pub gateway_timeout_secs: u64,
    /// Logging level.
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bot: BotConfig::default(),
            port: 5000,
            opportunities_path: PathBuf::from("opportunities.json"),
            trades_path: PathBuf::from("trades.log"),
            telegram: TelegramConfig::default(),
            gateway_timeout_secs: 10,
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load from a JSON file. A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AppConfigError> {
        let path = path.as_ref();
        let config = match std::fs::read_to_string(path) {
            Ok(raw) => serde_json::from_str::<AppConfig>(&raw).map_err(|source| {
                AppConfigError::Parse {
                    path: path.to_path_buf(),
                    source,
                }
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => AppConfig::default(),
            Err(source) => {
                return Err(AppConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        config.bot.validate()?;
        Ok(config)
    }

    pub fn gateway_timeout(&self) -> Duration {
        Duration::from_secs(self.gateway_timeout_secs.max(1))
    }

    /// Telegram settings from the file, or from the environment when the
    /// file leaves them empty.
    pub fn telegram(&self) -> Option<TelegramConfig> {
        if self.telegram.is_complete() {
            Some(self.telegram.clone())
        } else {
            TelegramConfig::from_env()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_app_config_default() {
        let config = AppConfig::default();
        assert_eq!(config.port, 5000);
        assert_eq!(config.opportunities_path, PathBuf::from("opportunities.json"));
        assert!(config.bot.simulation_mode);
        assert_eq!(config.gateway_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load(dir.path().join("absent.json")).unwrap();
        assert_eq!(config.port, 5000);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"port": 8080, "bot": {{"min_profit": 2.5}}}}"#).unwrap();

        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.bot.min_profit, 2.5);
        assert_eq!(config.bot.check_interval_seconds, 10);
        assert_eq!(config.trades_path, PathBuf::from("trades.log"));
    }

    #[test]
    fn test_invalid_bot_settings_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"bot": {{"trade_amount": 0}}}}"#).unwrap();

        assert!(matches!(
            AppConfig::load(file.path()),
            Err(AppConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_malformed_file_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();

        assert!(matches!(
            AppConfig::load(file.path()),
            Err(AppConfigError::Parse { .. })
        ));
    }
}
