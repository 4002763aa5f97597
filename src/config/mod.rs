//! TOML configuration for the CLI.

mod logging;

use std::path::Path;

use serde::Deserialize;
use url::Url;

use crate::domain::Filter;
use crate::error::ConfigError;
use crate::sync::{SyncConfig, DEFAULT_GRACE_PERIOD, DEFAULT_POLL_INTERVAL};
use crate::transport::SupabaseTransport;

pub use logging::LoggingConfig;

/// Environment variable consulted when `backend.api_key` is absent.
pub const API_KEY_ENV: &str = "LIVETALLY_API_KEY";

#[derive(Debug, Deserialize)]
pub struct Config {
    pub backend: BackendConfig,
    pub sync: SyncSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where the backend lives and how to authenticate to it.
#[derive(Debug, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the REST endpoint, e.g. `https://xyz.supabase.co`.
    pub rest_url: String,
    /// Websocket URL of the realtime endpoint, e.g.
    /// `wss://xyz.supabase.co/realtime/v1`.
    pub realtime_url: String,
    /// API key; falls back to the `LIVETALLY_API_KEY` environment variable.
    #[serde(default)]
    pub api_key: String,
}

/// Which rows to watch and how patient the fallback is.
#[derive(Debug, Deserialize)]
pub struct SyncSettings {
    pub table: String,
    pub filter_column: Option<String>,
    pub filter_value: Option<String>,
    #[serde(default = "default_grace_secs")]
    pub grace_period_secs: u64,
    #[serde(default = "default_poll_secs")]
    pub poll_interval_secs: u64,
}

fn default_grace_secs() -> u64 {
    DEFAULT_GRACE_PERIOD.as_secs()
}

fn default_poll_secs() -> u64 {
    DEFAULT_POLL_INTERVAL.as_secs()
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        let mut config: Config = toml::from_str(&content).map_err(ConfigError::Parse)?;

        if config.backend.api_key.is_empty() {
            if let Ok(key) = std::env::var(API_KEY_ENV) {
                config.backend.api_key = key;
            }
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.backend.rest_url.is_empty() {
            return Err(ConfigError::MissingField {
                field: "backend.rest_url",
            });
        }
        if self.backend.realtime_url.is_empty() {
            return Err(ConfigError::MissingField {
                field: "backend.realtime_url",
            });
        }
        if self.backend.api_key.is_empty() {
            return Err(ConfigError::MissingField {
                field: "backend.api_key",
            });
        }

        let rest = Url::parse(&self.backend.rest_url).map_err(|e| ConfigError::InvalidValue {
            field: "backend.rest_url",
            reason: e.to_string(),
        })?;
        if rest.scheme() != "http" && rest.scheme() != "https" {
            return Err(ConfigError::InvalidValue {
                field: "backend.rest_url",
                reason: format!("expected http(s) URL, got scheme '{}'", rest.scheme()),
            });
        }

        let realtime =
            Url::parse(&self.backend.realtime_url).map_err(|e| ConfigError::InvalidValue {
                field: "backend.realtime_url",
                reason: e.to_string(),
            })?;
        if realtime.scheme() != "ws" && realtime.scheme() != "wss" {
            return Err(ConfigError::InvalidValue {
                field: "backend.realtime_url",
                reason: format!("expected ws(s) URL, got scheme '{}'", realtime.scheme()),
            });
        }

        if self.sync.table.is_empty() {
            return Err(ConfigError::MissingField { field: "sync.table" });
        }
        if self.sync.filter_column.is_some() != self.sync.filter_value.is_some() {
            return Err(ConfigError::InvalidValue {
                field: "sync.filter_column",
                reason: "filter_column and filter_value must be set together".into(),
            });
        }
        if self.sync.poll_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "sync.poll_interval_secs",
                reason: "must be at least 1".into(),
            });
        }

        Ok(())
    }

    /// The equality filter, if one is configured.
    pub fn filter(&self) -> Option<Filter> {
        match (&self.sync.filter_column, &self.sync.filter_value) {
            (Some(column), Some(value)) => Some(Filter::eq(column, value)),
            _ => None,
        }
    }

    /// Synchronizer settings derived from this configuration.
    pub fn sync_config(&self) -> SyncConfig {
        let mut sync = SyncConfig::new(&self.sync.table)
            .with_grace_period(std::time::Duration::from_secs(self.sync.grace_period_secs))
            .with_poll_interval(std::time::Duration::from_secs(self.sync.poll_interval_secs));
        if let Some(filter) = self.filter() {
            sync = sync.with_filter(filter);
        }
        sync
    }

    /// Build the real transport from this configuration.
    pub fn transport(&self) -> SupabaseTransport {
        SupabaseTransport::new(
            self.backend.rest_url.clone(),
            self.backend.realtime_url.clone(),
            self.backend.api_key.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_str: &str) -> Config {
        toml::from_str(toml_str).unwrap()
    }

    const VALID: &str = r#"
        [backend]
        rest_url = "https://example.supabase.co"
        realtime_url = "wss://example.supabase.co/realtime/v1"
        api_key = "anon-key"

        [sync]
        table = "patients"
    "#;

    #[test]
    fn test_valid_config_passes_validation() {
        let config = parse(VALID);
        assert!(config.validate().is_ok());
        assert_eq!(config.sync.grace_period_secs, 3);
        assert_eq!(config.sync.poll_interval_secs, 10);
        assert!(config.filter().is_none());
    }

    #[test]
    fn test_sync_config_carries_intervals() {
        let mut config = parse(VALID);
        config.sync.grace_period_secs = 5;
        config.sync.poll_interval_secs = 20;
        let sync = config.sync_config();
        assert_eq!(sync.grace_period, std::time::Duration::from_secs(5));
        assert_eq!(sync.poll_interval, std::time::Duration::from_secs(20));
        assert_eq!(sync.table, "patients");
    }

    #[test]
    fn test_filter_requires_both_halves() {
        let mut config = parse(VALID);
        config.sync.filter_column = Some("therapist_id".into());
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));

        config.sync.filter_value = Some("7".into());
        assert!(config.validate().is_ok());
        assert_eq!(config.filter(), Some(Filter::eq("therapist_id", "7")));
    }

    #[test]
    fn test_rejects_non_ws_realtime_url() {
        let mut config = parse(VALID);
        config.backend.realtime_url = "https://example.supabase.co".into();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue {
                field: "backend.realtime_url",
                ..
            })
        ));
    }

    #[test]
    fn test_rejects_missing_api_key() {
        let mut config = parse(VALID);
        config.backend.api_key = String::new();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingField {
                field: "backend.api_key"
            })
        ));
    }

    #[test]
    fn test_rejects_zero_poll_interval() {
        let mut config = parse(VALID);
        config.sync.poll_interval_secs = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue {
                field: "sync.poll_interval_secs",
                ..
            })
        ));
    }
}
