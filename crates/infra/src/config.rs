//! Process settings loaded from `RESALE_*` environment variables.

use std::time::Duration;

use thiserror::Error;

use resale_lifecycle::EngineConfig;
use resale_observability::{LogConfig, LogFormat};

pub const ENGINE_NAME: &str = "RESALE_ENGINE_NAME";
/// Milliseconds; `0` or `none` waits indefinitely.
pub const LOCK_TIMEOUT_MS: &str = "RESALE_LOCK_TIMEOUT_MS";
pub const LOG_FORMAT: &str = "RESALE_LOG_FORMAT";
pub const LOG_FILTER: &str = "RESALE_LOG_FILTER";
pub const RELIST_CHECK_DELAY_SECS: &str = "RESALE_RELIST_CHECK_DELAY_SECS";
pub const RETURN_WINDOW_DAYS: &str = "RESALE_RETURN_WINDOW_DAYS";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: '{value}'")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub engine: EngineConfig,
    pub log: LogConfig,
    pub relist_check_delay: chrono::Duration,
    pub return_window: chrono::Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            log: LogConfig::default(),
            relist_check_delay: chrono::Duration::days(1),
            return_window: chrono::Duration::days(30),
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup. Missing or blank keys
    /// keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let mut settings = Settings::default();

        if let Some(name) = get(ENGINE_NAME) {
            settings.engine = settings.engine.with_name(name);
        }

        if let Some(raw) = get(LOCK_TIMEOUT_MS) {
            let timeout = if raw.eq_ignore_ascii_case("none") {
                None
            } else {
                match parse_u64(LOCK_TIMEOUT_MS, &raw)? {
                    0 => None,
                    ms => Some(Duration::from_millis(ms)),
                }
            };
            settings.engine = settings.engine.with_lock_timeout(timeout);
        }

        if let Some(raw) = get(LOG_FORMAT) {
            let format: LogFormat = raw.parse().map_err(|_| invalid(LOG_FORMAT, &raw))?;
            settings.log = settings.log.with_format(format);
        }

        if let Some(filter) = get(LOG_FILTER) {
            settings.log = settings.log.with_default_filter(filter);
        }

        if let Some(raw) = get(RELIST_CHECK_DELAY_SECS) {
            let secs = parse_i64(RELIST_CHECK_DELAY_SECS, &raw)?;
            settings.relist_check_delay = chrono::Duration::seconds(secs);
        }

        if let Some(raw) = get(RETURN_WINDOW_DAYS) {
            let days = parse_i64(RETURN_WINDOW_DAYS, &raw)?;
            settings.return_window = chrono::Duration::days(days);
        }

        Ok(settings)
    }
}

fn invalid(key: &'static str, value: &str) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_string(),
    }
}

fn parse_u64(key: &'static str, raw: &str) -> Result<u64, ConfigError> {
    raw.parse().map_err(|_| invalid(key, raw))
}

// Negative durations are rejected along with garbage.
fn parse_i64(key: &'static str, raw: &str) -> Result<i64, ConfigError> {
    match raw.parse::<i64>() {
        Ok(n) if n >= 0 => Ok(n),
        _ => Err(invalid(key, raw)),
    }
}
