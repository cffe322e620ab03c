//! Configuration loading and representation.
//!
//! Values come from environment variables; every variable is optional and
//! falls back to a default. `from_lookup` takes any key → value source so
//! tests never have to touch the process environment.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use stockroom_observability::{LOG_FORMAT_ENV, LogFormat};

pub const RATE_LIMIT_CALLS_ENV: &str = "STOCKROOM_RATE_LIMIT_CALLS";
pub const RATE_LIMIT_WINDOW_MS_ENV: &str = "STOCKROOM_RATE_LIMIT_WINDOW_MS";
pub const RATE_LIMIT_ENABLED_ENV: &str = "STOCKROOM_RATE_LIMIT_ENABLED";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Front-door throttle for reservation and backorder calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub enabled: bool,
    /// Calls allowed per principal and operation within one window.
    pub max_calls: u32,
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_calls: 5,
            window: Duration::from_millis(1000),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockroomConfig {
    pub rate_limit: RateLimitConfig,
    pub log_format: LogFormat,
}

impl StockroomConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = RateLimitConfig::default();

        let max_calls = match lookup(RATE_LIMIT_CALLS_ENV) {
            Some(raw) => parse(RATE_LIMIT_CALLS_ENV, &raw)?,
            None => defaults.max_calls,
        };
        if max_calls == 0 {
            return Err(invalid(RATE_LIMIT_CALLS_ENV, "0", "must be at least 1"));
        }

        let window = match lookup(RATE_LIMIT_WINDOW_MS_ENV) {
            Some(raw) => Duration::from_millis(parse(RATE_LIMIT_WINDOW_MS_ENV, &raw)?),
            None => defaults.window,
        };
        if window.is_zero() {
            return Err(invalid(RATE_LIMIT_WINDOW_MS_ENV, "0", "must be positive"));
        }

        let enabled = match lookup(RATE_LIMIT_ENABLED_ENV) {
            Some(raw) => parse(RATE_LIMIT_ENABLED_ENV, &raw)?,
            None => defaults.enabled,
        };

        let log_format = match lookup(LOG_FORMAT_ENV) {
            Some(raw) => raw
                .parse()
                .map_err(|e: stockroom_observability::ParseLogFormatError| {
                    invalid(LOG_FORMAT_ENV, &raw, e.to_string())
                })?,
            None => LogFormat::default(),
        };

        Ok(Self {
            rate_limit: RateLimitConfig {
                enabled,
                max_calls,
                window,
            },
            log_format,
        })
    }
}

fn parse<T>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: core::str::FromStr,
    T::Err: core::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e: T::Err| invalid(key, raw, e.to_string()))
}

fn invalid(key: &'static str, value: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = StockroomConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, StockroomConfig::default());
        assert_eq!(config.rate_limit.max_calls, 5);
        assert_eq!(config.rate_limit.window, Duration::from_secs(1));
        assert!(config.rate_limit.enabled);
    }

    #[test]
    fn reads_overrides() {
        let config = StockroomConfig::from_lookup(lookup(&[
            (RATE_LIMIT_CALLS_ENV, "10"),
            (RATE_LIMIT_WINDOW_MS_ENV, "250"),
            (RATE_LIMIT_ENABLED_ENV, "false"),
            (LOG_FORMAT_ENV, "pretty"),
        ]))
        .unwrap();

        assert_eq!(config.rate_limit.max_calls, 10);
        assert_eq!(config.rate_limit.window, Duration::from_millis(250));
        assert!(!config.rate_limit.enabled);
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn rejects_garbage() {
        let err = StockroomConfig::from_lookup(lookup(&[(RATE_LIMIT_CALLS_ENV, "lots")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: RATE_LIMIT_CALLS_ENV, .. }));

        assert!(StockroomConfig::from_lookup(lookup(&[(RATE_LIMIT_CALLS_ENV, "0")])).is_err());
        assert!(StockroomConfig::from_lookup(lookup(&[(RATE_LIMIT_WINDOW_MS_ENV, "0")])).is_err());
        assert!(StockroomConfig::from_lookup(lookup(&[(LOG_FORMAT_ENV, "xml")])).is_err());
    }
}
