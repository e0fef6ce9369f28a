//! Runtime configuration
//!
//! Values come from the process environment, optionally seeded from a
//! `.env` file. Every field has a default, so an empty environment yields
//! the stock one-minute refresh against the fundgz valuation feed.

use crate::error::{AppError, Result};
use crate::services::staleness;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_VALUATION_URL: &str = "https://fundgz.1234567.com.cn";

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Delay between the end of one cycle and the start of the next
    pub refresh_interval: Duration,
    /// Age after which a source timestamp is treated as a settled close
    pub staleness_threshold: Duration,
    /// Search prefix that switches the search box into filter mode
    pub filter_prefix: String,
    pub valuation_base_url: String,
    pub request_timeout: Duration,
    pub currency_symbol: String,
    pub database_path: PathBuf,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(60),
            staleness_threshold: staleness::DEFAULT_THRESHOLD,
            filter_prefix: "s".to_string(),
            valuation_base_url: DEFAULT_VALUATION_URL.to_string(),
            request_timeout: Duration::from_secs(10),
            currency_symbol: "¥".to_string(),
            database_path: PathBuf::from("fundwatch.db"),
        }
    }
}

impl WatchConfig {
    /// Load configuration from `.env` and the process environment
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let config = Self {
            refresh_interval: secs_or(&lookup, "FUNDWATCH_REFRESH_SECS", defaults.refresh_interval)?,
            staleness_threshold: secs_or(&lookup, "FUNDWATCH_STALE_SECS", defaults.staleness_threshold)?,
            filter_prefix: lookup("FUNDWATCH_FILTER_PREFIX").unwrap_or(defaults.filter_prefix),
            valuation_base_url: lookup("FUNDWATCH_VALUATION_URL")
                .unwrap_or(defaults.valuation_base_url),
            request_timeout: secs_or(&lookup, "FUNDWATCH_TIMEOUT_SECS", defaults.request_timeout)?,
            currency_symbol: lookup("FUNDWATCH_CURRENCY").unwrap_or(defaults.currency_symbol),
            database_path: lookup("FUNDWATCH_DB")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.refresh_interval.is_zero() {
            return Err(AppError::Config("Refresh interval must be positive".to_string()));
        }
        if self.staleness_threshold.is_zero() {
            return Err(AppError::Config("Staleness threshold must be positive".to_string()));
        }
        if self.filter_prefix.is_empty() {
            return Err(AppError::Config("Filter prefix must not be empty".to_string()));
        }
        url::Url::parse(&self.valuation_base_url).map_err(|e| {
            AppError::Config(format!("Invalid valuation URL {}: {}", self.valuation_base_url, e))
        })?;
        Ok(())
    }
}

fn secs_or<F>(lookup: &F, key: &str, default: Duration) -> Result<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|e| AppError::Config(format!("{} must be whole seconds: {}", key, e))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = WatchConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.refresh_interval, Duration::from_secs(60));
        assert_eq!(config.staleness_threshold, Duration::from_secs(600));
        assert_eq!(config.filter_prefix, "s");
        assert_eq!(config.currency_symbol, "¥");
    }

    #[test]
    fn test_overrides() {
        let config = WatchConfig::from_lookup(lookup_from(&[
            ("FUNDWATCH_REFRESH_SECS", "15"),
            ("FUNDWATCH_FILTER_PREFIX", "/"),
            ("FUNDWATCH_DB", "/tmp/watch.db"),
        ]))
        .unwrap();
        assert_eq!(config.refresh_interval, Duration::from_secs(15));
        assert_eq!(config.filter_prefix, "/");
        assert_eq!(config.database_path, PathBuf::from("/tmp/watch.db"));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = WatchConfig::from_lookup(lookup_from(&[("FUNDWATCH_REFRESH_SECS", "soon")]));
        assert!(matches!(err, Err(AppError::Config(_))));

        let err = WatchConfig::from_lookup(lookup_from(&[("FUNDWATCH_REFRESH_SECS", "0")]));
        assert!(matches!(err, Err(AppError::Config(_))));

        let err = WatchConfig::from_lookup(lookup_from(&[("FUNDWATCH_FILTER_PREFIX", "")]));
        assert!(matches!(err, Err(AppError::Config(_))));

        let err = WatchConfig::from_lookup(lookup_from(&[("FUNDWATCH_VALUATION_URL", "not a url")]));
        assert!(matches!(err, Err(AppError::Config(_))));
    }
}
