//! Stats API client configuration
//!
//! Defaults suit a locally running stats server; every field can be overridden through the
//! environment (see [`StatsConfig::from_env`]).

use crate::{
    endpoint::{AssetSymbol, DEFAULT_ASSETS},
    error::ConfigError,
    window::DEFAULT_LOOKBACK_HOURS,
};
use chrono::TimeDelta;
use std::{str::FromStr, time::Duration};
use url::Url;

pub const ENV_API_URL: &str = "STATS_API_URL";
pub const ENV_ASSETS: &str = "STATS_ASSETS";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "STATS_REQUEST_TIMEOUT_SECS";
pub const ENV_LOOKBACK_HOURS: &str = "STATS_LOOKBACK_HOURS";
pub const ENV_SETTLE_TIMEOUT_SECS: &str = "STATS_SETTLE_TIMEOUT_SECS";

const DEFAULT_API_URL: &str = "http://127.0.0.1:3113/api/";

#[derive(Debug, Clone, PartialEq)]
pub struct StatsConfig {
    /// Root of the stats API; endpoint paths are resolved beneath it
    pub api_url: Url,
    /// Assets with a price chart, in display order
    pub assets: Vec<AssetSymbol>,
    /// Timeout applied to each series request
    pub request_timeout: Duration,
    /// Look-back of the default window
    pub lookback: TimeDelta,
    /// Overall deadline for every series of a window to resolve
    pub settle_timeout: Duration,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            api_url: Url::parse(DEFAULT_API_URL).expect("default api url is valid"),
            assets: DEFAULT_ASSETS.iter().map(AssetSymbol::new).collect(),
            request_timeout: Duration::from_secs(10),
            lookback: TimeDelta::hours(DEFAULT_LOOKBACK_HOURS),
            settle_timeout: Duration::from_secs(30),
        }
    }
}

impl StatsConfig {
    /// Create a new configuration with a custom API root
    pub fn new(api_url: Url) -> Self {
        Self {
            api_url,
            ..Default::default()
        }
    }

    pub fn with_assets<Iter>(mut self, assets: Iter) -> Self
    where
        Iter: IntoIterator,
        Iter::Item: Into<AssetSymbol>,
    {
        self.assets = assets.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_lookback(mut self, lookback: TimeDelta) -> Self {
        self.lookback = lookback;
        self
    }

    pub fn with_settle_timeout(mut self, timeout: Duration) -> Self {
        self.settle_timeout = timeout;
        self
    }

    /// Build from process environment variables, falling back to defaults for unset ones.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let mut config = Self::default();

        if let Some(value) = lookup(ENV_API_URL) {
            config.api_url = Url::parse(value.trim())
                .map_err(|error| invalid(ENV_API_URL, &value, error.to_string()))?;
        }

        if let Some(value) = lookup(ENV_ASSETS) {
            let assets = value
                .split(',')
                .map(str::trim)
                .filter(|symbol| !symbol.is_empty())
                .map(AssetSymbol::new)
                .collect::<Vec<_>>();

            if assets.is_empty() {
                return Err(invalid(ENV_ASSETS, &value, "no asset symbols"));
            }
            config.assets = assets;
        }

        if let Some(value) = lookup(ENV_REQUEST_TIMEOUT_SECS) {
            let secs = parse_positive(ENV_REQUEST_TIMEOUT_SECS, &value)?;
            config.request_timeout = Duration::from_secs(secs);
        }

        if let Some(value) = lookup(ENV_LOOKBACK_HOURS) {
            let hours = parse_positive::<i64>(ENV_LOOKBACK_HOURS, &value)?;
            config.lookback = TimeDelta::try_hours(hours)
                .ok_or_else(|| invalid(ENV_LOOKBACK_HOURS, &value, "look-back too large"))?;
        }

        if let Some(value) = lookup(ENV_SETTLE_TIMEOUT_SECS) {
            let secs = parse_positive(ENV_SETTLE_TIMEOUT_SECS, &value)?;
            config.settle_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }
}

fn parse_positive<T>(key: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr + PartialOrd + Default,
    T::Err: std::fmt::Display,
{
    let parsed = value
        .trim()
        .parse::<T>()
        .map_err(|error| invalid(key, value, error.to_string()))?;

    if parsed > T::default() {
        Ok(parsed)
    } else {
        Err(invalid(key, value, "must be greater than zero"))
    }
}

fn invalid(key: &'static str, value: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key,
        value: value.to_string(),
        reason: reason.into(),
    }
}
