//! Engine configuration.
//!
//! Loaded from TOML; every field has a default so an empty file is valid.
//!
//! ```toml
//! provider_timeout_ms = 5000
//! resolution_deadline_ms = 20000
//! race_top_k = 2
//!
//! [[priorities.standings]]
//! provider = "espn"
//! extra_attempts = 1
//! ```
//!
//! `COURTSIDE_*` environment variables override file values.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{CoreError, LeagueClock, PriorityTable};

pub const ENV_PROVIDER_TIMEOUT_MS: &str = "COURTSIDE_PROVIDER_TIMEOUT_MS";
pub const ENV_RESOLUTION_DEADLINE_MS: &str = "COURTSIDE_RESOLUTION_DEADLINE_MS";
pub const ENV_MAX_LOOKBACK_DAYS: &str = "COURTSIDE_MAX_LOOKBACK_DAYS";
pub const ENV_RACE_TOP_K: &str = "COURTSIDE_RACE_TOP_K";
pub const ENV_CACHE_TTL_SECS: &str = "COURTSIDE_CACHE_TTL_SECS";
pub const ENV_BALLDONTLIE_API_KEY: &str = "COURTSIDE_BALLDONTLIE_API_KEY";
const ENV_BALLDONTLIE_API_KEY_FALLBACK: &str = "BALLDONTLIE_API_KEY";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Upper bound for a single provider attempt.
    pub provider_timeout_ms: u64,
    /// Upper bound for a whole resolution, across all providers.
    pub resolution_deadline_ms: u64,
    pub max_lookback_days: u32,
    pub league_utc_offset_hours: i8,
    /// Providers raced concurrently at the head of each chain; 0 or 1 means
    /// strictly sequential.
    pub race_top_k: usize,
    /// 0 disables the result cache.
    pub cache_ttl_secs: u64,
    /// Base delay between attempts against the same provider; 0 disables.
    pub retry_backoff_ms: u64,
    #[serde(skip_serializing)]
    pub balldontlie_api_key: Option<String>,
    pub priorities: PriorityTable,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            provider_timeout_ms: 8_000,
            resolution_deadline_ms: 25_000,
            max_lookback_days: 30,
            league_utc_offset_hours: -5,
            race_top_k: 0,
            cache_ttl_secs: 0,
            retry_backoff_ms: 0,
            balldontlie_api_key: None,
            priorities: PriorityTable::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self, CoreError> {
        let config: Self = toml::from_str(contents)?;
        config.validated()
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Applies `COURTSIDE_*` overrides from the process environment.
    pub fn with_env_overrides(self) -> Result<Self, CoreError> {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Applies overrides read through `lookup`.
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Result<Self, CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = parse_override(&lookup, ENV_PROVIDER_TIMEOUT_MS)? {
            self.provider_timeout_ms = value;
        }
        if let Some(value) = parse_override(&lookup, ENV_RESOLUTION_DEADLINE_MS)? {
            self.resolution_deadline_ms = value;
        }
        if let Some(value) = parse_override(&lookup, ENV_MAX_LOOKBACK_DAYS)? {
            self.max_lookback_days = value;
        }
        if let Some(value) = parse_override(&lookup, ENV_RACE_TOP_K)? {
            self.race_top_k = value;
        }
        if let Some(value) = parse_override(&lookup, ENV_CACHE_TTL_SECS)? {
            self.cache_ttl_secs = value;
        }
        if let Some(key) = lookup(ENV_BALLDONTLIE_API_KEY)
            .or_else(|| lookup(ENV_BALLDONTLIE_API_KEY_FALLBACK))
            .filter(|key| !key.trim().is_empty())
        {
            self.balldontlie_api_key = Some(key.trim().to_owned());
        }
        self.validated()
    }

    pub fn with_priorities(mut self, priorities: PriorityTable) -> Self {
        self.priorities = priorities.normalized();
        self
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_millis(self.provider_timeout_ms)
    }

    pub fn resolution_deadline(&self) -> Duration {
        Duration::from_millis(self.resolution_deadline_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn clock(&self) -> Result<LeagueClock, CoreError> {
        Ok(LeagueClock::fixed(self.league_utc_offset_hours)?)
    }

    fn validated(mut self) -> Result<Self, CoreError> {
        if self.provider_timeout_ms == 0 {
            return Err(CoreError::Config(String::from(
                "provider_timeout_ms must be greater than zero",
            )));
        }
        if self.resolution_deadline_ms == 0 {
            return Err(CoreError::Config(String::from(
                "resolution_deadline_ms must be greater than zero",
            )));
        }
        if self.max_lookback_days == 0 {
            return Err(CoreError::Config(String::from(
                "max_lookback_days must be at least 1",
            )));
        }
        self.clock()?;
        self.priorities = self.priorities.normalized();
        Ok(self)
    }
}

fn parse_override<F, T>(lookup: &F, key: &str) -> Result<Option<T>, CoreError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| CoreError::Config(format!("{key} must be a non-negative integer, got '{raw}'"))),
    }
}
