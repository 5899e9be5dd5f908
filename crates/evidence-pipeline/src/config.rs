use std::time::Duration;

use crate::error::AppError;

/// Application configuration loaded explicitly from environment variables.
///
/// Redis URL is optional; unset or empty means the cache is permanently
/// unavailable and every lookup degrades to a miss.
#[derive(Debug, Clone)]
pub struct Config {
    /// Redis connection URL (e.g. "redis://127.0.0.1:6379").
    pub redis_url: Option<String>,
    /// Upper bound on one external fetch call.
    pub fetch_timeout: Duration,
    /// Upper bound on one cache backend operation.
    pub cache_op_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Optional:
    /// - `REDIS_URL`: cache connection string (omit or leave empty to disable caching)
    /// - `FETCH_TIMEOUT_SECS`: external fetch bound, default 10
    /// - `CACHE_TIMEOUT_SECS`: cache operation bound, default 2
    pub fn from_env() -> Result<Self, AppError> {
        let redis_url = std::env::var("REDIS_URL")
            .ok()
            .filter(|s| !s.trim().is_empty());

        Ok(Self {
            redis_url,
            fetch_timeout: duration_from_env("FETCH_TIMEOUT_SECS", 10)?,
            cache_op_timeout: duration_from_env("CACHE_TIMEOUT_SECS", 2)?,
        })
    }
}

fn duration_from_env(name: &str, default_secs: u64) -> Result<Duration, AppError> {
    match std::env::var(name) {
        Err(_) => Ok(Duration::from_secs(default_secs)),
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|_| AppError::Config(format!("{name} must be an integer number of seconds, got {raw:?}"))),
    }
}
