//! Configuration Module
//!
//! Loads cache, rate-limit and memory parameters from environment variables.

use std::env;
use std::str::FromStr;

use crate::clock::secs_to_ms;
use crate::error::{Error, Result};

/// Runtime configuration for every component of the caching layer.
///
/// All values can be configured via environment variables with defaults
/// matching the production deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Facility response cache TTL in seconds
    pub cache_ttl: u64,
    /// Maximum entries in the facility response cache
    pub cache_max_size: usize,
    /// Requests admitted per subject per window
    pub rate_limit_requests: usize,
    /// Rate limit window in seconds
    pub rate_limit_window: u64,
    /// Conversation memory entry TTL in seconds
    pub memory_ttl: u64,
    /// Maximum entries in the fallback response cache
    pub response_cache_size: usize,
    /// Fallback response cache TTL in seconds
    pub response_cache_ttl: u64,
    /// Concurrent units in a batch facility lookup
    pub batch_max_workers: usize,
    /// Active expiry sweep interval in seconds, 0 = lazy expiry only.
    ///
    /// With lazy expiry alone, rate-limit subjects and memory users are
    /// never dropped from their maps unless reset or forgotten, so both grow
    /// with the number of distinct users seen. Enable the sweep to reclaim
    /// them.
    pub sweep_interval: u64,
    /// HTTP port for the admin API
    pub server_port: u16,
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_TTL` - Facility cache TTL in seconds (default: 300)
    /// - `MAX_CACHE_SIZE` - Facility cache capacity (default: 1000)
    /// - `RATE_LIMIT_REQUESTS` - Requests per window (default: 100)
    /// - `RATE_LIMIT_WINDOW` - Window in seconds (default: 60)
    /// - `MEMORY_TTL` - Conversation memory TTL in seconds (default: 3600)
    /// - `RESPONSE_CACHE_SIZE` - Fallback reply cache capacity (default: 100)
    /// - `RESPONSE_CACHE_TTL` - Fallback reply TTL in seconds (default: 3600)
    /// - `BATCH_MAX_WORKERS` - Batch lookup concurrency (default: 3)
    /// - `SWEEP_INTERVAL` - Active expiry interval in seconds (default: 0, off;
    ///   idle limiter subjects and memory users are only reclaimed when set)
    /// - `SERVER_PORT` - Admin API port (default: 3000)
    ///
    /// Unparseable values fall back to the default; zeros are caught by
    /// [`Config::validate`].
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            cache_ttl: env_or("CACHE_TTL", defaults.cache_ttl),
            cache_max_size: env_or("MAX_CACHE_SIZE", defaults.cache_max_size),
            rate_limit_requests: env_or("RATE_LIMIT_REQUESTS", defaults.rate_limit_requests),
            rate_limit_window: env_or("RATE_LIMIT_WINDOW", defaults.rate_limit_window),
            memory_ttl: env_or("MEMORY_TTL", defaults.memory_ttl),
            response_cache_size: env_or("RESPONSE_CACHE_SIZE", defaults.response_cache_size),
            response_cache_ttl: env_or("RESPONSE_CACHE_TTL", defaults.response_cache_ttl),
            batch_max_workers: env_or("BATCH_MAX_WORKERS", defaults.batch_max_workers),
            sweep_interval: env_or("SWEEP_INTERVAL", defaults.sweep_interval),
            server_port: env_or("SERVER_PORT", defaults.server_port),
        }
    }

    /// Checks that every component parameter is positive and that every
    /// duration fits in milliseconds.
    ///
    /// # Errors
    /// Returns `Error::InvalidConfig` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        let durations = [
            ("cache_ttl", self.cache_ttl),
            ("rate_limit_window", self.rate_limit_window),
            ("memory_ttl", self.memory_ttl),
            ("response_cache_ttl", self.response_cache_ttl),
        ];
        for (field, secs) in durations {
            secs_to_ms(field, secs)?;
        }

        let counts = [
            ("cache_max_size", self.cache_max_size),
            ("rate_limit_requests", self.rate_limit_requests),
            ("response_cache_size", self.response_cache_size),
            ("batch_max_workers", self.batch_max_workers),
        ];
        match counts.iter().find(|(_, value)| *value == 0) {
            Some((field, _)) => Err(Error::non_positive(field)),
            None => Ok(()),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_ttl: 300,
            cache_max_size: 1000,
            rate_limit_requests: 100,
            rate_limit_window: 60,
            memory_ttl: 3600,
            response_cache_size: 100,
            response_cache_ttl: 3600,
            batch_max_workers: 3,
            sweep_interval: 0,
            server_port: 3000,
        }
    }
}
