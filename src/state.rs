//! Application State
//!
//! Owns one instance of each component, built from a validated [`Config`]
//! over a single shared clock. The dialogue host holds an `AppState` for the
//! lifetime of the process and hands clones to its request handlers; tests
//! build isolated instances the same way.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::cache::{ResponseCache, TtlCache};
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::error::Result;
use crate::limiter::RateLimiter;
use crate::memory::ConversationMemory;

// == App State ==
/// Shared handles to the caching layer.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Facility responses keyed by handler-specific cache keys
    pub facility_cache: Arc<TtlCache<Value>>,
    /// Fallback LLM replies keyed by (language, message)
    pub responses: Arc<ResponseCache>,
    /// Per-user admission control
    pub limiter: Arc<RateLimiter>,
    /// Per-user conversational context
    pub memory: Arc<ConversationMemory<Value>>,
    /// Maximum concurrent units for batch lookups
    pub batch_max_workers: usize,
    clock: Arc<dyn Clock>,
}

// == Sweep Report ==
/// Entries removed by one active sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub facility_entries: usize,
    pub responses: usize,
    pub memories: usize,
    pub idle_subjects: usize,
}

impl SweepReport {
    pub fn total(&self) -> usize {
        self.facility_entries + self.responses + self.memories + self.idle_subjects
    }
}

impl AppState {
    // == Constructors ==
    /// Builds every component from `config`, sharing `clock`.
    ///
    /// # Errors
    /// Returns `Error::InvalidConfig` if any parameter is zero or a duration
    /// overflows in milliseconds.
    pub fn from_config(config: &Config, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            facility_cache: Arc::new(TtlCache::new(
                config.cache_ttl,
                config.cache_max_size,
                clock.clone(),
            )?),
            responses: Arc::new(ResponseCache::new(
                config.response_cache_size,
                config.response_cache_ttl,
                clock.clone(),
            )?),
            limiter: Arc::new(RateLimiter::new(
                config.rate_limit_requests,
                config.rate_limit_window,
                clock.clone(),
            )?),
            memory: Arc::new(ConversationMemory::new(config.memory_ttl, clock.clone())?),
            batch_max_workers: config.batch_max_workers,
            clock,
        })
    }

    /// Builds every component on the wall clock.
    pub fn with_system_clock(config: &Config) -> Result<Self> {
        Self::from_config(config, Arc::new(SystemClock))
    }

    // == Accessors ==
    /// The clock shared by all components.
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    // == Active Sweep ==
    /// Removes expired entries and idle subjects from every component.
    pub fn sweep_expired(&self) -> SweepReport {
        SweepReport {
            facility_entries: self.facility_cache.purge_expired(),
            responses: self.responses.purge_expired(),
            memories: self.memory.purge_expired(),
            idle_subjects: self.limiter.purge_idle(),
        }
    }
}
