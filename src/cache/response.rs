//! Response Cache Module
//!
//! Caches fallback LLM replies keyed by a SHA-256 digest of the language tag
//! and the normalized user message. Eviction is strict LRU over an explicit
//! recency order, so an old entry that keeps getting hit outlives newer ones
//! that nobody reads.

use std::fmt;
use std::num::NonZeroUsize;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use lru::LruCache;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::cache::{CacheEntry, CacheStats};
use crate::clock::{secs_to_ms, Clock};
use crate::error::{Error, Result};

// == Language ==
/// Reply language understood by the assistant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Zh,
    En,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Zh => "zh",
            Language::En => "en",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = Error;

    /// Parses `zh`/`en` in any case, including regional tags like `zh-TW`.
    fn from_str(s: &str) -> Result<Self> {
        let tag = s.trim().to_ascii_lowercase();
        let primary = tag.split(['-', '_']).next().unwrap_or_default();
        match primary {
            "zh" => Ok(Language::Zh),
            "en" => Ok(Language::En),
            _ => Err(Error::InvalidLanguage(s.to_string())),
        }
    }
}

// == Cache State ==
struct ResponseState {
    /// Front = most recently used, back = next to evict
    entries: LruCache<String, CacheEntry<String>>,
    stats: CacheStats,
}

// == Response Cache ==
/// Thread-safe LRU cache of fallback replies with TTL expiry.
pub struct ResponseCache {
    state: Mutex<ResponseState>,
    ttl_ms: u64,
    max_size: usize,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseCache")
            .field("ttl_ms", &self.ttl_ms)
            .field("max_size", &self.max_size)
            .finish_non_exhaustive()
    }
}

impl ResponseCache {
    // == Constructor ==
    /// Creates a response cache of `max_size` entries living `ttl_secs` each.
    ///
    /// # Errors
    /// Returns `Error::InvalidConfig` if either parameter is zero or the TTL
    /// overflows in milliseconds.
    pub fn new(max_size: usize, ttl_secs: u64, clock: Arc<dyn Clock>) -> Result<Self> {
        let capacity =
            NonZeroUsize::new(max_size).ok_or_else(|| Error::non_positive("max_size"))?;
        let ttl_ms = secs_to_ms("ttl_secs", ttl_secs)?;

        Ok(Self {
            state: Mutex::new(ResponseState {
                entries: LruCache::new(capacity),
                stats: CacheStats::new(),
            }),
            ttl_ms,
            max_size,
            clock,
        })
    }

    fn lock(&self) -> MutexGuard<'_, ResponseState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // == Cache Key ==
    /// Hex SHA-256 of `"{language}:{message}"` after trimming and lowercasing
    /// the message.
    pub fn cache_key(message: &str, language: Language) -> String {
        let normalized = message.trim().to_lowercase();
        let mut hasher = Sha256::new();
        hasher.update(language.as_str().as_bytes());
        hasher.update(b":");
        hasher.update(normalized.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    // == Get ==
    /// Returns the cached reply for `message` if present and not expired,
    /// marking it most recently used.
    pub fn get(&self, message: &str, language: Language) -> Option<String> {
        let key = Self::cache_key(message, language);
        let now = self.clock.now_ms();
        let mut guard = self.lock();
        let state = &mut *guard;

        let expired = state
            .entries
            .peek(&key)
            .map(|entry| entry.is_expired(now, self.ttl_ms));

        match expired {
            None => {
                state.stats.record_miss();
                None
            }
            Some(true) => {
                state.entries.pop(&key);
                state.stats.record_expiration();
                state.stats.record_miss();
                debug!(key = %&key[..8], %language, "Response cache entry expired");
                None
            }
            Some(false) => {
                state.stats.record_hit();
                state.entries.get(&key).map(|entry| entry.value.clone())
            }
        }
    }

    // == Set ==
    /// Stores `value` as the reply for `message`, evicting the least
    /// recently used entry if a new key would exceed capacity.
    pub fn set(&self, message: &str, language: Language, value: impl Into<String>) {
        let key = Self::cache_key(message, language);
        let now = self.clock.now_ms();
        let mut state = self.lock();

        let displaced = state
            .entries
            .push(key.clone(), CacheEntry::new(value.into(), now));
        if let Some((old_key, _)) = displaced {
            if old_key != key {
                state.stats.record_eviction();
                debug!(key = %&old_key[..8], "Evicted least recently used response");
            }
        }
    }

    // == Clear ==
    pub fn clear(&self) {
        let mut state = self.lock();
        let cleared = state.entries.len();
        state.entries.clear();
        info!(cleared, "Response cache cleared");
    }

    // == Purge Expired ==
    /// Removes all expired replies. Returns the number removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now_ms();
        let mut guard = self.lock();
        let state = &mut *guard;

        let expired: Vec<String> = state
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now, self.ttl_ms))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            state.entries.pop(key);
            state.stats.record_expiration();
        }
        expired.len()
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.lock();
        let mut stats = state.stats.clone();
        stats.set_total_entries(state.entries.len());
        stats
    }

    /// Number of stored replies, including expired ones not yet read.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }
}
