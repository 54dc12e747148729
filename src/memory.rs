//! Conversation Memory Module
//!
//! Short-lived per-user key/value store used to personalize replies across
//! turns. Every entry ages on its own clock, so a user's older facts can
//! expire while newer ones stay.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::cache::CacheEntry;
use crate::clock::{secs_to_ms, Clock};
use crate::error::Result;

/// Keys the facility handlers store per user.
pub mod keys {
    /// Facility type of the user's most recent lookup
    pub const LAST_FACILITY_TYPE: &str = "last_facility_type";
    /// Facility type the user asks for most
    pub const PREFERRED_FACILITY_TYPE: &str = "preferred_facility_type";
    /// Reply language the user last wrote in
    pub const LANGUAGE: &str = "language";
}

type UserEntries<V> = HashMap<String, CacheEntry<V>>;

// == Conversation Memory ==
/// Thread-safe per-user memory with per-entry TTL.
#[derive(Debug)]
pub struct ConversationMemory<V> {
    users: Mutex<HashMap<String, UserEntries<V>>>,
    ttl_ms: u64,
    clock: Arc<dyn Clock>,
}

impl<V: Clone> ConversationMemory<V> {
    // == Constructor ==
    /// Creates a memory whose entries live `ttl_secs` after being stored.
    ///
    /// # Errors
    /// Returns `Error::InvalidConfig` if `ttl_secs` is zero or overflows in
    /// milliseconds.
    pub fn new(ttl_secs: u64, clock: Arc<dyn Clock>) -> Result<Self> {
        let ttl_ms = secs_to_ms("ttl_secs", ttl_secs)?;

        Ok(Self {
            users: Mutex::new(HashMap::new()),
            ttl_ms,
            clock,
        })
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, UserEntries<V>>> {
        self.users.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // == Remember ==
    /// Stores `value` under `key` for `user`, restarting that entry's TTL.
    pub fn remember(&self, user: &str, key: &str, value: V) {
        let now = self.clock.now_ms();
        self.lock()
            .entry(user.to_string())
            .or_default()
            .insert(key.to_string(), CacheEntry::new(value, now));
        debug!(user, key, "Remembered");
    }

    // == Recall ==
    /// Returns the live value for `(user, key)`, deleting it if expired.
    pub fn recall_opt(&self, user: &str, key: &str) -> Option<V> {
        let now = self.clock.now_ms();
        let mut users = self.lock();
        let entries = users.get_mut(user)?;

        let expired = entries.get(key)?.is_expired(now, self.ttl_ms);
        if expired {
            entries.remove(key);
            if entries.is_empty() {
                users.remove(user);
            }
            debug!(user, key, "Memory expired");
            return None;
        }

        entries.get(key).map(|entry| entry.value.clone())
    }

    /// Like [`recall_opt`](Self::recall_opt), falling back to `default`.
    pub fn recall(&self, user: &str, key: &str, default: V) -> V {
        self.recall_opt(user, key).unwrap_or(default)
    }

    // == Forget ==
    /// Deletes one entry, or everything stored for `user` when `key` is `None`.
    pub fn forget(&self, user: &str, key: Option<&str>) {
        let mut users = self.lock();
        match key {
            Some(key) => {
                if let Some(entries) = users.get_mut(user) {
                    entries.remove(key);
                    if entries.is_empty() {
                        users.remove(user);
                    }
                }
                debug!(user, key, "Forgot");
            }
            None => {
                users.remove(user);
                debug!(user, "Forgot all memories");
            }
        }
    }

    // == User Context ==
    /// Returns every unexpired entry for `user`. Expired entries found along
    /// the way are deleted.
    pub fn user_context(&self, user: &str) -> HashMap<String, V> {
        let now = self.clock.now_ms();
        let mut users = self.lock();
        let Some(entries) = users.get_mut(user) else {
            return HashMap::new();
        };

        entries.retain(|_, entry| !entry.is_expired(now, self.ttl_ms));
        let context: HashMap<String, V> = entries
            .iter()
            .map(|(key, entry)| (key.clone(), entry.value.clone()))
            .collect();

        if entries.is_empty() {
            users.remove(user);
        }
        context
    }

    // == Purge Expired ==
    /// Removes expired entries for all users. Returns the number removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now_ms();
        let mut users = self.lock();
        let mut removed = 0;

        users.retain(|_, entries| {
            let before = entries.len();
            entries.retain(|_, entry| !entry.is_expired(now, self.ttl_ms));
            removed += before - entries.len();
            !entries.is_empty()
        });
        removed
    }

    /// Number of users with at least one stored entry.
    pub fn user_count(&self) -> usize {
        self.lock().len()
    }

    pub fn ttl_secs(&self) -> u64 {
        self.ttl_ms / 1000
    }
}
