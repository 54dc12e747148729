//! Response DTOs for the admin API
//!
//! Defines the structure of outgoing HTTP response bodies.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;

use crate::cache::{CacheStats, Language};

/// Counters for one cache, as reported by `GET /stats`
#[derive(Debug, Clone, Serialize)]
pub struct CacheStatsResponse {
    pub hits: u64,
    pub misses: u64,
    pub expirations: u64,
    pub evictions: u64,
    /// May include expired entries not yet read
    pub total_entries: usize,
    /// hits / (hits + misses)
    pub hit_rate: f64,
}

impl From<CacheStats> for CacheStatsResponse {
    fn from(stats: CacheStats) -> Self {
        Self {
            hit_rate: stats.hit_rate(),
            hits: stats.hits,
            misses: stats.misses,
            expirations: stats.expirations,
            evictions: stats.evictions,
            total_entries: stats.total_entries,
        }
    }
}

/// Rate limiter summary
#[derive(Debug, Clone, Serialize)]
pub struct LimiterStatsResponse {
    pub tracked_subjects: usize,
    pub max_requests: usize,
    pub window_secs: u64,
}

/// Conversation memory summary
#[derive(Debug, Clone, Serialize)]
pub struct MemoryStatsResponse {
    pub users: usize,
    pub ttl_secs: u64,
}

/// Response body for `GET /stats`
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub facility_cache: CacheStatsResponse,
    pub response_cache: CacheStatsResponse,
    pub rate_limiter: LimiterStatsResponse,
    pub memory: MemoryStatsResponse,
}

/// Response body for `GET /limits/:subject`
#[derive(Debug, Clone, Serialize)]
pub struct RemainingResponse {
    pub subject: String,
    pub remaining: usize,
    pub limit: usize,
}

/// Response body for `GET /memory/:user`
#[derive(Debug, Clone, Serialize)]
pub struct MemoryResponse {
    pub user: String,
    pub context: HashMap<String, Value>,
}

/// Response body for `POST /responses/lookup`
#[derive(Debug, Clone, Serialize)]
pub struct LookupResponse {
    pub language: Language,
    pub value: String,
}

/// Response body for clear/reset/forget operations
#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
