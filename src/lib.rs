//! Campus Cache - in-process caching layer for a campus facility assistant
//!
//! Provides a TTL + LRU response cache, a per-user sliding-window rate
//! limiter, short-lived conversation memory and a hashed LLM reply cache,
//! all safe to share across request handlers.

pub mod api;
pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod limiter;
pub mod memory;
pub mod models;
pub mod state;
pub mod tasks;

pub use cache::{Language, ResponseCache, TtlCache};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use error::{Error, Result};
pub use limiter::RateLimiter;
pub use memory::ConversationMemory;
pub use state::AppState;
pub use tasks::{fan_out, spawn_sweep_task, UnitOutcome};
