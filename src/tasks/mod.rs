//! Background Tasks Module
//!
//! # Tasks
//! - Expiry sweep: optional active removal of expired entries at a fixed interval
//! - Fan-out: bounded parallel execution of independent lookups with per-unit outcomes

mod fan_out;
mod sweep;

pub use fan_out::{fan_out, UnitOutcome};
pub use sweep::spawn_sweep_task;
