//! API Module
//!
//! Admin HTTP surface for operators: health, statistics, cache clearing,
//! rate-limit inspection and reset, and conversation memory inspection.
//! The dialogue host talks to the components in-process, not through here.

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
