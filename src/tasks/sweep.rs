//! Expiry Sweep Task
//!
//! Optional background task that actively removes expired cache entries,
//! memories and idle rate-limit subjects. Without it expiry stays lazy and
//! reported sizes may include dead entries.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::state::AppState;

/// Spawns a task that calls [`AppState::sweep_expired`] every
/// `interval_secs` seconds.
///
/// The returned handle should be aborted during shutdown.
///
/// # Example
/// ```ignore
/// let handle = spawn_sweep_task(state.clone(), 60);
/// // Later, during shutdown:
/// handle.abort();
/// ```
pub fn spawn_sweep_task(state: AppState, interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(interval_secs.max(1));

    tokio::spawn(async move {
        info!(interval_secs, "Starting expiry sweep task");

        loop {
            tokio::time::sleep(interval).await;

            // Each component takes its own lock; nothing is held across the await
            let report = state.sweep_expired();

            if report.total() > 0 {
                info!(
                    facility_entries = report.facility_entries,
                    responses = report.responses,
                    memories = report.memories,
                    idle_subjects = report.idle_subjects,
                    "Expiry sweep removed stale entries"
                );
            } else {
                debug!("Expiry sweep found nothing to remove");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::Config;
    use serde_json::json;
    use std::sync::Arc;

    fn state_with_clock() -> (AppState, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(0));
        let config = Config {
            cache_ttl: 1,
            ..Config::default()
        };
        let state = AppState::from_config(&config, clock.clone()).unwrap();
        (state, clock)
    }

    #[tokio::test]
    async fn test_sweep_task_removes_expired_entries() {
        let (state, clock) = state_with_clock();

        state.facility_cache.set("expire_soon", json!("value"));
        clock.advance_secs(2);

        let handle = spawn_sweep_task(state.clone(), 1);
        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert_eq!(state.facility_cache.len(), 0);
        handle.abort();
    }

    #[tokio::test]
    async fn test_sweep_task_preserves_valid_entries() {
        let (state, _clock) = state_with_clock();

        state.memory.remember("u1", "language", json!("zh"));
        state.facility_cache.set("long_lived", json!("value"));

        let handle = spawn_sweep_task(state.clone(), 1);
        tokio::time::sleep(Duration::from_millis(2500)).await;

        assert_eq!(state.facility_cache.get("long_lived"), Some(json!("value")));
        assert_eq!(state.memory.user_count(), 1);
        handle.abort();
    }

    #[tokio::test]
    async fn test_sweep_task_can_be_aborted() {
        let (state, _clock) = state_with_clock();

        let handle = spawn_sweep_task(state, 1);
        handle.abort();

        let result = handle.await;
        assert!(result.unwrap_err().is_cancelled());
    }
}
