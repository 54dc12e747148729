//! Parallel Fan-out
//!
//! Runs independent units of work concurrently (e.g. one lookup per facility
//! type in a batch query) and collects every outcome, failures included, in
//! the order the units finish.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::{AbortHandle, JoinSet};
use tracing::warn;

// == Unit Outcome ==
/// Result of one unit of a fan-out.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UnitOutcome<K, T> {
    Completed { unit: K, value: T },
    Failed { unit: K, error: String },
}

impl<K, T> UnitOutcome<K, T> {
    pub fn unit(&self) -> &K {
        match self {
            UnitOutcome::Completed { unit, .. } | UnitOutcome::Failed { unit, .. } => unit,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, UnitOutcome::Completed { .. })
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            UnitOutcome::Completed { value, .. } => Some(value),
            UnitOutcome::Failed { .. } => None,
        }
    }
}

// == Fan Out ==
/// Runs `work` once per unit with at most `max_workers` in flight.
///
/// Every unit produces exactly one outcome. An `Err` or a panic inside
/// `work` becomes [`UnitOutcome::Failed`] for that unit only. Outcomes are
/// returned in completion order, not submission order. A `max_workers` of 0
/// is treated as 1.
///
/// Dropping the returned future cancels every unit, including ones already
/// running.
pub async fn fan_out<K, T, E, F, Fut>(
    units: Vec<K>,
    max_workers: usize,
    work: F,
) -> Vec<UnitOutcome<K, T>>
where
    K: Display + Clone + Send + 'static,
    T: Send + 'static,
    E: Display + Send + 'static,
    F: Fn(K) -> Fut,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
{
    let permits = Arc::new(Semaphore::new(max_workers.max(1)));
    let mut set = JoinSet::new();

    for unit in units {
        let permits = Arc::clone(&permits);
        let job = work(unit.clone());

        set.spawn(async move {
            // Never closed, so the permit is always granted
            let _permit = permits.acquire_owned().await;

            // Run the unit in its own task so a panic is caught as a JoinError
            let handle = tokio::spawn(job);
            let _guard = AbortOnDrop(handle.abort_handle());

            match handle.await {
                Ok(Ok(value)) => UnitOutcome::Completed { unit, value },
                Ok(Err(err)) => UnitOutcome::Failed {
                    unit,
                    error: err.to_string(),
                },
                Err(join_err) => UnitOutcome::Failed {
                    unit,
                    error: join_err.to_string(),
                },
            }
        });
    }

    let mut outcomes = Vec::with_capacity(set.len());
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(outcome) => {
                if let UnitOutcome::Failed { unit, error } = &outcome {
                    warn!(%unit, %error, "Batch unit failed");
                }
                outcomes.push(outcome);
            }
            // Only reachable if the wrapper itself was cancelled
            Err(join_err) => warn!(error = %join_err, "Batch unit wrapper did not finish"),
        }
    }
    outcomes
}

/// Aborts a unit task when its wrapper is dropped before the unit finishes.
struct AbortOnDrop(AbortHandle);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}
