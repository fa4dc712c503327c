//! Poll-until-terminal driver.
//!
//! Checks a query's status at a constant interval until the engine reports a
//! terminal status or the local timeout passes. Timing out only stops the
//! wait; the remote query keeps running until it finishes or someone cancels
//! it on the engine side.
//!
//! The wait is a plain future. Dropping it (for example from a
//! `tokio::select!` against a cancellation token) stops polling immediately.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::athena::{EngineStatus, ExecutionHandle, ExecutionState, QueryEngine};
use crate::error::Result;

/// Timeout used when the caller does not give one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(180);

/// Delay between status checks used when the caller does not give one.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Drives one handle to a terminal state.
pub struct QueryPoller<'a> {
    engine: &'a dyn QueryEngine,
    interval: Duration,
}

impl<'a> QueryPoller<'a> {
    /// Creates a poller that checks every `interval`.
    pub fn new(engine: &'a dyn QueryEngine, interval: Duration) -> Self {
        Self { engine, interval }
    }

    /// Creates a poller with the default one-second interval.
    pub fn with_default_interval(engine: &'a dyn QueryEngine) -> Self {
        Self::new(engine, DEFAULT_POLL_INTERVAL)
    }

    /// Polls until the query succeeds, fails, is cancelled, or `timeout` passes.
    ///
    /// Elapsed time is measured from submission. A query that has already
    /// succeeded on the first check returns without sleeping. Errors are only
    /// returned when a status request itself fails.
    pub async fn await_completion(
        &self,
        handle: &mut ExecutionHandle,
        timeout: Duration,
    ) -> Result<ExecutionState> {
        if handle.state().is_terminal() {
            return Ok(handle.state().clone());
        }

        let mut checks: u32 = 0;
        loop {
            let status = self.engine.status(handle.query_id()).await?;
            checks += 1;

            let next = match status {
                EngineStatus::Succeeded => Some(ExecutionState::Succeeded),
                EngineStatus::Failed(reason) => Some(ExecutionState::Failed(reason)),
                EngineStatus::Cancelled(reason) => Some(ExecutionState::Cancelled(reason)),
                EngineStatus::Queued | EngineStatus::Running => {
                    let elapsed = handle.elapsed();
                    (elapsed > timeout).then_some(ExecutionState::TimedOut(elapsed))
                }
            };

            if let Some(state) = next {
                match &state {
                    ExecutionState::TimedOut(elapsed) => warn!(
                        "Query {} still running after {:?}; no longer waiting",
                        handle.query_id(),
                        elapsed
                    ),
                    _ => info!(
                        "Query {} finished as {} after {} check(s)",
                        handle.query_id(),
                        state,
                        checks
                    ),
                }
                handle.transition(state.clone());
                return Ok(state);
            }

            debug!(
                "Query {} not finished (check {}), sleeping {:?}",
                handle.query_id(),
                checks,
                self.interval
            );
            tokio::time::sleep(self.interval).await;
        }
    }
}
