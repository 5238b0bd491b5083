// src/core/scanner/pool.rs

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::core::errors::{Result, ScanError};
use crate::core::models::ProbeResult;
use crate::core::scanner::aggregator::ResultSink;

/// What a single probe task hands back: a finding, nothing, or a failure.
pub type TaskOutcome = Result<Option<ProbeResult>>;

/// Counters for one completed phase.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PhaseSummary {
    pub submitted: usize,
    pub found: usize,
    pub failed: usize,
    pub cancelled: usize,
}

/// A bounded worker pool owned by one provider scan.
///
/// Every task of a phase is spawned up front and waits on a semaphore permit,
/// so at most `concurrency` probes are in flight. `run_phase` only returns
/// once every task of the phase has been joined, which is the barrier later
/// phases rely on.
pub struct TaskPool {
    permits: Arc<Semaphore>,
    deadline: Option<Instant>,
}

impl TaskPool {
    pub fn new(concurrency: usize, deadline: Option<Instant>) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(concurrency.max(1))),
            deadline,
        }
    }

    fn expired(&self) -> bool {
        self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// Runs `task` over every item and forwards findings to `sink` as tasks finish.
    ///
    /// Failures and panics are logged here and never reach sibling tasks.
    /// When the scan deadline passes, outstanding tasks are aborted and the
    /// findings gathered so far are kept.
    ///
    /// # Arguments
    /// * `phase` - Name used in log lines.
    /// * `items` - One task is spawned per item.
    /// * `sink` - Receives every finding.
    /// * `task` - Builds the probe future for an item.
    pub async fn run_phase<I, F, Fut>(&self, phase: &'static str, items: I, sink: &ResultSink, mut task: F) -> PhaseSummary
    where
        I: IntoIterator,
        F: FnMut(I::Item) -> Fut,
        Fut: Future<Output = TaskOutcome> + Send + 'static,
    {
        let mut summary = PhaseSummary::default();
        if self.expired() {
            warn!(phase, "Scan deadline already reached, skipping phase.");
            return summary;
        }

        info!(phase, "Starting phase.");
        let mut tasks = JoinSet::new();
        for item in items {
            let permits = Arc::clone(&self.permits);
            let probe = task(item);
            tasks.spawn(async move {
                let _permit = permits.acquire_owned().await.map_err(|_| ScanError::PoolClosed)?;
                probe.await
            });
            summary.submitted += 1;
        }

        let mut aborted = false;
        loop {
            let next = match self.deadline {
                Some(deadline) if !aborted => {
                    match tokio::time::timeout_at(deadline, tasks.join_next()).await {
                        Ok(next) => next,
                        Err(_) => {
                            warn!(phase, remaining = tasks.len(), "Scan deadline reached, cancelling outstanding tasks.");
                            tasks.abort_all();
                            aborted = true;
                            continue;
                        }
                    }
                }
                _ => tasks.join_next().await,
            };
            let Some(joined) = next else { break };

            match joined {
                Ok(Ok(Some(result))) => {
                    summary.found += 1;
                    sink.send(result);
                }
                Ok(Ok(None)) => {}
                Ok(Err(e)) => {
                    summary.failed += 1;
                    warn!(phase, error = %e, "Probe task failed.");
                }
                Err(e) if e.is_cancelled() => summary.cancelled += 1,
                Err(e) => {
                    summary.failed += 1;
                    error!(phase, error = %e, "Probe task panicked.");
                }
            }
        }

        info!(
            phase,
            submitted = summary.submitted,
            found = summary.found,
            failed = summary.failed,
            cancelled = summary.cancelled,
            "Phase finished."
        );
        summary
    }
}
