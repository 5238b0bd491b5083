// src/core/scanner/aggregator.rs

use tokio::sync::mpsc;
use tracing::debug;

use crate::core::models::ProbeResult;

/// Collects findings from every provider pipeline in completion order.
///
/// Pipelines hold a cloned `ResultSink`; collection ends once every sink has
/// been dropped.
pub struct ResultAggregator {
    rx: mpsc::UnboundedReceiver<ProbeResult>,
}

/// Sending half handed to provider pipelines.
#[derive(Clone)]
pub struct ResultSink {
    tx: mpsc::UnboundedSender<ProbeResult>,
}

impl ResultAggregator {
    pub fn channel() -> (Self, ResultSink) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { rx }, ResultSink { tx })
    }

    /// Drains findings until all sinks are gone, calling `on_result` for each
    /// one as it arrives.
    pub async fn collect<F>(mut self, mut on_result: F) -> Vec<ProbeResult>
    where
        F: FnMut(&ProbeResult),
    {
        let mut results = Vec::new();
        while let Some(result) = self.rx.recv().await {
            on_result(&result);
            results.push(result);
        }
        debug!(count = results.len(), "All result sinks closed.");
        results
    }
}

impl ResultSink {
    pub fn send(&self, result: ProbeResult) {
        if self.tx.send(result).is_err() {
            debug!("Aggregator already closed, dropping result.");
        }
    }
}
