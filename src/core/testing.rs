// src/core/testing.rs

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use hickory_resolver::error::ResolveError;

use crate::core::dns::{HostResolver, Lookup};
use crate::core::errors::{Result, ScanError};

/// Shared, ordered event log for trace assertions.
pub type Trace = Arc<Mutex<Vec<String>>>;

/// In-memory resolver: listed hosts resolve, listed failures error, the
/// rest are NXDOMAIN.
#[derive(Default)]
pub struct StubResolver {
    found: HashSet<String>,
    failing: HashSet<String>,
    delays: HashMap<String, Duration>,
    trace: Option<Trace>,
}

impl StubResolver {
    pub fn absent() -> Self {
        Self::default()
    }

    pub fn with_found<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { found: hosts.into_iter().map(Into::into).collect(), ..Default::default() }
    }

    pub fn failing(mut self, host: &str) -> Self {
        self.failing.insert(host.to_string());
        self
    }

    pub fn delayed(mut self, host: &str, delay: Duration) -> Self {
        self.delays.insert(host.to_string(), delay);
        self
    }

    /// Records `resolved:{host}` once each lookup completes.
    pub fn traced(mut self, trace: Trace) -> Self {
        self.trace = Some(trace);
        self
    }
}

impl HostResolver for StubResolver {
    async fn lookup(&self, host: &str) -> Result<Lookup> {
        if let Some(delay) = self.delays.get(host) {
            tokio::time::sleep(*delay).await;
        }
        if let Some(trace) = &self.trace {
            trace.lock().unwrap().push(format!("resolved:{host}"));
        }
        if self.failing.contains(host) {
            return Err(ScanError::Dns {
                host: host.to_string(),
                source: ResolveError::from("SERVFAIL"),
            });
        }
        if self.found.contains(host) {
            Ok(Lookup::Found)
        } else {
            Ok(Lookup::NotFound)
        }
    }
}
