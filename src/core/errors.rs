// src/core/errors.rs

use hickory_resolver::error::ResolveError;
use thiserror::Error;

/// Failures raised while scanning.
///
/// Absence and permission denial are not errors: probes report them as
/// `Ok(None)` and `false` respectively. Everything here is either a
/// transient per-task failure, logged at the task boundary, or a setup
/// failure that aborts a single provider's scan.
#[derive(Error, Debug)]
pub enum ScanError {
    /// The provider's anonymous client could not be built. Fatal for that provider.
    #[error("failed to build anonymous {provider} client: {source}")]
    ClientSetup {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("invalid nameserver '{0}'")]
    InvalidNameServer(String),

    /// Resolver failure other than NXDOMAIN or a timeout.
    #[error("DNS lookup for {host} failed: {source}")]
    Dns {
        host: String,
        #[source]
        source: ResolveError,
    },

    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("malformed response from {url}: {reason}")]
    MalformedResponse { url: String, reason: String },

    #[error("worker pool closed")]
    PoolClosed,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ScanError>;
