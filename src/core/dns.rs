// src/core/dns.rs

use std::future::Future;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use hickory_resolver::TokioAsyncResolver;
use hickory_resolver::config::{NameServerConfigGroup, ResolverConfig, ResolverOpts};
use hickory_resolver::error::{ResolveError, ResolveErrorKind};
use hickory_resolver::proto::op::ResponseCode;
use tracing::{debug, warn};

use crate::core::errors::{Result, ScanError};

pub const DEFAULT_NAME_SERVER: &str = "1.1.1.1";
pub const DEFAULT_DNS_TIMEOUT: Duration = Duration::from_secs(10);

/// Outcome of a single hostname lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    Found,
    NotFound,
    /// The resolver gave up; the host may or may not exist.
    TimedOut,
}

/// The DNS existence-check capability consumed by the DNS-only probes.
pub trait HostResolver: Send + Sync + 'static {
    /// Resolves `host`. NXDOMAIN and timeouts are outcomes, any other
    /// resolver failure is an error.
    fn lookup(&self, host: &str) -> impl Future<Output = Result<Lookup>> + Send;
}

/// Resolves `host` and folds a timeout into "absent", logging a warning.
///
/// Results keep no trace of the timeout; only the log does.
pub async fn resolves<R: HostResolver>(resolver: &R, host: &str) -> Result<bool> {
    match resolver.lookup(host).await? {
        Lookup::Found => Ok(true),
        Lookup::NotFound => Ok(false),
        Lookup::TimedOut => {
            warn!(host, "DNS lookup timed out, treating host as absent.");
            Ok(false)
        }
    }
}

/// A hickory resolver pinned to a single nameserver.
pub struct DnsResolver {
    inner: TokioAsyncResolver,
    timeout: Duration,
}

impl DnsResolver {
    /// Builds a resolver that only talks to `name_server`.
    ///
    /// # Arguments
    /// * `name_server` - An IP address, optionally with a port (`9.9.9.9:53`).
    ///
    /// # Returns
    /// The resolver, or `ScanError::InvalidNameServer` when the address
    /// cannot be parsed.
    pub fn configure(name_server: &str) -> Result<Self> {
        Self::with_timeout(name_server, DEFAULT_DNS_TIMEOUT)
    }

    pub fn with_timeout(name_server: &str, timeout: Duration) -> Result<Self> {
        let addr = parse_name_server(name_server)?;
        let group = NameServerConfigGroup::from_ips_clear(&[addr.ip()], addr.port(), true);
        let config = ResolverConfig::from_parts(None, vec![], group);

        let mut opts = ResolverOpts::default();
        opts.timeout = timeout;
        opts.attempts = 1;

        debug!(name_server = %addr, timeout_secs = timeout.as_secs(), "Configured DNS resolver.");
        Ok(Self { inner: TokioAsyncResolver::tokio(config, opts), timeout })
    }
}

impl HostResolver for DnsResolver {
    async fn lookup(&self, host: &str) -> Result<Lookup> {
        // hickory has its own timeout; the outer one bounds retries over TCP fallback too.
        let lookup = match tokio::time::timeout(self.timeout, self.inner.lookup_ip(host)).await {
            Ok(lookup) => lookup,
            Err(_) => return Ok(Lookup::TimedOut),
        };

        match lookup {
            Ok(_) => Ok(Lookup::Found),
            Err(err) => classify(host, err),
        }
    }
}

/// Maps a hickory failure onto a lookup outcome.
///
/// Only NXDOMAIN means absent. An empty NOERROR answer, SERVFAIL or a
/// transport failure is a resolver error.
fn classify(host: &str, err: ResolveError) -> Result<Lookup> {
    let outcome = match err.kind() {
        ResolveErrorKind::NoRecordsFound { response_code, .. } if *response_code == ResponseCode::NXDomain => {
            Some(Lookup::NotFound)
        }
        ResolveErrorKind::Timeout => Some(Lookup::TimedOut),
        _ => None,
    };
    outcome.ok_or_else(|| ScanError::Dns { host: host.to_string(), source: err })
}

fn parse_name_server(name_server: &str) -> Result<SocketAddr> {
    let trimmed = name_server.trim();
    if let Ok(ip) = trimmed.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, 53));
    }
    trimmed
        .parse::<SocketAddr>()
        .map_err(|_| ScanError::InvalidNameServer(name_server.to_string()))
}
