// src/core/config.rs

use std::sync::Arc;
use std::time::Duration;

use url::Url;

use crate::core::dns::{DnsResolver, HostResolver};

pub const DEFAULT_CONCURRENCY: usize = 10;
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Where provider requests are sent.
///
/// The default talks to the public provider hosts. `path_style` sends every
/// call to one base URL, addressing the bucket or account in the path; that is
/// what local mirrors and the tests use. Findings always carry the public
/// URLs regardless of routing.
#[derive(Debug, Clone, Default)]
pub struct Endpoints {
    base: Option<Url>,
}

impl Endpoints {
    pub fn path_style(base: Url) -> Self {
        Self { base: Some(base) }
    }

    fn base(&self) -> Option<&str> {
        self.base.as_ref().map(|u| u.as_str().trim_end_matches('/'))
    }

    /// Root of an S3 bucket, without a trailing slash.
    pub fn s3_bucket(&self, bucket: &str) -> String {
        match self.base() {
            Some(base) => format!("{base}/s3/{bucket}"),
            None => format!("https://{bucket}.s3.amazonaws.com"),
        }
    }

    /// GCS JSON API metadata resource for a bucket.
    pub fn gcs_bucket_metadata(&self, bucket: &str) -> String {
        match self.base() {
            Some(base) => format!("{base}/storage/v1/b/{bucket}"),
            None => format!("https://www.googleapis.com/storage/v1/b/{bucket}"),
        }
    }

    /// GCS public XML listing for a bucket.
    pub fn gcs_bucket_listing(&self, bucket: &str) -> String {
        match self.base() {
            Some(base) => format!("{base}/gcs/{bucket}"),
            None => format!("https://storage.googleapis.com/{bucket}"),
        }
    }

    /// Anonymous container listing for `container` under a storage account.
    pub fn azure_container_listing(&self, account: &str, container: &str) -> String {
        match self.base() {
            Some(base) => format!("{base}/{account}/{container}?restype=container&comp=list"),
            None => azure_container_url(account, container),
        }
    }
}

/// Public URL of an Azure container listing.
pub fn azure_container_url(account: &str, container: &str) -> String {
    format!("https://{account}.blob.core.windows.net/{container}?restype=container&comp=list")
}

/// Immutable scan settings, shared by reference across provider pipelines.
pub struct ScanConfig<R: HostResolver = DnsResolver> {
    pub candidates: Arc<[String]>,
    pub concurrency: usize,
    pub resolver: Arc<R>,
    /// Container names tried against every discovered storage account.
    /// Empty disables the container phase.
    pub container_wordlist: Arc<[String]>,
    pub endpoints: Endpoints,
    pub http_timeout: Duration,
    pub scan_timeout: Option<Duration>,
}

impl<R: HostResolver> ScanConfig<R> {
    pub fn new(candidates: Arc<[String]>, resolver: R) -> Self {
        Self {
            candidates,
            concurrency: DEFAULT_CONCURRENCY,
            resolver: Arc::new(resolver),
            container_wordlist: Arc::from(Vec::new()),
            endpoints: Endpoints::default(),
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            scan_timeout: None,
        }
    }

    /// Sets the worker-pool size; zero is raised to one.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_container_wordlist(mut self, words: Vec<String>) -> Self {
        self.container_wordlist = words.into();
        self
    }

    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    pub fn with_scan_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.scan_timeout = timeout;
        self
    }
}
