// src/core/scanner/aws_scanner.rs

use std::sync::{Arc, Mutex};

use chrono::Utc;
use reqwest::{Client, RequestBuilder};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::core::config::{Endpoints, ScanConfig};
use crate::core::dns::{resolves, HostResolver};
use crate::core::errors::Result;
use crate::core::http::{anonymous_client, list_bucket_files};
use crate::core::models::{PermissionSet, Platform, ProbeResult, S3Permissions, Service};
use crate::core::scanner::aggregator::ResultSink;
use crate::core::scanner::pool::{TaskOutcome, TaskPool};

/// Public hostname of an S3 bucket.
pub fn s3_bucket_host(bucket: &str) -> String {
    format!("{bucket}.s3.amazonaws.com")
}

/// Public hostname of an AWS apps portal.
pub fn aws_apps_host(name: &str) -> String {
    format!("{name}.awsapps.com")
}

/// Probes S3 buckets and AWS apps portals without credentials.
///
/// The HTTP client is built once per scan and shared by every task.
pub struct S3BucketsScanner<R> {
    client: Client,
    endpoints: Endpoints,
    resolver: Arc<R>,
    /// Pending write-check marker deletions, drained by `finish_cleanups`.
    cleanups: Mutex<JoinSet<()>>,
}

impl<R: HostResolver> S3BucketsScanner<R> {
    pub fn new(config: &ScanConfig<R>) -> Result<Self> {
        Ok(Self {
            client: anonymous_client("S3", config.http_timeout)?,
            endpoints: config.endpoints.clone(),
            resolver: Arc::clone(&config.resolver),
            cleanups: Mutex::new(JoinSet::new()),
        })
    }

    /// DNS-only check for `{candidate}.awsapps.com`.
    pub async fn scan_aws_apps(&self, candidate: &str) -> TaskOutcome {
        let host = aws_apps_host(candidate);
        if resolves(&*self.resolver, &host).await? {
            info!(host = %host, "AWS apps portal found.");
            return Ok(Some(ProbeResult::service_found(Platform::Aws, Service::AwsApps, host)));
        }
        debug!(host = %host, "AWS apps portal absent.");
        Ok(None)
    }

    /// Checks that the bucket exists, then probes its four anonymous
    /// capabilities and lists whatever is publicly visible.
    ///
    /// WARNING: the ACL-write check really sets the bucket ACL to
    /// `public-read` when it succeeds. That check alters the target.
    pub async fn scan_bucket(&self, candidate: &str) -> TaskOutcome {
        let base = self.endpoints.s3_bucket(candidate);
        if !self.bucket_exists(&base).await {
            debug!(candidate, "S3 bucket absent.");
            return Ok(None);
        }

        let (readable, writeable, acp_readable, acp_writeable) = tokio::join!(
            self.check_read_permission(&base),
            self.check_write_permission(&base),
            self.check_read_acl_permission(&base),
            self.check_write_acl_permission(&base),
        );

        let host = s3_bucket_host(candidate);
        let files = list_bucket_files(
            &self.client,
            &format!("{base}?list-type=2"),
            &format!("https://{host}"),
        )
        .await;

        info!(bucket = %host, readable, writeable, files = files.len(), "S3 bucket found.");
        Ok(Some(ProbeResult::BucketFound {
            platform: Platform::Aws,
            service: Service::S3,
            bucket_url: host,
            permissions: PermissionSet::S3(S3Permissions {
                readable,
                writeable,
                acp_readable,
                acp_writeable,
            }),
            files,
        }))
    }

    /// Anonymous HEAD on the bucket. Any failure means absent.
    async fn bucket_exists(&self, base: &str) -> bool {
        succeeds(self.client.head(base)).await
    }

    /// Unsigned ListObjectsV2 capped at zero keys.
    async fn check_read_permission(&self, base: &str) -> bool {
        succeeds(self.client.get(format!("{base}?list-type=2&max-keys=0"))).await
    }

    /// Uploads an empty marker object and deletes it again.
    ///
    /// The delete is not awaited here and its outcome never changes the
    /// answer; `finish_cleanups` waits for it before the scan ends.
    async fn check_write_permission(&self, base: &str) -> bool {
        let marker = format!("{base}/buckets-hunter-{}.txt", Utc::now().format("%Y%m%d%H%M%S%f"));
        if !succeeds(self.client.put(&marker).body(Vec::new())).await {
            return false;
        }

        let client = self.client.clone();
        let delete = async move {
            if !succeeds(client.delete(&marker)).await {
                debug!(object = %marker, "Could not remove write-check marker.");
            }
        };
        match self.cleanups.lock() {
            Ok(mut cleanups) => {
                cleanups.spawn(delete);
            }
            Err(_) => warn!("Cleanup set poisoned, marker left behind."),
        }
        true
    }

    /// Waits for every outstanding marker deletion.
    pub async fn finish_cleanups(&self) {
        let mut pending = match self.cleanups.lock() {
            Ok(mut cleanups) => std::mem::take(&mut *cleanups),
            Err(_) => return,
        };
        if !pending.is_empty() {
            debug!(pending = pending.len(), "Waiting for write-check cleanups.");
        }
        while pending.join_next().await.is_some() {}
    }

    async fn check_read_acl_permission(&self, base: &str) -> bool {
        succeeds(self.client.get(format!("{base}?acl"))).await
    }

    async fn check_write_acl_permission(&self, base: &str) -> bool {
        let request = self
            .client
            .put(format!("{base}?acl"))
            .header("x-amz-acl", "public-read")
            .body(Vec::new());
        succeeds(request).await
    }
}

/// Sends `request`; only a 2xx answer counts as allowed.
async fn succeeds(request: RequestBuilder) -> bool {
    match request.send().await {
        Ok(res) => res.status().is_success(),
        Err(e) => {
            debug!(error = %e, "Request failed, treating as denied.");
            false
        }
    }
}

/// Runs the S3 phase followed by the AWS apps phase over every candidate.
pub async fn run<R: HostResolver>(config: &ScanConfig<R>, pool: &TaskPool, sink: &ResultSink) -> Result<()> {
    let scanner = Arc::new(S3BucketsScanner::new(config)?);

    pool.run_phase("aws-s3-buckets", config.candidates.iter().cloned(), sink, |candidate| {
        let scanner = Arc::clone(&scanner);
        async move { scanner.scan_bucket(&candidate).await }
    })
    .await;
    scanner.finish_cleanups().await;

    pool.run_phase("aws-apps", config.candidates.iter().cloned(), sink, |candidate| {
        let scanner = Arc::clone(&scanner);
        async move { scanner.scan_aws_apps(&candidate).await }
    })
    .await;

    Ok(())
}
