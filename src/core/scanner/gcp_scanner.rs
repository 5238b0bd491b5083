// src/core/scanner/gcp_scanner.rs

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::core::config::{Endpoints, ScanConfig};
use crate::core::dns::HostResolver;
use crate::core::errors::{Result, ScanError};
use crate::core::http::{anonymous_client, list_bucket_files};
use crate::core::models::{GcsPermissions, PermissionSet, Platform, ProbeResult, Service};
use crate::core::scanner::aggregator::ResultSink;
use crate::core::scanner::pool::{TaskOutcome, TaskPool};

/// Permissions asked of the `testPermissions` endpoint.
pub const TESTED_PERMISSIONS: &[&str] = &[
    "storage.buckets.delete",
    "storage.buckets.get",
    "storage.buckets.getIamPolicy",
    "storage.buckets.setIamPolicy",
    "storage.buckets.update",
    "storage.objects.create",
    "storage.objects.delete",
    "storage.objects.get",
    "storage.objects.list",
    "storage.objects.update",
];

/// Status codes that mean the bucket does not exist. Anything else,
/// 403 included, means it does.
const ABSENT_STATUSES: &[StatusCode] = &[
    StatusCode::BAD_REQUEST,
    StatusCode::NOT_FOUND,
    StatusCode::INTERNAL_SERVER_ERROR,
];

#[derive(Debug, Deserialize)]
struct TestPermissionsResponse {
    permissions: Option<Vec<String>>,
}

/// Maps the granted permission strings to the four reported flags.
pub fn derive_permissions<S: AsRef<str>>(granted: &[S]) -> GcsPermissions {
    let has = |wanted: &str| granted.iter().any(|p| p.as_ref() == wanted);
    GcsPermissions {
        readable: has("storage.objects.get"),
        writeable: has("storage.objects.create") || has("storage.objects.delete") || has("storage.objects.update"),
        listable: has("storage.objects.list"),
        privesc: has("storage.buckets.setIamPolicy"),
    }
}

pub fn bucket_metadata_url(bucket: &str) -> String {
    format!("https://www.googleapis.com/storage/v1/b/{bucket}")
}

pub struct GcpBucketsScanner {
    client: Client,
    endpoints: Endpoints,
}

impl GcpBucketsScanner {
    pub fn new<R: HostResolver>(config: &ScanConfig<R>) -> Result<Self> {
        Ok(Self {
            client: anonymous_client("GCS", config.http_timeout)?,
            endpoints: config.endpoints.clone(),
        })
    }

    /// Confirms the bucket through its public metadata, then asks IAM which
    /// of `TESTED_PERMISSIONS` an anonymous caller holds.
    ///
    /// Buckets whose IAM answer carries no permission list are dropped even
    /// though they exist: there is nothing actionable to report.
    pub async fn scan_bucket(&self, candidate: &str) -> TaskOutcome {
        let metadata_url = self.endpoints.gcs_bucket_metadata(candidate);
        if !self.bucket_exists(&metadata_url).await {
            debug!(candidate, "GCS bucket absent.");
            return Ok(None);
        }

        let Some(granted) = self.granted_permissions(&metadata_url).await? else {
            debug!(candidate, "GCS bucket exists but grants nothing anonymously.");
            return Ok(None);
        };
        let permissions = derive_permissions(&granted);

        let files = list_bucket_files(
            &self.client,
            &self.endpoints.gcs_bucket_listing(candidate),
            &format!("https://storage.googleapis.com/{candidate}"),
        )
        .await;

        info!(candidate, privesc = permissions.privesc, files = files.len(), "GCS bucket found.");
        Ok(Some(ProbeResult::BucketFound {
            platform: Platform::Gcp,
            service: Service::Gcs,
            bucket_url: bucket_metadata_url(candidate),
            permissions: PermissionSet::Gcs(permissions),
            files,
        }))
    }

    async fn bucket_exists(&self, metadata_url: &str) -> bool {
        match self.client.get(metadata_url).send().await {
            Ok(res) => !ABSENT_STATUSES.contains(&res.status()),
            Err(e) => {
                debug!(url = metadata_url, error = %e, "Metadata request failed, treating as absent.");
                false
            }
        }
    }

    async fn granted_permissions(&self, metadata_url: &str) -> Result<Option<Vec<String>>> {
        let url = format!("{metadata_url}/iam/testPermissions");
        let query: Vec<(&str, &str)> = TESTED_PERMISSIONS.iter().map(|p| ("permissions", *p)).collect();

        let response = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|source| ScanError::Http { url: url.clone(), source })?;
        let body: TestPermissionsResponse = response.json().await.map_err(|e| ScanError::MalformedResponse {
            url: url.clone(),
            reason: e.to_string(),
        })?;
        Ok(body.permissions)
    }
}

pub async fn run<R: HostResolver>(config: &ScanConfig<R>, pool: &TaskPool, sink: &ResultSink) -> Result<()> {
    let scanner = Arc::new(GcpBucketsScanner::new(config)?);

    pool.run_phase("gcp-buckets", config.candidates.iter().cloned(), sink, |candidate| {
        let scanner = Arc::clone(&scanner);
        async move { scanner.scan_bucket(&candidate).await }
    })
    .await;

    Ok(())
}
