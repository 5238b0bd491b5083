// src/core/models.rs

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

// --- Platforms & Services ---

/// The cloud providers a scan can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter)]
pub enum Platform {
    #[serde(rename = "AWS")]
    #[strum(serialize = "AWS")]
    Aws,
    #[serde(rename = "Azure")]
    #[strum(serialize = "Azure")]
    Azure,
    // Output files have always spelled this one "Gcp".
    #[serde(rename = "Gcp")]
    #[strum(serialize = "GCP")]
    Gcp,
}

/// The concrete service a finding belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum Service {
    #[serde(rename = "S3")]
    #[strum(serialize = "S3")]
    S3,
    #[serde(rename = "AWS apps")]
    #[strum(serialize = "AWS apps")]
    AwsApps,
    #[serde(rename = "Azure storage account")]
    #[strum(serialize = "Azure storage account")]
    AzureStorageAccount,
    #[serde(rename = "Azure container")]
    #[strum(serialize = "Azure container")]
    AzureContainer,
    #[serde(rename = "Azure web app")]
    #[strum(serialize = "Azure web app")]
    AzureWebApp,
    #[serde(rename = "Azure VMs")]
    #[strum(serialize = "Azure VMs")]
    AzureVms,
    #[serde(rename = "GCP")]
    #[strum(serialize = "GCP")]
    Gcs,
}

// --- Permission Sets ---
// Each provider keeps its own vocabulary; there is no shared schema.

/// Anonymous capabilities detected on an S3 bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct S3Permissions {
    pub readable: bool,
    pub writeable: bool,
    pub acp_readable: bool,
    pub acp_writeable: bool,
}

/// Anonymous capabilities derived from a GCS `testPermissions` answer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GcsPermissions {
    pub readable: bool,
    pub writeable: bool,
    pub listable: bool,
    /// Anyone may rewrite the bucket's IAM policy.
    pub privesc: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PermissionSet {
    S3(S3Permissions),
    Gcs(GcsPermissions),
}

impl PermissionSet {
    /// Returns `true` when at least one flag is set.
    pub fn any(&self) -> bool {
        match self {
            PermissionSet::S3(p) => p.readable || p.writeable || p.acp_readable || p.acp_writeable,
            PermissionSet::Gcs(p) => p.readable || p.writeable || p.listable || p.privesc,
        }
    }
}

// --- Probe Results ---

/// A single finding produced by a probe.
///
/// A candidate that does not exist produces no `ProbeResult` at all. The
/// serialized field names follow the historic JSON report layout, so every
/// URL-ish field is written as `bucket` except the VM list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProbeResult {
    BucketFound {
        platform: Platform,
        service: Service,
        #[serde(rename = "bucket")]
        bucket_url: String,
        permissions: PermissionSet,
        files: Vec<String>,
    },
    /// DNS-only hits such as AWS apps or Azure web apps.
    ServiceFound {
        platform: Platform,
        service: Service,
        #[serde(rename = "bucket")]
        endpoint_url: String,
    },
    VmGroupFound {
        platform: Platform,
        service: Service,
        #[serde(rename = "vms")]
        vm_urls: Vec<String>,
    },
}

impl ProbeResult {
    pub fn service_found(platform: Platform, service: Service, endpoint_url: impl Into<String>) -> Self {
        ProbeResult::ServiceFound { platform, service, endpoint_url: endpoint_url.into() }
    }

    pub fn platform(&self) -> Platform {
        match self {
            ProbeResult::BucketFound { platform, .. }
            | ProbeResult::ServiceFound { platform, .. }
            | ProbeResult::VmGroupFound { platform, .. } => *platform,
        }
    }

    pub fn service(&self) -> Service {
        match self {
            ProbeResult::BucketFound { service, .. }
            | ProbeResult::ServiceFound { service, .. }
            | ProbeResult::VmGroupFound { service, .. } => *service,
        }
    }
}
