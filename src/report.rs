// src/report.rs

use std::collections::BTreeMap;
use std::path::Path;

use colored::Colorize;

use crate::core::errors::Result;
use crate::core::models::{PermissionSet, ProbeResult};

/// Renders a single finding for the terminal.
pub fn format_result(result: &ProbeResult) -> String {
    match result {
        ProbeResult::BucketFound { platform, service, bucket_url, permissions, files } => {
            let headline = format!("[+] Open {platform} {service} bucket: {bucket_url}");
            let headline = if is_critical(permissions) {
                headline.red().bold()
            } else {
                headline.green().bold()
            };
            let mut out = format!("{headline}\n    permissions: {}", describe_permissions(permissions));
            if !files.is_empty() {
                out.push_str(&format!("\n    files ({}):", files.len()));
                for file in files {
                    out.push_str(&format!("\n        {file}"));
                }
            }
            out
        }
        ProbeResult::ServiceFound { platform, service, endpoint_url } => {
            format!("{} {}", format!("[+] {platform} {service} found:").cyan().bold(), endpoint_url)
        }
        ProbeResult::VmGroupFound { platform, service, vm_urls } => {
            let mut out = format!("{}", format!("[+] {platform} {service} found:").cyan().bold());
            for vm in vm_urls {
                out.push_str(&format!("\n        {vm}"));
            }
            out
        }
    }
}

/// Write access or an IAM takeover path is worth highlighting.
fn is_critical(permissions: &PermissionSet) -> bool {
    match permissions {
        PermissionSet::S3(p) => p.writeable || p.acp_writeable,
        PermissionSet::Gcs(p) => p.writeable || p.privesc,
    }
}

fn describe_permissions(permissions: &PermissionSet) -> String {
    let flags: Vec<(&str, bool)> = match permissions {
        PermissionSet::S3(p) => vec![
            ("readable", p.readable),
            ("writeable", p.writeable),
            ("acp_readable", p.acp_readable),
            ("acp_writeable", p.acp_writeable),
        ],
        PermissionSet::Gcs(p) => vec![
            ("readable", p.readable),
            ("writeable", p.writeable),
            ("listable", p.listable),
            ("privesc", p.privesc),
        ],
    };
    if !permissions.any() {
        return "none".to_string();
    }
    flags
        .into_iter()
        .filter(|(_, on)| *on)
        .map(|(name, _)| name)
        .collect::<Vec<_>>()
        .join(", ")
}

/// One line per platform and service with its finding count.
pub fn summarize(results: &[ProbeResult]) -> String {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for result in results {
        *counts.entry(format!("{} {}", result.platform(), result.service())).or_default() += 1;
    }
    if counts.is_empty() {
        return "No findings.".to_string();
    }
    counts
        .iter()
        .map(|(platform, count)| format!("{platform}: {count} finding(s)"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Writes the findings as a pretty-printed JSON array.
pub async fn write_json(path: &Path, results: &[ProbeResult]) -> Result<()> {
    let json = serde_json::to_string_pretty(results)?;
    tokio::fs::write(path, json).await?;
    Ok(())
}
