// src/core/http.rs

use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use tracing::debug;
use url::Url;

use crate::core::errors::{Result, ScanError};

const USER_AGENT: &str = concat!("BucketsHunterRS/", env!("CARGO_PKG_VERSION"));

static RE_LISTING_ENTRY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<Key>(.*?)</Key>").unwrap());

/// Builds the credential-less HTTP client shared by one provider's tasks.
///
/// A failure here is a setup failure: the caller aborts that provider's scan.
pub fn anonymous_client(provider: &'static str, timeout: Duration) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(|source| ScanError::ClientSetup { provider, source })
}

/// Removes the query string (and fragment) from a URL.
pub fn strip_query(url: &str) -> String {
    match Url::parse(url) {
        Ok(mut parsed) => {
            parsed.set_query(None);
            parsed.set_fragment(None);
            parsed.as_str().trim_end_matches('/').to_string()
        }
        Err(_) => url.split(['?', '#']).next().unwrap_or(url).to_string(),
    }
}

/// Pulls the object keys out of a public S3/GCS XML listing.
///
/// Only `<Key>` elements name objects; the bucket's own `<Name>` is ignored.
/// Returned values are absolute URLs under `public_base` with any query stripped.
pub fn extract_listing_files(body: &str, public_base: &str) -> Vec<String> {
    let base = strip_query(public_base);
    RE_LISTING_ENTRY
        .captures_iter(body)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .filter(|entry| !entry.is_empty())
        .map(|entry| format!("{base}/{entry}"))
        .collect()
}

/// Fetches a public listing and returns the files it names.
///
/// Best effort: transport failures and non-success answers give an empty list.
pub async fn list_bucket_files(client: &Client, listing_url: &str, public_base: &str) -> Vec<String> {
    let response = match client.get(listing_url).send().await {
        Ok(res) if res.status().is_success() => res,
        Ok(res) => {
            debug!(url = listing_url, status = %res.status(), "Listing not public.");
            return Vec::new();
        }
        Err(e) => {
            debug!(url = listing_url, error = %e, "Listing request failed.");
            return Vec::new();
        }
    };

    match response.text().await {
        Ok(body) => extract_listing_files(&body, public_base),
        Err(e) => {
            debug!(url = listing_url, error = %e, "Failed to read listing body.");
            Vec::new()
        }
    }
}
