// src/core/scanner/azure_scanner.rs

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{Client, StatusCode};
use tracing::{debug, info};

use crate::core::config::{azure_container_url, Endpoints, ScanConfig};
use crate::core::dns::{resolves, HostResolver};
use crate::core::errors::Result;
use crate::core::http::anonymous_client;
use crate::core::models::{Platform, ProbeResult, Service};
use crate::core::scanner::aggregator::ResultSink;
use crate::core::scanner::pool::{TaskOutcome, TaskPool};

/// Storage account names are lowercase alphanumerics, 3 to 21 characters here.
static RE_STORAGE_ACCOUNT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z0-9]{3,21}$").unwrap());

/// Regions probed for `{name}.{region}.cloudapp.azure.com`.
pub const AZURE_REGIONS: &[&str] = &[
    "eastasia",
    "southeastasia",
    "centralus",
    "eastus",
    "eastus2",
    "westus",
    "northcentralus",
    "southcentralus",
    "northeurope",
    "westeurope",
    "japanwest",
    "japaneast",
    "brazilsouth",
    "australiaeast",
    "australiasoutheast",
    "southindia",
    "centralindia",
    "westindia",
    "canadacentral",
    "canadaeast",
    "uksouth",
    "ukwest",
    "westcentralus",
    "westus2",
    "koreacentral",
    "koreasouth",
    "francecentral",
    "francesouth",
    "australiacentral",
    "australiacentral2",
    "southafricanorth",
    "southafricawest",
];

pub fn storage_account_host(account: &str) -> String {
    format!("{account}.blob.core.windows.net")
}

pub fn web_app_host(name: &str) -> String {
    format!("{name}.azurewebsites.net")
}

pub fn vm_host(name: &str, region: &str) -> String {
    format!("{name}.{region}.cloudapp.azure.com")
}

pub fn is_valid_storage_account(name: &str) -> bool {
    RE_STORAGE_ACCOUNT.is_match(name)
}

/// Runs the four Azure sub-scans for a single scan run.
///
/// Holds the only shared mutable state of a scan: the storage accounts
/// confirmed during discovery. Discovery tasks insert into it; the container
/// phase reads it only after discovery has fully drained.
pub struct AzureBucketsScanner<R> {
    client: Client,
    endpoints: Endpoints,
    resolver: Arc<R>,
    found_storage_accounts: Mutex<BTreeSet<String>>,
}

impl<R: HostResolver> AzureBucketsScanner<R> {
    pub fn new(config: &ScanConfig<R>) -> Result<Self> {
        Ok(Self {
            client: anonymous_client("Azure", config.http_timeout)?,
            endpoints: config.endpoints.clone(),
            resolver: Arc::clone(&config.resolver),
            found_storage_accounts: Mutex::new(BTreeSet::new()),
        })
    }

    /// Storage accounts can only be confirmed through DNS.
    pub async fn scan_storage_account(&self, candidate: &str) -> TaskOutcome {
        if !is_valid_storage_account(candidate) {
            return Ok(None);
        }

        let host = storage_account_host(candidate);
        if !resolves(&*self.resolver, &host).await? {
            debug!(host = %host, "Storage account absent.");
            return Ok(None);
        }

        info!(host = %host, "Azure storage account found.");
        self.found_storage_accounts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(candidate.to_string());
        Ok(Some(ProbeResult::service_found(Platform::Azure, Service::AzureStorageAccount, host)))
    }

    /// Snapshot of the accounts confirmed so far.
    pub fn found_storage_accounts(&self) -> Vec<String> {
        self.found_storage_accounts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .cloned()
            .collect()
    }

    /// Anonymous container listing; only a 200 counts as found.
    pub async fn scan_container(&self, account: &str, container: &str) -> TaskOutcome {
        let url = self.endpoints.azure_container_listing(account, container);
        let status = match self.client.get(&url).send().await {
            Ok(res) => res.status(),
            Err(e) => {
                debug!(url = %url, error = %e, "Container request failed.");
                return Ok(None);
            }
        };

        if status != StatusCode::OK {
            return Ok(None);
        }
        let public_url = azure_container_url(account, container);
        info!(url = %public_url, "Public Azure container found.");
        Ok(Some(ProbeResult::service_found(Platform::Azure, Service::AzureContainer, public_url)))
    }

    pub async fn scan_web_app(&self, candidate: &str) -> TaskOutcome {
        let host = web_app_host(candidate);
        if resolves(&*self.resolver, &host).await? {
            info!(host = %host, "Azure web app found.");
            return Ok(Some(ProbeResult::service_found(Platform::Azure, Service::AzureWebApp, host)));
        }
        Ok(None)
    }

    /// Tries every region and folds all hits for `candidate` into one finding.
    pub async fn scan_vms(&self, candidate: &str) -> TaskOutcome {
        let mut vm_urls = Vec::new();
        for region in AZURE_REGIONS {
            let host = vm_host(candidate, region);
            if resolves(&*self.resolver, &host).await? {
                vm_urls.push(host);
            }
        }

        if vm_urls.is_empty() {
            return Ok(None);
        }
        info!(candidate, count = vm_urls.len(), "Azure VMs found.");
        Ok(Some(ProbeResult::VmGroupFound {
            platform: Platform::Azure,
            service: Service::AzureVms,
            vm_urls,
        }))
    }
}

/// Runs storage-account discovery, container bruteforce, web apps and VMs in
/// that order.
///
/// Container bruteforce starts only after every discovery task has finished,
/// and is skipped when the container wordlist is empty.
pub async fn run<R: HostResolver>(config: &ScanConfig<R>, pool: &TaskPool, sink: &ResultSink) -> Result<()> {
    let scanner = Arc::new(AzureBucketsScanner::new(config)?);

    pool.run_phase("azure-storage-accounts", config.candidates.iter().cloned(), sink, |candidate| {
        let scanner = Arc::clone(&scanner);
        async move { scanner.scan_storage_account(&candidate).await }
    })
    .await;

    // run_phase has joined every discovery task, so this snapshot is final.
    let accounts = scanner.found_storage_accounts();
    if config.container_wordlist.is_empty() {
        debug!("No container wordlist, skipping container bruteforce.");
    } else if accounts.is_empty() {
        info!("No storage accounts discovered, skipping container bruteforce.");
    } else {
        let pairs = accounts.iter().flat_map(|account| {
            config
                .container_wordlist
                .iter()
                .map(move |container| (account.clone(), container.clone()))
        });
        pool.run_phase("azure-containers", pairs, sink, |(account, container)| {
            let scanner = Arc::clone(&scanner);
            async move { scanner.scan_container(&account, &container).await }
        })
        .await;
    }

    pool.run_phase("azure-web-apps", config.candidates.iter().cloned(), sink, |candidate| {
        let scanner = Arc::clone(&scanner);
        async move { scanner.scan_web_app(&candidate).await }
    })
    .await;

    pool.run_phase("azure-vms", config.candidates.iter().cloned(), sink, |candidate| {
        let scanner = Arc::clone(&scanner);
        async move { scanner.scan_vms(&candidate).await }
    })
    .await;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::scanner::aggregator::ResultAggregator;
    use crate::core::testing::{StubResolver, Trace};
    use std::time::Duration;
    use url::Url;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    fn candidates(names: &[&str]) -> Arc<[String]> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn storage_account_naming_rule() {
        assert!(is_valid_storage_account("acme"));
        assert!(is_valid_storage_account("acme2024"));
        assert!(!is_valid_storage_account("ac"));
        assert!(!is_valid_storage_account("acme-dev"));
        assert!(!is_valid_storage_account("Acme"));
        assert!(!is_valid_storage_account(&"a".repeat(22)));
    }

    #[tokio::test]
    async fn invalid_names_never_reach_dns() {
        let trace = Trace::default();
        let resolver = StubResolver::absent().traced(trace.clone());
        let config = ScanConfig::new(candidates(&["acme_dev"]), resolver);
        let scanner = AzureBucketsScanner::new(&config).unwrap();

        assert!(scanner.scan_storage_account("acme_dev").await.unwrap().is_none());
        assert!(trace.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn vm_hits_are_grouped_per_candidate() {
        let resolver = StubResolver::with_found([
            "acme.eastus.cloudapp.azure.com",
            "acme.westeurope.cloudapp.azure.com",
        ]);
        let config = ScanConfig::new(candidates(&["acme"]), resolver);
        let scanner = AzureBucketsScanner::new(&config).unwrap();

        assert_eq!(
            scanner.scan_vms("acme").await.unwrap(),
            Some(ProbeResult::VmGroupFound {
                platform: Platform::Azure,
                service: Service::AzureVms,
                vm_urls: vec![
                    "acme.eastus.cloudapp.azure.com".to_string(),
                    "acme.westeurope.cloudapp.azure.com".to_string(),
                ],
            })
        );
        assert!(scanner.scan_vms("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn container_phase_waits_for_discovery() {
        let server = MockServer::start().await;
        let trace = Trace::default();

        let responder_trace = trace.clone();
        Mock::given(method("GET"))
            .and(query_param("restype", "container"))
            .respond_with(move |req: &Request| {
                responder_trace.lock().unwrap().push(format!("container:{}", req.url.path()));
                if req.url.path() == "/acme/logs" {
                    ResponseTemplate::new(200)
                } else {
                    ResponseTemplate::new(404)
                }
            })
            .mount(&server)
            .await;

        // Discovery of the second account is deliberately slow.
        let resolver = StubResolver::with_found(["acme.blob.core.windows.net", "acmedev.blob.core.windows.net"])
            .delayed("acmedev.blob.core.windows.net", Duration::from_millis(150))
            .traced(trace.clone());
        let config = ScanConfig::new(candidates(&["acme", "acmedev", "zzz"]), resolver)
            .with_concurrency(4)
            .with_container_wordlist(vec!["logs".to_string(), "backup".to_string()])
            .with_endpoints(Endpoints::path_style(Url::parse(&server.uri()).unwrap()));

        let pool = TaskPool::new(config.concurrency, None);
        let (aggregator, sink) = ResultAggregator::channel();
        run(&config, &pool, &sink).await.unwrap();
        drop(sink);
        let results = aggregator.collect(|_| {}).await;

        let events = trace.lock().unwrap().clone();
        let last_discovery = events
            .iter()
            .rposition(|e| e.starts_with("resolved:") && e.ends_with(".blob.core.windows.net"))
            .unwrap();
        let first_container = events.iter().position(|e| e.starts_with("container:")).unwrap();
        assert!(last_discovery < first_container, "trace: {events:?}");
        assert_eq!(events.iter().filter(|e| e.starts_with("container:")).count(), 4);

        assert!(results.contains(&ProbeResult::service_found(
            Platform::Azure,
            Service::AzureContainer,
            "https://acme.blob.core.windows.net/logs?restype=container&comp=list",
        )));
        assert_eq!(
            results
                .iter()
                .filter(|r| r.service() == Service::AzureStorageAccount)
                .count(),
            2
        );
    }

    #[tokio::test]
    async fn container_phase_skipped_without_wordlist() {
        let server = MockServer::start().await;
        let resolver = StubResolver::with_found(["acme.blob.core.windows.net"]);
        let config = ScanConfig::new(candidates(&["acme"]), resolver)
            .with_endpoints(Endpoints::path_style(Url::parse(&server.uri()).unwrap()));

        let pool = TaskPool::new(2, None);
        let (aggregator, sink) = ResultAggregator::channel();
        run(&config, &pool, &sink).await.unwrap();
        drop(sink);

        let results = aggregator.collect(|_| {}).await;
        assert_eq!(results.len(), 1);
        assert!(server.received_requests().await.unwrap().is_empty());
    }
}
