// src/core/scanner/mod.rs

// Each provider module owns its probes and the phases it runs. The
// orchestrator below only decides which providers run and collects findings.
pub mod aggregator;
pub mod aws_scanner;
pub mod azure_scanner;
pub mod gcp_scanner;
pub mod pool;

use std::sync::Arc;

use tokio::time::Instant;
use tracing::{error, info};

use crate::core::config::ScanConfig;
use crate::core::dns::{DnsResolver, HostResolver};
use crate::core::models::{Platform, ProbeResult};
use self::aggregator::{ResultAggregator, ResultSink};
use self::pool::TaskPool;

/// Schedules every selected provider over the shared candidate set.
pub struct ScanOrchestrator<R: HostResolver = DnsResolver> {
    config: Arc<ScanConfig<R>>,
}

impl<R: HostResolver> ScanOrchestrator<R> {
    pub fn new(config: ScanConfig<R>) -> Self {
        Self { config: Arc::new(config) }
    }

    /// Runs the selected providers concurrently and returns every finding in
    /// completion order.
    ///
    /// Each provider gets its own pool of `concurrency` workers, so a slow
    /// provider never holds up another. A provider whose client cannot be
    /// built is skipped with an error log; the rest still run.
    ///
    /// # Arguments
    /// * `platforms` - Providers to scan. Duplicates are ignored.
    /// * `on_result` - Called for each finding as soon as it arrives.
    ///
    /// # Returns
    /// All findings. Order follows completion, not candidate order.
    pub async fn run<F>(&self, platforms: &[Platform], on_result: F) -> Vec<ProbeResult>
    where
        F: FnMut(&ProbeResult),
    {
        let deadline = self.config.scan_timeout.map(|timeout| Instant::now() + timeout);
        let (aggregator, sink) = ResultAggregator::channel();

        info!(
            candidates = self.config.candidates.len(),
            concurrency = self.config.concurrency,
            platforms = ?platforms,
            "Starting scan."
        );

        let scans = async move {
            tokio::join!(
                self.scan_platform(Platform::Aws, platforms, deadline, &sink),
                self.scan_platform(Platform::Azure, platforms, deadline, &sink),
                self.scan_platform(Platform::Gcp, platforms, deadline, &sink),
            );
            // Closing the last sink ends collection.
            drop(sink);
        };

        let ((), results) = tokio::join!(scans, aggregator.collect(on_result));
        info!(findings = results.len(), "Finished scanning.");
        results
    }

    async fn scan_platform(
        &self,
        platform: Platform,
        selected: &[Platform],
        deadline: Option<Instant>,
        sink: &ResultSink,
    ) {
        if !selected.contains(&platform) {
            return;
        }

        info!(%platform, "Starting {platform} buckets scan.");
        let pool = TaskPool::new(self.config.concurrency, deadline);
        let outcome = match platform {
            Platform::Aws => aws_scanner::run(&self.config, &pool, sink).await,
            Platform::Azure => azure_scanner::run(&self.config, &pool, sink).await,
            Platform::Gcp => gcp_scanner::run(&self.config, &pool, sink).await,
        };

        match outcome {
            Ok(()) => info!(%platform, "Finished {platform} buckets scan."),
            Err(e) => error!(%platform, error = %e, "Aborting {platform} scan."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::Endpoints;
    use crate::core::models::{PermissionSet, S3Permissions, Service};
    use crate::core::testing::StubResolver;
    use strum::IntoEnumIterator;
    use url::Url;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn all_platforms() -> Vec<Platform> {
        Platform::iter().collect()
    }

    fn config_for(server: &MockServer, names: &[&str], resolver: StubResolver) -> ScanConfig<StubResolver> {
        let candidates: Arc<[String]> = names.iter().map(|n| n.to_string()).collect();
        ScanConfig::new(candidates, resolver)
            .with_concurrency(4)
            .with_endpoints(Endpoints::path_style(Url::parse(&server.uri()).unwrap()))
    }

    #[tokio::test]
    async fn nothing_exists_nothing_reported() {
        let server = MockServer::start().await;
        let config = config_for(&server, &["acme", "acme-dev", "devacme"], StubResolver::absent());

        let results = ScanOrchestrator::new(config).run(&all_platforms(), |_| {}).await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn single_readable_s3_bucket() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/s3/demo"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/s3/demo"))
            .and(query_param("list-type", "2"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let config = config_for(&server, &["demo", "demo-dev", "dev-demo"], StubResolver::absent());
        let results = ScanOrchestrator::new(config).run(&[Platform::Aws], |_| {}).await;

        assert_eq!(results.len(), 1);
        let ProbeResult::BucketFound { bucket_url, permissions, .. } = &results[0] else {
            panic!("expected a bucket finding, got {results:?}");
        };
        assert_eq!(bucket_url, "demo.s3.amazonaws.com");
        assert_eq!(
            permissions,
            &PermissionSet::S3(S3Permissions { readable: true, ..Default::default() })
        );
    }

    #[tokio::test]
    async fn failing_task_does_not_stop_the_batch() {
        let server = MockServer::start().await;
        let resolver = StubResolver::with_found(["ok.awsapps.com", "fine.awsapps.com"]).failing("boom.awsapps.com");
        let config = config_for(&server, &["ok", "boom", "fine"], resolver);

        let mut streamed = 0;
        let results = ScanOrchestrator::new(config)
            .run(&[Platform::Aws], |_| streamed += 1)
            .await;

        assert_eq!(streamed, 2);
        let mut hosts: Vec<_> = results
            .iter()
            .filter_map(|r| match r {
                ProbeResult::ServiceFound { service: Service::AwsApps, endpoint_url, .. } => Some(endpoint_url.as_str()),
                _ => None,
            })
            .collect();
        hosts.sort_unstable();
        assert_eq!(hosts, vec!["fine.awsapps.com", "ok.awsapps.com"]);
    }

    #[tokio::test]
    async fn unselected_platforms_are_not_probed() {
        let server = MockServer::start().await;
        let resolver = StubResolver::with_found(["acme.azurewebsites.net", "acme.awsapps.com"]);
        let config = config_for(&server, &["acme"], resolver);

        let results = ScanOrchestrator::new(config).run(&[Platform::Azure], |_| {}).await;

        assert!(results.iter().all(|r| r.platform() == Platform::Azure));
        assert_eq!(results.len(), 1);
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn slow_provider_does_not_hold_back_others() {
        let server = MockServer::start().await;
        let resolver = StubResolver::with_found(["acme.awsapps.com", "acme.azurewebsites.net"])
            .delayed("acme.awsapps.com", std::time::Duration::from_secs(2));
        let config = config_for(&server, &["acme"], resolver);

        let mut streamed = Vec::new();
        let results = ScanOrchestrator::new(config)
            .run(&all_platforms(), |result| streamed.push(result.platform()))
            .await;

        assert_eq!(streamed, vec![Platform::Azure, Platform::Aws]);
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn scan_timeout_returns_partial_results() {
        let server = MockServer::start().await;
        let resolver = StubResolver::with_found(["fast.awsapps.com", "slow.awsapps.com"])
            .delayed("slow.awsapps.com", std::time::Duration::from_secs(30));
        let config = config_for(&server, &["fast", "slow"], resolver)
            .with_scan_timeout(Some(std::time::Duration::from_millis(300)));

        let results = ScanOrchestrator::new(config).run(&[Platform::Aws], |_| {}).await;
        assert_eq!(
            results,
            vec![ProbeResult::service_found(Platform::Aws, Service::AwsApps, "fast.awsapps.com")]
        );
    }
}
