// src/cli.rs

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use color_eyre::eyre::{bail, Result};
use strum::IntoEnumIterator;
use url::Url;

use crate::core::config::{Endpoints, DEFAULT_CONCURRENCY};
use crate::core::dns::DEFAULT_NAME_SERVER;
use crate::core::models::Platform;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PlatformSelector {
    All,
    Aws,
    Azure,
    Gcp,
}

impl PlatformSelector {
    pub fn platforms(self) -> Vec<Platform> {
        match self {
            PlatformSelector::All => Platform::iter().collect(),
            PlatformSelector::Aws => vec![Platform::Aws],
            PlatformSelector::Azure => vec![Platform::Azure],
            PlatformSelector::Gcp => vec![Platform::Gcp],
        }
    }
}

/// Find open buckets, misconfigured permissions and exposed files across AWS, Azure and GCP.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Keyword used to generate bucket names.
    #[arg(short, long)]
    pub keyword: String,

    /// Wordlist of mutations combined with the keyword. Defaults to the bundled list.
    #[arg(short, long)]
    pub wordlist: Option<PathBuf>,

    /// Platform to scan.
    #[arg(short, long, value_enum, default_value_t = PlatformSelector::All)]
    pub platform: PlatformSelector,

    /// Number of concurrent probes per platform.
    #[arg(short, long, default_value_t = DEFAULT_CONCURRENCY)]
    pub threads: usize,

    /// Save the results to a JSON file.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Nameserver used for DNS lookups.
    #[arg(short, long = "nameserver", default_value = DEFAULT_NAME_SERVER)]
    pub name_server: String,

    /// Container names to bruteforce on discovered Azure storage accounts.
    #[arg(short, long)]
    pub container_wordlist: Option<PathBuf>,

    /// Per-request HTTP timeout in seconds.
    #[arg(long, default_value_t = 10)]
    pub timeout: u64,

    /// Stop the whole scan after this many seconds and keep what was found.
    #[arg(long)]
    pub scan_timeout: Option<u64>,

    /// Send every provider request to this base URL instead (path-style), e.g. a local mirror.
    #[arg(long)]
    pub endpoint: Option<Url>,

    /// Print debug logs to stderr.
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Rejects argument combinations clap cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.keyword.trim().is_empty() {
            bail!("keyword must not be empty");
        }
        if self.threads == 0 {
            bail!("threads must be at least 1");
        }
        if let Some(output) = &self.output {
            let is_json = output
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
            if !is_json {
                bail!("only JSON output files are supported: {}", output.display());
            }
        }
        Ok(())
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout.max(1))
    }

    pub fn scan_timeout(&self) -> Option<Duration> {
        self.scan_timeout.map(Duration::from_secs)
    }

    pub fn endpoints(&self) -> Endpoints {
        self.endpoint.clone().map(Endpoints::path_style).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("buckets-hunter-rs").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn defaults_match_historic_tool() {
        let args = parse(&["-k", "acme"]);
        assert_eq!(args.platform, PlatformSelector::All);
        assert_eq!(args.threads, 10);
        assert_eq!(args.name_server, "1.1.1.1");
        assert!(args.validate().is_ok());
        assert_eq!(args.platform.platforms().len(), 3);
        assert_eq!(args.endpoints().s3_bucket("acme"), "https://acme.s3.amazonaws.com");
    }

    #[test]
    fn keyword_is_required() {
        assert!(Args::try_parse_from(["buckets-hunter-rs"]).is_err());
    }

    #[test]
    fn rejects_unknown_platform() {
        assert!(Args::try_parse_from(["buckets-hunter-rs", "-k", "acme", "-p", "oracle"]).is_err());
    }

    #[test]
    fn output_must_be_json() {
        assert!(parse(&["-k", "acme", "-o", "out.txt"]).validate().is_err());
        assert!(parse(&["-k", "acme", "-o", "out.JSON"]).validate().is_ok());
    }

    #[test]
    fn endpoint_override_is_path_style() {
        let args = parse(&["-k", "acme", "--endpoint", "http://127.0.0.1:4566"]);
        assert_eq!(args.endpoints().s3_bucket("acme"), "http://127.0.0.1:4566/s3/acme");
    }

    #[test]
    fn single_platform_selection() {
        let args = parse(&["-k", "acme", "-p", "gcp", "-n", "8.8.8.8", "-t", "32"]);
        assert_eq!(args.platform.platforms(), vec![Platform::Gcp]);
        assert_eq!(args.threads, 32);
        assert_eq!(args.name_server, "8.8.8.8");
    }
}
