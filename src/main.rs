// src/main.rs

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use tracing::{info, warn};

mod cli;
mod core;
mod logging;
mod report;

use cli::Args;
use crate::core::config::ScanConfig;
use crate::core::dns::DnsResolver;
use crate::core::permutations::generate_permutations;
use crate::core::scanner::ScanOrchestrator;
use crate::core::wordlist::{default_mutations, load_wordlist};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();
    args.validate()?;

    let log_path = logging::initialize_logging(args.verbose)?;
    info!(log = %log_path.display(), "Logging initialized.");

    let mutations = match &args.wordlist {
        Some(path) => load_wordlist(path)
            .await
            .wrap_err_with(|| format!("failed to load wordlist {}", path.display()))?,
        None => default_mutations(),
    };
    let container_wordlist = match &args.container_wordlist {
        Some(path) => load_wordlist(path)
            .await
            .wrap_err_with(|| format!("failed to load container wordlist {}", path.display()))?,
        None => Vec::new(),
    };

    let candidates = generate_permutations(args.keyword.trim(), &mutations);
    info!(candidates = candidates.len(), "Generated bucket permutations.");

    let resolver = DnsResolver::configure(&args.name_server).wrap_err("failed to configure DNS resolver")?;
    let config = ScanConfig::new(candidates, resolver)
        .with_concurrency(args.threads)
        .with_container_wordlist(container_wordlist)
        .with_endpoints(args.endpoints())
        .with_http_timeout(args.http_timeout())
        .with_scan_timeout(args.scan_timeout());

    let orchestrator = ScanOrchestrator::new(config);
    let results = orchestrator
        .run(&args.platform.platforms(), |result| println!("{}\n", report::format_result(result)))
        .await;

    println!("{}", report::summarize(&results));

    match &args.output {
        Some(path) if !results.is_empty() => {
            info!(path = %path.display(), "Writing results.");
            report::write_json(path, &results)
                .await
                .wrap_err_with(|| format!("failed to write {}", path.display()))?;
        }
        Some(_) => warn!("No findings, skipping output file."),
        None => {}
    }

    info!("Finished with scanning.");
    Ok(())
}
