// src/core/mod.rs

/// Immutable scan settings and provider endpoint routing.
pub mod config;

/// The DNS existence-check capability and its hickory-backed implementation.
pub mod dns;

/// The `ScanError` taxonomy shared by every probe.
pub mod errors;

/// Anonymous HTTP client construction and public listing extraction.
pub mod http;

/// Findings and provider-specific permission sets.
pub mod models;

/// Candidate name generation from a keyword and mutation words.
pub mod permutations;

/// Provider probes, the bounded task pool and the orchestrator.
pub mod scanner;

/// Mutation and container wordlist loading.
pub mod wordlist;

#[cfg(test)]
pub mod testing;
