// src/core/permutations.rs

use std::sync::Arc;

/// Builds the candidate names for a keyword and a list of mutation words.
///
/// The bare keyword always comes first, followed by six combinations per
/// mutation in wordlist order: `k-m`, `k_m`, `km`, `m-k`, `m_k`, `mk`.
/// The result is materialized once and shared read-only between providers.
///
/// # Arguments
/// * `keyword` - The base name, usually the target organisation.
/// * `mutations` - Words to combine with the keyword.
///
/// # Returns
/// `1 + 6 * mutations.len()` candidate names. Duplicates are kept.
pub fn generate_permutations<S: AsRef<str>>(keyword: &str, mutations: &[S]) -> Arc<[String]> {
    let mut names = Vec::with_capacity(1 + 6 * mutations.len());
    names.push(keyword.to_string());

    for mutation in mutations {
        let mutation = mutation.as_ref();
        names.push(format!("{keyword}-{mutation}"));
        names.push(format!("{keyword}_{mutation}"));
        names.push(format!("{keyword}{mutation}"));
        names.push(format!("{mutation}-{keyword}"));
        names.push(format!("{mutation}_{keyword}"));
        names.push(format!("{mutation}{keyword}"));
    }

    names.into()
}
