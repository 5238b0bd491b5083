// src/core/wordlist.rs

use std::path::Path;

use tracing::debug;

use crate::core::errors::Result;

/// Mutation words bundled with the binary, used when no wordlist is given.
pub const DEFAULT_MUTATIONS: &str = include_str!("../../data/mutations.txt");

/// Splits wordlist text into words: trimmed, blank lines and `#` comments
/// dropped, order kept.
pub fn parse_wordlist(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

pub async fn load_wordlist(path: &Path) -> Result<Vec<String>> {
    let text = tokio::fs::read_to_string(path).await?;
    let words = parse_wordlist(&text);
    debug!(path = %path.display(), words = words.len(), "Loaded wordlist.");
    Ok(words)
}

pub fn default_mutations() -> Vec<String> {
    parse_wordlist(DEFAULT_MUTATIONS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_blanks_and_comments() {
        let words = parse_wordlist("# header\n dev \n\nprod\r\n#skip\nlogs");
        assert_eq!(words, vec!["dev", "prod", "logs"]);
    }

    #[test]
    fn bundled_list_is_usable() {
        let words = default_mutations();
        assert!(!words.is_empty());
        assert!(words.iter().all(|w| !w.starts_with('#') && !w.is_empty()));
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        assert!(load_wordlist(Path::new("/definitely/not/here.txt")).await.is_err());
    }
}
