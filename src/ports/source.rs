use async_trait::async_trait;
use regex::Regex;
use std::path::PathBuf;
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },
    #[error("invalid listing selector: {0}")]
    Selector(String),
    #[error("unrecognised source identifier {0:?}")]
    UnknownSource(String),
}

/// Produces the ordered batch of text items for a run.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Fetch at most `limit` items, in source order
    async fn fetch(&self, limit: usize) -> Result<Vec<String>, SourceError>;
}

/// Trim every line and collapse runs of blanks inside it; drops empty lines.
pub fn normalize_item(text: &str) -> String {
    static BLANKS: OnceLock<Regex> = OnceLock::new();
    let blanks = BLANKS.get_or_init(|| Regex::new(r"[ \t\u{a0}]+").expect("static regex"));

    text.lines()
        .map(|line| blanks.replace_all(line.trim(), " ").into_owned())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::normalize_item;

    #[test]
    fn test_normalize_item() {
        let raw = "  What is   the best\tadvice?  \n\n   you ever got  \n";
        assert_eq!(normalize_item(raw), "What is the best advice?\nyou ever got");
    }

    #[test]
    fn test_normalize_blank_item() {
        assert_eq!(normalize_item(" \n\t\n"), "");
    }
}
