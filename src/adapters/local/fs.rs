use crate::ports::source::{normalize_item, ContentSource, SourceError};
use async_trait::async_trait;
use std::path::PathBuf;

/// Reads items from a text file, one item per paragraph.
#[derive(Debug, Clone)]
pub struct TextFileSource {
    path: PathBuf,
}

impl TextFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ContentSource for TextFileSource {
    async fn fetch(&self, limit: usize) -> Result<Vec<String>, SourceError> {
        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| SourceError::Io {
                path: self.path.clone(),
                source,
            })?;

        Ok(split_paragraphs(&contents, limit))
    }
}

fn split_paragraphs(contents: &str, limit: usize) -> Vec<String> {
    let mut items = Vec::new();
    let mut current = String::new();

    for line in contents.lines().chain(std::iter::once("")) {
        if line.trim().is_empty() {
            let item = normalize_item(&current);
            if !item.is_empty() {
                items.push(item);
            }
            current.clear();
        } else {
            current.push_str(line);
            current.push('\n');
        }
    }

    items.truncate(limit);
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_split_paragraphs() {
        let contents = "First title\nfirst body\n\n\n  Second   one  \n\nThird\n";
        assert_eq!(
            split_paragraphs(contents, 10),
            vec!["First title\nfirst body", "Second one", "Third"]
        );
        assert_eq!(split_paragraphs(contents, 2).len(), 2);
        assert!(split_paragraphs("\n\n", 5).is_empty());
    }

    #[tokio::test]
    async fn test_fetch_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "one\n\ntwo\n\nthree").unwrap();

        let source = TextFileSource::new(file.path());
        let items = source.fetch(2).await.unwrap();
        assert_eq!(items, vec!["one", "two"]);
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        let source = TextFileSource::new("/nonexistent/posts.txt");
        assert!(matches!(source.fetch(5).await, Err(SourceError::Io { .. })));
    }
}
