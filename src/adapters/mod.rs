//! Adapters - Concrete implementations of ports.

pub mod local;
pub mod web;

use crate::ports::source::{ContentSource, SourceError};

/// Build the content source named by `identifier`:
/// `r/<subreddit>` for a subreddit listing, `file:<path>` or a bare path for
/// a local text file.
pub fn source_from_identifier(identifier: &str) -> Result<Box<dyn ContentSource>, SourceError> {
    let identifier = identifier.trim();

    if let Some(name) = identifier
        .strip_prefix("r/")
        .or_else(|| identifier.strip_prefix("/r/"))
    {
        let name = name.trim_end_matches('/');
        if name.is_empty() || name.contains('/') {
            return Err(SourceError::UnknownSource(identifier.to_string()));
        }
        return Ok(Box::new(web::SubredditSource::new(name)));
    }

    let path = identifier.strip_prefix("file:").unwrap_or(identifier);
    if path.is_empty() {
        return Err(SourceError::UnknownSource(identifier.to_string()));
    }
    Ok(Box::new(local::TextFileSource::new(path)))
}
