//! Subreddit "hot" listing scraped from old.reddit.com.

use crate::ports::source::{normalize_item, ContentSource, SourceError};
use async_trait::async_trait;
use scraper::{Html, Selector};
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://old.reddit.com";
const USER_AGENT: &str = "Mozilla/5.0 (compatible; reelcast)";

pub struct SubredditSource {
    client: reqwest::Client,
    base_url: String,
    subreddit: String,
}

impl SubredditSource {
    pub fn new(subreddit: impl Into<String>) -> Self {
        Self::with_base_url(subreddit, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(subreddit: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            subreddit: subreddit.into(),
        }
    }

    pub fn listing_url(&self) -> String {
        format!("{}/r/{}/hot/", self.base_url, self.subreddit)
    }
}

#[async_trait]
impl ContentSource for SubredditSource {
    async fn fetch(&self, limit: usize) -> Result<Vec<String>, SourceError> {
        let url = self.listing_url();
        debug!(%url, "fetching subreddit listing");

        let http_error = |source| SourceError::Http {
            url: url.clone(),
            source,
        };
        let response = self
            .client
            .get(&url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .send()
            .await
            .map_err(http_error)?;

        if !response.status().is_success() {
            return Err(SourceError::Status {
                url,
                status: response.status().as_u16(),
            });
        }

        let html = response.text().await.map_err(http_error)?;
        parse_listing(&html, limit)
    }
}

/// Extract `"title\nbody"` for each post of a listing page.
pub(crate) fn parse_listing(html: &str, limit: usize) -> Result<Vec<String>, SourceError> {
    let selector =
        |css: &str| Selector::parse(css).map_err(|e| SourceError::Selector(e.to_string()));
    let thing = selector("div.thing")?;
    let title_link = selector("a.title")?;
    let expando = selector("div.expando")?;

    let document = Html::parse_document(html);
    let posts = document
        .select(&thing)
        .take(limit)
        .filter_map(|post| {
            let title = post.select(&title_link).next()?.text().collect::<String>();
            let body = post
                .select(&expando)
                .next()
                .map(|e| e.text().collect::<String>())
                .unwrap_or_default();
            let item = normalize_item(&format!("{}\n{}", title, body));
            (!item.is_empty()).then_some(item)
        })
        .collect();

    Ok(posts)
}
