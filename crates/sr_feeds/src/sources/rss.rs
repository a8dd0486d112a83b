use async_trait::async_trait;
use feed_rs::model::Entry;
use feed_rs::parser;
use reqwest::Client;
use sr_core::{Article, Error, FeedSource, Result};
use std::io::Cursor;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::utils::{parse_url, sanitize_text, truncate_chars};

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const RETRY_DELAY: Duration = Duration::from_secs(5);
pub const MAX_ATTEMPTS: usize = 3;

/// Raw content bodies are cut to this many characters before sanitizing
const MAX_CONTENT_CHARS: usize = 1500;

/// RSS or Atom feed fetched over HTTP.
pub struct RssFeedSource {
    client: Client,
    attempts: usize,
    retry_delay: Duration,
}

impl Default for RssFeedSource {
    fn default() -> Self {
        Self::new()
    }
}

impl RssFeedSource {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            attempts: MAX_ATTEMPTS,
            retry_delay: RETRY_DELAY,
        }
    }

    pub fn with_retries(mut self, attempts: usize, delay: Duration) -> Self {
        self.attempts = attempts.max(1);
        self.retry_delay = delay;
        self
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }
}

fn entry_to_article(entry: Entry) -> Option<Article> {
    let link = entry.links.first().map(|l| l.href.trim().to_string()).filter(|l| !l.is_empty())?;
    let title = entry.title.map(|t| sanitize_text(&t.content)).unwrap_or_default();
    let published_at = entry
        .published
        .or(entry.updated)
        .map(|d| d.to_rfc3339())
        .unwrap_or_default();
    let raw_description = match entry.summary.map(|s| s.content).filter(|s| !s.trim().is_empty()) {
        Some(summary) => summary,
        None => entry
            .content
            .and_then(|c| c.body)
            .map(|body| truncate_chars(&body, MAX_CONTENT_CHARS))
            .unwrap_or_default(),
    };

    Some(Article {
        title,
        link,
        published_at,
        description: sanitize_text(&raw_description),
    })
}

/// Parse an RSS/Atom document and keep the first `max_items` entries.
pub fn parse_feed(body: &[u8], max_items: usize) -> Result<Vec<Article>> {
    let feed = parser::parse(Cursor::new(body)).map_err(|e| Error::Feed(format!("Failed to parse feed: {}", e)))?;
    debug!("Parsed feed with {} entries", feed.entries.len());

    let mut articles = Vec::new();
    for entry in feed.entries.into_iter().take(max_items) {
        let id = entry.id.clone();
        match entry_to_article(entry) {
            Some(article) => articles.push(article),
            None => warn!("⚠️ Feed entry {} has no link, skipping", id),
        }
    }
    Ok(articles)
}

#[async_trait]
impl FeedSource for RssFeedSource {
    fn source(&self) -> &str {
        "rss"
    }

    async fn fetch(&self, url: &str, max_items: usize) -> Result<Vec<Article>> {
        parse_url(url)?;

        let mut attempt = 1;
        let body = loop {
            info!("📡 Loading feed from {} (attempt {}/{})", url, attempt, self.attempts);
            match self.download(url).await {
                Ok(body) => break body,
                Err(e) if attempt < self.attempts => {
                    warn!("⚠️ Feed request failed: {}, retrying in {:?}", e, self.retry_delay);
                    tokio::time::sleep(self.retry_delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        };

        let articles = parse_feed(&body, max_items)?;
        info!("📰 Fetched {} articles from {}", articles.len(), url);
        Ok(articles)
    }
}
