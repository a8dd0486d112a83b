use scraper::Html;
use sr_core::{Error, Result};
use url::Url;

pub mod rss;

pub use rss::RssFeedSource;

/// Common utilities for feed sources
pub mod utils {
    use super::*;

    /// Parse `url`, accepting only http and https.
    pub fn parse_url(url: &str) -> Result<Url> {
        let parsed = Url::parse(url).map_err(|e| Error::Feed(format!("Failed to parse URL {}: {}", url, e)))?;
        match parsed.scheme() {
            "http" | "https" => Ok(parsed),
            scheme => Err(Error::Feed(format!("Unsupported URL scheme: {}", scheme))),
        }
    }

    /// Collapse runs of whitespace into single spaces and trim.
    pub fn collapse_whitespace(text: &str) -> String {
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Plain text of an HTML snippet: entities decoded, tags dropped, text
    /// nodes joined by spaces, whitespace collapsed.
    pub fn sanitize_text(text: &str) -> String {
        if text.is_empty() {
            return String::new();
        }
        let fragment = Html::parse_fragment(text);
        let joined = fragment.root_element().text().collect::<Vec<_>>().join(" ");
        collapse_whitespace(&joined)
    }

    pub fn truncate_chars(text: &str, max: usize) -> String {
        text.chars().take(max).collect()
    }
}
