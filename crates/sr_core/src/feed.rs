use async_trait::async_trait;
use crate::types::Article;
use crate::Result;

#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Returns a name for the source, used in logs
    fn source(&self) -> &str;

    /// Fetch up to `max_items` articles from `url`, in feed order.
    /// Descriptions must already be plain text.
    async fn fetch(&self, url: &str, max_items: usize) -> Result<Vec<Article>>;
}
