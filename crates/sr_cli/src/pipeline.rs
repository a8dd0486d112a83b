use std::path::PathBuf;
use std::sync::Arc;
use sr_core::{Digest, FeedSource, HistoryStore, Result};
use sr_inference::DigestBuilder;
use sr_storage::write_json_atomic;
use tracing::{error, info};

/// One fetch → digest → persist cycle.
pub struct Pipeline {
    pub feed: Arc<dyn FeedSource>,
    pub feed_url: String,
    pub max_items: usize,
    pub builder: DigestBuilder,
    pub history: Arc<dyn HistoryStore>,
    pub output: PathBuf,
}

impl Pipeline {
    async fn try_run(&self) -> Result<Digest> {
        info!("🚀 Starting run with {} source {}", self.feed.source(), self.feed_url);
        let articles = self.feed.fetch(&self.feed_url, self.max_items).await?;
        let digest = self.builder.build(&articles).await;
        write_json_atomic(&self.output, &digest).await?;
        self.history.merge(&digest.articles).await?;
        Ok(digest)
    }

    /// Run a cycle. Any failure is logged and turned into an empty digest
    /// carrying the error, which is still written to the output path.
    pub async fn run(&self) -> Digest {
        match self.try_run().await {
            Ok(digest) => {
                info!("✨ Wrote {} articles → {}", digest.articles.len(), self.output.display());
                digest
            }
            Err(e) => {
                error!("💥 Fatal: {}", e);
                let digest = Digest::failed(e.to_string());
                if let Err(write_error) = write_json_atomic(&self.output, &digest).await {
                    error!("💥 Could not write {}: {}", self.output.display(), write_error);
                }
                digest
            }
        }
    }
}
