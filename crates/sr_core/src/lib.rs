pub mod error;
pub mod feed;
pub mod models;
pub mod storage;
pub mod types;

pub use error::{Error, Result};
pub use feed::FeedSource;
pub use models::TextGenerator;
pub use storage::{HistoryStore, MergeReport};
pub use types::{Article, Digest, DigestStats, HookType, SummaryRecord, NO_API_KEY};
