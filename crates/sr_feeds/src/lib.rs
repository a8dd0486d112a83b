pub mod sources;

pub use sources::{rss::parse_feed, RssFeedSource};

pub mod prelude {
    pub use super::sources::RssFeedSource;
    pub use sr_core::{Article, Error, FeedSource, Result};
}
