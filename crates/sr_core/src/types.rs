use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A feed item as handed over by a [`FeedSource`](crate::FeedSource).
///
/// `description` is plain text; HTML has already been stripped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub title: String,
    pub link: String,
    #[serde(rename = "pubDate")]
    pub published_at: String,
    pub description: String,
}

/// Style of curiosity hook requested for an article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HookType {
    StatPoint,
    QuoteShard,
    LocalImpact,
    WhatChanged,
    Timeline,
    Comparison,
    OddDetail,
}

impl HookType {
    /// Rotation order; article `i` gets `ALL[i % 7]`.
    pub const ALL: [HookType; 7] = [
        HookType::StatPoint,
        HookType::QuoteShard,
        HookType::LocalImpact,
        HookType::WhatChanged,
        HookType::Timeline,
        HookType::Comparison,
        HookType::OddDetail,
    ];

    pub fn for_position(position: usize) -> Self {
        Self::ALL[position % Self::ALL.len()]
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HookType::StatPoint => "STAT_POINT",
            HookType::QuoteShard => "QUOTE_SHARD",
            HookType::LocalImpact => "LOCAL_IMPACT",
            HookType::WhatChanged => "WHAT_CHANGED",
            HookType::Timeline => "TIMELINE",
            HookType::Comparison => "COMPARISON",
            HookType::OddDetail => "ODD_DETAIL",
        }
    }
}

impl fmt::Display for HookType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One digest entry. `bullets[2]` is the hook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRecord {
    pub title: String,
    pub link: String,
    #[serde(rename = "pubDate")]
    pub published_at: String,
    #[serde(rename = "summary")]
    pub bullets: [String; 3],
    pub hook_type: HookType,
}

impl SummaryRecord {
    pub fn hook(&self) -> &str {
        &self.bullets[2]
    }

    /// Identity used for history deduplication.
    pub fn key(&self) -> (&str, &str) {
        (&self.title, &self.link)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DigestStats {
    Completed {
        count: usize,
        feed: String,
        model: String,
    },
    Failed {
        error: String,
    },
}

/// Error code reported when no generator is configured.
pub const NO_API_KEY: &str = "no_api_key";

/// The output artifact consumers read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Digest {
    pub last_updated: String,
    pub articles: Vec<SummaryRecord>,
    pub stats: DigestStats,
}

impl Digest {
    pub fn completed(articles: Vec<SummaryRecord>, feed: &str, model: &str) -> Self {
        let count = articles.len();
        Self {
            last_updated: timestamp(Local::now()),
            articles,
            stats: DigestStats::Completed {
                count,
                feed: feed.to_string(),
                model: model.to_string(),
            },
        }
    }

    /// Empty but well-formed artifact carrying an error code or message.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            last_updated: timestamp(Local::now()),
            articles: Vec::new(),
            stats: DigestStats::Failed {
                error: error.into(),
            },
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.stats {
            DigestStats::Failed { error } => Some(error),
            DigestStats::Completed { .. } => None,
        }
    }
}

fn timestamp(now: DateTime<Local>) -> String {
    now.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}
