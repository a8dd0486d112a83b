use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sr_core::{HistoryStore, MergeReport, Result, SummaryRecord};
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::{merge_records, read_json_or, write_json_atomic, DEFAULT_HISTORY_CAP};

/// Entries are kept as raw JSON so ones written by other tools, or by older
/// versions, survive a merge untouched.
#[derive(Debug, Default, Serialize, Deserialize)]
struct HistoryFile {
    #[serde(default)]
    articles: Vec<Value>,
}

/// History archive kept in a single JSON file: `{"articles": [...]}`.
///
/// A file that is not JSON at all is replaced by a fresh archive.
pub struct JsonHistoryStore {
    path: PathBuf,
    cap: usize,
    // serializes read-modify-write cycles within the process
    lock: Mutex<()>,
}

impl JsonHistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cap: DEFAULT_HISTORY_CAP,
            lock: Mutex::new(()),
        }
    }

    pub fn with_cap(mut self, cap: usize) -> Self {
        self.cap = cap;
        self
    }

    async fn read(&self) -> HistoryFile {
        read_json_or(&self.path, HistoryFile::default()).await
    }
}

#[async_trait]
impl HistoryStore for JsonHistoryStore {
    async fn merge(&self, records: &[SummaryRecord]) -> Result<MergeReport> {
        let _guard = self.lock.lock().await;
        let mut history = self.read().await;
        let incoming = records
            .iter()
            .map(serde_json::to_value)
            .collect::<serde_json::Result<Vec<_>>>()?;
        let report = merge_records(&mut history.articles, incoming, self.cap);
        write_json_atomic(&self.path, &history).await?;
        info!("🗄️ History {}: {} new, {} total", self.path.display(), report.added, report.total);
        Ok(report)
    }

    async fn load(&self) -> Result<Vec<SummaryRecord>> {
        let mut records = Vec::new();
        for entry in self.read().await.articles {
            match serde_json::from_value::<SummaryRecord>(entry) {
                Ok(record) => records.push(record),
                Err(e) => warn!("⚠️ Skipping archived entry in {}: {}", self.path.display(), e),
            }
        }
        Ok(records)
    }
}
