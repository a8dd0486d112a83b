use async_trait::async_trait;
use sr_core::{HistoryStore, MergeReport, Result, SummaryRecord};
use tokio::sync::RwLock;

use crate::{merge_records, DEFAULT_HISTORY_CAP};

/// History archive held in memory, for tests and dry runs.
pub struct MemoryHistoryStore {
    records: RwLock<Vec<SummaryRecord>>,
    cap: usize,
}

impl Default for MemoryHistoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            cap: DEFAULT_HISTORY_CAP,
        }
    }

    pub fn with_cap(mut self, cap: usize) -> Self {
        self.cap = cap;
        self
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn merge(&self, records: &[SummaryRecord]) -> Result<MergeReport> {
        let mut archive = self.records.write().await;
        Ok(merge_records(&mut *archive, records.iter().cloned(), self.cap))
    }

    async fn load(&self) -> Result<Vec<SummaryRecord>> {
        Ok(self.records.read().await.clone())
    }
}
