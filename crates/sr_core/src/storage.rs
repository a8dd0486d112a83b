use async_trait::async_trait;
use crate::types::SummaryRecord;
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MergeReport {
    pub added: usize,
    pub total: usize,
}

#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Append records whose (title, link) is not archived yet, then keep
    /// only the most recent entries up to the store's cap.
    async fn merge(&self, records: &[SummaryRecord]) -> Result<MergeReport>;

    /// All archived records, oldest first
    async fn load(&self) -> Result<Vec<SummaryRecord>>;
}
