use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use sr_core::{Error, HistoryStore, MergeReport, Result, SummaryRecord};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

pub mod backends;

pub use backends::*;

/// Archive size kept by default
pub const DEFAULT_HISTORY_CAP: usize = 2000;

/// Anything a history archive can hold. Entries without a key are kept as
/// they are but never match an incoming record.
pub trait ArchiveEntry {
    fn archive_key(&self) -> Option<(&str, &str)>;
}

impl ArchiveEntry for SummaryRecord {
    fn archive_key(&self) -> Option<(&str, &str)> {
        Some(self.key())
    }
}

impl ArchiveEntry for Value {
    fn archive_key(&self) -> Option<(&str, &str)> {
        let title = self.get("title")?.as_str()?;
        let link = self.get("link")?.as_str()?;
        Some((title, link))
    }
}

fn owned_key<T: ArchiveEntry>(entry: &T) -> Option<(String, String)> {
    entry
        .archive_key()
        .map(|(title, link)| (title.to_string(), link.to_string()))
}

/// Append the entries of `incoming` whose (title, link) is not in `archive`
/// yet, then drop the oldest entries until at most `cap` remain.
pub fn merge_records<T: ArchiveEntry>(
    archive: &mut Vec<T>,
    incoming: impl IntoIterator<Item = T>,
    cap: usize,
) -> MergeReport {
    let mut seen: HashSet<(String, String)> = archive.iter().filter_map(owned_key).collect();

    let mut added = 0;
    for entry in incoming {
        let fresh = match owned_key(&entry) {
            Some(key) => seen.insert(key),
            None => true,
        };
        if fresh {
            archive.push(entry);
            added += 1;
        }
    }

    if archive.len() > cap {
        let excess = archive.len() - cap;
        archive.drain(..excess);
    }

    MergeReport {
        added,
        total: archive.len(),
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write `value` as pretty JSON next to `path`, then rename it into place so
/// readers never observe a partial file.
pub async fn write_json_atomic<T: Serialize + ?Sized>(path: impl AsRef<Path>, value: &T) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let tmp = temp_path(path);
    let bytes = serde_json::to_vec_pretty(value)?;
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    debug!("💾 Wrote {}", path.display());
    Ok(())
}

/// Read JSON from `path`, or return `fallback` if the file is missing or
/// unreadable.
pub async fn read_json_or<T: DeserializeOwned>(path: impl AsRef<Path>, fallback: T) -> T {
    let path = path.as_ref();
    let raw = match tokio::fs::read(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return fallback,
        Err(e) => {
            warn!("⚠️ Could not read {}: {}", path.display(), e);
            return fallback;
        }
    };
    match serde_json::from_slice(&raw) {
        Ok(value) => value,
        Err(e) => {
            warn!("⚠️ Ignoring malformed {}: {}", path.display(), e);
            fallback
        }
    }
}

/// Build a history store by name: `json` (file at `path`) or `memory`.
pub fn create_storage(kind: &str, path: impl Into<PathBuf>, cap: usize) -> Result<Arc<dyn HistoryStore>> {
    match kind {
        "json" => Ok(Arc::new(JsonHistoryStore::new(path).with_cap(cap))),
        "memory" => Ok(Arc::new(MemoryHistoryStore::new().with_cap(cap))),
        other => Err(Error::Storage(format!("Unknown storage backend: {}", other))),
    }
}

pub mod prelude {
    pub use super::backends::*;
    pub use super::{create_storage, merge_records, ArchiveEntry, write_json_atomic, DEFAULT_HISTORY_CAP};
}


#[cfg(test)]
mod tests {
    use super::test_support::record;
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_merge_skips_known_and_repeated_keys() {
        let mut archive = vec![record(1), record(2)];
        let incoming = vec![record(2), record(3), record(3), record(4)];

        let report = merge_records(&mut archive, incoming, DEFAULT_HISTORY_CAP);

        assert_eq!(report, MergeReport { added: 2, total: 4 });
        let links: Vec<&str> = archive.iter().map(|r| r.link.as_str()).collect();
        assert_eq!(
            links,
            vec!["https://example.com/1", "https://example.com/2", "https://example.com/3", "https://example.com/4"]
        );
    }

    #[test]
    fn test_merge_key_is_title_and_link() {
        let mut archive = vec![record(1)];
        let mut retitled = record(1);
        retitled.title = "Story 1, updated".to_string();

        let report = merge_records(&mut archive, [retitled], DEFAULT_HISTORY_CAP);
        assert_eq!(report.added, 1);
    }

    #[test]
    fn test_merge_keeps_most_recent_entries() {
        let mut archive: Vec<SummaryRecord> = (0..1995).map(record).collect();
        let incoming: Vec<SummaryRecord> = (1995..2010).map(record).collect();

        let report = merge_records(&mut archive, incoming, DEFAULT_HISTORY_CAP);

        assert_eq!(report, MergeReport { added: 15, total: 2000 });
        assert_eq!(archive.first().unwrap().title, "Story 10");
        assert_eq!(archive.last().unwrap().title, "Story 2009");
    }

    #[test]
    fn test_merge_keeps_opaque_entries() {
        let mut archive = vec![
            serde_json::json!({"title": "Story 1", "link": "https://example.com/1", "summary": ["a", "b"]}),
            serde_json::json!({"note": "no key at all"}),
        ];
        let incoming = vec![
            serde_json::to_value(record(1)).unwrap(),
            serde_json::to_value(record(2)).unwrap(),
        ];

        let report = merge_records(&mut archive, incoming, DEFAULT_HISTORY_CAP);

        assert_eq!(report, MergeReport { added: 1, total: 3 });
        assert_eq!(archive[0]["summary"].as_array().unwrap().len(), 2);
        assert_eq!(archive[1]["note"], "no key at all");
        assert_eq!(archive[2]["title"], "Story 2");
    }

    #[tokio::test]
    async fn test_atomic_write_leaves_no_temp_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("news-data.json");

        write_json_atomic(&path, &vec![record(1)]).await.unwrap();

        assert!(path.exists());
        assert!(!temp_path(&path).exists());
        let back: Vec<SummaryRecord> = read_json_or(&path, vec![]).await;
        assert_eq!(back, vec![record(1)]);
    }

    #[tokio::test]
    async fn test_atomic_write_keeps_unicode() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.json");
        write_json_atomic(&path, &"Cambridge’s plan").await.unwrap();
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("Cambridge’s plan"));
    }

    #[tokio::test]
    async fn test_read_json_falls_back() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        assert_eq!(read_json_or(&missing, 7u32).await, 7);

        let broken = dir.path().join("broken.json");
        std::fs::write(&broken, "{not json").unwrap();
        assert_eq!(read_json_or(&broken, 7u32).await, 7);
    }

    #[test]
    fn test_create_storage() {
        assert!(create_storage("json", "history.json", 10).is_ok());
        assert!(create_storage("memory", "", 10).is_ok());
        assert!(create_storage("qdrant", "", 10).is_err());
    }
}
