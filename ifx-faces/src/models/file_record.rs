//! Uploaded file records and the ordered sets that own them
//!
//! A [`FileSet`] owns the content handles of its records and releases them
//! when it is dropped. Sets are shared behind `Arc` while a batch runs, so
//! release happens once, when the last owner lets go.

use crate::services::content_store::{ContentHandle, ContentStore};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which side of the comparison a set belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SetKind {
    /// Probe files, each compared against every candidate
    Input,
    /// Candidate files
    Comparison,
}

impl SetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SetKind::Input => "input",
            SetKind::Comparison => "comparison",
        }
    }
}

impl fmt::Display for SetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepted upload kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Image,
    Pdf,
}

/// One accepted upload
///
/// Immutable after creation. Clones share the same content handle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileRecord {
    /// Generated identifier, unique within its set (`input-…`, `comparison-…`)
    pub id: String,
    /// Original file name; the comparison backend reports matches by this name
    pub name: String,
    /// Media type used when forwarding the file
    pub media_type: String,
    pub kind: FileKind,
    pub size_bytes: usize,
    /// Handle to the bytes in the content store
    pub content: ContentHandle,
}

/// Ordered, non-empty collection of records from one user selection
///
/// Insertion order is processing order.
pub struct FileSet {
    kind: SetKind,
    records: Vec<FileRecord>,
    store: ContentStore,
}

impl FileSet {
    pub fn new(kind: SetKind, records: Vec<FileRecord>, store: ContentStore) -> Self {
        Self {
            kind,
            records,
            store,
        }
    }

    pub fn kind(&self) -> SetKind {
        self.kind
    }

    pub fn records(&self) -> &[FileRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FileRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&FileRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    /// First record with the given file name
    pub fn find_by_name(&self, name: &str) -> Option<&FileRecord> {
        self.records.iter().find(|r| r.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.name.as_str()).collect()
    }

    pub fn total_bytes(&self) -> usize {
        self.records.iter().map(|r| r.size_bytes).sum()
    }
}

impl Drop for FileSet {
    fn drop(&mut self) {
        let mut released = 0usize;
        for record in &self.records {
            match self.store.release(&record.content) {
                Ok(()) => released += 1,
                Err(e) => tracing::warn!(
                    set = %self.kind,
                    file = %record.name,
                    error = %e,
                    "Content handle release failed"
                ),
            }
        }
        tracing::debug!(set = %self.kind, released, "File set discarded");
    }
}

impl fmt::Debug for FileSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileSet")
            .field("kind", &self.kind)
            .field("records", &self.records)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(store: &ContentStore, id: &str, name: &str) -> FileRecord {
        FileRecord {
            id: id.to_string(),
            name: name.to_string(),
            media_type: "image/png".to_string(),
            kind: FileKind::Image,
            size_bytes: 3,
            content: store.acquire(vec![1, 2, 3]),
        }
    }

    #[test]
    fn test_lookup_by_id_and_name() {
        let store = ContentStore::new();
        let set = FileSet::new(
            SetKind::Comparison,
            vec![record(&store, "c-1", "x.png"), record(&store, "c-2", "y.png")],
            store.clone(),
        );

        assert_eq!(set.len(), 2);
        assert_eq!(set.get("c-2").unwrap().name, "y.png");
        assert_eq!(set.find_by_name("x.png").unwrap().id, "c-1");
        assert!(set.find_by_name("z.png").is_none());
        assert_eq!(set.names(), vec!["x.png", "y.png"]);
        assert_eq!(set.total_bytes(), 6);
    }

    #[test]
    fn test_drop_releases_every_handle_once() {
        let store = ContentStore::new();
        let a = record(&store, "i-1", "a.png");
        let b = record(&store, "i-2", "b.png");
        let (ha, hb) = (a.content, b.content);
        assert_eq!(store.live_count(), 2);

        drop(FileSet::new(SetKind::Input, vec![a, b], store.clone()));

        assert_eq!(store.live_count(), 0);
        assert!(!store.is_live(&ha));
        // A second release would be a double release
        assert!(store.release(&hb).is_err());
    }

    #[test]
    fn test_shared_set_releases_on_last_owner() {
        let store = ContentStore::new();
        let set = std::sync::Arc::new(FileSet::new(
            SetKind::Input,
            vec![record(&store, "i-1", "a.png")],
            store.clone(),
        ));
        let running_batch = std::sync::Arc::clone(&set);

        drop(set);
        assert_eq!(store.live_count(), 1, "batch still holds the set");

        drop(running_batch);
        assert_eq!(store.live_count(), 0);
    }

    #[test]
    fn test_set_kind_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&SetKind::Comparison).unwrap(), "\"comparison\"");
        let kind: SetKind = serde_json::from_str("\"input\"").unwrap();
        assert_eq!(kind, SetKind::Input);
    }
}
