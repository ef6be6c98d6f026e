//! Turns a user file selection into a validated [`FileSet`]
//!
//! Only images and PDF documents are accepted. Each accepted file is parked
//! in the [`ContentStore`] and gets a fresh id (`input-…` / `comparison-…`).

use crate::error::ValidationError;
use crate::models::{FileKind, FileRecord, FileSet, SetKind};
use crate::services::content_store::ContentStore;
use std::collections::HashSet;
use std::path::Path;
use uuid::Uuid;

/// A file as selected by the user, before validation
#[derive(Debug, Clone)]
pub struct RawFile {
    pub name: String,
    /// Declared media type, if the selection carried one
    pub media_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl RawFile {
    pub fn new(name: impl Into<String>, media_type: Option<&str>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.map(str::to_string),
            bytes,
        }
    }

    /// Read a file from disk; the media type is left for detection
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self {
            name,
            media_type: None,
            bytes,
        })
    }
}

/// Builds file sets from raw selections
#[derive(Clone, Default)]
pub struct FileSetCollector {
    store: ContentStore,
}

impl FileSetCollector {
    pub fn new(store: ContentStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &ContentStore {
        &self.store
    }

    /// Filter, de-duplicate and register a selection
    ///
    /// Files with an unsupported media type or no name are skipped, as are
    /// repeated names (the backend reports matches by file name). Fails with
    /// [`ValidationError::NoValidFiles`] when nothing survives.
    pub fn collect(&self, kind: SetKind, files: Vec<RawFile>) -> Result<FileSet, ValidationError> {
        let offered = files.len();
        let mut seen = HashSet::new();
        let mut records = Vec::new();

        for file in files {
            if file.name.trim().is_empty() {
                tracing::debug!(set = %kind, "Skipping file without a name");
                continue;
            }

            let Some((media_type, file_kind)) =
                accepted_media_type(file.media_type.as_deref(), &file.bytes)
            else {
                tracing::debug!(
                    set = %kind,
                    file = %file.name,
                    declared = ?file.media_type,
                    "Skipping unsupported file type"
                );
                continue;
            };

            if !seen.insert(file.name.clone()) {
                tracing::debug!(set = %kind, file = %file.name, "Skipping duplicate file name");
                continue;
            }

            let size_bytes = file.bytes.len();
            let content = self.store.acquire(file.bytes);
            records.push(FileRecord {
                id: format!("{}-{}", kind.as_str(), Uuid::new_v4()),
                name: file.name,
                media_type,
                kind: file_kind,
                size_bytes,
                content,
            });
        }

        if records.is_empty() {
            tracing::info!(set = %kind, offered, "No valid files in selection");
            return Err(ValidationError::NoValidFiles { set: kind });
        }

        tracing::info!(set = %kind, offered, accepted = records.len(), "File set collected");
        Ok(FileSet::new(kind, records, self.store.clone()))
    }
}

/// Decide whether a file is an accepted type
///
/// The declared type wins; magic bytes are consulted only when the type is
/// missing or the generic `application/octet-stream`.
pub fn accepted_media_type(declared: Option<&str>, bytes: &[u8]) -> Option<(String, FileKind)> {
    let declared = declared
        .map(|d| d.split(';').next().unwrap_or_default().trim().to_ascii_lowercase())
        .filter(|d| !d.is_empty() && d != "application/octet-stream");

    let media_type = match declared {
        Some(d) => d,
        None => infer::get(bytes)?.mime_type().to_string(),
    };

    let kind = if media_type.starts_with("image/") {
        FileKind::Image
    } else if media_type == "application/pdf" {
        FileKind::Pdf
    } else {
        return None;
    };

    Some((media_type, kind))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
    const PDF_MAGIC: &[u8] = b"%PDF-1.7\n";

    #[test]
    fn test_collect_filters_unsupported_types() {
        let collector = FileSetCollector::default();
        let set = collector
            .collect(
                SetKind::Input,
                vec![
                    RawFile::new("a.jpg", Some("image/jpeg"), vec![1, 2, 3]),
                    RawFile::new("notes.txt", Some("text/plain"), vec![4]),
                    RawFile::new("doc.pdf", Some("application/pdf"), vec![5]),
                ],
            )
            .unwrap();

        assert_eq!(set.names(), vec!["a.jpg", "doc.pdf"]);
        assert_eq!(set.records()[1].kind, FileKind::Pdf);
        assert!(set.iter().all(|r| r.id.starts_with("input-")));
        assert_eq!(collector.store().live_count(), 2);
    }

    #[test]
    fn test_collect_rejects_empty_result() {
        let collector = FileSetCollector::default();
        let err = collector
            .collect(
                SetKind::Comparison,
                vec![RawFile::new("song.mp3", Some("audio/mpeg"), vec![0])],
            )
            .unwrap_err();
        assert_eq!(err, ValidationError::NoValidFiles { set: SetKind::Comparison });
        assert_eq!(collector.store().live_count(), 0);

        let err = collector.collect(SetKind::Input, Vec::new()).unwrap_err();
        assert_eq!(err, ValidationError::NoValidFiles { set: SetKind::Input });
    }

    #[test]
    fn test_collect_keeps_first_of_duplicate_names() {
        let collector = FileSetCollector::default();
        let set = collector
            .collect(
                SetKind::Comparison,
                vec![
                    RawFile::new("x.png", Some("image/png"), vec![1]),
                    RawFile::new("x.png", Some("image/png"), vec![2, 2]),
                    RawFile::new("y.png", Some("image/png"), vec![3]),
                ],
            )
            .unwrap();

        assert_eq!(set.names(), vec!["x.png", "y.png"]);
        assert_eq!(set.records()[0].size_bytes, 1);
        assert_eq!(collector.store().live_count(), 2);
    }

    #[test]
    fn test_ids_unique_and_insertion_order_kept() {
        let collector = FileSetCollector::default();
        let files = (0..20)
            .map(|i| RawFile::new(format!("{i}.jpg"), Some("image/jpeg"), vec![i as u8]))
            .collect();
        let set = collector.collect(SetKind::Input, files).unwrap();

        let ids: HashSet<&str> = set.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids.len(), 20);
        let expected: Vec<String> = (0..20).map(|i| format!("{i}.jpg")).collect();
        assert_eq!(set.names(), expected.iter().map(String::as_str).collect::<Vec<_>>());
    }

    #[test]
    fn test_media_type_detection() {
        assert_eq!(
            accepted_media_type(Some("image/JPEG; charset=binary"), &[]),
            Some(("image/jpeg".to_string(), FileKind::Image))
        );
        assert_eq!(
            accepted_media_type(None, PNG_MAGIC),
            Some(("image/png".to_string(), FileKind::Image))
        );
        assert_eq!(
            accepted_media_type(Some("application/octet-stream"), PDF_MAGIC),
            Some(("application/pdf".to_string(), FileKind::Pdf))
        );
        // Declared type is trusted over content
        assert_eq!(accepted_media_type(Some("text/plain"), PNG_MAGIC), None);
        assert_eq!(accepted_media_type(None, b"plain text"), None);
    }

    #[tokio::test]
    async fn test_raw_file_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("probe.png");
        tokio::fs::write(&path, PNG_MAGIC).await.unwrap();

        let raw = RawFile::from_path(&path).await.unwrap();
        assert_eq!(raw.name, "probe.png");
        assert!(raw.media_type.is_none());

        let set = FileSetCollector::default().collect(SetKind::Input, vec![raw]).unwrap();
        assert_eq!(set.records()[0].media_type, "image/png");
    }

    #[test]
    fn test_dropping_set_releases_content() {
        let collector = FileSetCollector::default();
        let set = collector
            .collect(SetKind::Input, vec![RawFile::new("a.jpg", Some("image/jpeg"), vec![1])])
            .unwrap();
        assert_eq!(collector.store().live_count(), 1);
        drop(set);
        assert_eq!(collector.store().live_count(), 0);
    }
}
