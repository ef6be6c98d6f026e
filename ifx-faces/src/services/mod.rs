//! Service modules for the face comparison batch pipeline
//!
//! - `content_store`: revocable handles to uploaded bytes
//! - `file_set_collector`: selection → validated [`FileSet`](crate::models::FileSet)
//! - `comparison_client`: backend HTTP client behind the [`FaceComparator`] trait
//! - `match_classifier`: display tiers
//! - `batch_orchestrator`: sequential per-probe submission
//! - `result_exporter`: JSON / CSV downloads
//! - `workspace`: owned state driven by the HTTP API

pub mod batch_orchestrator;
pub mod comparison_client;
pub mod content_store;
pub mod file_set_collector;
pub mod match_classifier;
pub mod result_exporter;
pub mod workspace;

pub use batch_orchestrator::{BatchOrchestrator, BatchUpdate};
pub use comparison_client::{
    CompareMatch, CompareResponse, ComparisonClient, ComparisonError, FaceComparator,
};
pub use content_store::{ContentHandle, ContentStore, HandleError, HandleId};
pub use file_set_collector::{accepted_media_type, FileSetCollector, RawFile};
pub use match_classifier::{classify, STRONG_MATCH_HEADROOM};
pub use result_exporter::{export, ExportError, ExportFile, ExportFormat};
pub use workspace::FaceWorkspace;
