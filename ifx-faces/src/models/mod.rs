//! Data models for ifx-faces
//!
//! - File records and the sets that own their content
//! - Threshold, progress and per-probe results
//! - Batch session state machine

pub mod batch_session;
pub mod file_record;
pub mod progress;
pub mod results;
pub mod threshold;

pub use batch_session::{BatchSession, BatchState, BatchSummary, ProbeFailure, StateTransition};
pub use file_record::{FileKind, FileRecord, FileSet, SetKind};
pub use progress::ProgressState;
pub use results::{MatchResult, MatchTier, ProbeResult, ResultSet};
pub use threshold::Threshold;
