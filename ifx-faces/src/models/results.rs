//! Per-probe comparison results and the append-only result log

use super::file_record::FileRecord;
use serde::{Deserialize, Serialize, Serializer};
use std::sync::Arc;

/// Display tier of a match relative to the batch threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchTier {
    /// At least fifteen points above threshold
    Strong,
    /// At or above threshold, less than fifteen points over
    Borderline,
    /// Below threshold
    None,
}

impl MatchTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchTier::Strong => "strong",
            MatchTier::Borderline => "borderline",
            MatchTier::None => "none",
        }
    }
}

/// One candidate the backend reported as matching a probe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub candidate_id: String,
    pub candidate_name: String,
    /// Similarity reported by the backend (`result`), 0–100 scale
    pub score: f64,
    /// Raw distance the backend computed before thresholding
    pub distance: f64,
    pub tier: MatchTier,
}

/// Outcome of comparing one probe against the candidate set
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbeResult {
    pub probe: FileRecord,
    pub matches: Vec<MatchResult>,
    /// Per-file errors the backend reported alongside a successful response
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub backend_errors: Vec<String>,
    /// Set when the comparison call itself failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProbeResult {
    pub fn matched(probe: FileRecord, matches: Vec<MatchResult>, backend_errors: Vec<String>) -> Self {
        Self {
            probe,
            matches,
            backend_errors,
            error: None,
        }
    }

    /// Placeholder keeping a failed probe's position in the result log
    pub fn failed(probe: FileRecord, error: String) -> Self {
        Self {
            probe,
            matches: Vec::new(),
            backend_errors: Vec::new(),
            error: Some(error),
        }
    }

    pub fn has_matches(&self) -> bool {
        !self.matches.is_empty()
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}

/// Append-only log of probe results in probe order
///
/// Entries are immutable once appended; clones share them, so a clone is a
/// cheap point-in-time snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    entries: Vec<Arc<ProbeResult>>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn append(&mut self, result: ProbeResult) -> Arc<ProbeResult> {
        let entry = Arc::new(result);
        self.entries.push(Arc::clone(&entry));
        entry
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ProbeResult> {
        self.entries.get(index).map(|e| e.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProbeResult> + '_ {
        self.entries.iter().map(|e| e.as_ref())
    }

    /// Probes that matched at least one candidate, in probe order
    pub fn with_matches(&self) -> impl Iterator<Item = &ProbeResult> + '_ {
        self.iter().filter(|r| r.has_matches())
    }

    pub fn total_matches(&self) -> usize {
        self.iter().map(|r| r.matches.len()).sum()
    }

    /// Probes whose comparison call failed
    pub fn failed_count(&self) -> usize {
        self.iter().filter(|r| r.is_failed()).count()
    }
}

impl Serialize for ResultSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}
