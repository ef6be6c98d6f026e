//! Batch state machine
//!
//! A batch session moves through:
//! IDLE → VALIDATING → RUNNING → COMPLETED | COMPLETED_WITH_ERRORS
//! with IDLE → REJECTED when a probe or candidate set is missing and
//! RUNNING → CANCELLED when the owner tears the batch down.

use super::file_record::FileRecord;
use super::progress::ProgressState;
use super::results::{ProbeResult, ResultSet};
use super::threshold::Threshold;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Batch workflow state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchState {
    Idle,
    Validating,
    /// Probes are being submitted; `progress.current` is the number resolved
    Running,
    Completed,
    /// Completed, but at least one probe call failed
    CompletedWithErrors,
    /// Inputs failed the precondition check; no calls were made
    Rejected,
    Cancelled,
}

impl BatchState {
    /// Wire name, as serialized
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchState::Idle => "IDLE",
            BatchState::Validating => "VALIDATING",
            BatchState::Running => "RUNNING",
            BatchState::Completed => "COMPLETED",
            BatchState::CompletedWithErrors => "COMPLETED_WITH_ERRORS",
            BatchState::Rejected => "REJECTED",
            BatchState::Cancelled => "CANCELLED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BatchState::Completed
                | BatchState::CompletedWithErrors
                | BatchState::Rejected
                | BatchState::Cancelled
        )
    }

    pub fn is_active(&self) -> bool {
        matches!(self, BatchState::Validating | BatchState::Running)
    }
}

/// State transition record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub session_id: Uuid,
    pub old_state: BatchState,
    pub new_state: BatchState,
    pub transitioned_at: DateTime<Utc>,
}

/// One failed probe call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeFailure {
    /// Position of the probe in the input set
    pub index: usize,
    pub probe_id: String,
    pub probe_name: String,
    /// Error code (e.g. "NETWORK_ERROR", "AUTH_FAILURE")
    pub error_code: String,
    pub message: String,
    /// The backend rejected our credentials (HTTP 401)
    pub auth_failure: bool,
    pub occurred_at: DateTime<Utc>,
}

/// Batch session: the owned state of one batch run
///
/// Passed into and returned from the orchestrator; observers get clones.
#[derive(Debug, Clone, Serialize)]
pub struct BatchSession {
    pub session_id: Uuid,
    pub state: BatchState,
    /// Fixed for the lifetime of the session
    pub threshold: Threshold,
    pub progress: ProgressState,
    pub results: ResultSet,
    /// Failed probes in the order they failed
    pub failures: Vec<ProbeFailure>,
    /// Index of the most recently completed probe with at least one match
    pub selected: Option<usize>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl BatchSession {
    pub fn new(threshold: Threshold) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            state: BatchState::Idle,
            threshold,
            progress: ProgressState::default(),
            results: ResultSet::new(),
            failures: Vec::new(),
            selected: None,
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    /// Transition to new state
    pub fn transition_to(&mut self, new_state: BatchState) -> StateTransition {
        let transition = StateTransition {
            session_id: self.session_id,
            old_state: self.state,
            new_state,
            transitioned_at: Utc::now(),
        };
        self.state = new_state;

        if new_state.is_terminal() {
            self.ended_at = Some(Utc::now());
        }

        transition
    }

    /// Reset accumulators and enter RUNNING for `total` probes
    pub fn begin(&mut self, total: usize) -> StateTransition {
        self.progress = ProgressState::start(total);
        self.results = ResultSet::new();
        self.failures.clear();
        self.selected = None;
        self.started_at = Utc::now();
        self.ended_at = None;
        self.transition_to(BatchState::Running)
    }

    /// Append a resolved probe and advance progress
    pub fn record_success(&mut self, result: ProbeResult) -> Arc<ProbeResult> {
        let index = self.results.len();
        let has_matches = result.has_matches();
        let entry = self.results.append(result);
        if has_matches {
            self.selected = Some(index);
        }
        self.progress.advance();
        entry
    }

    /// Append an empty result for a failed probe, note the failure and advance progress
    pub fn record_failure(
        &mut self,
        probe: &FileRecord,
        error_code: &str,
        message: String,
        auth_failure: bool,
    ) -> Arc<ProbeResult> {
        let index = self.results.len();
        self.failures.push(ProbeFailure {
            index,
            probe_id: probe.id.clone(),
            probe_name: probe.name.clone(),
            error_code: error_code.to_string(),
            message: message.clone(),
            auth_failure,
            occurred_at: Utc::now(),
        });
        let entry = self.results.append(ProbeResult::failed(probe.clone(), message));
        self.progress.advance();
        entry
    }

    /// Finalize progress and enter COMPLETED or COMPLETED_WITH_ERRORS
    pub fn finish(&mut self) -> StateTransition {
        self.progress.complete();
        let state = if self.failures.is_empty() {
            BatchState::Completed
        } else {
            BatchState::CompletedWithErrors
        };
        self.transition_to(state)
    }

    pub fn cancel(&mut self) -> StateTransition {
        self.transition_to(BatchState::Cancelled)
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn is_running(&self) -> bool {
        self.state.is_active()
    }

    pub fn selected_result(&self) -> Option<&ProbeResult> {
        self.selected.and_then(|i| self.results.get(i))
    }

    pub fn failed_probe_names(&self) -> Vec<String> {
        self.failures.iter().map(|f| f.probe_name.clone()).collect()
    }

    pub fn summary(&self) -> BatchSummary {
        let duration_ms = self
            .ended_at
            .unwrap_or_else(Utc::now)
            .signed_duration_since(self.started_at)
            .num_milliseconds()
            .max(0) as u64;

        BatchSummary {
            session_id: self.session_id,
            state: self.state,
            total_probes: self.progress.total,
            processed: self.progress.current,
            total_matches: self.results.total_matches(),
            probes_with_matches: self.results.with_matches().count(),
            failed_probes: self.failed_probe_names(),
            auth_failures: self.failures.iter().filter(|f| f.auth_failure).count(),
            duration_ms,
        }
    }
}

/// End-of-batch report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub session_id: Uuid,
    pub state: BatchState,
    pub total_probes: usize,
    pub processed: usize,
    pub total_matches: usize,
    pub probes_with_matches: usize,
    /// Names of probes whose comparison call failed, in probe order
    pub failed_probes: Vec<String>,
    pub auth_failures: usize,
    pub duration_ms: u64,
}

impl BatchSummary {
    pub fn has_errors(&self) -> bool {
        !self.failed_probes.is_empty()
    }

    /// One-line result for notifications
    pub fn message(&self) -> String {
        let mut message = format!(
            "Found {} matches for {} out of {} images.",
            self.total_matches, self.probes_with_matches, self.total_probes
        );
        if self.has_errors() {
            message.push_str(&format!(
                " {} image(s) could not be processed.",
                self.failed_probes.len()
            ));
        }
        message
    }
}
