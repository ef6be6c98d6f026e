//! Events published by the face batch service
//!
//! Broadcast on an [`EventBus<FaceEvent>`](ifx_common::events::EventBus) and
//! forwarded to browsers over SSE. Each probe outcome is its own event, so
//! observers never need to read the live session.

use crate::models::{BatchState, BatchSummary, ProbeResult, ProgressState, SetKind, StateTransition};
use chrono::{DateTime, Utc};
use ifx_common::events::BusEvent;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum FaceEvent {
    /// Batch passed validation and the first probe is about to be submitted
    BatchStarted {
        session_id: Uuid,
        total_probes: usize,
        total_candidates: usize,
        threshold: f64,
        timestamp: DateTime<Utc>,
    },

    /// One probe resolved successfully (with or without matches)
    ProbeCompleted {
        session_id: Uuid,
        /// Position of the probe in the input set
        index: usize,
        result: ProbeResult,
        progress: ProgressState,
        timestamp: DateTime<Utc>,
    },

    /// One probe call failed; the batch continues
    ProbeFailed {
        session_id: Uuid,
        index: usize,
        probe_name: String,
        error_code: String,
        error: String,
        auth_failure: bool,
        progress: ProgressState,
        timestamp: DateTime<Utc>,
    },

    /// Every probe resolved
    BatchCompleted {
        session_id: Uuid,
        summary: BatchSummary,
        timestamp: DateTime<Utc>,
    },

    /// Batch torn down before every probe resolved
    BatchCancelled {
        session_id: Uuid,
        processed: usize,
        total: usize,
        timestamp: DateTime<Utc>,
    },

    /// Session lifecycle step, including the VALIDATING pass before RUNNING
    BatchStateChanged {
        session_id: Uuid,
        old_state: BatchState,
        new_state: BatchState,
        timestamp: DateTime<Utc>,
    },

    /// Precondition check failed; no calls were made
    BatchRejected {
        session_id: Uuid,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// The backend rejected our credentials; the front-end should log in again
    SessionInvalidated {
        session_id: Uuid,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// An input or comparison set was replaced by a new selection
    FileSetReplaced {
        set: SetKind,
        count: usize,
        timestamp: DateTime<Utc>,
    },

    ThresholdChanged {
        threshold: f64,
        timestamp: DateTime<Utc>,
    },
}

impl From<StateTransition> for FaceEvent {
    fn from(transition: StateTransition) -> Self {
        FaceEvent::BatchStateChanged {
            session_id: transition.session_id,
            old_state: transition.old_state,
            new_state: transition.new_state,
            timestamp: transition.transitioned_at,
        }
    }
}

impl BusEvent for FaceEvent {
    fn event_type(&self) -> &'static str {
        match self {
            FaceEvent::BatchStarted { .. } => "BatchStarted",
            FaceEvent::ProbeCompleted { .. } => "ProbeCompleted",
            FaceEvent::ProbeFailed { .. } => "ProbeFailed",
            FaceEvent::BatchCompleted { .. } => "BatchCompleted",
            FaceEvent::BatchCancelled { .. } => "BatchCancelled",
            FaceEvent::BatchStateChanged { .. } => "BatchStateChanged",
            FaceEvent::BatchRejected { .. } => "BatchRejected",
            FaceEvent::SessionInvalidated { .. } => "SessionInvalidated",
            FaceEvent::FileSetReplaced { .. } => "FileSetReplaced",
            FaceEvent::ThresholdChanged { .. } => "ThresholdChanged",
        }
    }
}
