//! Batch orchestrator
//!
//! Submits probes one at a time, in input order, each against the full
//! candidate set. A failed probe call is recorded and the batch moves on;
//! only a missing probe or candidate set stops a batch, and that happens
//! before any call is made.
//!
//! # Flow
//! IDLE → VALIDATING → RUNNING(1..N) → COMPLETED | COMPLETED_WITH_ERRORS
//! IDLE → REJECTED when a set is missing
//!
//! Every transition is published as [`FaceEvent::BatchStateChanged`].
//!
//! Progress is published as a stream of [`BatchUpdate`]s, each carrying an
//! immutable snapshot of the session. Dropping the stream abandons the
//! in-flight call and any pending probes.

use crate::error::ValidationError;
use crate::events::FaceEvent;
use crate::models::{
    BatchSession, BatchState, BatchSummary, FileRecord, FileSet, MatchResult, ProbeResult,
    SetKind, Threshold,
};
use crate::services::comparison_client::{CompareResponse, FaceComparator};
use crate::services::match_classifier::{build_match, classify};
use chrono::Utc;
use futures::stream::{Stream, StreamExt};
use ifx_common::events::EventBus;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// One step of a running batch
#[derive(Debug, Clone)]
pub enum BatchUpdate {
    /// Probe at `index` resolved (successfully or not)
    Probe {
        index: usize,
        result: Arc<ProbeResult>,
        snapshot: BatchSession,
    },
    /// All probes resolved; `snapshot` is the final session
    Completed {
        snapshot: BatchSession,
        summary: BatchSummary,
    },
}

impl BatchUpdate {
    pub fn snapshot(&self) -> &BatchSession {
        match self {
            BatchUpdate::Probe { snapshot, .. } | BatchUpdate::Completed { snapshot, .. } => snapshot,
        }
    }

    pub fn into_snapshot(self) -> BatchSession {
        match self {
            BatchUpdate::Probe { snapshot, .. } | BatchUpdate::Completed { snapshot, .. } => snapshot,
        }
    }
}

/// Batch orchestrator service
#[derive(Clone)]
pub struct BatchOrchestrator {
    comparator: Arc<dyn FaceComparator>,
    event_bus: EventBus<FaceEvent>,
    /// Pause between probes, for a smoother progress display
    step_delay: Duration,
}

impl BatchOrchestrator {
    pub fn new(comparator: Arc<dyn FaceComparator>, event_bus: EventBus<FaceEvent>) -> Self {
        Self {
            comparator,
            event_bus,
            step_delay: Duration::ZERO,
        }
    }

    pub fn with_step_delay(mut self, step_delay: Duration) -> Self {
        self.step_delay = step_delay;
        self
    }

    pub fn event_bus(&self) -> &EventBus<FaceEvent> {
        &self.event_bus
    }

    /// Both sets must be present and non-empty
    pub fn validate_inputs(
        probes: Option<&FileSet>,
        candidates: Option<&FileSet>,
    ) -> Result<(), ValidationError> {
        if probes.map_or(true, FileSet::is_empty) {
            return Err(ValidationError::MissingInput { set: SetKind::Input });
        }
        if candidates.map_or(true, FileSet::is_empty) {
            return Err(ValidationError::MissingInput { set: SetKind::Comparison });
        }
        Ok(())
    }

    /// Take an idle session through validation into RUNNING
    ///
    /// On failure the session ends REJECTED and no state beyond that is
    /// created.
    pub fn prepare_batch(
        &self,
        session: &mut BatchSession,
        probes: Option<&FileSet>,
        candidates: Option<&FileSet>,
    ) -> Result<(), ValidationError> {
        if let Err(e) = Self::validate_inputs(probes, candidates) {
            let rejected = session.transition_to(BatchState::Rejected);
            self.event_bus.emit_lossy(rejected.into());
            tracing::info!(session_id = %session.session_id, reason = %e, "Batch rejected");
            self.event_bus.emit_lossy(FaceEvent::BatchRejected {
                session_id: session.session_id,
                reason: e.to_string(),
                timestamp: Utc::now(),
            });
            return Err(e);
        }

        let (total_probes, total_candidates) = (
            probes.map_or(0, FileSet::len),
            candidates.map_or(0, FileSet::len),
        );

        let validating = session.transition_to(BatchState::Validating);
        self.event_bus.emit_lossy(validating.into());
        let running = session.begin(total_probes);
        self.event_bus.emit_lossy(running.into());

        tracing::info!(
            session_id = %session.session_id,
            probes = total_probes,
            candidates = total_candidates,
            threshold = %session.threshold,
            "Starting face comparison batch"
        );

        self.event_bus.emit_lossy(FaceEvent::BatchStarted {
            session_id: session.session_id,
            total_probes,
            total_candidates,
            threshold: session.threshold.value(),
            timestamp: Utc::now(),
        });

        Ok(())
    }

    /// Run a prepared session, yielding an update per probe and a final one
    pub fn stream_batch(
        &self,
        session: BatchSession,
        probes: Arc<FileSet>,
        candidates: Arc<FileSet>,
    ) -> impl Stream<Item = BatchUpdate> + Send + 'static {
        let comparator = Arc::clone(&self.comparator);
        let event_bus = self.event_bus.clone();
        let step_delay = self.step_delay;

        async_stream::stream! {
            let mut session = session;
            let threshold = session.threshold;
            let session_id = session.session_id;

            for (index, probe) in probes.iter().enumerate() {
                if index > 0 && !step_delay.is_zero() {
                    tokio::time::sleep(step_delay).await;
                }

                let outcome = comparator
                    .compare(std::slice::from_ref(probe), candidates.records(), threshold)
                    .await;

                let result = match outcome {
                    Ok(response) => {
                        let probe_result = collect_matches(probe, &response, &candidates, threshold);
                        tracing::debug!(
                            session_id = %session_id,
                            probe = %probe.name,
                            matches = probe_result.matches.len(),
                            "Probe compared"
                        );
                        let entry = session.record_success(probe_result);
                        event_bus.emit_lossy(FaceEvent::ProbeCompleted {
                            session_id,
                            index,
                            result: entry.as_ref().clone(),
                            progress: session.progress,
                            timestamp: Utc::now(),
                        });
                        entry
                    }
                    Err(e) => {
                        let auth_failure = e.is_auth_failure();
                        tracing::warn!(
                            session_id = %session_id,
                            probe = %probe.name,
                            error_code = e.code(),
                            error = %e,
                            "Probe comparison failed"
                        );
                        let entry = session.record_failure(probe, e.code(), e.to_string(), auth_failure);
                        event_bus.emit_lossy(FaceEvent::ProbeFailed {
                            session_id,
                            index,
                            probe_name: probe.name.clone(),
                            error_code: e.code().to_string(),
                            error: e.to_string(),
                            auth_failure,
                            progress: session.progress,
                            timestamp: Utc::now(),
                        });
                        if auth_failure {
                            tracing::warn!(session_id = %session_id, "Backend rejected credentials");
                            event_bus.emit_lossy(FaceEvent::SessionInvalidated {
                                session_id,
                                reason: e.to_string(),
                                timestamp: Utc::now(),
                            });
                        }
                        entry
                    }
                };

                yield BatchUpdate::Probe {
                    index,
                    result,
                    snapshot: session.clone(),
                };
            }

            event_bus.emit_lossy(session.finish().into());
            let summary = session.summary();

            tracing::info!(
                session_id = %session_id,
                state = ?summary.state,
                probes = summary.total_probes,
                matches = summary.total_matches,
                failed = summary.failed_probes.len(),
                duration_ms = summary.duration_ms,
                "Face comparison batch finished"
            );

            event_bus.emit_lossy(FaceEvent::BatchCompleted {
                session_id,
                summary: summary.clone(),
                timestamp: Utc::now(),
            });

            yield BatchUpdate::Completed { snapshot: session, summary };
        }
    }

    /// Validate the inputs and start a new batch
    pub fn submit_batch(
        &self,
        probes: Option<Arc<FileSet>>,
        candidates: Option<Arc<FileSet>>,
        threshold: Threshold,
    ) -> Result<impl Stream<Item = BatchUpdate> + Send + 'static, ValidationError> {
        let mut session = BatchSession::new(threshold);
        self.prepare_batch(&mut session, probes.as_deref(), candidates.as_deref())?;

        match (probes, candidates) {
            (Some(probes), Some(candidates)) => Ok(self.stream_batch(session, probes, candidates)),
            (None, _) => Err(ValidationError::MissingInput { set: SetKind::Input }),
            (_, None) => Err(ValidationError::MissingInput { set: SetKind::Comparison }),
        }
    }

    /// Drive a prepared session to completion or cancellation
    ///
    /// Every snapshot is published on `updates`. When `cancel` fires, the
    /// in-flight call is abandoned and the last published snapshot ends
    /// CANCELLED; nothing that resolves afterwards is applied.
    pub async fn execute_batch(
        &self,
        session: BatchSession,
        probes: Arc<FileSet>,
        candidates: Arc<FileSet>,
        cancel: CancellationToken,
        updates: &watch::Sender<BatchSession>,
    ) -> BatchSession {
        let mut last = session.clone();
        updates.send_replace(session.clone());

        let stream = self.stream_batch(session, probes, candidates);
        tokio::pin!(stream);

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    let cancelled = last.cancel();
                    self.event_bus.emit_lossy(cancelled.into());
                    tracing::info!(
                        session_id = %last.session_id,
                        processed = last.progress.current,
                        total = last.progress.total,
                        "Face comparison batch cancelled"
                    );
                    self.event_bus.emit_lossy(FaceEvent::BatchCancelled {
                        session_id: last.session_id,
                        processed: last.progress.current,
                        total: last.progress.total,
                        timestamp: Utc::now(),
                    });
                    updates.send_replace(last.clone());
                    return last;
                }

                update = stream.next() => match update {
                    Some(update) => {
                        let done = matches!(update, BatchUpdate::Completed { .. });
                        last = update.into_snapshot();
                        updates.send_replace(last.clone());
                        if done {
                            return last;
                        }
                    }
                    None => return last,
                },
            }
        }
    }

    /// Submit and wait for the whole batch
    pub async fn run_batch(
        &self,
        probes: Arc<FileSet>,
        candidates: Arc<FileSet>,
        threshold: Threshold,
    ) -> Result<BatchSession, ValidationError> {
        let stream = self.submit_batch(Some(probes), Some(candidates), threshold)?;
        tokio::pin!(stream);

        let mut last = None;
        while let Some(update) = stream.next().await {
            last = Some(update.into_snapshot());
        }
        Ok(last.unwrap_or_else(|| BatchSession::new(threshold)))
    }
}

/// Turn a backend response into the probe's result
///
/// Only `matched` entries for this probe's file name are kept. Each is
/// resolved back to its candidate record by name; names the candidate set
/// does not contain get a generated id so the match is still reported.
fn collect_matches(
    probe: &FileRecord,
    response: &CompareResponse,
    candidates: &FileSet,
    threshold: Threshold,
) -> ProbeResult {
    let matches: Vec<MatchResult> = response
        .matches_for(&probe.name)
        .map(|m| match candidates.find_by_name(&m.compare_file) {
            Some(candidate) => build_match(candidate, m.result, m.distance, threshold),
            None => MatchResult {
                candidate_id: format!("match-{}", Uuid::new_v4()),
                candidate_name: m.compare_file.clone(),
                score: m.result,
                distance: m.distance,
                tier: classify(m.result, threshold),
            },
        })
        .collect();

    for error in &response.errors {
        tracing::warn!(probe = %probe.name, error = %error, "Backend reported a file error");
    }

    ProbeResult::matched(probe.clone(), matches, response.errors.clone())
}
