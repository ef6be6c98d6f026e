//! Face workspace: the owned state behind the HTTP surface
//!
//! Holds the current input and comparison sets, the threshold control, and
//! the latest batch session. At most one batch runs at a time; it runs on
//! its own task and publishes snapshots through a `watch` channel, so
//! readers never share mutable state with the orchestrator.

use crate::error::BatchError;
use crate::events::FaceEvent;
use crate::models::{BatchSession, FileRecord, FileSet, SetKind, Threshold};
use crate::services::batch_orchestrator::BatchOrchestrator;
use crate::services::content_store::HandleError;
use crate::services::file_set_collector::{FileSetCollector, RawFile};
use crate::services::result_exporter::{self, ExportError, ExportFile, ExportFormat};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

struct ActiveBatch {
    cancel_token: CancellationToken,
    handle: JoinHandle<BatchSession>,
}

pub struct FaceWorkspace {
    collector: FileSetCollector,
    orchestrator: BatchOrchestrator,
    input: Option<Arc<FileSet>>,
    comparison: Option<Arc<FileSet>>,
    threshold: Threshold,
    session: Option<watch::Receiver<BatchSession>>,
    active: Option<ActiveBatch>,
}

impl FaceWorkspace {
    pub fn new(collector: FileSetCollector, orchestrator: BatchOrchestrator, threshold: Threshold) -> Self {
        Self {
            collector,
            orchestrator,
            input: None,
            comparison: None,
            threshold,
            session: None,
            active: None,
        }
    }

    fn emit(&self, event: FaceEvent) {
        self.orchestrator.event_bus().emit_lossy(event);
    }

    /// Replace a set with a new selection
    ///
    /// The previous set is released once nothing else holds it (a running
    /// batch keeps its own reference). An unusable selection leaves the
    /// current set in place.
    pub fn replace_set(&mut self, kind: SetKind, files: Vec<RawFile>) -> Result<Arc<FileSet>, BatchError> {
        let set = Arc::new(self.collector.collect(kind, files)?);
        let slot = match kind {
            SetKind::Input => &mut self.input,
            SetKind::Comparison => &mut self.comparison,
        };
        *slot = Some(Arc::clone(&set));

        self.emit(FaceEvent::FileSetReplaced {
            set: kind,
            count: set.len(),
            timestamp: Utc::now(),
        });
        Ok(set)
    }

    pub fn file_set(&self, kind: SetKind) -> Option<Arc<FileSet>> {
        match kind {
            SetKind::Input => self.input.clone(),
            SetKind::Comparison => self.comparison.clone(),
        }
    }

    /// Look a record up by id in either set
    pub fn find_record(&self, id: &str) -> Option<FileRecord> {
        [&self.input, &self.comparison]
            .into_iter()
            .flatten()
            .find_map(|set| set.get(id).cloned())
    }

    /// Record and bytes for a preview
    pub fn file_content(&self, id: &str) -> Option<Result<(FileRecord, Arc<[u8]>), HandleError>> {
        let record = self.find_record(id)?;
        Some(
            self.collector
                .store()
                .read(&record.content)
                .map(|bytes| (record, bytes)),
        )
    }

    /// Uploads currently held in the content store: `(files, bytes)`
    pub fn stored_content(&self) -> (usize, usize) {
        let store = self.collector.store();
        (store.live_count(), store.live_bytes())
    }

    pub fn threshold(&self) -> Threshold {
        self.threshold
    }

    /// Change the threshold for the next batch; disabled while one runs
    pub fn set_threshold(&mut self, value: f64) -> Result<Threshold, BatchError> {
        if self.is_running() {
            return Err(BatchError::AlreadyRunning);
        }
        self.threshold = Threshold::new(value);
        self.emit(FaceEvent::ThresholdChanged {
            threshold: self.threshold.value(),
            timestamp: Utc::now(),
        });
        Ok(self.threshold)
    }

    pub fn is_running(&self) -> bool {
        self.active.as_ref().is_some_and(|a| !a.handle.is_finished())
    }

    /// Validate the current sets and start a batch on a background task
    ///
    /// Returns the session as it entered RUNNING. A rejected batch leaves
    /// the previous session's results in place.
    pub fn start_batch(&mut self) -> Result<BatchSession, BatchError> {
        if self.is_running() {
            return Err(BatchError::AlreadyRunning);
        }

        let mut session = BatchSession::new(self.threshold);
        self.orchestrator
            .prepare_batch(&mut session, self.input.as_deref(), self.comparison.as_deref())?;

        let (Some(probes), Some(candidates)) = (self.input.clone(), self.comparison.clone()) else {
            return Err(BatchError::NoSession);
        };

        let (tx, rx) = watch::channel(session.clone());
        let cancel_token = CancellationToken::new();
        let orchestrator = self.orchestrator.clone();
        let task_token = cancel_token.clone();
        let started = session.clone();
        let session_id = session.session_id;

        let handle = tokio::spawn(async move {
            tracing::debug!(session_id = %session_id, "Batch task started");
            orchestrator
                .execute_batch(session, probes, candidates, task_token, &tx)
                .await
        });

        self.session = Some(rx);
        self.active = Some(ActiveBatch { cancel_token, handle });
        Ok(started)
    }

    /// Cancel the running batch and wait for its final (CANCELLED) snapshot
    pub async fn cancel_batch(&mut self) -> Result<BatchSession, BatchError> {
        if !self.is_running() {
            return Err(BatchError::NotRunning);
        }
        let active = self.active.take().ok_or(BatchError::NotRunning)?;
        active.cancel_token.cancel();
        self.join(active.handle).await
    }

    /// Wait for the running batch, if any, to finish
    pub async fn wait_for_batch(&mut self) -> Result<BatchSession, BatchError> {
        match self.active.take() {
            Some(active) => self.join(active.handle).await,
            None => self.snapshot().ok_or(BatchError::NoSession),
        }
    }

    async fn join(&self, handle: JoinHandle<BatchSession>) -> Result<BatchSession, BatchError> {
        match handle.await {
            Ok(session) => Ok(session),
            Err(e) => {
                tracing::error!(error = %e, "Batch task failed");
                self.snapshot().ok_or(BatchError::NoSession)
            }
        }
    }

    /// Latest published session snapshot
    pub fn snapshot(&self) -> Option<BatchSession> {
        self.session.as_ref().map(|rx| rx.borrow().clone())
    }

    pub fn subscribe_session(&self) -> Option<watch::Receiver<BatchSession>> {
        self.session.clone()
    }

    /// Export the latest session's results
    pub fn export(&self, format: ExportFormat) -> Result<ExportFile, BatchError> {
        let session = self.snapshot().ok_or(ExportError::NoResultsToExport)?;
        Ok(result_exporter::export(&session.results, session.threshold, format)?)
    }

    /// Drop both sets and the last session, cancelling any running batch
    pub fn reset(&mut self) {
        if let Some(active) = self.active.take() {
            active.cancel_token.cancel();
        }
        self.input = None;
        self.comparison = None;
        self.session = None;
        tracing::info!("Workspace reset");
    }
}

impl Drop for FaceWorkspace {
    fn drop(&mut self) {
        if let Some(active) = self.active.take() {
            active.cancel_token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use crate::models::BatchState;
    use crate::services::comparison_client::{CompareResponse, ComparisonError, FaceComparator};
    use async_trait::async_trait;
    use ifx_common::events::EventBus;
    use std::time::Duration;

    /// Answers every probe with no matches after `delay`
    struct Quiet {
        delay: Duration,
    }

    #[async_trait]
    impl FaceComparator for Quiet {
        async fn compare(
            &self,
            _probes: &[FileRecord],
            _candidates: &[FileRecord],
            _threshold: Threshold,
        ) -> Result<CompareResponse, ComparisonError> {
            tokio::time::sleep(self.delay).await;
            Ok(CompareResponse::default())
        }
    }

    fn workspace(delay_ms: u64) -> FaceWorkspace {
        let collector = FileSetCollector::default();
        let orchestrator = BatchOrchestrator::new(
            Arc::new(Quiet { delay: Duration::from_millis(delay_ms) }),
            EventBus::new(100),
        );
        FaceWorkspace::new(collector, orchestrator, Threshold::default())
    }

    fn images(names: &[&str]) -> Vec<RawFile> {
        names
            .iter()
            .map(|n| RawFile::new(*n, Some("image/png"), vec![1, 2, 3]))
            .collect()
    }

    #[tokio::test]
    async fn test_start_requires_both_sets() {
        let mut ws = workspace(0);
        ws.replace_set(SetKind::Input, images(&["a.png"])).unwrap();

        let err = ws.start_batch().unwrap_err();
        assert!(matches!(
            err,
            BatchError::Validation(ValidationError::MissingInput { set: SetKind::Comparison })
        ));
        assert!(ws.snapshot().is_none());
    }

    #[tokio::test]
    async fn test_batch_runs_to_completion() {
        let mut ws = workspace(0);
        ws.replace_set(SetKind::Input, images(&["a.png", "b.png"])).unwrap();
        ws.replace_set(SetKind::Comparison, images(&["x.png"])).unwrap();

        let started = ws.start_batch().unwrap();
        assert_eq!(started.state, BatchState::Running);
        assert_eq!(started.progress.total, 2);

        let done = ws.wait_for_batch().await.unwrap();
        assert_eq!(done.state, BatchState::Completed);
        assert_eq!(ws.snapshot().unwrap().progress.current, 2);
        assert!(!ws.is_running());
    }

    #[tokio::test]
    async fn test_second_start_and_threshold_change_rejected_while_running() {
        let mut ws = workspace(200);
        ws.replace_set(SetKind::Input, images(&["a.png"])).unwrap();
        ws.replace_set(SetKind::Comparison, images(&["x.png"])).unwrap();
        ws.start_batch().unwrap();

        assert!(matches!(ws.start_batch(), Err(BatchError::AlreadyRunning)));
        assert!(matches!(ws.set_threshold(70.0), Err(BatchError::AlreadyRunning)));
        assert_eq!(ws.threshold().value(), 50.0);

        let cancelled = ws.cancel_batch().await.unwrap();
        assert_eq!(cancelled.state, BatchState::Cancelled);
        assert_eq!(ws.set_threshold(70.0).unwrap().value(), 70.0);
        assert_eq!(ws.set_threshold(10.0).unwrap().value(), Threshold::MIN);
    }

    #[tokio::test]
    async fn test_replacing_a_set_releases_old_content() {
        let mut ws = workspace(0);
        ws.replace_set(SetKind::Input, images(&["a.png", "b.png"])).unwrap();
        assert_eq!(ws.collector.store().live_count(), 2);

        ws.replace_set(SetKind::Input, images(&["c.png"])).unwrap();
        assert_eq!(ws.collector.store().live_count(), 1);

        // Unusable selection keeps the current set
        let err = ws
            .replace_set(SetKind::Input, vec![RawFile::new("n.txt", Some("text/plain"), vec![0])])
            .unwrap_err();
        assert!(matches!(err, BatchError::Validation(ValidationError::NoValidFiles { .. })));
        assert_eq!(ws.file_set(SetKind::Input).unwrap().names(), vec!["c.png"]);

        ws.reset();
        assert_eq!(ws.collector.store().live_count(), 0);
    }

    #[tokio::test]
    async fn test_file_content_lookup() {
        let mut ws = workspace(0);
        let set = ws.replace_set(SetKind::Comparison, images(&["x.png"])).unwrap();
        let id = set.records()[0].id.clone();

        let (record, bytes) = ws.file_content(&id).unwrap().unwrap();
        assert_eq!(record.name, "x.png");
        assert_eq!(&*bytes, &[1, 2, 3]);
        assert!(ws.file_content("comparison-missing").is_none());
    }

    #[tokio::test]
    async fn test_export_without_session() {
        let ws = workspace(0);
        assert!(matches!(
            ws.export(ExportFormat::Csv),
            Err(BatchError::Export(ExportError::NoResultsToExport))
        ));
    }
}
