//! Batch control handlers
//!
//! PUT /faces/threshold, POST /faces/batch, GET /faces/batch,
//! POST /faces/batch/cancel, GET /faces/batch/results, POST /faces/reset

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{ApiResult, BatchError},
    models::{BatchState, BatchSummary, ProbeFailure, ProbeResult, ProgressState, Threshold},
    AppState,
};

/// PUT /faces/threshold request
#[derive(Debug, Deserialize)]
pub struct ThresholdRequest {
    pub threshold: f64,
}

/// Threshold response
#[derive(Debug, Serialize)]
pub struct ThresholdResponse {
    pub threshold: f64,
    /// Requested value was outside the accepted range and was replaced
    pub clamped: bool,
    pub min: f64,
    pub max: f64,
}

/// POST /faces/batch response
#[derive(Debug, Serialize)]
pub struct StartBatchResponse {
    pub session_id: Uuid,
    pub state: BatchState,
    pub total_probes: usize,
    pub threshold: f64,
    pub started_at: DateTime<Utc>,
}

/// GET /faces/batch response
#[derive(Debug, Serialize)]
pub struct BatchStatusResponse {
    pub session_id: Uuid,
    pub state: BatchState,
    pub threshold: f64,
    pub progress: ProgressState,
    pub failures: Vec<ProbeFailure>,
    /// Most recently completed probe with matches
    pub selected: Option<ProbeResult>,
    pub summary: BatchSummary,
    pub message: String,
}

/// POST /faces/batch/cancel response
#[derive(Debug, Serialize)]
pub struct CancelBatchResponse {
    pub session_id: Uuid,
    pub state: BatchState,
    pub processed: usize,
    pub remaining: usize,
    pub cancelled_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResultsQuery {
    /// Include probes without matches
    #[serde(default)]
    pub all: bool,
}

/// GET /faces/batch/results response
#[derive(Debug, Serialize)]
pub struct BatchResultsResponse {
    pub session_id: Uuid,
    pub state: BatchState,
    pub total_probes: usize,
    pub total_matches: usize,
    pub failed_probes: usize,
    pub results: Vec<ProbeResult>,
}

/// GET /faces/threshold
pub async fn get_threshold(State(state): State<AppState>) -> Json<ThresholdResponse> {
    let threshold = state.workspace.read().await.threshold();
    Json(threshold_response(threshold, false))
}

/// PUT /faces/threshold
///
/// Out-of-range values are clamped to the minimum, not rejected.
pub async fn set_threshold(
    State(state): State<AppState>,
    Json(request): Json<ThresholdRequest>,
) -> ApiResult<Json<ThresholdResponse>> {
    let threshold = state.workspace.write().await.set_threshold(request.threshold)?;
    let clamped = threshold.value() != request.threshold;
    tracing::info!(threshold = %threshold, clamped, "Threshold updated");
    Ok(Json(threshold_response(threshold, clamped)))
}

fn threshold_response(threshold: Threshold, clamped: bool) -> ThresholdResponse {
    ThresholdResponse {
        threshold: threshold.value(),
        clamped,
        min: Threshold::MIN,
        max: Threshold::MAX,
    }
}

/// POST /faces/batch
///
/// Start a batch over the current sets. 409 if one is running, 400 if a set
/// is missing.
pub async fn start_batch(
    State(state): State<AppState>,
) -> ApiResult<(StatusCode, Json<StartBatchResponse>)> {
    let session = state.workspace.write().await.start_batch()?;

    tracing::info!(session_id = %session.session_id, "Batch started");

    Ok((
        StatusCode::ACCEPTED,
        Json(StartBatchResponse {
            session_id: session.session_id,
            state: session.state,
            total_probes: session.progress.total,
            threshold: session.threshold.value(),
            started_at: session.started_at,
        }),
    ))
}

/// GET /faces/batch
pub async fn get_batch_status(State(state): State<AppState>) -> ApiResult<Json<BatchStatusResponse>> {
    let session = state
        .workspace
        .read()
        .await
        .snapshot()
        .ok_or(BatchError::NoSession)?;

    let summary = session.summary();
    Ok(Json(BatchStatusResponse {
        session_id: session.session_id,
        state: session.state,
        threshold: session.threshold.value(),
        progress: session.progress,
        failures: session.failures.clone(),
        selected: session.selected_result().cloned(),
        message: summary.message(),
        summary,
    }))
}

/// POST /faces/batch/cancel
pub async fn cancel_batch(State(state): State<AppState>) -> ApiResult<Json<CancelBatchResponse>> {
    let session = state.workspace.write().await.cancel_batch().await?;

    Ok(Json(CancelBatchResponse {
        session_id: session.session_id,
        state: session.state,
        processed: session.progress.current,
        remaining: session.progress.remaining(),
        cancelled_at: session.ended_at.unwrap_or_else(Utc::now),
    }))
}

/// GET /faces/batch/results
///
/// Probes with at least one match, in probe order; `?all=true` includes
/// every probe.
pub async fn get_batch_results(
    State(state): State<AppState>,
    Query(query): Query<ResultsQuery>,
) -> ApiResult<Json<BatchResultsResponse>> {
    let session = state
        .workspace
        .read()
        .await
        .snapshot()
        .ok_or(BatchError::NoSession)?;

    let results = if query.all {
        session.results.iter().cloned().collect()
    } else {
        session.results.with_matches().cloned().collect()
    };

    Ok(Json(BatchResultsResponse {
        session_id: session.session_id,
        state: session.state,
        total_probes: session.results.len(),
        total_matches: session.results.total_matches(),
        failed_probes: session.results.failed_count(),
        results,
    }))
}

/// POST /faces/reset
///
/// Discard both sets and the last session.
pub async fn reset_workspace(State(state): State<AppState>) -> StatusCode {
    state.workspace.write().await.reset();
    StatusCode::NO_CONTENT
}

/// Build batch routes
pub fn batch_routes() -> Router<AppState> {
    Router::new()
        .route("/faces/threshold", get(get_threshold).put(set_threshold))
        .route("/faces/batch", get(get_batch_status).post(start_batch))
        .route("/faces/batch/cancel", post(cancel_batch))
        .route("/faces/batch/results", get(get_batch_results))
        .route("/faces/reset", post(reset_workspace))
}

