//! Health check endpoint

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status ("ok")
    pub status: String,
    /// Module name ("ifx-faces")
    pub module: String,
    /// Crate version from Cargo.toml
    pub version: String,
    /// Seconds since service started
    pub uptime_seconds: u64,
    /// A batch is validating or running
    pub batch_running: bool,
    /// Uploaded files held for preview and submission
    pub stored_files: usize,
    pub stored_bytes: usize,
    /// Last error message if any (for diagnostics)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// GET /health
///
/// Reports uptime and the most recent error: an API failure or, failing
/// that, the last probe failure of the latest batch.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime = Utc::now().signed_duration_since(state.startup_time);
    let uptime_seconds = uptime.num_seconds().max(0) as u64;

    let (batch_running, (stored_files, stored_bytes), probe_error) = {
        let workspace = state.workspace.read().await;
        let probe_error = workspace
            .snapshot()
            .and_then(|s| s.failures.last().map(|f| format!("{}: {}", f.probe_name, f.message)));
        (workspace.is_running(), workspace.stored_content(), probe_error)
    };
    let last_error = state.last_error.read().await.clone().or(probe_error);

    Json(HealthResponse {
        status: "ok".to_string(),
        module: "ifx-faces".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds,
        batch_running,
        stored_files,
        stored_bytes,
        last_error,
    })
}

/// Build health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
