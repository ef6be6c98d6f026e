//! Export handler
//!
//! GET /faces/export?format=csv|json

use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Deserialize;

use crate::{
    error::{ApiResult, BatchError},
    services::{ExportError, ExportFormat},
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    pub format: ExportFormat,
}

/// GET /faces/export
///
/// Download the latest session's results. 404 when there is nothing to
/// export.
pub async fn export_results(
    State(state): State<AppState>,
    Query(query): Query<ExportQuery>,
) -> ApiResult<Response> {
    let exported = state.workspace.read().await.export(query.format);
    let file = match exported {
        Ok(file) => file,
        Err(e) => {
            if let BatchError::Export(ExportError::Serialize(message)) = &e {
                tracing::error!(error = %message, "Export failed");
                state.record_error(format!("Export failed: {}", message)).await;
            }
            return Err(e.into());
        }
    };

    Ok((
        [
            (header::CONTENT_TYPE, file.content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file.file_name),
            ),
        ],
        file.bytes,
    )
        .into_response())
}

/// Build export routes
pub fn export_routes() -> Router<AppState> {
    Router::new().route("/faces/export", get(export_results))
}
