//! File set handlers
//!
//! POST /faces/sets/{kind}, GET /faces/sets/{kind}, GET /faces/files/{id}

use axum::{
    extract::{Multipart, Path, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;

use crate::{
    error::{ApiError, ApiResult},
    models::{FileRecord, FileSet, SetKind},
    services::RawFile,
    AppState,
};

/// File set listing
#[derive(Debug, Serialize)]
pub struct FileSetResponse {
    pub kind: SetKind,
    pub count: usize,
    pub total_bytes: usize,
    pub files: Vec<FileRecord>,
}

impl From<&FileSet> for FileSetResponse {
    fn from(set: &FileSet) -> Self {
        Self {
            kind: set.kind(),
            count: set.len(),
            total_bytes: set.total_bytes(),
            files: set.records().to_vec(),
        }
    }
}

/// POST /faces/sets/{kind}
///
/// Multipart upload replacing the input or comparison set. Only parts with
/// a file name are taken as files.
pub async fn upload_set(
    State(state): State<AppState>,
    Path(kind): Path<SetKind>,
    mut multipart: Multipart,
) -> ApiResult<Json<FileSetResponse>> {
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed upload: {}", e)))?
    {
        let Some(name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let media_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Upload of {} failed: {}", name, e)))?;

        files.push(RawFile {
            name,
            media_type,
            bytes: bytes.to_vec(),
        });
    }

    tracing::debug!(set = %kind, files = files.len(), "Upload received");

    let set = state.workspace.write().await.replace_set(kind, files)?;
    Ok(Json(FileSetResponse::from(set.as_ref())))
}

/// GET /faces/sets/{kind}
pub async fn get_set(
    State(state): State<AppState>,
    Path(kind): Path<SetKind>,
) -> ApiResult<Json<FileSetResponse>> {
    let set = state
        .workspace
        .read()
        .await
        .file_set(kind)
        .ok_or_else(|| ApiError::NotFound(format!("No {} files selected", kind)))?;
    Ok(Json(FileSetResponse::from(set.as_ref())))
}

/// GET /faces/files/{id}
///
/// File preview through the record's content handle.
pub async fn get_file(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let (record, bytes) = state
        .workspace
        .read()
        .await
        .file_content(&id)
        .ok_or_else(|| ApiError::NotFound(format!("File not found: {}", id)))??;

    Ok((
        [(header::CONTENT_TYPE, record.media_type)],
        bytes.to_vec(),
    )
        .into_response())
}

/// Build file set routes
pub fn file_set_routes() -> Router<AppState> {
    Router::new()
        .route("/faces/sets/:kind", get(get_set).post(upload_set))
        .route("/faces/files/:id", get(get_file))
}
