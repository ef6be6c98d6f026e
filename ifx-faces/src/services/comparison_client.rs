//! Face comparison backend client
//!
//! One `POST {base}/compare-faces` per call, multipart encoded:
//! `input_files` (probe, repeatable), `compare_files` (one per candidate)
//! and `threshold`. A 401 is reported as [`ComparisonError::Unauthorized`]
//! so the caller can invalidate the session.

use crate::models::{FileRecord, Threshold};
use crate::services::content_store::{ContentStore, HandleError};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

const COMPARE_PATH: &str = "/compare-faces";
const USER_AGENT: &str = concat!("ifx-faces/", env!("CARGO_PKG_VERSION"));

/// Comparison call errors
///
/// Every variant is a recoverable per-probe failure for the orchestrator.
#[derive(Debug, Clone, Error)]
pub enum ComparisonError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Comparison request timed out")]
    Timeout,

    #[error("Unauthorized: Please log in again")]
    Unauthorized,

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("File content unavailable: {0}")]
    Content(#[from] HandleError),
}

impl ComparisonError {
    /// Error code recorded on the batch session
    pub fn code(&self) -> &'static str {
        match self {
            ComparisonError::Network(_) => "NETWORK_ERROR",
            ComparisonError::Timeout => "TIMEOUT",
            ComparisonError::Unauthorized => "AUTH_FAILURE",
            ComparisonError::Api(..) => "API_ERROR",
            ComparisonError::Parse(_) => "PARSE_ERROR",
            ComparisonError::Content(_) => "CONTENT_ERROR",
        }
    }

    /// Authentication-class failure (HTTP 401)
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, ComparisonError::Unauthorized)
    }

    fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ComparisonError::Timeout
        } else {
            ComparisonError::Network(e.to_string())
        }
    }
}

/// One comparison outcome reported by the backend
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CompareMatch {
    pub input_file: String,
    pub compare_file: String,
    pub matched: bool,
    pub distance: f64,
    pub threshold: f64,
    /// Similarity score on the threshold's scale
    pub result: f64,
}

/// `/compare-faces` response body
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct CompareResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_files: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compare_files: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_matches: Option<usize>,
    #[serde(default)]
    pub matches: Vec<CompareMatch>,
    #[serde(default)]
    pub errors: Vec<String>,
}

impl CompareResponse {
    /// Matched entries for the given probe file name, in response order
    pub fn matches_for<'a>(&'a self, probe_name: &'a str) -> impl Iterator<Item = &'a CompareMatch> + 'a {
        self.matches
            .iter()
            .filter(move |m| m.matched && m.input_file == probe_name)
    }
}

/// Anything that can compare probes against candidates
#[async_trait]
pub trait FaceComparator: Send + Sync {
    async fn compare(
        &self,
        probes: &[FileRecord],
        candidates: &[FileRecord],
        threshold: Threshold,
    ) -> Result<CompareResponse, ComparisonError>;
}

/// HTTP client for the comparison backend
pub struct ComparisonClient {
    http_client: reqwest::Client,
    endpoint: String,
    access_token: Option<String>,
    store: ContentStore,
}

impl ComparisonClient {
    pub fn new(
        base_url: &str,
        access_token: Option<String>,
        timeout: Duration,
        store: ContentStore,
    ) -> Result<Self, ComparisonError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| ComparisonError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            endpoint: compare_endpoint(base_url),
            access_token,
            store,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn file_part(&self, record: &FileRecord) -> Result<Part, ComparisonError> {
        let bytes = self.store.read(&record.content)?;
        Part::bytes(bytes.to_vec())
            .file_name(record.name.clone())
            .mime_str(&record.media_type)
            .map_err(|e| ComparisonError::Network(e.to_string()))
    }

    fn build_form(
        &self,
        probes: &[FileRecord],
        candidates: &[FileRecord],
        threshold: Threshold,
    ) -> Result<Form, ComparisonError> {
        // File names go out verbatim; the backend echoes them back and
        // matches are resolved by exact name
        let mut form = Form::new().percent_encode_noop();
        for probe in probes {
            form = form.part("input_files", self.file_part(probe)?);
        }
        for candidate in candidates {
            form = form.part("compare_files", self.file_part(candidate)?);
        }
        Ok(form.text("threshold", threshold.to_string()))
    }
}

#[async_trait]
impl FaceComparator for ComparisonClient {
    async fn compare(
        &self,
        probes: &[FileRecord],
        candidates: &[FileRecord],
        threshold: Threshold,
    ) -> Result<CompareResponse, ComparisonError> {
        let form = self.build_form(probes, candidates, threshold)?;

        tracing::debug!(
            endpoint = %self.endpoint,
            probes = probes.len(),
            candidates = candidates.len(),
            threshold = %threshold,
            "Submitting face comparison"
        );

        let bearer = format!("Bearer {}", self.access_token.as_deref().unwrap_or_default());
        let response = self
            .http_client
            .post(&self.endpoint)
            .header(reqwest::header::AUTHORIZATION, bearer)
            .header(reqwest::header::ACCEPT, "application/json")
            .multipart(form)
            .send()
            .await
            .map_err(ComparisonError::from_reqwest)?;

        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            return Err(ComparisonError::Unauthorized);
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ComparisonError::Api(status.as_u16(), error_text));
        }

        let body = response.bytes().await.map_err(ComparisonError::from_reqwest)?;
        let compare_response: CompareResponse =
            serde_json::from_slice(&body).map_err(|e| ComparisonError::Parse(e.to_string()))?;

        tracing::debug!(
            matches = compare_response.matches.len(),
            errors = compare_response.errors.len(),
            "Face comparison returned"
        );

        Ok(compare_response)
    }
}

fn compare_endpoint(base_url: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), COMPARE_PATH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = ComparisonClient::new(
            "http://127.0.0.1:8000/",
            None,
            Duration::from_secs(5),
            ContentStore::new(),
        )
        .unwrap();
        assert_eq!(client.endpoint(), "http://127.0.0.1:8000/compare-faces");
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(ComparisonError::Unauthorized.code(), "AUTH_FAILURE");
        assert!(ComparisonError::Unauthorized.is_auth_failure());
        assert!(!ComparisonError::Api(500, String::new()).is_auth_failure());
        assert!(!ComparisonError::Timeout.is_auth_failure());
        assert_eq!(ComparisonError::Api(503, "down".into()).to_string(), "API error 503: down");
    }

    #[test]
    fn test_response_parsing_tolerates_missing_fields() {
        let response: CompareResponse = serde_json::from_str(r#"{"matches": []}"#).unwrap();
        assert!(response.errors.is_empty());
        assert!(response.threshold.is_none());

        let response: CompareResponse = serde_json::from_str("{}").unwrap();
        assert!(response.matches.is_empty());
    }

    #[test]
    fn test_matches_for_filters_by_probe_and_flag() {
        let response: CompareResponse = serde_json::from_value(serde_json::json!({
            "threshold": 50,
            "total_matches": 2,
            "matches": [
                {"input_file": "A.jpg", "compare_file": "X.jpg", "matched": true,
                 "distance": 0.3, "threshold": 50, "result": 72},
                {"input_file": "A.jpg", "compare_file": "Y.jpg", "matched": false,
                 "distance": 0.9, "threshold": 50, "result": 12},
                {"input_file": "B.jpg", "compare_file": "Y.jpg", "matched": true,
                 "distance": 0.4, "threshold": 50, "result": 61}
            ],
            "errors": []
        }))
        .unwrap();

        let hits: Vec<&str> = response.matches_for("A.jpg").map(|m| m.compare_file.as_str()).collect();
        assert_eq!(hits, vec!["X.jpg"]);
        assert_eq!(response.matches_for("C.jpg").count(), 0);
    }

    #[test]
    fn test_released_content_is_a_content_error() {
        let store = ContentStore::new();
        let handle = store.acquire(vec![1, 2, 3]);
        let record = FileRecord {
            id: "input-1".into(),
            name: "a.jpg".into(),
            media_type: "image/jpeg".into(),
            kind: crate::models::FileKind::Image,
            size_bytes: 3,
            content: handle,
        };
        let client =
            ComparisonClient::new("http://127.0.0.1:1", None, Duration::from_secs(1), store.clone())
                .unwrap();

        assert!(client.build_form(&[record.clone()], &[], Threshold::default()).is_ok());
        store.release(&handle).unwrap();
        let err = client.build_form(&[record], &[], Threshold::default()).unwrap_err();
        assert_eq!(err.code(), "CONTENT_ERROR");
    }
}
