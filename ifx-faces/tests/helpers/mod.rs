//! Test helpers: a mock `/compare-faces` backend and file set builders

#![allow(dead_code)]

use axum::{
    extract::{Multipart, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use ifx_faces::models::{FileSet, SetKind};
use ifx_faces::services::{ContentStore, FileSetCollector, RawFile};
use serde_json::json;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// How the mock backend answers for one probe file name
#[derive(Clone, Debug)]
pub enum MockReply {
    /// `(candidate name, result, distance)` reported as matched
    Matches(Vec<(&'static str, f64, f64)>),
    /// Matches plus backend-reported file errors
    MatchesWithErrors(Vec<(&'static str, f64, f64)>, Vec<&'static str>),
    /// Bare HTTP status with a text body
    Status(u16),
    /// 200 with a body that is not the expected JSON
    Garbage,
    /// Answer with no matches after a delay
    Slow(Duration),
}

/// One request as the backend saw it
#[derive(Clone, Debug)]
pub struct ReceivedRequest {
    pub authorization: Option<String>,
    pub accept: Option<String>,
    pub input_files: Vec<String>,
    pub compare_files: Vec<(String, Option<String>)>,
    pub threshold: Option<String>,
}

#[derive(Clone)]
struct MockState {
    replies: Arc<HashMap<String, MockReply>>,
    received: Arc<Mutex<Vec<ReceivedRequest>>>,
}

pub struct MockBackend {
    pub addr: SocketAddr,
    received: Arc<Mutex<Vec<ReceivedRequest>>>,
}

impl MockBackend {
    /// Start a backend on an ephemeral port; probes without a reply get no matches
    pub async fn start(replies: Vec<(&str, MockReply)>) -> Self {
        let received = Arc::new(Mutex::new(Vec::new()));
        let state = MockState {
            replies: Arc::new(
                replies
                    .into_iter()
                    .map(|(name, reply)| (name.to_string(), reply))
                    .collect(),
            ),
            received: Arc::clone(&received),
        };

        let app = Router::new()
            .route("/compare-faces", post(compare_faces))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, received }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn received(&self) -> Vec<ReceivedRequest> {
        self.received.lock().unwrap().clone()
    }

    pub fn probe_order(&self) -> Vec<String> {
        self.received()
            .into_iter()
            .flat_map(|r| r.input_files)
            .collect()
    }
}

async fn compare_faces(
    State(state): State<MockState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    let mut request = ReceivedRequest {
        authorization: header(&headers, "authorization"),
        accept: header(&headers, "accept"),
        input_files: Vec::new(),
        compare_files: Vec::new(),
        threshold: None,
    };

    while let Some(field) = multipart.next_field().await.unwrap() {
        let field_name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await.unwrap();
        match field_name.as_str() {
            "input_files" => request.input_files.push(file_name.unwrap_or_default()),
            "compare_files" => request
                .compare_files
                .push((file_name.unwrap_or_default(), content_type)),
            "threshold" => request.threshold = Some(String::from_utf8_lossy(&data).into_owned()),
            _ => {}
        }
    }

    state.received.lock().unwrap().push(request.clone());

    let probe = request.input_files.first().cloned().unwrap_or_default();
    let threshold: f64 = request
        .threshold
        .as_deref()
        .and_then(|t| t.parse().ok())
        .unwrap_or(50.0);

    let reply = state
        .replies
        .get(&probe)
        .cloned()
        .unwrap_or(MockReply::Matches(vec![]));

    let (hits, errors) = match reply {
        MockReply::Matches(hits) => (hits, vec![]),
        MockReply::MatchesWithErrors(hits, errors) => (hits, errors),
        MockReply::Status(code) => {
            let status = StatusCode::from_u16(code).unwrap();
            return (status, "backend failure").into_response();
        }
        MockReply::Garbage => return (StatusCode::OK, "<html>not json</html>").into_response(),
        MockReply::Slow(delay) => {
            tokio::time::sleep(delay).await;
            (vec![], vec![])
        }
    };

    // Report every candidate: matched ones with their score, the rest unmatched
    let matches: Vec<_> = request
        .compare_files
        .iter()
        .map(|(candidate, _)| match hits.iter().find(|(name, _, _)| *name == candidate.as_str()) {
            Some((_, result, distance)) => json!({
                "input_file": probe, "compare_file": candidate, "matched": true,
                "distance": distance, "threshold": threshold, "result": result
            }),
            None => json!({
                "input_file": probe, "compare_file": candidate, "matched": false,
                "distance": 0.95, "threshold": threshold, "result": 5.0
            }),
        })
        .collect();

    Json(json!({
        "input_files": request.input_files,
        "compare_files": request.compare_files.iter().map(|(n, _)| n).collect::<Vec<_>>(),
        "threshold": threshold,
        "total_matches": hits.len(),
        "matches": matches,
        "errors": errors,
    }))
    .into_response()
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Small JPEG-typed uploads named as given
pub fn images(names: &[&str]) -> Vec<RawFile> {
    names
        .iter()
        .map(|n| RawFile::new(*n, Some("image/jpeg"), format!("bytes of {n}").into_bytes()))
        .collect()
}

pub fn file_set(store: &ContentStore, kind: SetKind, names: &[&str]) -> Arc<FileSet> {
    Arc::new(
        FileSetCollector::new(store.clone())
            .collect(kind, images(names))
            .unwrap(),
    )
}
