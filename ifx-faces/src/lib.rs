//! ifx-faces library interface
//!
//! Face comparison batch service: collects probe and candidate file sets,
//! runs them through the comparison backend one probe at a time, and exposes
//! progress, results and exports over HTTP + SSE.

pub mod api;
pub mod config;
pub mod error;
pub mod events;
pub mod models;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use crate::config::FacesConfig;
use crate::events::FaceEvent;
use crate::services::{
    BatchOrchestrator, ComparisonClient, ComparisonError, ContentStore, FaceComparator,
    FaceWorkspace, FileSetCollector,
};
use axum::extract::DefaultBodyLimit;
use axum::Router;
use chrono::{DateTime, Utc};
use ifx_common::events::EventBus;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Largest accepted upload request (all files of one selection)
const MAX_UPLOAD_BYTES: usize = 256 * 1024 * 1024;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// File sets, threshold and batch session
    pub workspace: Arc<RwLock<FaceWorkspace>>,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus<FaceEvent>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last error for diagnostic purposes
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    /// State wired to the HTTP comparison backend
    pub fn from_config(config: &FacesConfig) -> Result<Self, ComparisonError> {
        let store = ContentStore::new();
        let client = ComparisonClient::new(
            &config.api_base_url,
            config.access_token.clone(),
            config.request_timeout(),
            store.clone(),
        )?;
        tracing::info!(endpoint = %client.endpoint(), "Comparison backend configured");
        Ok(Self::with_comparator(Arc::new(client), store, config))
    }

    /// State wired to any comparator (tests substitute their own)
    pub fn with_comparator(
        comparator: Arc<dyn FaceComparator>,
        store: ContentStore,
        config: &FacesConfig,
    ) -> Self {
        let event_bus = EventBus::new(config.event_capacity);
        let orchestrator =
            BatchOrchestrator::new(comparator, event_bus.clone()).with_step_delay(config.step_delay());
        let workspace = FaceWorkspace::new(
            FileSetCollector::new(store),
            orchestrator,
            config.threshold(),
        );

        Self {
            workspace: Arc::new(RwLock::new(workspace)),
            event_bus,
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }

    pub async fn record_error(&self, message: impl Into<String>) {
        *self.last_error.write().await = Some(message.into());
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::file_set_routes())
        .merge(api::batch_routes())
        .merge(api::export_routes())
        .merge(api::health_routes())
        .route("/faces/events", axum::routing::get(api::event_stream))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
