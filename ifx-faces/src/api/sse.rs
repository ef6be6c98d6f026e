//! Server-Sent Events (SSE) for batch progress streaming
//!
//! GET /faces/events streams every [`FaceEvent`](crate::events::FaceEvent):
//! batch start, per-probe completion or failure, completion, cancellation,
//! rejection, session invalidation and workspace changes.

use crate::AppState;
use axum::{
    extract::State,
    response::sse::{Event, Sse},
};
use futures::stream::Stream;
use std::convert::Infallible;

/// GET /faces/events
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    ifx_common::sse::event_bus_sse_stream(&state.event_bus, "ifx-faces")
}
