//! HTTP API handlers for ifx-faces
//!
//! REST endpoints for the browser front-end plus an SSE event stream.

pub mod batch;
pub mod export;
pub mod file_sets;
pub mod health;
pub mod sse;

pub use batch::batch_routes;
pub use export::export_routes;
pub use file_sets::file_set_routes;
pub use health::health_routes;
pub use sse::event_stream;
