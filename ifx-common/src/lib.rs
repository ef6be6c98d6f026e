//! # IFX Common Library
//!
//! Shared code for the IFX image-forensics client services:
//! - Error type shared across crates
//! - Configuration loading (TOML bootstrap file, logging settings)
//! - Generic event bus for broadcasting service events
//! - Server-Sent Events helpers for browser front-ends

pub mod config;
pub mod error;
pub mod events;
pub mod sse;

pub use error::{Error, Result};
