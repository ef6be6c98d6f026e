//! Common error types for IFX

use thiserror::Error;

/// Common result type for IFX operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while bootstrapping a service
#[derive(Error, Debug)]
pub enum Error {
    /// Config file could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),
}
