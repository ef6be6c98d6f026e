//! Configuration loading for IFX services
//!
//! Settings resolve in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! Steps 1 and 2 are handled by each binary's argument parser; this module
//! covers locating and parsing the TOML file.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Logging configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level or filter directive (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl LoggingConfig {
    /// Filter directive for the tracing subscriber
    ///
    /// `RUST_LOG` takes precedence over the configured level.
    pub fn filter_directive(&self) -> String {
        match std::env::var("RUST_LOG") {
            Ok(filter) if !filter.trim().is_empty() => filter,
            _ => self.level.clone(),
        }
    }
}

/// Default TOML path for a module: `<config_dir>/ifx/<module>.toml`
pub fn default_config_path(module_name: &str) -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("ifx").join(format!("{}.toml", module_name)))
}

/// Load a module's TOML configuration
///
/// An explicitly requested file must exist. When no path is given the
/// platform default location is tried, and a missing file there falls back
/// to `T::default()` with a warning. A file that exists but fails to parse
/// is always an error.
pub fn load_toml_config<T>(explicit_path: Option<&Path>, module_name: &str) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    let path = match explicit_path {
        Some(path) => {
            if !path.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            path.to_path_buf()
        }
        None => match default_config_path(module_name) {
            Some(path) if path.exists() => path,
            Some(path) => {
                warn!(
                    "No config file at {}, using built-in defaults",
                    path.display()
                );
                return Ok(T::default());
            }
            None => {
                warn!("Could not determine config directory, using built-in defaults");
                return Ok(T::default());
            }
        },
    };

    parse_toml_file(&path)
}

/// Read and parse one TOML file
pub fn parse_toml_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)?;
    let config = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed ({}): {}", path.display(), e)))?;
    info!("Loaded configuration from {}", path.display());
    Ok(config)
}
