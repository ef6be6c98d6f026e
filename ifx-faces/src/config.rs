//! Configuration for ifx-faces
//!
//! Priority (highest first): command line → environment → TOML → defaults.
//! Command line and environment arrive together through clap (`env = …`)
//! as [`CliOverrides`]; the TOML file is `<config_dir>/ifx/ifx-faces.toml`
//! unless `--config` names another.

use crate::models::Threshold;
use ifx_common::config::{load_toml_config, LoggingConfig};
use ifx_common::{Error, Result};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

pub const MODULE_NAME: &str = "ifx-faces";

/// Resolved service configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct FacesConfig {
    /// Comparison backend base URL; requests go to `{api_base_url}/compare-faces`
    pub api_base_url: String,
    /// Bearer token for the backend
    pub access_token: Option<String>,
    /// Local HTTP listen address
    pub bind_addr: String,
    /// Per-call timeout for comparison requests
    pub request_timeout_secs: u64,
    /// Pause between probes (0 = none)
    pub step_delay_ms: u64,
    /// Threshold a fresh workspace starts with
    pub default_threshold: f64,
    /// Events buffered per SSE subscriber
    pub event_capacity: usize,
    pub logging: LoggingConfig,
}

impl Default for FacesConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:8000".to_string(),
            access_token: None,
            bind_addr: "127.0.0.1:5740".to_string(),
            request_timeout_secs: 120,
            step_delay_ms: 0,
            default_threshold: Threshold::DEFAULT,
            event_capacity: 100,
            logging: LoggingConfig::default(),
        }
    }
}

/// Values supplied on the command line or through environment variables
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub api_base_url: Option<String>,
    pub access_token: Option<String>,
    pub bind_addr: Option<String>,
    pub log_level: Option<String>,
}

impl FacesConfig {
    /// Load the TOML tier (or defaults)
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        load_toml_config(explicit_path, MODULE_NAME)
    }

    /// Apply command line / environment values over the TOML tier
    pub fn apply_overrides(&mut self, overrides: CliOverrides) {
        if let Some(url) = overrides.api_base_url {
            info!("Comparison backend URL set from command line or environment");
            self.api_base_url = url;
        }
        if let Some(token) = overrides.access_token {
            self.access_token = Some(token);
        }
        if let Some(addr) = overrides.bind_addr {
            self.bind_addr = addr;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }

        // An empty token means "no token"
        if self.access_token.as_deref().is_some_and(|t| t.trim().is_empty()) {
            self.access_token = None;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.api_base_url.starts_with("http://") || self.api_base_url.starts_with("https://")) {
            return Err(Error::Config(format!(
                "api_base_url must be an http(s) URL: {}",
                self.api_base_url
            )));
        }
        self.bind_socket_addr()?;
        if self.request_timeout_secs == 0 {
            return Err(Error::Config("request_timeout_secs must be at least 1".to_string()));
        }
        if self.event_capacity == 0 {
            return Err(Error::Config("event_capacity must be at least 1".to_string()));
        }
        if !Threshold::in_range(self.default_threshold) {
            warn!(
                configured = self.default_threshold,
                "default_threshold outside {}-{}, using {}",
                Threshold::MIN,
                Threshold::MAX,
                Threshold::MIN
            );
        }
        if self.access_token.is_none() {
            warn!("No access token configured; comparison requests will be sent without credentials");
        }
        Ok(())
    }

    pub fn bind_socket_addr(&self) -> Result<SocketAddr> {
        self.bind_addr
            .parse()
            .map_err(|e| Error::Config(format!("Invalid bind_addr {}: {}", self.bind_addr, e)))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn step_delay(&self) -> Duration {
        Duration::from_millis(self.step_delay_ms)
    }

    pub fn threshold(&self) -> Threshold {
        Threshold::new(self.default_threshold)
    }
}
