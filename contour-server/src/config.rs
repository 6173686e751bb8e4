// contour-server/src/config.rs
// ============================================================================
// Module: Server Configuration
// Description: Listener, persistence, and geolocation settings for the server.
// Purpose: Provide strict, fail-closed configuration validation.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Server configuration is assembled from command-line flags (or supplied
//! programmatically in tests) and validated before the server starts.
//! Missing or conflicting settings fail closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::net::Ipv4Addr;
use std::net::SocketAddr;
use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default listen port.
pub const DEFAULT_PORT: u16 = 8080;
/// Maximum total path length accepted for configured directories.
const MAX_TOTAL_PATH_LENGTH: usize = 4_096;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerConfig {
    /// Listen address.
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,
    /// Specification directory; in-memory only when absent.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    /// Geolocation CIDR table path.
    #[serde(default)]
    pub geo_table: Option<PathBuf>,
    /// Geolocation HTTP lookup endpoint.
    #[serde(default)]
    pub geo_url: Option<String>,
    /// Emit one JSON log line per request to stderr.
    #[serde(default)]
    pub log_requests: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            data_dir: None,
            geo_table: None,
            geo_url: None,
            log_requests: false,
        }
    }
}

impl ServerConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] on conflicting or out-of-bounds settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.geo_table.is_some() && self.geo_url.is_some() {
            return Err(ConfigError::ConflictingGeoBackends);
        }
        for path in [&self.data_dir, &self.geo_table].into_iter().flatten() {
            if path.as_os_str().len() > MAX_TOTAL_PATH_LENGTH {
                return Err(ConfigError::PathTooLong(path.display().to_string()));
            }
        }
        if let Some(url) = &self.geo_url
            && !(url.starts_with("http://") || url.starts_with("https://"))
        {
            return Err(ConfigError::InvalidGeoUrl(url.clone()));
        }
        Ok(())
    }
}

/// Serde default for the listen address.
fn default_listen() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_PORT))
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Server configuration errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Both a geolocation table and an HTTP endpoint were configured.
    #[error("geo_table and geo_url are mutually exclusive")]
    ConflictingGeoBackends,
    /// A configured path exceeds the length limit.
    #[error("configured path too long: {0}")]
    PathTooLong(String),
    /// The geolocation endpoint is not an HTTP(S) URL.
    #[error("invalid geo url: {0}")]
    InvalidGeoUrl(String),
}
