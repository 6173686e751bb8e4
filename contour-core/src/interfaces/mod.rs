// contour-core/src/interfaces/mod.rs
// ============================================================================
// Module: Contour Interfaces
// Description: Capability seams for user-agent parsing, geolocation, and persistence.
// Purpose: Define the contract surfaces the core consumes without embedding backends.
// Dependencies: crate::core, serde, thiserror
// ============================================================================

//! ## Overview
//! The core consumes three external capabilities through narrow interfaces:
//! user-agent parsing, IP geolocation, and specification persistence.
//! Implementations must be deterministic where the contract demands it and
//! must degrade rather than fail: a geolocation miss is `None`, never an
//! error.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::context::ParsedUserAgent;
use crate::core::identifiers::AppId;
use crate::core::identifiers::SpecVersion;
use crate::core::spec::Specification;

// ============================================================================
// SECTION: User-Agent Parser
// ============================================================================

/// User-agent parsing capability.
pub trait UserAgentParser {
    /// Parses a raw user-agent string into its structured form.
    ///
    /// Unrecognized agents yield a default (all-`None`) structure.
    fn parse(&self, user_agent: &str) -> ParsedUserAgent;
}

// ============================================================================
// SECTION: Geolocation
// ============================================================================

/// Result of a geolocation lookup.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GeoLocation {
    /// Country code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    /// Region code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// City name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    /// Latitude in decimal degrees.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    /// Longitude in decimal degrees.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

/// IP geolocation capability.
///
/// Lookups may suspend the transport once at context construction but must
/// never fail: any miss, parse error, or backend failure is `None`.
pub trait GeoLocator {
    /// Resolves an IP address string to a location, when known.
    fn locate(&self, ip: &str) -> Option<GeoLocation>;
}

// ============================================================================
// SECTION: Specification Persistence
// ============================================================================

/// Specification persistence errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum PersistError {
    /// Underlying storage I/O failed.
    #[error("specification persistence io error: {0}")]
    Io(String),
    /// Stored data could not be decoded.
    #[error("specification persistence invalid data: {0}")]
    Invalid(String),
}

/// Durable specification persistence behind the in-memory store.
///
/// The core requires only read-all-on-init and write-on-save; removal has a
/// default no-op for backends that only append.
pub trait SpecPersistence {
    /// Loads every persisted specification.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError`] when enumeration or decoding fails.
    fn load_all(&self) -> Result<Vec<Specification>, PersistError>;

    /// Persists one specification.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError`] when writing fails.
    fn persist(&self, spec: &Specification) -> Result<(), PersistError>;

    /// Removes a persisted specification.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError`] when removal fails.
    fn remove(&self, _app_id: &AppId, _version: &SpecVersion) -> Result<(), PersistError> {
        Ok(())
    }
}

/// Persistence stub that stores nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSpecPersistence;

impl SpecPersistence for NoopSpecPersistence {
    fn load_all(&self) -> Result<Vec<Specification>, PersistError> {
        Ok(Vec::new())
    }

    fn persist(&self, _spec: &Specification) -> Result<(), PersistError> {
        Ok(())
    }
}
