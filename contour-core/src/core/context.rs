// contour-core/src/core/context.rs
// ============================================================================
// Module: Contour Request Context
// Description: Per-request attributes evaluated against rule conditions.
// Purpose: Capture device, geography, identity, and custom request state.
// Dependencies: crate::core::{identifiers, spec, time}, serde, serde_json
// ============================================================================

//! ## Overview
//! A request context is created per resolve request and discarded afterwards.
//! It combines transport-derived attributes (user-agent, IP geolocation) with
//! caller-supplied overrides (client geography, environment, flags, custom
//! keys). Client-provided geography takes precedence over IP-derived values.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::core::identifiers::UserId;
use crate::core::spec::Environment;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Parsed User Agent
// ============================================================================

/// Structured form of a parsed user-agent string.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedUserAgent {
    /// Operating system name, when recognized.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os_name: Option<String>,
    /// Device type classification, when recognized.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_type: Option<String>,
}

// ============================================================================
// SECTION: Client Geography
// ============================================================================

/// Client-provided geography, taking precedence over IP-derived geography.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClientGeo {
    /// Client-provided country code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    /// Client-provided region code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

// ============================================================================
// SECTION: Request Context
// ============================================================================

/// Per-request attributes evaluated against rule conditions.
///
/// # Invariants
/// - Contexts are request-scoped; they are never shared across requests.
/// - `timestamp` is caller-supplied; the core never reads the wall clock.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestContext {
    /// Raw user-agent string.
    #[serde(default)]
    pub user_agent: String,
    /// Structured user-agent form.
    #[serde(default)]
    pub parsed_ua: ParsedUserAgent,
    /// Client application version.
    #[serde(default)]
    pub app_version: String,
    /// Operating system override; falls back to `parsed_ua.os_name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os: Option<String>,
    /// Device type override; falls back to `parsed_ua.device_type`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    /// IP-derived country code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geo_country: Option<String>,
    /// IP-derived region code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geo_region: Option<String>,
    /// Client-provided geography; wins over IP-derived values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_geo: Option<ClientGeo>,
    /// Request timestamp in unix epoch milliseconds.
    #[serde(default)]
    pub timestamp: Timestamp,
    /// Requested environment override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<Environment>,
    /// Per-request feature flag overrides.
    #[serde(default)]
    pub feature_flags: BTreeMap<String, bool>,
    /// End-user identifier for rollout bucketing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    /// Arbitrary caller-supplied context mapping.
    #[serde(default)]
    pub custom: Map<String, Value>,
}

impl RequestContext {
    /// Returns the effective operating system name.
    ///
    /// The explicit field wins when set; otherwise the parsed user-agent
    /// value is used.
    #[must_use]
    pub fn effective_os(&self) -> Option<&str> {
        self.os.as_deref().or(self.parsed_ua.os_name.as_deref())
    }

    /// Returns the effective device type.
    #[must_use]
    pub fn effective_device(&self) -> Option<&str> {
        self.device.as_deref().or(self.parsed_ua.device_type.as_deref())
    }

    /// Returns the effective country: client-provided, else IP-derived.
    #[must_use]
    pub fn effective_country(&self) -> Option<&str> {
        self.client_geo
            .as_ref()
            .and_then(|geo| geo.country.as_deref())
            .or(self.geo_country.as_deref())
    }

    /// Returns the effective region: client-provided, else IP-derived.
    #[must_use]
    pub fn effective_region(&self) -> Option<&str> {
        self.client_geo
            .as_ref()
            .and_then(|geo| geo.region.as_deref())
            .or(self.geo_region.as_deref())
    }
}
