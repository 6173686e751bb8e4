// contour-providers/src/geo.rs
// ============================================================================
// Module: Geolocation Providers
// Description: CIDR-table and HTTP-backed IP geolocation.
// Purpose: Resolve request IPs to coarse geography with strict limits.
// Dependencies: contour-core, reqwest, serde, serde_json
// ============================================================================

//! ## Overview
//! Two geolocators are provided: a table locator backed by a JSON file of
//! IPv4 CIDR entries (longest prefix wins) and an HTTP locator issuing
//! bounded GET requests against a lookup endpoint. Both honor the capability
//! contract: every miss, parse error, or backend failure is `None`, never an
//! error surfaced to the resolution path.
//!
//! Security posture: IP strings and lookup responses are untrusted; the HTTP
//! locator disables redirects and bounds response sizes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::io::Read;
use std::net::IpAddr;
use std::net::Ipv4Addr;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use contour_core::GeoLocation;
use contour_core::GeoLocator;
use reqwest::blocking::Client;
use reqwest::redirect::Policy;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum geolocation table file size in bytes.
const MAX_TABLE_BYTES: u64 = 8 * 1024 * 1024;
/// Default HTTP lookup timeout in milliseconds.
const DEFAULT_HTTP_TIMEOUT_MS: u64 = 2_000;
/// Default maximum HTTP lookup response size in bytes.
const DEFAULT_MAX_RESPONSE_BYTES: usize = 64 * 1024;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Geolocation provider construction errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
/// - Lookup itself never errors; only construction can fail.
#[derive(Debug, Error)]
pub enum GeoProviderError {
    /// Table file could not be read.
    #[error("geo table io error: {0}")]
    Io(String),
    /// Table contents could not be decoded.
    #[error("geo table invalid data: {0}")]
    Invalid(String),
    /// An entry carried an unparseable CIDR.
    #[error("geo table invalid cidr: {0}")]
    InvalidCidr(String),
    /// The HTTP client could not be constructed.
    #[error("geo http client error: {0}")]
    Client(String),
}

// ============================================================================
// SECTION: Table Locator
// ============================================================================

/// One row of the geolocation table file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GeoTableEntry {
    /// IPv4 CIDR block, e.g. `"81.2.69.0/24"`.
    pub cidr: String,
    /// Country code for the block.
    #[serde(default)]
    pub country: Option<String>,
    /// Region code for the block.
    #[serde(default)]
    pub region: Option<String>,
    /// City name for the block.
    #[serde(default)]
    pub city: Option<String>,
}

/// CIDR-table geolocator with longest-prefix matching.
pub struct TableGeoLocator {
    /// Parsed blocks: base address, prefix length, location.
    blocks: Vec<(u32, u8, GeoLocation)>,
}

impl TableGeoLocator {
    /// Loads a table from a JSON file of [`GeoTableEntry`] rows.
    ///
    /// # Errors
    ///
    /// Returns [`GeoProviderError`] when the file cannot be read, decoded,
    /// or contains an invalid CIDR.
    pub fn from_path(path: &Path) -> Result<Self, GeoProviderError> {
        let metadata = fs::metadata(path).map_err(|err| GeoProviderError::Io(err.to_string()))?;
        if metadata.len() > MAX_TABLE_BYTES {
            return Err(GeoProviderError::Invalid("geo table exceeds size limit".to_string()));
        }
        let raw = fs::read(path).map_err(|err| GeoProviderError::Io(err.to_string()))?;
        let entries: Vec<GeoTableEntry> = serde_json::from_slice(&raw)
            .map_err(|err| GeoProviderError::Invalid(err.to_string()))?;
        Self::from_entries(entries)
    }

    /// Builds a table from in-memory entries.
    ///
    /// # Errors
    ///
    /// Returns [`GeoProviderError::InvalidCidr`] for an unparseable block.
    pub fn from_entries(entries: Vec<GeoTableEntry>) -> Result<Self, GeoProviderError> {
        let mut blocks = Vec::with_capacity(entries.len());
        for entry in entries {
            let (base, prefix) = parse_cidr(&entry.cidr)
                .ok_or_else(|| GeoProviderError::InvalidCidr(entry.cidr.clone()))?;
            let location = GeoLocation {
                country: entry.country,
                region: entry.region,
                city: entry.city,
                latitude: None,
                longitude: None,
            };
            blocks.push((base, prefix, location));
        }
        Ok(Self {
            blocks,
        })
    }
}

impl GeoLocator for TableGeoLocator {
    fn locate(&self, ip: &str) -> Option<GeoLocation> {
        let address = Ipv4Addr::from_str(ip).ok()?;
        let needle = u32::from(address);
        let mut best: Option<(u8, &GeoLocation)> = None;
        for (base, prefix, location) in &self.blocks {
            if !block_contains(*base, *prefix, needle) {
                continue;
            }
            if best.is_none_or(|(best_prefix, _)| *prefix > best_prefix) {
                best = Some((*prefix, location));
            }
        }
        best.map(|(_, location)| location.clone())
    }
}

/// Parses an IPv4 CIDR string into base address and prefix length.
fn parse_cidr(cidr: &str) -> Option<(u32, u8)> {
    let (address, prefix) = cidr.split_once('/')?;
    let base = Ipv4Addr::from_str(address).ok()?;
    let prefix: u8 = prefix.parse().ok()?;
    if prefix > 32 {
        return None;
    }
    Some((u32::from(base), prefix))
}

/// Tests membership of an address in a CIDR block.
fn block_contains(base: u32, prefix: u8, address: u32) -> bool {
    if prefix == 0 {
        return true;
    }
    let mask = u32::MAX << (32 - u32::from(prefix));
    (base & mask) == (address & mask)
}

// ============================================================================
// SECTION: Null Locator
// ============================================================================

/// Geolocator that never resolves; for deployments without geolocation.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullGeoLocator;

impl GeoLocator for NullGeoLocator {
    fn locate(&self, _ip: &str) -> Option<GeoLocation> {
        None
    }
}

// ============================================================================
// SECTION: HTTP Locator
// ============================================================================

/// Configuration for the HTTP geolocator.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HttpGeoConfig {
    /// Lookup endpoint base; the IP is appended as a path segment.
    pub base_url: String,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Maximum response size allowed, in bytes.
    pub max_response_bytes: usize,
    /// User agent string for outbound requests.
    pub user_agent: String,
}

impl Default for HttpGeoConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            timeout_ms: DEFAULT_HTTP_TIMEOUT_MS,
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
            user_agent: "contour/0.1".to_string(),
        }
    }
}

/// Geolocator backed by an HTTP lookup endpoint.
pub struct HttpGeoLocator {
    /// Locator configuration, including limits.
    config: HttpGeoConfig,
    /// HTTP client used for outbound requests.
    client: Client,
}

impl HttpGeoLocator {
    /// Builds the locator, constructing a bounded HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`GeoProviderError::Client`] when client construction fails.
    pub fn new(config: HttpGeoConfig) -> Result<Self, GeoProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .redirect(Policy::none())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|err| GeoProviderError::Client(err.to_string()))?;
        Ok(Self {
            config,
            client,
        })
    }
}

impl GeoLocator for HttpGeoLocator {
    fn locate(&self, ip: &str) -> Option<GeoLocation> {
        // Reject anything that is not a literal IP before building the URL.
        IpAddr::from_str(ip).ok()?;
        let url = format!("{}/{ip}", self.config.base_url.trim_end_matches('/'));
        let response = self.client.get(url).send().ok()?;
        if !response.status().is_success() {
            return None;
        }
        let mut body = Vec::new();
        response
            .take(u64::try_from(self.config.max_response_bytes).ok()?)
            .read_to_end(&mut body)
            .ok()?;
        serde_json::from_slice(&body).ok()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
