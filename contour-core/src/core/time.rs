// contour-core/src/core/time.rs
// ============================================================================
// Module: Contour Time Model
// Description: Canonical timestamp representation for specifications and requests.
// Purpose: Provide deterministic, caller-supplied time values across Contour records.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! Contour uses explicit time values embedded in specifications and request
//! contexts to keep resolution deterministic. The core never reads wall-clock
//! time directly; hosts must supply timestamps when building contexts or
//! saving specifications.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

// ============================================================================
// SECTION: Timestamp
// ============================================================================

/// Canonical timestamp in unix epoch milliseconds.
///
/// # Invariants
/// - Values are explicitly provided by callers; the core never reads wall-clock time.
/// - No validation is performed; monotonicity is a caller responsibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Creates a timestamp from unix epoch milliseconds.
    #[must_use]
    pub const fn from_unix_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Returns the timestamp as unix epoch milliseconds.
    #[must_use]
    pub const fn as_unix_millis(self) -> i64 {
        self.0
    }

    /// Parses an RFC3339 date-time string into a timestamp.
    #[must_use]
    pub fn parse_rfc3339(value: &str) -> Option<Self> {
        let parsed = OffsetDateTime::parse(value, &Rfc3339).ok()?;
        let millis = parsed.unix_timestamp_nanos() / 1_000_000;
        i64::try_from(millis).ok().map(Self)
    }

    /// Formats the timestamp as an RFC3339 date-time string.
    #[must_use]
    pub fn to_rfc3339(self) -> Option<String> {
        let nanos = i128::from(self.0).checked_mul(1_000_000)?;
        let datetime = OffsetDateTime::from_unix_timestamp_nanos(nanos).ok()?;
        datetime.format(&Rfc3339).ok()
    }
}

impl From<i64> for Timestamp {
    fn from(millis: i64) -> Self {
        Self(millis)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
