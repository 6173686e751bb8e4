// contour-core/src/core/identifiers.rs
// ============================================================================
// Module: Contour Identifiers
// Description: Canonical opaque identifiers for specifications, rules, and users.
// Purpose: Provide strongly typed, serializable identifiers with stable wire forms.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! This module defines the canonical identifiers used throughout Contour.
//! Identifiers are opaque UTF-8 strings and serialize transparently on the
//! wire. No normalization or validation is applied at construction; path
//! boundaries (the file store) sanitize separately.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

macro_rules! string_id {
    ($(#[$docs:meta])* $name:ident) => {
        $(#[$docs])*
        ///
        /// # Invariants
        /// - Opaque UTF-8 string; no normalization or validation is applied by this type.
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self::new(value)
            }
        }
    };
}

string_id! {
    /// Application identifier owning a set of specifications.
    AppId
}

string_id! {
    /// Specification version identifier (semver string by convention).
    SpecVersion
}

string_id! {
    /// Specification identifier, unique across the store.
    SpecId
}

string_id! {
    /// Rule identifier, unique within one specification.
    RuleId
}

string_id! {
    /// Rule template identifier within a specification's template map.
    TemplateId
}

string_id! {
    /// End-user identifier used for deterministic rollout bucketing.
    UserId
}
