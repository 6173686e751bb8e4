// contour-core/src/runtime/validator.rs
// ============================================================================
// Module: Contour Schema Validation
// Description: Shallow required/optional/deprecated key checking.
// Purpose: Report schema findings without suppressing resolution output.
// Dependencies: crate::core::spec, serde, serde_json
// ============================================================================

//! ## Overview
//! Validation is shallow: only top-level document keys are checked against
//! the schema's three key sets. Findings are reported alongside the resolved
//! configuration; an invalid document never suppresses a response.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::core::spec::ConfigSchema;

// ============================================================================
// SECTION: Validation Report
// ============================================================================

/// Outcome of validating a configuration document against a schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// True when no findings were produced.
    pub valid: bool,
    /// Human-readable findings.
    pub errors: Vec<String>,
}

// ============================================================================
// SECTION: Validation
// ============================================================================

/// Validates a configuration document against a shallow key schema.
#[must_use]
pub fn validate_config(config: &Value, schema: &ConfigSchema) -> ValidationReport {
    let empty = Map::new();
    let document = config.as_object().unwrap_or(&empty);

    let mut errors = Vec::new();
    for key in &schema.required_keys {
        if !document.contains_key(key) {
            errors.push(format!("Missing required key: {key}"));
        }
    }
    for key in document.keys() {
        let deprecated = schema.deprecated_keys.iter().any(|candidate| candidate == key);
        if deprecated {
            errors.push(format!("Using deprecated key: {key}"));
            continue;
        }
        let known = schema.required_keys.iter().any(|candidate| candidate == key)
            || schema.optional_keys.iter().any(|candidate| candidate == key);
        if !known {
            errors.push(format!("Unknown key: {key}"));
        }
    }

    ValidationReport {
        valid: errors.is_empty(),
        errors,
    }
}
