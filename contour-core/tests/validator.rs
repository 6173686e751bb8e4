// contour-core/tests/validator.rs
// ============================================================================
// Module: Schema Validator Tests
// Description: Tests for shallow required/optional/deprecated key checking.
// ============================================================================
//! ## Overview
//! Validates the exact finding strings and the shallow nature of the check.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use contour_core::ConfigSchema;
use contour_core::runtime::validate_config;
use serde_json::json;

fn schema() -> ConfigSchema {
    ConfigSchema {
        version: "1".to_string(),
        required_keys: vec!["theme".to_string(), "timeout".to_string()],
        optional_keys: vec!["retries".to_string()],
        deprecated_keys: vec!["legacyMode".to_string()],
    }
}

// ============================================================================
// SECTION: Findings
// ============================================================================

/// Tests that a conforming document is valid with no findings.
#[test]
fn test_valid_document() {
    let report = validate_config(&json!({"theme": "light", "timeout": 5000, "retries": 3}), &schema());
    assert!(report.valid);
    assert!(report.errors.is_empty());
}

/// Tests the missing-required finding string.
#[test]
fn test_missing_required_key() {
    let report = validate_config(&json!({"theme": "light"}), &schema());
    assert!(!report.valid);
    assert_eq!(report.errors, vec!["Missing required key: timeout".to_string()]);
}

/// Tests the deprecated-key finding string.
#[test]
fn test_deprecated_key_reported() {
    let report =
        validate_config(&json!({"theme": "light", "timeout": 1, "legacyMode": true}), &schema());
    assert!(!report.valid);
    assert_eq!(report.errors, vec!["Using deprecated key: legacyMode".to_string()]);
}

/// Tests the unknown-key finding string.
#[test]
fn test_unknown_key_reported() {
    let report =
        validate_config(&json!({"theme": "light", "timeout": 1, "surprise": 0}), &schema());
    assert!(!report.valid);
    assert_eq!(report.errors, vec!["Unknown key: surprise".to_string()]);
}

/// Tests that validation is shallow: nested keys are never inspected.
#[test]
fn test_validation_is_shallow() {
    let report = validate_config(
        &json!({"theme": {"surprise": true, "legacyMode": 1}, "timeout": 1}),
        &schema(),
    );
    assert!(report.valid);
}

/// Tests that a non-object document reports every required key missing.
#[test]
fn test_non_object_document() {
    let report = validate_config(&json!(42), &schema());
    assert!(!report.valid);
    assert_eq!(
        report.errors,
        vec![
            "Missing required key: theme".to_string(),
            "Missing required key: timeout".to_string(),
        ]
    );
}
