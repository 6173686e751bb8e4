// contour-store-fs/tests/fs_store.rs
// ============================================================================
// Module: File Store Tests
// Description: Tests for directory-backed specification persistence.
// ============================================================================
//! ## Overview
//! Validates round-trips, stable enumeration, removal, and identifier
//! sanitization against a temporary directory.

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

use std::collections::BTreeMap;

use contour_core::AppId;
use contour_core::ConfigSchema;
use contour_core::Environment;
use contour_core::SpecId;
use contour_core::SpecPersistence;
use contour_core::SpecVersion;
use contour_core::Specification;
use contour_core::Timestamp;
use contour_store_fs::FsSpecStore;
use serde_json::json;

fn spec(app_id: &str, version: &str) -> Specification {
    Specification {
        id: SpecId::new(format!("{app_id}-{version}")),
        app_id: AppId::new(app_id),
        version: SpecVersion::new(version),
        schema: ConfigSchema::default(),
        default_config: json!({"theme": "light"}),
        rules: Vec::new(),
        conditional_rules: Vec::new(),
        rule_templates: BTreeMap::new(),
        environment: Environment::Production,
        feature_flags: BTreeMap::new(),
        rollout_percentages: BTreeMap::new(),
        created_at: Timestamp::from_unix_millis(1_000),
        updated_at: Timestamp::from_unix_millis(2_000),
    }
}

// ============================================================================
// SECTION: Round-Trips
// ============================================================================

/// Tests persist and reload of one specification.
#[test]
fn test_persist_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsSpecStore::new(dir.path());

    let original = spec("govuk", "1.0.0");
    store.persist(&original).unwrap();
    assert!(dir.path().join("govuk-1.0.0.json").is_file());

    let loaded = store.load_all().unwrap();
    assert_eq!(loaded, vec![original]);
}

/// Tests that enumeration is stable and sorted by filename.
#[test]
fn test_sorted_enumeration() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsSpecStore::new(dir.path());
    store.persist(&spec("zeta", "1.0.0")).unwrap();
    store.persist(&spec("alpha", "2.0.0")).unwrap();
    store.persist(&spec("alpha", "1.0.0")).unwrap();

    let apps: Vec<String> = store
        .load_all()
        .unwrap()
        .iter()
        .map(|spec| format!("{}@{}", spec.app_id, spec.version))
        .collect();
    assert_eq!(apps, vec!["alpha@1.0.0", "alpha@2.0.0", "zeta@1.0.0"]);
}

/// Tests that a missing root directory loads as empty.
#[test]
fn test_missing_root_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsSpecStore::new(dir.path().join("never-created"));
    assert!(store.load_all().unwrap().is_empty());
}

/// Tests removal semantics, including missing files.
#[test]
fn test_remove() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsSpecStore::new(dir.path());
    store.persist(&spec("govuk", "1.0.0")).unwrap();

    store.remove(&AppId::new("govuk"), &SpecVersion::new("1.0.0")).unwrap();
    assert!(!dir.path().join("govuk-1.0.0.json").exists());
    // Removing again is not an error.
    store.remove(&AppId::new("govuk"), &SpecVersion::new("1.0.0")).unwrap();
}

// ============================================================================
// SECTION: Sanitization and Corruption
// ============================================================================

/// Tests rejection of identifiers unusable as filename components.
#[test]
fn test_unsafe_identifiers_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsSpecStore::new(dir.path());

    for bad in ["../escape", "a/b", "", "..", "name with spaces"] {
        assert!(store.persist(&spec(bad, "1.0.0")).is_err(), "app id {bad:?} must be rejected");
        assert!(store.persist(&spec("app", bad)).is_err(), "version {bad:?} must be rejected");
    }
}

/// Tests that a corrupt file fails the whole load.
#[test]
fn test_corrupt_file_fails_closed() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsSpecStore::new(dir.path());
    store.persist(&spec("govuk", "1.0.0")).unwrap();
    std::fs::write(dir.path().join("broken-1.0.0.json"), b"{not json").unwrap();

    assert!(store.load_all().is_err());
}
