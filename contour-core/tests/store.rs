// contour-core/tests/store.rs
// ============================================================================
// Module: In-Memory Store Tests
// Description: Tests for the concurrent specification registry.
// ============================================================================
//! ## Overview
//! Validates get/list/save/delete semantics and update stamping.

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

use contour_core::AppId;
use contour_core::ConfigSchema;
use contour_core::Environment;
use contour_core::InMemorySpecStore;
use contour_core::SpecId;
use contour_core::SpecVersion;
use contour_core::Specification;
use contour_core::Timestamp;
use serde_json::json;
use std::collections::BTreeMap;

fn spec(app_id: &str, version: &str) -> Specification {
    Specification {
        id: SpecId::new(format!("{app_id}-{version}")),
        app_id: AppId::new(app_id),
        version: SpecVersion::new(version),
        schema: ConfigSchema::default(),
        default_config: json!({}),
        rules: Vec::new(),
        conditional_rules: Vec::new(),
        rule_templates: BTreeMap::new(),
        environment: Environment::Development,
        feature_flags: BTreeMap::new(),
        rollout_percentages: BTreeMap::new(),
        created_at: Timestamp::from_unix_millis(1_000),
        updated_at: Timestamp::from_unix_millis(1_000),
    }
}

// ============================================================================
// SECTION: Store Operations
// ============================================================================

/// Tests save and keyed retrieval.
#[test]
fn test_save_and_get() {
    let store = InMemorySpecStore::new();
    store.save(spec("govuk", "1.0.0"), Timestamp::from_unix_millis(2_000)).unwrap();

    let loaded = store
        .get(&AppId::new("govuk"), &SpecVersion::new("1.0.0"))
        .unwrap()
        .unwrap();
    assert_eq!(loaded.app_id.as_str(), "govuk");
    assert_eq!(loaded.updated_at, Timestamp::from_unix_millis(2_000));

    assert!(store.get(&AppId::new("govuk"), &SpecVersion::new("9.9.9")).unwrap().is_none());
}

/// Tests that save upserts and restamps the update time.
#[test]
fn test_save_upserts() {
    let store = InMemorySpecStore::new();
    store.save(spec("govuk", "1.0.0"), Timestamp::from_unix_millis(2_000)).unwrap();
    let mut replacement = spec("govuk", "1.0.0");
    replacement.environment = Environment::Production;
    store.save(replacement, Timestamp::from_unix_millis(3_000)).unwrap();

    assert_eq!(store.len().unwrap(), 1);
    let loaded = store
        .get(&AppId::new("govuk"), &SpecVersion::new("1.0.0"))
        .unwrap()
        .unwrap();
    assert_eq!(loaded.environment, Environment::Production);
    assert_eq!(loaded.updated_at, Timestamp::from_unix_millis(3_000));
}

/// Tests listing in key order.
#[test]
fn test_list_in_key_order() {
    let store = InMemorySpecStore::new();
    store.save(spec("zeta", "1.0.0"), Timestamp::from_unix_millis(1)).unwrap();
    store.save(spec("alpha", "2.0.0"), Timestamp::from_unix_millis(1)).unwrap();
    store.save(spec("alpha", "1.0.0"), Timestamp::from_unix_millis(1)).unwrap();

    let apps: Vec<String> = store
        .list()
        .unwrap()
        .iter()
        .map(|spec| format!("{}@{}", spec.app_id, spec.version))
        .collect();
    assert_eq!(apps, vec!["alpha@1.0.0", "alpha@2.0.0", "zeta@1.0.0"]);
}

/// Tests delete semantics.
#[test]
fn test_delete() {
    let store = InMemorySpecStore::new();
    store.save(spec("govuk", "1.0.0"), Timestamp::from_unix_millis(1)).unwrap();

    assert!(store.delete(&AppId::new("govuk"), &SpecVersion::new("1.0.0")).unwrap());
    assert!(!store.delete(&AppId::new("govuk"), &SpecVersion::new("1.0.0")).unwrap());
    assert!(store.is_empty().unwrap());
}
