// contour-core/tests/merge.rs
// ============================================================================
// Module: Value Merger Tests
// Description: Tests for deep merge, override, and inherit strategies.
// ============================================================================
//! ## Overview
//! Validates the strategy contract: deep merge recurses objects and replaces
//! arrays atomically, override discards the left document, and inherit stays
//! intentionally shallow.

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

use contour_core::ResolutionStrategy;
use contour_core::runtime::apply_strategy;
use contour_core::runtime::inherit_values;
use contour_core::runtime::merge_values;
use contour_core::runtime::override_values;
use serde_json::json;

// ============================================================================
// SECTION: Deep Merge
// ============================================================================

/// Tests that merging an empty document is the identity.
#[test]
fn test_merge_left_identity() {
    let document = json!({"theme": "light", "nested": {"a": 1}, "list": [1, 2]});
    assert_eq!(merge_values(&document, &json!({})), document);
}

/// Tests that nested objects recurse while scalars replace.
#[test]
fn test_merge_recurses_objects() {
    let left = json!({"theme": "light", "timeouts": {"connect": 5, "read": 10}});
    let right = json!({"timeouts": {"read": 30}});
    let merged = merge_values(&left, &right);
    assert_eq!(merged, json!({"theme": "light", "timeouts": {"connect": 5, "read": 30}}));
}

/// Tests that keys present only in the left document survive unchanged.
#[test]
fn test_merge_preserves_disjoint_subtrees() {
    let left = json!({"only_left": {"deep": true}, "shared": 1});
    let right = json!({"shared": 2, "only_right": 3});
    let merged = merge_values(&left, &right);
    assert_eq!(merged, json!({"only_left": {"deep": true}, "shared": 2, "only_right": 3}));
}

/// Tests that arrays replace atomically, never concatenate.
#[test]
fn test_merge_replaces_arrays() {
    let left = json!({"features": ["a", "b"]});
    let right = json!({"features": ["c"]});
    assert_eq!(merge_values(&left, &right), json!({"features": ["c"]}));
}

/// Tests that an object over a scalar replaces rather than recurses.
#[test]
fn test_merge_type_mismatch_replaces() {
    let left = json!({"value": 5});
    let right = json!({"value": {"nested": true}});
    assert_eq!(merge_values(&left, &right), json!({"value": {"nested": true}}));

    let left = json!({"value": {"nested": true}});
    let right = json!({"value": 5});
    assert_eq!(merge_values(&left, &right), json!({"value": 5}));
}

/// Tests that merge does not mutate its inputs.
#[test]
fn test_merge_pure() {
    let left = json!({"a": {"b": 1}});
    let right = json!({"a": {"c": 2}});
    let left_before = left.clone();
    let right_before = right.clone();
    let _ = merge_values(&left, &right);
    assert_eq!(left, left_before);
    assert_eq!(right, right_before);
}

// ============================================================================
// SECTION: Override
// ============================================================================

/// Tests that override returns the right document regardless of the left.
#[test]
fn test_override_right_wins() {
    let left = json!({"anything": true, "nested": {"x": 1}});
    let right = json!({"only": "this"});
    assert_eq!(override_values(&left, &right), right);
}

// ============================================================================
// SECTION: Inherit
// ============================================================================

/// Tests that inherit keeps existing left keys at the top level.
#[test]
fn test_inherit_left_wins_shallow() {
    let left = json!({"theme": "dark"});
    let right = json!({"theme": "light", "timeout": 5000});
    assert_eq!(inherit_values(&left, &right), json!({"theme": "dark", "timeout": 5000}));
}

/// Tests that inherit against an empty right document is the identity.
#[test]
fn test_inherit_identity() {
    let document = json!({"theme": "dark", "nested": {"a": 1}});
    assert_eq!(inherit_values(&document, &json!({})), document);
}

/// Tests that inherit does not recurse into nested objects.
#[test]
fn test_inherit_is_shallow() {
    let left = json!({"timeouts": {"connect": 5}});
    let right = json!({"timeouts": {"connect": 1, "read": 30}});
    // The whole nested object from the left wins; right's read key is gone.
    assert_eq!(inherit_values(&left, &right), json!({"timeouts": {"connect": 5}}));
}

// ============================================================================
// SECTION: Strategy Dispatch
// ============================================================================

/// Tests strategy dispatch against all three strategies.
#[test]
fn test_apply_strategy_dispatch() {
    let left = json!({"a": 1, "nested": {"x": 1}});
    let right = json!({"b": 2, "nested": {"y": 2}});

    assert_eq!(
        apply_strategy(ResolutionStrategy::Merge, &left, &right),
        json!({"a": 1, "b": 2, "nested": {"x": 1, "y": 2}})
    );
    assert_eq!(apply_strategy(ResolutionStrategy::Override, &left, &right), right);
    assert_eq!(
        apply_strategy(ResolutionStrategy::Inherit, &left, &right),
        json!({"a": 1, "b": 2, "nested": {"x": 1}})
    );
}
