// contour-core/src/runtime/merge.rs
// ============================================================================
// Module: Contour Value Merger
// Description: Deep, replace, and left-wins combination of configuration documents.
// Purpose: Provide the three resolution strategies over arbitrary JSON documents.
// Dependencies: crate::core::rule, serde_json
// ============================================================================

//! ## Overview
//! Configuration documents are open-ended JSON values. Three combination
//! strategies exist: deep merge (objects recurse, arrays and scalars are
//! replaced atomically), override (the right document replaces the left
//! wholesale), and inherit (right as base, left wins at the top level,
//! intentionally shallow). None of the operations mutate their inputs.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Map;
use serde_json::Value;

use crate::core::rule::ResolutionStrategy;

// ============================================================================
// SECTION: Merge Operations
// ============================================================================

/// Deep-merges `right` into `left`, returning a new document.
///
/// Keys present only in `left` are retained. When both sides hold an object
/// under the same key, the merge recurses; any other pairing is decided in
/// `right`'s favor. Arrays are replaced atomically, never concatenated.
#[must_use]
pub fn merge_values(left: &Value, right: &Value) -> Value {
    match (left, right) {
        (Value::Object(left_map), Value::Object(right_map)) => {
            let mut merged = left_map.clone();
            for (key, right_value) in right_map {
                let combined = match merged.get(key) {
                    Some(left_value) if left_value.is_object() && right_value.is_object() => {
                        merge_values(left_value, right_value)
                    }
                    _ => right_value.clone(),
                };
                merged.insert(key.clone(), combined);
            }
            Value::Object(merged)
        }
        _ => right.clone(),
    }
}

/// Replaces `left` with a shallow copy of `right`.
#[must_use]
pub fn override_values(_left: &Value, right: &Value) -> Value {
    right.clone()
}

/// Overlays `left` on `right` at the top level so existing keys in `left` win.
///
/// Nested objects are not recursed; this strategy is intentionally shallow.
#[must_use]
pub fn inherit_values(left: &Value, right: &Value) -> Value {
    match (left, right) {
        (Value::Object(left_map), Value::Object(right_map)) => {
            let mut combined: Map<String, Value> = right_map.clone();
            for (key, left_value) in left_map {
                combined.insert(key.clone(), left_value.clone());
            }
            Value::Object(combined)
        }
        (Value::Object(_), _) => left.clone(),
        _ => right.clone(),
    }
}

/// Applies the named strategy to a `(left, right)` document pair.
#[must_use]
pub fn apply_strategy(strategy: ResolutionStrategy, left: &Value, right: &Value) -> Value {
    match strategy {
        ResolutionStrategy::Merge => merge_values(left, right),
        ResolutionStrategy::Override => override_values(left, right),
        ResolutionStrategy::Inherit => inherit_values(left, right),
    }
}
