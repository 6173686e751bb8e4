// contour-core/src/runtime/loader.rs
// ============================================================================
// Module: Contour Conditional Loader
// Description: Load-time gating of conditionally enabled rules.
// Purpose: Decide which gated rules join the evaluation set for a request.
// Dependencies: crate::core, crate::runtime::{condition, hash}, serde_json
// ============================================================================

//! ## Overview
//! Conditional rules are inert (typically stored disabled) until their load
//! conditions all hold for a request; a loaded copy is forced `enabled` so
//! the gate alone decides participation. Gate kinds: environment,
//! feature-flag (context value wins over the specification default),
//! deterministic percentage rollout, and custom-context comparisons.
//!
//! Loaded sets are cached across requests behind a context fingerprint that
//! covers every attribute the loader reads; identical contexts resolve to
//! identical loaded sets without re-evaluating the gates.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::RwLock;

use serde_json::json;

use crate::core::context::RequestContext;
use crate::core::rule::Rule;
use crate::core::spec::LoadCondition;
use crate::core::spec::Specification;
use crate::runtime::condition::apply_operator;
use crate::runtime::hash::rollout_bucket;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Cache entry ceiling; the cache resets wholesale when reached.
const MAX_CACHE_ENTRIES: usize = 1_024;

// ============================================================================
// SECTION: Conditional Loader
// ============================================================================

/// Cross-request conditional-rule loader with a fingerprint cache.
#[derive(Debug, Default)]
pub struct ConditionalLoader {
    /// Loaded-rule sets keyed by context fingerprint.
    cache: RwLock<BTreeMap<String, Vec<Rule>>>,
}

impl ConditionalLoader {
    /// Creates a loader with an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the gated rules that enter the evaluation set for a request.
    ///
    /// Loaded copies are forced `enabled = true`; unresolvable rule ids are
    /// skipped. Results are served from the fingerprint cache when the same
    /// context shape has been evaluated before.
    #[must_use]
    pub fn load(&self, spec: &Specification, context: &RequestContext) -> Vec<Rule> {
        let fingerprint = context_fingerprint(spec, context);
        if let Ok(cache) = self.cache.read()
            && let Some(hit) = cache.get(&fingerprint)
        {
            return hit.clone();
        }

        let loaded = load_uncached(spec, context);
        if let Ok(mut cache) = self.cache.write() {
            if cache.len() >= MAX_CACHE_ENTRIES {
                cache.clear();
            }
            cache.insert(fingerprint, loaded.clone());
        }
        loaded
    }

    /// Drops every cached loaded-rule set.
    pub fn invalidate(&self) {
        if let Ok(mut cache) = self.cache.write() {
            cache.clear();
        }
    }
}

/// Evaluates the gates without consulting the cache.
fn load_uncached(spec: &Specification, context: &RequestContext) -> Vec<Rule> {
    let mut loaded = Vec::new();
    for conditional in &spec.conditional_rules {
        let satisfied = conditional
            .load_conditions
            .iter()
            .all(|condition| evaluate_load_condition(condition, spec, context));
        if !satisfied {
            continue;
        }
        if let Some(rule) = spec.rule(&conditional.rule_id) {
            let mut copy = rule.clone();
            copy.enabled = true;
            loaded.push(copy);
        }
    }
    loaded
}

// ============================================================================
// SECTION: Load Conditions
// ============================================================================

/// Evaluates one load condition against the specification and context.
#[must_use]
pub fn evaluate_load_condition(
    condition: &LoadCondition,
    spec: &Specification,
    context: &RequestContext,
) -> bool {
    match condition {
        LoadCondition::Environment(environment) => spec.environment == *environment,
        LoadCondition::FeatureFlag {
            flag_name,
            expected_value,
        } => {
            let effective = context
                .feature_flags
                .get(flag_name)
                .or_else(|| spec.feature_flags.get(flag_name));
            effective.is_some_and(|value| value == expected_value)
        }
        LoadCondition::PercentageRollout {
            percentage,
            rule_id,
        } => {
            let Some(user_id) = &context.user_id else {
                return false;
            };
            let effective =
                percentage.or_else(|| spec.rollout_percentages.get(rule_id).copied());
            let Some(percentage) = effective else {
                return false;
            };
            rollout_bucket(rule_id, user_id) <= u32::from(percentage)
        }
        LoadCondition::Custom {
            key,
            operator,
            value,
        } => apply_operator(*operator, context.custom.get(key), value),
        LoadCondition::Unknown => false,
    }
}

// ============================================================================
// SECTION: Context Fingerprint
// ============================================================================

/// Renders the canonical fingerprint of every attribute the loader reads.
///
/// Covers user id, custom context, context feature flags, the
/// specification's environment, and the specification identity (which pins
/// its flag defaults and rollout table). A future load condition reading new
/// context attributes must extend this fingerprint.
#[must_use]
pub fn context_fingerprint(spec: &Specification, context: &RequestContext) -> String {
    json!([
        spec.id,
        spec.version,
        spec.environment,
        context.user_id,
        context.feature_flags,
        context.custom,
    ])
    .to_string()
}
