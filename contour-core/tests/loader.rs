// contour-core/tests/loader.rs
// ============================================================================
// Module: Conditional Loader Tests
// Description: Tests for load-time gating and rollout determinism.
// ============================================================================
//! ## Overview
//! Validates the four gate kinds, the forced-enable contract for loaded
//! rules, rollout bucket determinism and monotonicity, and fingerprint cache
//! behavior.

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
use contour_core::ConditionOperator;
use contour_core::ConditionalRule;
use contour_core::ConfigSchema;
use contour_core::Environment;
use contour_core::LoadCondition;
use contour_core::RequestContext;
use contour_core::Rule;
use contour_core::RuleId;
use contour_core::SpecId;
use contour_core::SpecVersion;
use contour_core::Specification;
use contour_core::Timestamp;
use contour_core::UserId;
use contour_core::runtime::ConditionalLoader;
use contour_core::runtime::rollout_bucket;
use serde_json::Map;
use serde_json::json;

fn base_spec() -> Specification {
    Specification {
        id: SpecId::new("spec-1"),
        app_id: AppId::new("govuk"),
        version: SpecVersion::new("1.0.0"),
        schema: ConfigSchema::default(),
        default_config: json!({}),
        rules: Vec::new(),
        conditional_rules: Vec::new(),
        rule_templates: BTreeMap::new(),
        environment: Environment::Production,
        feature_flags: BTreeMap::new(),
        rollout_percentages: BTreeMap::new(),
        created_at: Timestamp::default(),
        updated_at: Timestamp::default(),
    }
}

fn gated_rule(id: &str) -> Rule {
    let mut rule = Rule::named(id, id);
    // Conditional rules are stored inert; the gate must enable them.
    rule.enabled = false;
    rule
}

fn gate(rule_id: &str, conditions: Vec<LoadCondition>) -> ConditionalRule {
    ConditionalRule {
        rule_id: RuleId::new(rule_id),
        load_conditions: conditions,
        lazy_load: false,
    }
}

// ============================================================================
// SECTION: Gate Kinds
// ============================================================================

/// Tests environment gating against the specification's environment.
#[test]
fn test_environment_gate() {
    let mut spec = base_spec();
    spec.rules = vec![gated_rule("prod-only")];
    spec.conditional_rules =
        vec![gate("prod-only", vec![LoadCondition::Environment(Environment::Production)])];

    let loader = ConditionalLoader::new();
    let loaded = loader.load(&spec, &RequestContext::default());
    assert_eq!(loaded.len(), 1);
    // Enable-by-gate: the loaded copy is forced enabled.
    assert!(loaded[0].enabled);

    spec.environment = Environment::Staging;
    spec.id = SpecId::new("spec-2");
    assert!(loader.load(&spec, &RequestContext::default()).is_empty());
}

/// Tests that context feature flags win over specification defaults.
#[test]
fn test_feature_flag_gate_precedence() {
    let mut spec = base_spec();
    spec.rules = vec![gated_rule("beta")];
    spec.feature_flags.insert("beta".to_string(), false);
    spec.conditional_rules = vec![gate(
        "beta",
        vec![LoadCondition::FeatureFlag {
            flag_name: "beta".to_string(),
            expected_value: true,
        }],
    )];

    let loader = ConditionalLoader::new();
    assert!(loader.load(&spec, &RequestContext::default()).is_empty());

    let mut context = RequestContext::default();
    context.feature_flags.insert("beta".to_string(), true);
    assert_eq!(loader.load(&spec, &context).len(), 1);

    // A flag absent on both sides never matches.
    let mut unflagged = base_spec();
    unflagged.id = SpecId::new("spec-3");
    unflagged.rules = vec![gated_rule("beta")];
    unflagged.conditional_rules = vec![gate(
        "beta",
        vec![LoadCondition::FeatureFlag {
            flag_name: "ghost".to_string(),
            expected_value: false,
        }],
    )];
    assert!(loader.load(&unflagged, &RequestContext::default()).is_empty());
}

/// Tests custom-context gating through the shared operator set.
#[test]
fn test_custom_gate() {
    let mut spec = base_spec();
    spec.rules = vec![gated_rule("tiered")];
    spec.conditional_rules = vec![gate(
        "tiered",
        vec![LoadCondition::Custom {
            key: "tier".to_string(),
            operator: ConditionOperator::In,
            value: json!(["gold", "platinum"]),
        }],
    )];

    let loader = ConditionalLoader::new();
    let mut context = RequestContext::default();
    context.custom = Map::from_iter([("tier".to_string(), json!("gold"))]);
    assert_eq!(loader.load(&spec, &context).len(), 1);

    let mut other = RequestContext::default();
    other.custom = Map::from_iter([("tier".to_string(), json!("bronze"))]);
    assert!(loader.load(&spec, &other).is_empty());
}

/// Tests that every gate must hold (AND composition).
#[test]
fn test_all_gates_required() {
    let mut spec = base_spec();
    spec.rules = vec![gated_rule("strict")];
    spec.conditional_rules = vec![gate(
        "strict",
        vec![
            LoadCondition::Environment(Environment::Production),
            LoadCondition::FeatureFlag {
                flag_name: "beta".to_string(),
                expected_value: true,
            },
        ],
    )];

    let loader = ConditionalLoader::new();
    // Environment holds, flag does not.
    assert!(loader.load(&spec, &RequestContext::default()).is_empty());
}

/// Tests that dangling gated rule ids are skipped silently.
#[test]
fn test_unresolvable_rule_skipped() {
    let mut spec = base_spec();
    spec.conditional_rules =
        vec![gate("nowhere", vec![LoadCondition::Environment(Environment::Production)])];
    let loader = ConditionalLoader::new();
    assert!(loader.load(&spec, &RequestContext::default()).is_empty());
}

// ============================================================================
// SECTION: Percentage Rollouts
// ============================================================================

/// Tests rollout bucketing at 25 percent for a fixed user.
#[test]
fn test_percentage_rollout_bucket() {
    let bucket = rollout_bucket(&RuleId::new("beta"), &UserId::new("user055"));

    let mut spec = base_spec();
    spec.rules = vec![gated_rule("beta")];
    spec.conditional_rules = vec![gate(
        "beta",
        vec![LoadCondition::PercentageRollout {
            percentage: Some(25),
            rule_id: RuleId::new("beta"),
        }],
    )];

    let loader = ConditionalLoader::new();
    let context = RequestContext {
        user_id: Some(UserId::new("user055")),
        ..RequestContext::default()
    };
    let loaded = loader.load(&spec, &context);
    assert_eq!(!loaded.is_empty(), bucket <= 25);
}

/// Tests rollout monotonicity: membership at p implies membership at 100.
#[test]
fn test_percentage_rollout_monotonic() {
    let loader = ConditionalLoader::new();
    for (spec_id, percentage, expect_any) in
        [("all", 100_u8, true), ("none", 0_u8, false)]
    {
        let mut spec = base_spec();
        spec.id = SpecId::new(spec_id);
        spec.rules = vec![gated_rule("beta")];
        spec.conditional_rules = vec![gate(
            "beta",
            vec![LoadCondition::PercentageRollout {
                percentage: Some(percentage),
                rule_id: RuleId::new("beta"),
            }],
        )];
        for user in ["user001", "user055", "user999"] {
            let context = RequestContext {
                user_id: Some(UserId::new(user)),
                ..RequestContext::default()
            };
            assert_eq!(!loader.load(&spec, &context).is_empty(), expect_any);
        }
    }
}

/// Tests that rollouts without a user identity never load.
#[test]
fn test_percentage_rollout_requires_user() {
    let mut spec = base_spec();
    spec.rules = vec![gated_rule("beta")];
    spec.conditional_rules = vec![gate(
        "beta",
        vec![LoadCondition::PercentageRollout {
            percentage: Some(100),
            rule_id: RuleId::new("beta"),
        }],
    )];
    let loader = ConditionalLoader::new();
    assert!(loader.load(&spec, &RequestContext::default()).is_empty());
}

/// Tests the fallback to the specification's rollout table.
#[test]
fn test_percentage_fallback_to_spec_table() {
    let mut spec = base_spec();
    spec.rules = vec![gated_rule("beta")];
    spec.rollout_percentages.insert(RuleId::new("beta"), 100);
    spec.conditional_rules = vec![gate(
        "beta",
        vec![LoadCondition::PercentageRollout {
            percentage: None,
            rule_id: RuleId::new("beta"),
        }],
    )];
    let loader = ConditionalLoader::new();
    let context = RequestContext {
        user_id: Some(UserId::new("user055")),
        ..RequestContext::default()
    };
    assert_eq!(loader.load(&spec, &context).len(), 1);
}

// ============================================================================
// SECTION: Cache
// ============================================================================

/// Tests that identical contexts resolve to identical loaded sets.
#[test]
fn test_cache_determinism() {
    let mut spec = base_spec();
    spec.rules = vec![gated_rule("beta")];
    spec.conditional_rules = vec![gate(
        "beta",
        vec![LoadCondition::PercentageRollout {
            percentage: Some(100),
            rule_id: RuleId::new("beta"),
        }],
    )];

    let loader = ConditionalLoader::new();
    let context = RequestContext {
        user_id: Some(UserId::new("user055")),
        ..RequestContext::default()
    };
    let first = loader.load(&spec, &context);
    let second = loader.load(&spec, &context);
    assert_eq!(first, second);

    // A different user is a different fingerprint.
    let other = RequestContext {
        user_id: Some(UserId::new("user-other")),
        ..RequestContext::default()
    };
    let _ = loader.load(&spec, &other);
    assert_eq!(loader.load(&spec, &context), first);
}
