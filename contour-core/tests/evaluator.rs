// contour-core/tests/evaluator.rs
// ============================================================================
// Module: Rule Evaluator Tests
// Description: Tests for per-rule decisions and chain combination.
// ============================================================================
//! ## Overview
//! Validates the short-circuit precedence of the per-rule checks, exclusion
//! and dependency semantics, and chain evaluation over the rule registry.

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

use std::collections::BTreeSet;

use contour_core::ChainNode;
use contour_core::ChainOperator;
use contour_core::ConditionOperator;
use contour_core::ConditionType;
use contour_core::ParsedUserAgent;
use contour_core::PrimitiveCondition;
use contour_core::RequestContext;
use contour_core::Rule;
use contour_core::RuleChain;
use contour_core::RuleEvaluator;
use contour_core::RuleId;
use serde_json::json;

fn os_rule(id: &str, os: &str) -> Rule {
    let mut rule = Rule::named(id, id);
    rule.conditions = vec![PrimitiveCondition {
        condition_type: ConditionType::Os,
        operator: ConditionOperator::Eq,
        value: json!(os),
    }];
    rule
}

fn ios_context() -> RequestContext {
    RequestContext {
        parsed_ua: ParsedUserAgent {
            os_name: Some("iOS".to_string()),
            device_type: Some("mobile".to_string()),
        },
        ..RequestContext::default()
    }
}

fn matched(ids: &[&str]) -> BTreeSet<RuleId> {
    ids.iter().map(|id| RuleId::new(*id)).collect()
}

// ============================================================================
// SECTION: Decision Precedence
// ============================================================================

/// Tests the reason strings along the short-circuit precedence.
#[test]
fn test_decision_precedence() {
    let context = ios_context();

    let mut disabled = os_rule("r", "iOS");
    disabled.enabled = false;
    // Disabled wins even when an exclusion would also apply.
    disabled.exclusions = vec![RuleId::new("other")];
    let rules = vec![disabled.clone()];
    let mut evaluator = RuleEvaluator::new(&rules, &context);
    let decision = evaluator.evaluate(&disabled, &matched(&["other"]));
    assert!(!decision.matched);
    assert_eq!(decision.reason, "Rule disabled");

    let mut excluded = os_rule("r", "iOS");
    excluded.exclusions = vec![RuleId::new("other")];
    excluded.dependencies = vec![RuleId::new("missing")];
    let rules = vec![excluded.clone()];
    let mut evaluator = RuleEvaluator::new(&rules, &context);
    let decision = evaluator.evaluate(&excluded, &matched(&["other"]));
    assert_eq!(decision.reason, "Excluded by another rule");

    let mut dependent = os_rule("r", "iOS");
    dependent.dependencies = vec![RuleId::new("missing")];
    let rules = vec![dependent.clone()];
    let mut evaluator = RuleEvaluator::new(&rules, &context);
    let decision = evaluator.evaluate(&dependent, &matched(&[]));
    assert_eq!(decision.reason, "Missing dependencies");

    let satisfied = os_rule("r", "iOS");
    let rules = vec![satisfied.clone()];
    let mut evaluator = RuleEvaluator::new(&rules, &context);
    let decision = evaluator.evaluate(&satisfied, &matched(&[]));
    assert!(decision.matched);
    assert_eq!(decision.reason, "All conditions met");

    let mismatched = os_rule("r", "Android");
    let rules = vec![mismatched.clone()];
    let mut evaluator = RuleEvaluator::new(&rules, &context);
    let decision = evaluator.evaluate(&mismatched, &matched(&[]));
    assert!(!decision.matched);
    assert_eq!(decision.reason, "Conditions not met");
}

/// Tests that satisfied dependencies allow a match.
#[test]
fn test_dependencies_satisfied() {
    let context = ios_context();
    let mut rule = os_rule("child", "iOS");
    rule.dependencies = vec![RuleId::new("parent")];
    let rules = vec![rule.clone()];
    let mut evaluator = RuleEvaluator::new(&rules, &context);
    assert!(evaluator.evaluate(&rule, &matched(&["parent"])).matched);
}

/// Tests that a rule with no conditions matches when enabled.
#[test]
fn test_empty_conditions_match() {
    let context = RequestContext::default();
    let rule = Rule::named("bare", "Bare");
    let rules = vec![rule.clone()];
    let mut evaluator = RuleEvaluator::new(&rules, &context);
    assert!(evaluator.evaluate(&rule, &matched(&[])).matched);
}

// ============================================================================
// SECTION: Chains
// ============================================================================

/// Tests XOR chain behavior with one and with both branches true.
#[test]
fn test_xor_chain() {
    let context = ios_context();
    let mut combo = Rule::named("combo", "Combo");
    combo.chain = Some(RuleChain {
        operator: ChainOperator::Xor,
        rules: vec![
            ChainNode::Rule(RuleId::new("iosRule")),
            ChainNode::Rule(RuleId::new("androidRule")),
        ],
    });

    // Exactly one branch true: the chain holds.
    let rules = vec![combo.clone(), os_rule("iosRule", "iOS"), os_rule("androidRule", "Android")];
    let mut evaluator = RuleEvaluator::new(&rules, &context);
    assert!(evaluator.evaluate(&combo, &matched(&[])).matched);

    // Both branches true: XOR fails.
    let rules = vec![combo.clone(), os_rule("iosRule", "iOS"), os_rule("androidRule", "iOS")];
    let mut evaluator = RuleEvaluator::new(&rules, &context);
    let decision = evaluator.evaluate(&combo, &matched(&[]));
    assert!(!decision.matched);
    assert_eq!(decision.reason, "Chain evaluation failed");
}

/// Tests nested chains and the NOT first-item semantics.
#[test]
fn test_nested_and_not_chains() {
    let context = ios_context();
    let mut rule = Rule::named("guard", "Guard");
    rule.chain = Some(RuleChain {
        operator: ChainOperator::And,
        rules: vec![
            ChainNode::Rule(RuleId::new("iosRule")),
            ChainNode::Chain(RuleChain {
                operator: ChainOperator::Not,
                rules: vec![
                    ChainNode::Rule(RuleId::new("androidRule")),
                    // Only the first item is negated; extra items are ignored.
                    ChainNode::Rule(RuleId::new("iosRule")),
                ],
            }),
        ],
    });

    let rules = vec![rule.clone(), os_rule("iosRule", "iOS"), os_rule("androidRule", "Android")];
    let mut evaluator = RuleEvaluator::new(&rules, &context);
    assert!(evaluator.evaluate(&rule, &matched(&[])).matched);
}

/// Tests that unknown rule ids in chains evaluate to false.
#[test]
fn test_unknown_chain_reference() {
    let context = ios_context();
    let mut rule = Rule::named("r", "R");
    rule.chain = Some(RuleChain {
        operator: ChainOperator::Or,
        rules: vec![ChainNode::Rule(RuleId::new("nowhere"))],
    });
    let rules = vec![rule.clone()];
    let mut evaluator = RuleEvaluator::new(&rules, &context);
    let decision = evaluator.evaluate(&rule, &matched(&[]));
    assert!(!decision.matched);
    assert_eq!(decision.reason, "Chain evaluation failed");
}

/// Tests that chain references use basic evaluation, ignoring exclusions.
#[test]
fn test_chain_uses_basic_evaluation() {
    let context = ios_context();
    let mut referenced = os_rule("referenced", "iOS");
    // The referenced rule is excluded by an already-matched rule, but chain
    // references intentionally skip exclusion checks.
    referenced.exclusions = vec![RuleId::new("winner")];

    let mut rule = Rule::named("r", "R");
    rule.chain = Some(RuleChain {
        operator: ChainOperator::And,
        rules: vec![ChainNode::Rule(RuleId::new("referenced"))],
    });

    let rules = vec![rule.clone(), referenced];
    let mut evaluator = RuleEvaluator::new(&rules, &context);
    assert!(evaluator.evaluate(&rule, &matched(&["winner"])).matched);
}
