// contour-core/tests/sort.rs
// ============================================================================
// Module: Rule Ordering Tests
// Description: Tests for priority-aware topological ordering.
// ============================================================================
//! ## Overview
//! Validates constraint ordering, priority interleaving, dangling-reference
//! tolerance, and the no-deadlock cycle guarantee.

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

use contour_core::Rule;
use contour_core::RuleId;
use contour_core::runtime::order_rules;

fn rule(id: &str, priority: i64) -> Rule {
    let mut rule = Rule::named(id, id);
    rule.priority = priority;
    rule
}

fn ids(rules: &[Rule]) -> Vec<&str> {
    rules.iter().map(|rule| rule.id.as_str()).collect()
}

// ============================================================================
// SECTION: Ordering
// ============================================================================

/// Tests that unconstrained rules order by priority descending.
#[test]
fn test_priority_order() {
    let ordered = order_rules(vec![rule("low", 1), rule("high", 100), rule("mid", 50)]);
    assert_eq!(ids(&ordered), vec!["high", "mid", "low"]);
}

/// Tests that execute_after forces a dependency before its dependent.
#[test]
fn test_execute_after() {
    let mut dependent = rule("x", 100);
    dependent.execute_after = vec![RuleId::new("y")];
    let ordered = order_rules(vec![dependent, rule("y", 1)]);
    // Despite the higher priority, x waits for y.
    assert_eq!(ids(&ordered), vec!["y", "x"]);
}

/// Tests that execute_before forces a rule ahead of another.
#[test]
fn test_execute_before() {
    let mut early = rule("early", 1);
    early.execute_before = vec![RuleId::new("late")];
    let ordered = order_rules(vec![rule("late", 100), early]);
    assert_eq!(ids(&ordered), vec!["early", "late"]);
}

/// Tests that unconstrained rules interleave with constrained ones by priority.
#[test]
fn test_interleaving() {
    let mut tail = rule("tail", 90);
    tail.execute_after = vec![RuleId::new("head")];
    let ordered = order_rules(vec![tail, rule("head", 10), rule("free", 50)]);
    // free (50) outranks head (10) immediately; tail is unblocked after head.
    assert_eq!(ids(&ordered), vec!["free", "head", "tail"]);
}

/// Tests that dangling ordering references impose no constraint.
#[test]
fn test_dangling_references_ignored() {
    let mut constrained = rule("a", 10);
    constrained.execute_after = vec![RuleId::new("missing")];
    let ordered = order_rules(vec![constrained, rule("b", 5)]);
    assert_eq!(ids(&ordered), vec!["a", "b"]);
}

/// Tests that ordering cycles never deadlock and keep original order.
#[test]
fn test_cycle_appends_in_original_order() {
    let mut first = rule("first", 1);
    first.execute_after = vec![RuleId::new("second")];
    let mut second = rule("second", 2);
    second.execute_after = vec![RuleId::new("first")];
    let ordered = order_rules(vec![first, second, rule("free", 50)]);
    assert_eq!(ids(&ordered), vec!["free", "first", "second"]);
}

/// Tests deterministic ordering for equal priorities.
#[test]
fn test_stable_for_equal_priorities() {
    let ordered = order_rules(vec![rule("a", 5), rule("b", 5), rule("c", 5)]);
    assert_eq!(ids(&ordered), vec!["a", "b", "c"]);
}
