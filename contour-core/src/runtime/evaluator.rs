// contour-core/src/runtime/evaluator.rs
// ============================================================================
// Module: Contour Rule Evaluation
// Description: Per-rule match decisions with short-circuit precedence.
// Purpose: Decide each rule against a context and the already-matched set.
// Dependencies: crate::core, crate::runtime::{chain, condition}
// ============================================================================

//! ## Overview
//! The rule evaluator is request-scoped: it holds a registry over the ordered
//! evaluation set, the request context, and a basic-evaluation memo. Checks
//! short-circuit in a fixed precedence: disabled, excluded, missing
//! dependencies, chain failure, then primitive conditions. The memo is keyed
//! by rule id because the context is fixed for the evaluator's lifetime; a
//! fresh evaluator is built per request, so no state leaks across requests.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use crate::core::context::RequestContext;
use crate::core::identifiers::RuleId;
use crate::core::rule::Rule;
use crate::runtime::chain::evaluate_chain;
use crate::runtime::condition::evaluate_condition;

// ============================================================================
// SECTION: Decision Reasons
// ============================================================================

/// Reason a rule was disabled at evaluation time.
pub const REASON_DISABLED: &str = "Rule disabled";
/// Reason a rule was blocked by a prior exclusion match.
pub const REASON_EXCLUDED: &str = "Excluded by another rule";
/// Reason a rule's dependencies were unmet.
pub const REASON_MISSING_DEPENDENCIES: &str = "Missing dependencies";
/// Reason a rule's chain evaluated false.
pub const REASON_CHAIN_FAILED: &str = "Chain evaluation failed";
/// Reason for a full match.
pub const REASON_CONDITIONS_MET: &str = "All conditions met";
/// Reason primitive conditions failed.
pub const REASON_CONDITIONS_NOT_MET: &str = "Conditions not met";

/// Outcome of evaluating one rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleDecision {
    /// Whether the rule matched.
    pub matched: bool,
    /// Stable reason string for the decision.
    pub reason: &'static str,
}

// ============================================================================
// SECTION: Rule Evaluator
// ============================================================================

/// Request-scoped rule evaluator with basic-evaluation memoization.
pub struct RuleEvaluator<'a> {
    /// Registry over the evaluation set, keyed by rule id.
    registry: BTreeMap<&'a RuleId, &'a Rule>,
    /// Request context, fixed for the evaluator's lifetime.
    context: &'a RequestContext,
    /// Basic-evaluation memo keyed by rule id.
    basic_memo: BTreeMap<RuleId, bool>,
}

impl<'a> RuleEvaluator<'a> {
    /// Builds an evaluator over the ordered evaluation set.
    #[must_use]
    pub fn new(rules: &'a [Rule], context: &'a RequestContext) -> Self {
        let registry = rules.iter().map(|rule| (&rule.id, rule)).collect();
        Self {
            registry,
            context,
            basic_memo: BTreeMap::new(),
        }
    }

    /// Evaluates one rule against the context and the already-matched set.
    ///
    /// The first failing check decides: disabled, excluded, missing
    /// dependencies, chain failure, then primitive conditions.
    pub fn evaluate(&mut self, rule: &Rule, matched: &BTreeSet<RuleId>) -> RuleDecision {
        if !rule.enabled {
            return RuleDecision {
                matched: false,
                reason: REASON_DISABLED,
            };
        }
        if rule.exclusions.iter().any(|id| matched.contains(id)) {
            return RuleDecision {
                matched: false,
                reason: REASON_EXCLUDED,
            };
        }
        if rule.dependencies.iter().any(|id| !matched.contains(id)) {
            return RuleDecision {
                matched: false,
                reason: REASON_MISSING_DEPENDENCIES,
            };
        }
        if let Some(chain) = &rule.chain {
            let mut basic = |id: &RuleId| self.basic_evaluation(id);
            if !evaluate_chain(chain, &mut basic) {
                return RuleDecision {
                    matched: false,
                    reason: REASON_CHAIN_FAILED,
                };
            }
        }
        if rule.conditions.iter().all(|condition| evaluate_condition(condition, self.context)) {
            RuleDecision {
                matched: true,
                reason: REASON_CONDITIONS_MET,
            }
        } else {
            RuleDecision {
                matched: false,
                reason: REASON_CONDITIONS_NOT_MET,
            }
        }
    }

    /// Basic evaluation of a referenced rule: enabled plus conditions.
    ///
    /// Dependency, exclusion, and chain checks are intentionally skipped so
    /// chain references cannot recurse. Unknown ids evaluate false.
    fn basic_evaluation(&mut self, id: &RuleId) -> bool {
        if let Some(&memoized) = self.basic_memo.get(id) {
            return memoized;
        }
        let outcome = self.registry.get(id).is_some_and(|rule| {
            rule.enabled
                && rule.conditions.iter().all(|condition| evaluate_condition(condition, self.context))
        });
        self.basic_memo.insert(id.clone(), outcome);
        outcome
    }
}
