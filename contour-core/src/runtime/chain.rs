// contour-core/src/runtime/chain.rs
// ============================================================================
// Module: Contour Chain Evaluation
// Description: Recursive boolean chain evaluation over rule references.
// Purpose: Combine rule outcomes with AND/OR/NOT/XOR combinators.
// Dependencies: crate::core::rule
// ============================================================================

//! ## Overview
//! A chain is a recursive boolean expression whose leaves reference rules by
//! id. Referenced rules receive *basic* evaluation (enabled plus primitive
//! conditions) supplied by the caller; dependency, exclusion, and chain
//! checks are deliberately not re-applied, which prevents infinite recursion
//! between chains and the rules they reference. Unknown rule ids and unknown
//! operators evaluate to false.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::identifiers::RuleId;
use crate::core::rule::ChainNode;
use crate::core::rule::ChainOperator;
use crate::core::rule::RuleChain;

// ============================================================================
// SECTION: Chain Evaluation
// ============================================================================

/// Evaluates a chain, resolving rule references through `basic`.
///
/// `basic` returns the referenced rule's basic evaluation, or false for an
/// unknown id. `NOT` negates the first item only; an empty `AND` is
/// vacuously true while empty `OR`/`XOR`/`NOT` are false.
#[must_use]
pub fn evaluate_chain(chain: &RuleChain, basic: &mut dyn FnMut(&RuleId) -> bool) -> bool {
    match chain.operator {
        ChainOperator::And => {
            for node in &chain.rules {
                if !evaluate_node(node, basic) {
                    return false;
                }
            }
            true
        }
        ChainOperator::Or => {
            for node in &chain.rules {
                if evaluate_node(node, basic) {
                    return true;
                }
            }
            false
        }
        ChainOperator::Not => {
            chain.rules.first().is_some_and(|node| !evaluate_node(node, basic))
        }
        ChainOperator::Xor => {
            let mut matches = 0_usize;
            for node in &chain.rules {
                if evaluate_node(node, basic) {
                    matches += 1;
                    if matches > 1 {
                        return false;
                    }
                }
            }
            matches == 1
        }
        ChainOperator::Unknown => false,
    }
}

/// Evaluates one chain item.
fn evaluate_node(node: &ChainNode, basic: &mut dyn FnMut(&RuleId) -> bool) -> bool {
    match node {
        ChainNode::Rule(id) => basic(id),
        ChainNode::Chain(nested) => evaluate_chain(nested, basic),
    }
}
