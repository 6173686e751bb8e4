// contour-core/src/runtime/sort.rs
// ============================================================================
// Module: Contour Rule Ordering
// Description: Priority-aware topological ordering of the evaluation set.
// Purpose: Produce the deterministic evaluation order for a resolve request.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! Ordering constraints (`execute_after`, `execute_before`) form a directed
//! graph over the evaluation set. Kahn's algorithm drains the graph with the
//! ready queue kept sorted by priority descending (original position breaks
//! ties), so unconstrained rules interleave purely by priority. Nodes caught
//! in a cycle are appended at the end in their original order; ordering never
//! deadlocks.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use crate::core::identifiers::RuleId;
use crate::core::rule::Rule;

// ============================================================================
// SECTION: Topological Ordering
// ============================================================================

/// Orders the evaluation set by ordering constraints, then priority.
#[must_use]
pub fn order_rules(rules: Vec<Rule>) -> Vec<Rule> {
    let count = rules.len();
    let mut position: BTreeMap<&RuleId, usize> = BTreeMap::new();
    for (index, rule) in rules.iter().enumerate() {
        position.entry(&rule.id).or_insert(index);
    }

    let mut successors: Vec<Vec<usize>> = vec![Vec::new(); count];
    let mut indegree: Vec<usize> = vec![0; count];
    for (index, rule) in rules.iter().enumerate() {
        for dependency in &rule.execute_after {
            // Dangling ordering references impose no constraint.
            if let Some(&source) = position.get(dependency) {
                successors[source].push(index);
                indegree[index] += 1;
            }
        }
        for dependent in &rule.execute_before {
            if let Some(&target) = position.get(dependent) {
                successors[index].push(target);
                indegree[target] += 1;
            }
        }
    }

    let mut ready: Vec<usize> =
        (0..count).filter(|&index| indegree[index] == 0).collect();
    sort_ready(&mut ready, &rules);

    let mut ordered_indices = Vec::with_capacity(count);
    let mut placed = vec![false; count];
    while let Some(next) = ready.first().copied() {
        ready.remove(0);
        ordered_indices.push(next);
        placed[next] = true;
        let mut changed = false;
        for &successor in &successors[next] {
            indegree[successor] -= 1;
            if indegree[successor] == 0 {
                ready.push(successor);
                changed = true;
            }
        }
        if changed {
            sort_ready(&mut ready, &rules);
        }
    }

    // Cycle leftovers keep their original relative order.
    for index in 0..count {
        if !placed[index] {
            ordered_indices.push(index);
        }
    }

    let mut slots: Vec<Option<Rule>> = rules.into_iter().map(Some).collect();
    ordered_indices.into_iter().filter_map(|index| slots[index].take()).collect()
}

/// Sorts the ready queue by priority descending, original position ascending.
fn sort_ready(ready: &mut [usize], rules: &[Rule]) {
    ready.sort_by(|&left, &right| {
        rules[right].priority.cmp(&rules[left].priority).then(left.cmp(&right))
    });
}
