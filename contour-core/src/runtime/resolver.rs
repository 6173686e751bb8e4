// contour-core/src/runtime/resolver.rs
// ============================================================================
// Module: Contour Resolver
// Description: Orchestration of the resolution pipeline for one request.
// Purpose: Compose materialization, loading, ordering, evaluation, and merge.
// Dependencies: crate::core, crate::runtime
// ============================================================================

//! ## Overview
//! The resolver is the single canonical resolution path: look up the
//! specification, materialize composed rules, add conditionally loaded rules,
//! order the combined set, evaluate each rule in order (honoring
//! `stop_propagation`), fold matched configs into the default in match order,
//! and report schema findings alongside the result. All transports must call
//! into this path to preserve determinism.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::context::RequestContext;
use crate::core::identifiers::AppId;
use crate::core::identifiers::RuleId;
use crate::core::identifiers::SpecVersion;
use crate::core::rule::Rule;
use crate::runtime::composer::ComposeError;
use crate::runtime::composer::materialize_rules;
use crate::runtime::evaluator::RuleEvaluator;
use crate::runtime::loader::ConditionalLoader;
use crate::runtime::merge::apply_strategy;
use crate::runtime::sort::order_rules;
use crate::runtime::store::InMemorySpecStore;
use crate::runtime::store::StoreError;
use crate::runtime::validator::ValidationReport;
use crate::runtime::validator::validate_config;

// ============================================================================
// SECTION: Resolution Output
// ============================================================================

/// Summary of one matched rule, in match order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedRule {
    /// Rule identifier.
    pub id: RuleId,
    /// Rule name.
    pub name: String,
    /// Rule priority.
    pub priority: i64,
}

/// Effective configuration produced for one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    /// Application identifier.
    pub app_id: AppId,
    /// Specification version.
    pub version: SpecVersion,
    /// Effective configuration document.
    pub config: Value,
    /// Matched rules in match order (the fold order).
    pub matched_rules: Vec<MatchedRule>,
    /// Schema findings for the effective configuration.
    pub validation: ValidationReport,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Resolution errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// No specification is registered for the requested pair.
    #[error("specification not found: {app_id}@{version}")]
    NotFound {
        /// Requested application identifier.
        app_id: AppId,
        /// Requested version.
        version: SpecVersion,
    },
    /// A composition descriptor failed to materialize.
    #[error(transparent)]
    Composition(#[from] ComposeError),
    /// The specification store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

// ============================================================================
// SECTION: Resolver
// ============================================================================

/// Resolution orchestrator over a shared specification store.
#[derive(Debug, Default)]
pub struct Resolver {
    /// Shared specification store.
    store: InMemorySpecStore,
    /// Cross-request conditional-rule loader.
    loader: ConditionalLoader,
}

impl Resolver {
    /// Creates a resolver over the given store.
    #[must_use]
    pub fn new(store: InMemorySpecStore) -> Self {
        Self {
            store,
            loader: ConditionalLoader::new(),
        }
    }

    /// Returns the underlying specification store.
    #[must_use]
    pub const fn store(&self) -> &InMemorySpecStore {
        &self.store
    }

    /// Drops cached loader state; call after specification mutations.
    pub fn invalidate_caches(&self) {
        self.loader.invalidate();
    }

    /// Resolves the effective configuration for one request.
    ///
    /// Rules pulled in by a satisfied conditional gate participate with
    /// effective `enabled = true` regardless of their stored value.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::NotFound`] for an unknown `(app_id, version)`
    /// pair and [`ResolveError::Composition`] when a composition descriptor
    /// in the specification is malformed.
    pub fn resolve(
        &self,
        app_id: &AppId,
        version: &SpecVersion,
        context: &RequestContext,
    ) -> Result<Resolution, ResolveError> {
        let spec = self.store.get(app_id, version)?.ok_or_else(|| ResolveError::NotFound {
            app_id: app_id.clone(),
            version: version.clone(),
        })?;

        let mut rules = materialize_rules(&spec.rules)?;

        // Gated rules already in the materialized set are enabled in place
        // rather than appended twice; the gate decides participation either way.
        for loaded in self.loader.load(&spec, context) {
            if let Some(existing) = rules.iter_mut().find(|rule| rule.id == loaded.id) {
                existing.enabled = true;
            } else {
                rules.push(loaded);
            }
        }

        let ordered = order_rules(rules);
        let mut evaluator = RuleEvaluator::new(&ordered, context);

        let mut matched_ids: BTreeSet<RuleId> = BTreeSet::new();
        let mut matched: Vec<&Rule> = Vec::new();
        for rule in &ordered {
            let decision = evaluator.evaluate(rule, &matched_ids);
            if decision.matched {
                matched_ids.insert(rule.id.clone());
                matched.push(rule);
                if rule.stop_propagation {
                    break;
                }
            }
        }

        let mut config = spec.default_config.clone();
        for rule in &matched {
            config = apply_strategy(rule.resolution_strategy, &config, &rule.config);
        }

        let validation = validate_config(&config, &spec.schema);
        let matched_rules = matched
            .iter()
            .map(|rule| MatchedRule {
                id: rule.id.clone(),
                name: rule.name.clone(),
                priority: rule.priority,
            })
            .collect();

        Ok(Resolution {
            app_id: spec.app_id.clone(),
            version: spec.version.clone(),
            config,
            matched_rules,
            validation,
        })
    }
}
