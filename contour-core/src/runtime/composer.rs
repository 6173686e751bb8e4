// contour-core/src/runtime/composer.rs
// ============================================================================
// Module: Contour Rule Composer
// Description: Template instantiation and rule composition (extend/compose/mixin).
// Purpose: Materialize declarative composition descriptors into concrete rules.
// Dependencies: crate::core, crate::runtime::merge, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Composition turns partial or referencing rule definitions into concrete
//! rules: templates are instantiated with overrides, `extend` inherits from a
//! base rule, `compose` folds several sources into one, and `mixin` folds
//! fragments into a target. The composer is stateless: templates and the rule
//! registry are per-call parameters, so materialization is trivially safe
//! under concurrent resolve requests.
//!
//! `extend` chains are resolved recursively with a visited set; a revisited
//! rule id is a composition cycle and is reported rather than recursed.
//! `mixin` silently skips unknown source ids while `compose` rejects them;
//! the asymmetry is part of the contract.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

use crate::core::identifiers::RuleId;
use crate::core::identifiers::TemplateId;
use crate::core::rule::CompositionType;
use crate::core::rule::METADATA_COMPOSED_FROM;
use crate::core::rule::METADATA_COMPOSITION_STRATEGY;
use crate::core::rule::METADATA_CREATED_FROM_TEMPLATE;
use crate::core::rule::METADATA_EXTENDED_FROM;
use crate::core::rule::METADATA_MIXINS;
use crate::core::rule::MIXED_TAG;
use crate::core::rule::ResolutionStrategy;
use crate::core::rule::Rule;
use crate::core::rule::RulePatch;
use crate::runtime::merge::apply_strategy;
use crate::runtime::merge::merge_values;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Composition errors raised by administrative operations.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
/// - Never raised from the evaluation pipeline itself; only from
///   materialization and the admin API surface.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ComposeError {
    /// Compose was invoked with an empty source list.
    #[error("cannot compose an empty rule list")]
    EmptyComposition,
    /// Extend composition without a base rule id.
    #[error("extend composition requires a base rule id")]
    MissingBaseRuleId,
    /// Extend composition referencing an unknown base rule.
    #[error("base rule not found: {0}")]
    BaseRuleNotFound(RuleId),
    /// Compose or mixin composition without source rule ids.
    #[error("composition requires source rule ids")]
    MissingSourceRuleIds,
    /// Compose composition referencing an unknown source rule.
    #[error("source rule not found: {0}")]
    SourceRuleNotFound(RuleId),
    /// Template instantiation referencing an unknown template.
    #[error("template not found: {0}")]
    TemplateNotFound(TemplateId),
    /// Template instantiation without an id in the overrides.
    #[error("template instantiation requires an id override")]
    TemplateMissingId,
    /// Extend chain revisited a rule id.
    #[error("composition cycle detected at rule: {0}")]
    Cycle(RuleId),
}

// ============================================================================
// SECTION: Template Instantiation
// ============================================================================

/// Instantiates a registered template into a complete rule.
///
/// `overrides` wins field-by-field over the template; `config` is
/// deep-merged (overrides over template) and `metadata` is shallow-merged
/// with the template provenance stamped in.
///
/// # Errors
///
/// Returns [`ComposeError::TemplateMissingId`] when `overrides.id` is absent
/// and [`ComposeError::TemplateNotFound`] when the template is unregistered.
pub fn instantiate_template(
    templates: &BTreeMap<TemplateId, RulePatch>,
    template_id: &TemplateId,
    overrides: &RulePatch,
) -> Result<Rule, ComposeError> {
    let id = overrides.id.clone().ok_or(ComposeError::TemplateMissingId)?;
    let template = templates
        .get(template_id)
        .ok_or_else(|| ComposeError::TemplateNotFound(template_id.clone()))?;

    let merged = template.clone().overlay(overrides);
    let mut rule = rule_from_patch(merged, id);
    rule.metadata.insert(
        METADATA_CREATED_FROM_TEMPLATE.to_string(),
        Value::String(template_id.as_str().to_string()),
    );
    Ok(rule)
}

// ============================================================================
// SECTION: Extend
// ============================================================================

/// Produces a new rule inheriting from `base` with `overrides` applied.
///
/// Fields supplied by `overrides` win; `config` is deep-merged (base then
/// overrides); `conditions` are taken wholesale from whichever side supplies
/// them last. The default id is `"<base.id>-extended"` unless overridden.
/// The base rule is not mutated.
#[must_use]
pub fn extend_rule(base: &Rule, overrides: &RulePatch) -> Rule {
    let id = overrides
        .id
        .clone()
        .unwrap_or_else(|| RuleId::new(format!("{}-extended", base.id.as_str())));

    let merged = RulePatch::from_rule(base).overlay(overrides);
    let mut rule = rule_from_patch(merged, id);
    rule.metadata
        .insert(METADATA_EXTENDED_FROM.to_string(), Value::String(base.id.as_str().to_string()));
    rule
}

// ============================================================================
// SECTION: Compose
// ============================================================================

/// Combines several source rules into one composed rule.
///
/// Conditions concatenate (AND at evaluation time), priority is the maximum,
/// dependency/exclusion/tag sets are first-occurrence unions, `enabled` is
/// the logical AND, and configs fold left-to-right under `strategy`.
///
/// # Errors
///
/// Returns [`ComposeError::EmptyComposition`] when `sources` is empty.
pub fn compose_rules(
    sources: &[&Rule],
    new_id: RuleId,
    strategy: ResolutionStrategy,
) -> Result<Rule, ComposeError> {
    if sources.is_empty() {
        return Err(ComposeError::EmptyComposition);
    }

    let names: Vec<&str> = sources.iter().map(|rule| rule.name.as_str()).collect();
    let ids: Vec<&str> = sources.iter().map(|rule| rule.id.as_str()).collect();

    let mut config = Value::Object(Map::new());
    let mut conditions = Vec::new();
    let mut dependencies = Vec::new();
    let mut exclusions = Vec::new();
    let mut tags = Vec::new();
    let mut enabled = true;
    let mut priority = i64::MIN;

    for source in sources {
        config = apply_strategy(strategy, &config, &source.config);
        conditions.extend(source.conditions.iter().cloned());
        union_into(&mut dependencies, &source.dependencies);
        union_into(&mut exclusions, &source.exclusions);
        for tag in &source.tags {
            if !tags.contains(tag) {
                tags.push(tag.clone());
            }
        }
        enabled &= source.enabled;
        priority = priority.max(source.priority);
    }

    let mut metadata = Map::new();
    metadata.insert(
        METADATA_COMPOSED_FROM.to_string(),
        Value::Array(ids.iter().map(|id| Value::String((*id).to_string())).collect()),
    );
    metadata.insert(
        METADATA_COMPOSITION_STRATEGY.to_string(),
        Value::String(strategy.as_str().to_string()),
    );

    let mut rule = Rule::named(new_id, format!("Composed: {}", names.join(" + ")));
    rule.description = Some(format!("Composed from: {}", ids.join(", ")));
    rule.priority = priority;
    rule.conditions = conditions;
    rule.config = config;
    rule.resolution_strategy = strategy;
    rule.enabled = enabled;
    rule.dependencies = dependencies;
    rule.exclusions = exclusions;
    rule.tags = tags;
    rule.metadata = metadata;
    Ok(rule)
}

/// Appends unseen identifiers, preserving first-occurrence order.
fn union_into(target: &mut Vec<RuleId>, source: &[RuleId]) {
    for id in source {
        if !target.contains(id) {
            target.push(id.clone());
        }
    }
}

// ============================================================================
// SECTION: Mixin
// ============================================================================

/// Folds a mixin fragment into the target rule.
///
/// The mixin's config deep-merges into the target's, its conditions append,
/// its tags union in order, the `"mixed"` sentinel tag is ensured, and the
/// mixin id is appended to the `metadata.mixins` list.
#[must_use]
pub fn apply_mixin(mut target: Rule, mixin: &Rule) -> Rule {
    target.config = merge_values(&target.config, &mixin.config);
    target.conditions.extend(mixin.conditions.iter().cloned());

    for tag in &mixin.tags {
        if !target.tags.contains(tag) {
            target.tags.push(tag.clone());
        }
    }
    if !target.tags.iter().any(|tag| tag == MIXED_TAG) {
        target.tags.push(MIXED_TAG.to_string());
    }

    let mixins = target
        .metadata
        .entry(METADATA_MIXINS.to_string())
        .or_insert_with(|| Value::Array(Vec::new()));
    if let Value::Array(entries) = mixins {
        entries.push(Value::String(mixin.id.as_str().to_string()));
    }
    target
}

// ============================================================================
// SECTION: Materialization
// ============================================================================

/// Materializes one rule's composition descriptor against a rule registry.
///
/// Rules without a composition (or with an unrecognized composition type)
/// pass through unchanged.
///
/// # Errors
///
/// Returns [`ComposeError`] when a descriptor is malformed, references an
/// unknown rule (compose/extend only), or forms an extend cycle.
pub fn materialize_rule(
    rule: &Rule,
    registry: &BTreeMap<RuleId, Rule>,
) -> Result<Rule, ComposeError> {
    let mut visited = BTreeSet::new();
    materialize_inner(rule, registry, &mut visited)
}

/// Materializes every rule in a specification's rule list.
///
/// # Errors
///
/// Returns the first [`ComposeError`] encountered.
pub fn materialize_rules(rules: &[Rule]) -> Result<Vec<Rule>, ComposeError> {
    let registry: BTreeMap<RuleId, Rule> =
        rules.iter().map(|rule| (rule.id.clone(), rule.clone())).collect();
    rules.iter().map(|rule| materialize_rule(rule, &registry)).collect()
}

/// Recursive materialization with extend-cycle detection.
fn materialize_inner(
    rule: &Rule,
    registry: &BTreeMap<RuleId, Rule>,
    visited: &mut BTreeSet<RuleId>,
) -> Result<Rule, ComposeError> {
    let Some(composition) = rule.composition.clone() else {
        return Ok(rule.clone());
    };

    match composition.composition_type {
        CompositionType::Extend => {
            if !visited.insert(rule.id.clone()) {
                return Err(ComposeError::Cycle(rule.id.clone()));
            }
            let base_id = composition.base_rule_id.as_ref().ok_or(ComposeError::MissingBaseRuleId)?;
            let base = registry
                .get(base_id)
                .ok_or_else(|| ComposeError::BaseRuleNotFound(base_id.clone()))?;
            let base = materialize_inner(base, registry, visited)?;

            let mut overrides = RulePatch::from_rule(rule);
            if let Some(patch) = &composition.overrides {
                overrides = overrides.overlay(patch);
            }
            overrides.id = Some(rule.id.clone());
            Ok(extend_rule(&base, &overrides))
        }
        CompositionType::Compose => {
            if composition.source_rule_ids.is_empty() {
                return Err(ComposeError::MissingSourceRuleIds);
            }
            let mut sources = Vec::with_capacity(composition.source_rule_ids.len());
            for id in &composition.source_rule_ids {
                let source =
                    registry.get(id).ok_or_else(|| ComposeError::SourceRuleNotFound(id.clone()))?;
                sources.push(source);
            }
            let mut composed =
                compose_rules(&sources, rule.id.clone(), rule.resolution_strategy)?;
            if let Some(patch) = &composition.overrides {
                apply_patch_shallow(&mut composed, patch);
            }
            Ok(composed)
        }
        CompositionType::Mixin => {
            if composition.source_rule_ids.is_empty() {
                return Err(ComposeError::MissingSourceRuleIds);
            }
            let mut target = rule.clone();
            target.composition = None;
            for id in &composition.source_rule_ids {
                // Unknown mixin ids are skipped, unlike compose which errors.
                if let Some(mixin) = registry.get(id) {
                    target = apply_mixin(target, mixin);
                }
            }
            Ok(target)
        }
        CompositionType::Unknown => Ok(rule.clone()),
    }
}

// ============================================================================
// SECTION: Patch Application
// ============================================================================

/// Builds a complete rule from a patch, filling contract defaults.
fn rule_from_patch(patch: RulePatch, id: RuleId) -> Rule {
    Rule {
        id,
        name: patch.name.unwrap_or_else(|| "Unnamed Rule".to_string()),
        description: patch.description,
        priority: patch.priority.unwrap_or(0),
        conditions: patch.conditions.unwrap_or_default(),
        config: patch.config.unwrap_or_else(|| Value::Object(Map::new())),
        resolution_strategy: patch.resolution_strategy.unwrap_or_default(),
        enabled: patch.enabled.unwrap_or(true),
        dependencies: patch.dependencies.unwrap_or_default(),
        exclusions: patch.exclusions.unwrap_or_default(),
        chain: patch.chain,
        execute_after: patch.execute_after.unwrap_or_default(),
        execute_before: patch.execute_before.unwrap_or_default(),
        stop_propagation: patch.stop_propagation.unwrap_or(false),
        composition: None,
        tags: patch.tags.unwrap_or_default(),
        metadata: patch.metadata.unwrap_or_default(),
    }
}

/// Overlays patch fields on a rule without merging documents.
///
/// Used for post-compose overrides where fields replace wholesale.
fn apply_patch_shallow(rule: &mut Rule, patch: &RulePatch) {
    if let Some(id) = &patch.id {
        rule.id = id.clone();
    }
    if let Some(name) = &patch.name {
        rule.name.clone_from(name);
    }
    if patch.description.is_some() {
        rule.description.clone_from(&patch.description);
    }
    if let Some(priority) = patch.priority {
        rule.priority = priority;
    }
    if let Some(conditions) = &patch.conditions {
        rule.conditions.clone_from(conditions);
    }
    if let Some(config) = &patch.config {
        rule.config = config.clone();
    }
    if let Some(strategy) = patch.resolution_strategy {
        rule.resolution_strategy = strategy;
    }
    if let Some(enabled) = patch.enabled {
        rule.enabled = enabled;
    }
    if let Some(dependencies) = &patch.dependencies {
        rule.dependencies.clone_from(dependencies);
    }
    if let Some(exclusions) = &patch.exclusions {
        rule.exclusions.clone_from(exclusions);
    }
    if patch.chain.is_some() {
        rule.chain.clone_from(&patch.chain);
    }
    if let Some(execute_after) = &patch.execute_after {
        rule.execute_after.clone_from(execute_after);
    }
    if let Some(execute_before) = &patch.execute_before {
        rule.execute_before.clone_from(execute_before);
    }
    if let Some(stop_propagation) = patch.stop_propagation {
        rule.stop_propagation = stop_propagation;
    }
    if let Some(tags) = &patch.tags {
        rule.tags.clone_from(tags);
    }
    if let Some(metadata) = &patch.metadata {
        for (key, value) in metadata {
            rule.metadata.insert(key.clone(), value.clone());
        }
    }
}
