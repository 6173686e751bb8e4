// contour-core/src/core/spec.rs
// ============================================================================
// Module: Contour Specification
// Description: Specification, schema, conditional-rule, and load-condition types.
// Purpose: Define the persistent unit of configuration with validation helpers.
// Dependencies: crate::core::{identifiers, rule, time}, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! A specification is the versioned configuration document for one
//! `(app_id, version)` pair: a default configuration plus an ordered set of
//! rules, gating links, templates, and rollout metadata. Specifications are
//! validated at create time for structural invariants; dangling rule-id
//! references are deliberately *not* fatal — they degrade to unsatisfiable at
//! evaluation time.
//!
//! Security posture: specifications are untrusted inputs supplied by
//! operators over the admin API or from disk.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::identifiers::AppId;
use crate::core::identifiers::RuleId;
use crate::core::identifiers::SpecId;
use crate::core::identifiers::SpecVersion;
use crate::core::identifiers::TemplateId;
use crate::core::rule::ConditionOperator;
use crate::core::rule::Rule;
use crate::core::rule::RulePatch;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Environment
// ============================================================================

/// Deployment environment a specification targets.
///
/// # Invariants
/// - Variants are stable for serialization and wire compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    /// Development environment.
    #[default]
    Development,
    /// Staging environment.
    Staging,
    /// Production environment.
    Production,
}

impl Environment {
    /// Returns a stable label for the environment.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Staging => "staging",
            Self::Production => "production",
        }
    }

    /// Parses an environment label; unknown labels yield `None`.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "development" => Some(Self::Development),
            "staging" => Some(Self::Staging),
            "production" => Some(Self::Production),
            _ => None,
        }
    }
}

// ============================================================================
// SECTION: Config Schema
// ============================================================================

/// Shallow key schema for configuration documents.
///
/// # Invariants
/// - Key sets are pairwise disjoint.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigSchema {
    /// Schema version label.
    #[serde(default)]
    pub version: String,
    /// Keys that must be present at the document top level.
    #[serde(default)]
    pub required_keys: Vec<String>,
    /// Keys that may be present.
    #[serde(default)]
    pub optional_keys: Vec<String>,
    /// Keys that are accepted but reported as deprecated.
    #[serde(default)]
    pub deprecated_keys: Vec<String>,
}

// ============================================================================
// SECTION: Load Conditions
// ============================================================================

/// Load-time gate deciding whether a conditional rule enters evaluation.
///
/// Unrecognized types deserialize to [`LoadCondition::Unknown`], which never
/// holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum LoadCondition {
    /// Holds when the specification targets the given environment.
    Environment(Environment),
    /// Holds when the effective flag value equals the expectation.
    #[serde(rename_all = "camelCase")]
    FeatureFlag {
        /// Flag name looked up in context first, then specification.
        flag_name: String,
        /// Expected flag value.
        expected_value: bool,
    },
    /// Holds when the user's deterministic bucket falls inside the rollout.
    #[serde(rename_all = "camelCase")]
    PercentageRollout {
        /// Rollout percentage (1..=100). Falls back to the specification's
        /// `rollout_percentages` entry for `rule_id` when omitted.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        percentage: Option<u8>,
        /// Rule identifier keyed into the rollout hash.
        rule_id: RuleId,
    },
    /// Holds when the custom-context value satisfies the operator.
    Custom {
        /// Custom-context key to read.
        key: String,
        /// Comparison operator.
        operator: ConditionOperator,
        /// Comparison value.
        #[serde(default)]
        value: Value,
    },
    /// Unrecognized load condition; never holds.
    #[serde(other)]
    Unknown,
}

/// Gating link enabling a rule only when all load conditions hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionalRule {
    /// Identifier of the gated rule within the specification.
    pub rule_id: RuleId,
    /// Conditions that must all hold (AND).
    #[serde(default)]
    pub load_conditions: Vec<LoadCondition>,
    /// Advisory lazy-load hint; carried but not acted upon.
    #[serde(default)]
    pub lazy_load: bool,
}

// ============================================================================
// SECTION: Specification
// ============================================================================

/// The persistent configuration unit for one `(app_id, version)` pair.
///
/// # Invariants
/// - `default_config` is an object satisfying `schema`.
/// - Rule identifiers are unique within the specification.
/// - Dangling rule references are unsatisfiable, never fatal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Specification {
    /// Specification identifier.
    pub id: SpecId,
    /// Owning application identifier.
    pub app_id: AppId,
    /// Specification version (semver string by convention).
    pub version: SpecVersion,
    /// Shallow key schema for the effective configuration.
    #[serde(default)]
    pub schema: ConfigSchema,
    /// Default configuration document.
    pub default_config: Value,
    /// Rule set; order carries no semantics, priority does.
    #[serde(default)]
    pub rules: Vec<Rule>,
    /// Gating links for conditionally loaded rules.
    #[serde(default)]
    pub conditional_rules: Vec<ConditionalRule>,
    /// Rule templates keyed by template identifier.
    #[serde(default)]
    pub rule_templates: BTreeMap<TemplateId, RulePatch>,
    /// Deployment environment this specification targets.
    #[serde(default)]
    pub environment: Environment,
    /// Specification-level feature flag defaults.
    #[serde(default)]
    pub feature_flags: BTreeMap<String, bool>,
    /// Default rollout percentages keyed by rule identifier.
    #[serde(default)]
    pub rollout_percentages: BTreeMap<RuleId, u8>,
    /// Creation timestamp.
    #[serde(default)]
    pub created_at: Timestamp,
    /// Last-update timestamp; stamped by the store on save.
    #[serde(default)]
    pub updated_at: Timestamp,
}

impl Specification {
    /// Validates structural invariants.
    ///
    /// # Errors
    ///
    /// Returns [`SpecError`] when an invariant is violated.
    pub fn validate(&self) -> Result<(), SpecError> {
        if !self.default_config.is_object() {
            return Err(SpecError::DefaultConfigNotObject);
        }
        ensure_unique_rule_ids(&self.rules)?;
        ensure_schema_disjoint(&self.schema)?;
        Ok(())
    }

    /// Looks up a rule by identifier.
    #[must_use]
    pub fn rule(&self, id: &RuleId) -> Option<&Rule> {
        self.rules.iter().find(|rule| &rule.id == id)
    }
}

/// Specification validation errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SpecError {
    /// The default configuration is not a JSON object.
    #[error("default config must be a JSON object")]
    DefaultConfigNotObject,
    /// A rule identifier appears more than once.
    #[error("duplicate rule id: {0}")]
    DuplicateRuleId(RuleId),
    /// A schema key appears in more than one key set.
    #[error("schema key in multiple sets: {0}")]
    SchemaKeyOverlap(String),
}

// ============================================================================
// SECTION: Validation Helpers
// ============================================================================

/// Ensures rule identifiers are unique within the specification.
fn ensure_unique_rule_ids(rules: &[Rule]) -> Result<(), SpecError> {
    let mut seen = BTreeSet::new();
    for rule in rules {
        if !seen.insert(&rule.id) {
            return Err(SpecError::DuplicateRuleId(rule.id.clone()));
        }
    }
    Ok(())
}

/// Ensures the three schema key sets are pairwise disjoint.
fn ensure_schema_disjoint(schema: &ConfigSchema) -> Result<(), SpecError> {
    let mut seen = BTreeSet::new();
    let sets = [&schema.required_keys, &schema.optional_keys, &schema.deprecated_keys];
    for set in sets {
        for key in set {
            if !seen.insert(key.as_str()) {
                return Err(SpecError::SchemaKeyOverlap(key.clone()));
            }
        }
    }
    Ok(())
}
