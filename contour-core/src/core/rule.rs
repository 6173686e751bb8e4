// contour-core/src/core/rule.rs
// ============================================================================
// Module: Contour Rule Model
// Description: Rules, primitive conditions, chains, and composition descriptors.
// Purpose: Define the declarative rule vocabulary evaluated by the pipeline.
// Dependencies: crate::core::identifiers, serde, serde_json
// ============================================================================

//! ## Overview
//! A rule is a conditional modification to the effective configuration. Rules
//! carry primitive match conditions, boolean chains over other rules,
//! dependency and exclusion links, ordering constraints, and an optional
//! composition descriptor that materializes them from other rules.
//!
//! Unknown condition types, operators, and chain operators deserialize into
//! explicit `Unknown` variants so malformed constructs degrade to
//! "never matches" instead of failing a whole specification load.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::core::identifiers::RuleId;

// ============================================================================
// SECTION: Resolution Strategy
// ============================================================================

/// Strategy used to combine a matched rule's config into the evolving result.
///
/// # Invariants
/// - Variants are stable for serialization and wire compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStrategy {
    /// Deep merge: nested objects recurse, arrays and scalars replace.
    #[default]
    Merge,
    /// Replace: the rule's config discards the accumulated document.
    Override,
    /// Left-wins shallow overlay: existing top-level keys are kept.
    Inherit,
}

impl ResolutionStrategy {
    /// Returns a stable label for the strategy.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Merge => "merge",
            Self::Override => "override",
            Self::Inherit => "inherit",
        }
    }
}

// ============================================================================
// SECTION: Primitive Conditions
// ============================================================================

/// Context attribute a primitive condition matches on.
///
/// Unrecognized type strings deserialize to [`ConditionType::Unknown`],
/// which never matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum ConditionType {
    /// Client application version string.
    AppVersion,
    /// Operating system name.
    Os,
    /// Device type classification.
    Device,
    /// Geolocated or client-provided country code.
    GeoCountry,
    /// Geolocated or client-provided region code.
    GeoRegion,
    /// Request timestamp must be after the condition value.
    TimeAfter,
    /// Request timestamp must be before the condition value.
    TimeBefore,
    /// Raw user-agent string match.
    UserAgentMatch,
    /// Unrecognized condition type; always evaluates false.
    Unknown,
}

impl From<String> for ConditionType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "app_version" => Self::AppVersion,
            "os" => Self::Os,
            "device" => Self::Device,
            "geo_country" => Self::GeoCountry,
            "geo_region" => Self::GeoRegion,
            "time_after" => Self::TimeAfter,
            "time_before" => Self::TimeBefore,
            "user_agent_match" => Self::UserAgentMatch,
            _ => Self::Unknown,
        }
    }
}

/// Comparison operator applied between context value and condition value.
///
/// Unrecognized operator strings deserialize to
/// [`ConditionOperator::Unknown`], which never matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum ConditionOperator {
    /// Equality.
    Eq,
    /// Inequality.
    Ne,
    /// Greater than.
    Gt,
    /// Less than.
    Lt,
    /// Greater than or equal.
    Gte,
    /// Less than or equal.
    Lte,
    /// Membership in an array value.
    In,
    /// Partial regular-expression match on the string form.
    Regex,
    /// Unrecognized operator; always evaluates false.
    Unknown,
}

impl From<String> for ConditionOperator {
    fn from(value: String) -> Self {
        match value.as_str() {
            "eq" => Self::Eq,
            "ne" => Self::Ne,
            "gt" => Self::Gt,
            "lt" => Self::Lt,
            "gte" => Self::Gte,
            "lte" => Self::Lte,
            "in" => Self::In,
            "regex" => Self::Regex,
            _ => Self::Unknown,
        }
    }
}

/// Primitive match predicate over one request-context attribute.
///
/// # Invariants
/// - An empty condition list on a rule means "always matches if enabled".
/// - `value` is an array for `in` and a pattern string for `regex`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrimitiveCondition {
    /// Context attribute to match on.
    #[serde(rename = "type")]
    pub condition_type: ConditionType,
    /// Comparison operator.
    pub operator: ConditionOperator,
    /// Comparison value.
    #[serde(default)]
    pub value: Value,
}

// ============================================================================
// SECTION: Rule Chains
// ============================================================================

/// Boolean combinator over chain items.
///
/// Unrecognized operator strings deserialize to [`ChainOperator::Unknown`],
/// which evaluates false.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE", from = "String")]
pub enum ChainOperator {
    /// All items must evaluate true.
    And,
    /// At least one item must evaluate true.
    Or,
    /// Negates the first item only.
    Not,
    /// Exactly one item must evaluate true.
    Xor,
    /// Unrecognized operator; always evaluates false.
    Unknown,
}

impl From<String> for ChainOperator {
    fn from(value: String) -> Self {
        match value.as_str() {
            "AND" => Self::And,
            "OR" => Self::Or,
            "NOT" => Self::Not,
            "XOR" => Self::Xor,
            _ => Self::Unknown,
        }
    }
}

/// One item of a rule chain: a rule reference or a nested chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChainNode {
    /// Reference to a rule in the per-request registry.
    Rule(RuleId),
    /// Nested boolean chain.
    Chain(RuleChain),
}

/// Recursive boolean expression over rule identifiers.
///
/// # Invariants
/// - Referenced rules receive *basic* evaluation only (enabled plus
///   conditions); dependency, exclusion, and chain checks are not re-applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleChain {
    /// Boolean combinator.
    pub operator: ChainOperator,
    /// Ordered chain items.
    pub rules: Vec<ChainNode>,
}

// ============================================================================
// SECTION: Composition
// ============================================================================

/// How a rule is materialized from other rules.
///
/// Unrecognized type strings deserialize to [`CompositionType::Unknown`];
/// such rules pass through composition unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum CompositionType {
    /// Inherit from a single base rule, overriding supplied fields.
    Extend,
    /// Combine several source rules into one.
    Compose,
    /// Fold mixin fragments into the rule in order.
    Mixin,
    /// Unrecognized composition type; the rule is left unchanged.
    Unknown,
}

impl From<String> for CompositionType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "extend" => Self::Extend,
            "compose" => Self::Compose,
            "mixin" => Self::Mixin,
            _ => Self::Unknown,
        }
    }
}

/// Composition descriptor attached to a rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Composition {
    /// Composition kind.
    #[serde(rename = "type")]
    pub composition_type: CompositionType,
    /// Base rule for `extend`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_rule_id: Option<RuleId>,
    /// Source rules for `compose` and `mixin`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source_rule_ids: Vec<RuleId>,
    /// Partial-rule overrides applied after composition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overrides: Option<RulePatch>,
}

// ============================================================================
// SECTION: Rule
// ============================================================================

/// A conditional modification to the effective configuration.
///
/// # Invariants
/// - `id` is unique within its specification.
/// - Identifiers referenced by `dependencies`, `exclusions`, `chain`,
///   `execute_after`, `execute_before`, and `composition` either resolve
///   within the same specification or are treated as unsatisfiable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    /// Rule identifier.
    pub id: RuleId,
    /// Human-readable rule name.
    #[serde(default)]
    pub name: String,
    /// Optional rule description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Evaluation priority; higher evaluates first.
    #[serde(default)]
    pub priority: i64,
    /// Primitive conditions, all of which must pass.
    #[serde(default)]
    pub conditions: Vec<PrimitiveCondition>,
    /// Configuration fragment contributed on match.
    #[serde(default = "empty_object")]
    pub config: Value,
    /// Strategy combining `config` into the evolving result.
    #[serde(default)]
    pub resolution_strategy: ResolutionStrategy,
    /// Whether the rule participates in evaluation.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Rules that must already have matched.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<RuleId>,
    /// Rules whose prior match blocks this one.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclusions: Vec<RuleId>,
    /// Boolean chain gating the rule.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain: Option<RuleChain>,
    /// Rules that must be ordered before this one.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub execute_after: Vec<RuleId>,
    /// Rules that must be ordered after this one.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub execute_before: Vec<RuleId>,
    /// Stops evaluation of later rules once this rule matches.
    #[serde(default)]
    pub stop_propagation: bool,
    /// Composition descriptor materializing this rule from others.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub composition: Option<Composition>,
    /// Free-form tags.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Free-form metadata mapping.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

impl Rule {
    /// Creates a minimal enabled rule with the given identifier.
    #[must_use]
    pub fn named(id: impl Into<RuleId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            priority: 0,
            conditions: Vec::new(),
            config: empty_object(),
            resolution_strategy: ResolutionStrategy::Merge,
            enabled: true,
            dependencies: Vec::new(),
            exclusions: Vec::new(),
            chain: None,
            execute_after: Vec::new(),
            execute_before: Vec::new(),
            stop_propagation: false,
            composition: None,
            tags: Vec::new(),
            metadata: Map::new(),
        }
    }
}

// ============================================================================
// SECTION: Rule Patch
// ============================================================================

/// Partial rule used for templates and composition overrides.
///
/// Every field is optional; absent fields leave the target untouched.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RulePatch {
    /// Rule identifier override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RuleId>,
    /// Rule name override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Description override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Priority override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,
    /// Conditions override (taken wholesale, not merged).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Vec<PrimitiveCondition>>,
    /// Config fragment; deep-merged over the target's config.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<Value>,
    /// Resolution strategy override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution_strategy: Option<ResolutionStrategy>,
    /// Enabled flag override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    /// Dependencies override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<Vec<RuleId>>,
    /// Exclusions override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclusions: Option<Vec<RuleId>>,
    /// Chain override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain: Option<RuleChain>,
    /// Execute-after override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execute_after: Option<Vec<RuleId>>,
    /// Execute-before override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execute_before: Option<Vec<RuleId>>,
    /// Stop-propagation override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_propagation: Option<bool>,
    /// Tags override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    /// Metadata fragment; shallow-merged over the target's metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

impl RulePatch {
    /// Overlays `other` on `self`: fields present in `other` win.
    ///
    /// `config` and `metadata` fragments are both kept when both sides
    /// supply them, with `other` merged over `self` by the composer.
    #[must_use]
    pub fn overlay(mut self, other: &Self) -> Self {
        if other.id.is_some() {
            self.id.clone_from(&other.id);
        }
        if other.name.is_some() {
            self.name.clone_from(&other.name);
        }
        if other.description.is_some() {
            self.description.clone_from(&other.description);
        }
        if other.priority.is_some() {
            self.priority = other.priority;
        }
        if other.conditions.is_some() {
            self.conditions.clone_from(&other.conditions);
        }
        if let Some(config) = &other.config {
            self.config = Some(match self.config.take() {
                Some(base) => crate::runtime::merge::merge_values(&base, config),
                None => config.clone(),
            });
        }
        if other.resolution_strategy.is_some() {
            self.resolution_strategy = other.resolution_strategy;
        }
        if other.enabled.is_some() {
            self.enabled = other.enabled;
        }
        if other.dependencies.is_some() {
            self.dependencies.clone_from(&other.dependencies);
        }
        if other.exclusions.is_some() {
            self.exclusions.clone_from(&other.exclusions);
        }
        if other.chain.is_some() {
            self.chain.clone_from(&other.chain);
        }
        if other.execute_after.is_some() {
            self.execute_after.clone_from(&other.execute_after);
        }
        if other.execute_before.is_some() {
            self.execute_before.clone_from(&other.execute_before);
        }
        if other.stop_propagation.is_some() {
            self.stop_propagation = other.stop_propagation;
        }
        if other.tags.is_some() {
            self.tags.clone_from(&other.tags);
        }
        if let Some(metadata) = &other.metadata {
            let mut merged = self.metadata.take().unwrap_or_default();
            for (key, value) in metadata {
                merged.insert(key.clone(), value.clone());
            }
            self.metadata = Some(merged);
        }
        self
    }

    /// Captures a complete rule as a patch.
    ///
    /// An empty name is treated as unsupplied so downstream composition can
    /// fall back to the base rule's name.
    #[must_use]
    pub fn from_rule(rule: &Rule) -> Self {
        Self {
            id: Some(rule.id.clone()),
            name: (!rule.name.is_empty()).then(|| rule.name.clone()),
            description: rule.description.clone(),
            priority: Some(rule.priority),
            conditions: Some(rule.conditions.clone()),
            config: Some(rule.config.clone()),
            resolution_strategy: Some(rule.resolution_strategy),
            enabled: Some(rule.enabled),
            dependencies: Some(rule.dependencies.clone()),
            exclusions: Some(rule.exclusions.clone()),
            chain: rule.chain.clone(),
            execute_after: Some(rule.execute_after.clone()),
            execute_before: Some(rule.execute_before.clone()),
            stop_propagation: Some(rule.stop_propagation),
            tags: Some(rule.tags.clone()),
            metadata: Some(rule.metadata.clone()),
        }
    }
}

// ============================================================================
// SECTION: Serde Defaults
// ============================================================================

/// Serde default for boolean fields that default to true.
const fn default_true() -> bool {
    true
}

/// Serde default for configuration fragments.
fn empty_object() -> Value {
    Value::Object(Map::new())
}

/// Template provenance metadata key.
pub const METADATA_CREATED_FROM_TEMPLATE: &str = "createdFromTemplate";
/// Extension provenance metadata key.
pub const METADATA_EXTENDED_FROM: &str = "extendedFrom";
/// Composition provenance metadata key.
pub const METADATA_COMPOSED_FROM: &str = "composedFrom";
/// Composition strategy metadata key.
pub const METADATA_COMPOSITION_STRATEGY: &str = "compositionStrategy";
/// Applied-mixins metadata key.
pub const METADATA_MIXINS: &str = "mixins";
/// Sentinel tag appended by mixin application.
pub const MIXED_TAG: &str = "mixed";
