// contour-core/src/core/mod.rs
// ============================================================================
// Module: Contour Core Data Model
// Description: Canonical types for specifications, rules, and request contexts.
// Purpose: Group and re-export the data model consumed by the runtime.
// Dependencies: crate::core submodules
// ============================================================================

//! ## Overview
//! The core data model defines specifications, rules, conditions, chains,
//! composition descriptors, request contexts, identifiers, and timestamps.
//! Runtime behavior lives in [`crate::runtime`]; capability seams live in
//! [`crate::interfaces`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod context;
pub mod identifiers;
pub mod rule;
pub mod spec;
pub mod time;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use context::ClientGeo;
pub use context::ParsedUserAgent;
pub use context::RequestContext;
pub use identifiers::AppId;
pub use identifiers::RuleId;
pub use identifiers::SpecId;
pub use identifiers::SpecVersion;
pub use identifiers::TemplateId;
pub use identifiers::UserId;
pub use rule::ChainNode;
pub use rule::ChainOperator;
pub use rule::Composition;
pub use rule::CompositionType;
pub use rule::ConditionOperator;
pub use rule::ConditionType;
pub use rule::PrimitiveCondition;
pub use rule::ResolutionStrategy;
pub use rule::Rule;
pub use rule::RuleChain;
pub use rule::RulePatch;
pub use spec::ConditionalRule;
pub use spec::ConfigSchema;
pub use spec::Environment;
pub use spec::LoadCondition;
pub use spec::SpecError;
pub use spec::Specification;
pub use time::Timestamp;
