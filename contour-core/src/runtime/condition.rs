// contour-core/src/runtime/condition.rs
// ============================================================================
// Module: Contour Condition Evaluation
// Description: Primitive condition matching against request contexts.
// Purpose: Convert context attributes into deterministic boolean outcomes.
// Dependencies: crate::core, bigdecimal, regex-lite, serde_json, time
// ============================================================================

//! ## Overview
//! Condition evaluation extracts one context attribute per condition type and
//! applies the condition's operator against the condition value. Numeric
//! ordering is decimal-aware and deterministic; temporal values accept both
//! epoch milliseconds and RFC3339 strings. Missing context attributes never
//! raise: every operator yields false on a missing value except `ne`, which
//! is true by strict-inequality semantics. Unknown condition types and
//! operators degrade to false.
//!
//! Security posture: condition values and contexts are untrusted; regex
//! patterns that fail to compile evaluate to false.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::cmp::Ordering;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use regex_lite::Regex;
use serde_json::Number;
use serde_json::Value;

use crate::core::context::RequestContext;
use crate::core::rule::ConditionOperator;
use crate::core::rule::ConditionType;
use crate::core::rule::PrimitiveCondition;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Condition Evaluation
// ============================================================================

/// Evaluates a primitive condition against a request context.
#[must_use]
pub fn evaluate_condition(condition: &PrimitiveCondition, context: &RequestContext) -> bool {
    if condition.condition_type == ConditionType::Unknown {
        return false;
    }
    let actual = context_value(condition.condition_type, context);
    apply_operator(condition.operator, actual.as_ref(), &condition.value)
}

/// Extracts the context attribute addressed by a condition type.
#[must_use]
fn context_value(condition_type: ConditionType, context: &RequestContext) -> Option<Value> {
    match condition_type {
        ConditionType::AppVersion => Some(Value::String(context.app_version.clone())),
        ConditionType::Os => context.effective_os().map(|os| Value::String(os.to_string())),
        ConditionType::Device => {
            context.effective_device().map(|device| Value::String(device.to_string()))
        }
        ConditionType::GeoCountry => {
            context.effective_country().map(|country| Value::String(country.to_string()))
        }
        ConditionType::GeoRegion => {
            context.effective_region().map(|region| Value::String(region.to_string()))
        }
        ConditionType::TimeAfter | ConditionType::TimeBefore => {
            Some(Value::Number(Number::from(context.timestamp.as_unix_millis())))
        }
        ConditionType::UserAgentMatch => Some(Value::String(context.user_agent.clone())),
        ConditionType::Unknown => None,
    }
}

/// Applies an operator between the extracted value and the condition value.
#[must_use]
pub fn apply_operator(
    operator: ConditionOperator,
    actual: Option<&Value>,
    expected: &Value,
) -> bool {
    let Some(actual) = actual else {
        // Strict inequality against a missing value holds; everything else fails.
        return operator == ConditionOperator::Ne;
    };

    match operator {
        ConditionOperator::Eq => values_equal(actual, expected),
        ConditionOperator::Ne => !values_equal(actual, expected),
        ConditionOperator::Gt => {
            compare_values(actual, expected).is_some_and(|ordering| ordering.is_gt())
        }
        ConditionOperator::Lt => {
            compare_values(actual, expected).is_some_and(|ordering| ordering.is_lt())
        }
        ConditionOperator::Gte => {
            compare_values(actual, expected).is_some_and(|ordering| ordering.is_ge())
        }
        ConditionOperator::Lte => {
            compare_values(actual, expected).is_some_and(|ordering| ordering.is_le())
        }
        ConditionOperator::In => match expected {
            Value::Array(values) => values.iter().any(|value| values_equal(actual, value)),
            _ => false,
        },
        ConditionOperator::Regex => match expected {
            Value::String(pattern) => Regex::new(pattern)
                .map(|regex| regex.is_match(&value_to_string(actual)))
                .unwrap_or(false),
            _ => false,
        },
        ConditionOperator::Unknown => false,
    }
}

// ============================================================================
// SECTION: Value Comparison
// ============================================================================

/// Compares values for equality, with decimal-aware numeric handling.
fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(left_num), Value::Number(right_num)) => {
            match (decimal_from_number(left_num), decimal_from_number(right_num)) {
                (Some(left_dec), Some(right_dec)) => left_dec == right_dec,
                _ => false,
            }
        }
        _ => left == right,
    }
}

/// Orders two values when a deterministic ordering exists.
///
/// Numbers order decimal-aware; strings order lexicographically. A number
/// against a string first tries the string as a decimal, then as an RFC3339
/// date-time rendered to epoch milliseconds. Any other pairing is unordered.
fn compare_values(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Number(left_num), Value::Number(right_num)) => {
            let left_dec = decimal_from_number(left_num)?;
            let right_dec = decimal_from_number(right_num)?;
            Some(left_dec.cmp(&right_dec))
        }
        (Value::String(left_str), Value::String(right_str)) => {
            Some(left_str.as_str().cmp(right_str.as_str()))
        }
        (Value::Number(number), Value::String(text)) => {
            let left_dec = decimal_from_number(number)?;
            let right_dec = decimal_from_text(text)?;
            Some(left_dec.cmp(&right_dec))
        }
        (Value::String(text), Value::Number(number)) => {
            let left_dec = decimal_from_text(text)?;
            let right_dec = decimal_from_number(number)?;
            Some(left_dec.cmp(&right_dec))
        }
        _ => None,
    }
}

/// Parses a JSON number into `BigDecimal` with a stable string representation.
fn decimal_from_number(number: &Number) -> Option<BigDecimal> {
    BigDecimal::from_str(&number.to_string()).ok()
}

/// Parses free text as a decimal, falling back to RFC3339 epoch milliseconds.
fn decimal_from_text(text: &str) -> Option<BigDecimal> {
    if let Ok(decimal) = BigDecimal::from_str(text) {
        return Some(decimal);
    }
    let timestamp = Timestamp::parse_rfc3339(text)?;
    Some(BigDecimal::from(timestamp.as_unix_millis()))
}

/// Renders a value in its string form for regex matching.
fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
