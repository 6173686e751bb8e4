// contour-core/src/runtime/hash.rs
// ============================================================================
// Module: Contour Stable Hash
// Description: Stable string hash and rollout bucket computation.
// Purpose: Provide the externally observable rollout membership contract.
// Dependencies: crate::core::identifiers
// ============================================================================

//! ## Overview
//! Percentage rollouts bucket users deterministically: the hash of
//! `"<rule_id>:<user_id>"` decides membership, so the precise hash function
//! is part of the wire contract. The function is a DJB2 variant computed
//! with 32-bit signed wrap-around over unicode code points.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::identifiers::RuleId;
use crate::core::identifiers::UserId;

// ============================================================================
// SECTION: Stable Hash
// ============================================================================

/// Computes the stable string hash used for rollout bucketing.
///
/// For each code point `c`: `h = (h << 5) - h + c` with 32-bit signed
/// wrap-around; the result is the absolute value.
#[must_use]
pub fn stable_hash(input: &str) -> u32 {
    let mut hash: i32 = 0;
    for ch in input.chars() {
        let code = ch as i32;
        hash = hash.wrapping_shl(5).wrapping_sub(hash).wrapping_add(code);
    }
    hash.unsigned_abs()
}

/// Computes a user's rollout bucket for a rule, in the range `1..=100`.
///
/// Identical `(rule_id, user_id)` pairs always land in the same bucket.
#[must_use]
pub fn rollout_bucket(rule_id: &RuleId, user_id: &UserId) -> u32 {
    let key = format!("{}:{}", rule_id.as_str(), user_id.as_str());
    stable_hash(&key) % 100 + 1
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::rollout_bucket;
    use super::stable_hash;
    use crate::core::identifiers::RuleId;
    use crate::core::identifiers::UserId;

    /// Tests the hash recurrence against hand-computed values.
    #[test]
    fn test_stable_hash_known_values() {
        assert_eq!(stable_hash(""), 0);
        // "a" = 97; "ab" = 97 * 31 + 98 = 3105.
        assert_eq!(stable_hash("a"), 97);
        assert_eq!(stable_hash("ab"), 3105);
    }

    /// Tests that hashing is stable across calls and inputs diverge.
    #[test]
    fn test_stable_hash_determinism() {
        assert_eq!(stable_hash("beta:user055"), stable_hash("beta:user055"));
        assert_ne!(stable_hash("beta:user055"), stable_hash("beta:user056"));
    }

    /// Tests that buckets stay in the inclusive 1..=100 range.
    #[test]
    fn test_bucket_range() {
        for index in 0..500 {
            let user = UserId::new(format!("user{index}"));
            let bucket = rollout_bucket(&RuleId::new("beta"), &user);
            assert!((1..=100).contains(&bucket));
        }
    }
}
