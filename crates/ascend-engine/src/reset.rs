//! Progressive reset policy
//!
//! When a challenge for a direct-only target (order 1-4) fails, the agent is
//! not sent back to zero. A reset attempt opens for the same target with half
//! of the requirement already credited, up to a fixed number of failures.
//! Once the failures reach `max_attempts_allowed` the cycle is demoted.
//! Network targets (order 5+) have no reset credit and no demotion.

use crate::config::EngineConfig;
use ascend_domain::Tier;

/// What happens after a failed challenge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetDecision {
    /// Open a reset attempt for the same target
    Reset {
        /// New value of `reset_attempts_used`
        attempts_used: u32,
        /// Baseline of the reset attempt
        starting_referral_count: u64,
    },
    /// Resets exhausted: demote the cycle
    Demote,
    /// Target is outside the reset policy: just close the challenge
    NotEligible,
}

/// Reset policy constants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResetPolicy {
    /// Failures tolerated before demotion
    pub max_attempts_allowed: u32,
    /// Credit is `required / credit_divisor`
    pub credit_divisor: u64,
}

impl Default for ResetPolicy {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

impl ResetPolicy {
    /// Take the constants from engine configuration
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            max_attempts_allowed: config.max_attempts_allowed,
            credit_divisor: config.reset_credit_divisor.max(1),
        }
    }

    /// Referrals credited to a reset attempt
    pub fn credit(&self, required_referrals: u64) -> u64 {
        required_referrals / self.credit_divisor.max(1)
    }

    /// Baseline of a reset attempt
    ///
    /// `current_count - credit`, but never below the baseline of the first
    /// attempt: the agent is never credited more than they actually earned.
    pub fn reset_baseline(&self, required_referrals: u64, current_count: u64, original_baseline: u64) -> u64 {
        current_count
            .saturating_sub(self.credit(required_referrals))
            .max(original_baseline)
    }

    /// Decide the follow-up to a failure on `target`
    pub fn decide(
        &self,
        target: &Tier,
        attempts_used: u32,
        current_count: u64,
        original_baseline: u64,
    ) -> ResetDecision {
        if !target.uses_reset_policy() {
            return ResetDecision::NotEligible;
        }

        let attempts = attempts_used.saturating_add(1);
        if attempts >= self.max_attempts_allowed {
            return ResetDecision::Demote;
        }

        ResetDecision::Reset {
            attempts_used: attempts,
            starting_referral_count: self.reset_baseline(
                target.required_referrals,
                current_count,
                original_baseline,
            ),
        }
    }

    /// Attempts left before demotion, `None` when the target has no limit
    pub fn attempts_remaining(&self, target: &Tier, attempts_used: u32) -> Option<u32> {
        target
            .uses_reset_policy()
            .then(|| self.max_attempts_allowed.saturating_sub(attempts_used))
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use ascend_domain::{TierCatalog, TierName};
    use proptest::prelude::*;

    proptest! {
        /// Property: a reset never credits more than was earned since the first baseline
        #[test]
        fn test_credit_bounded_by_earned(
            original in 0u64..10_000,
            earned in 0u64..10_000,
            required in 1u64..10_000,
        ) {
            let policy = ResetPolicy::default();
            let current = original + earned;
            let baseline = policy.reset_baseline(required, current, original);

            prop_assert!(baseline >= original);
            prop_assert!(current - baseline <= earned);
            prop_assert!(current - baseline <= required / 2);
        }

        /// Property: attempts used never exceed the maximum before demotion
        #[test]
        fn test_attempts_never_exceed_max(max in 1u32..6, failures in 1usize..20) {
            let policy = ResetPolicy { max_attempts_allowed: max, credit_divisor: 2 };
            let target = TierCatalog::standard().tier_by_name(TierName::Iron).cloned().unwrap();
            let mut used = 0u32;

            for _ in 0..failures {
                match policy.decide(&target, used, 100, 0) {
                    ResetDecision::Reset { attempts_used, .. } => {
                        prop_assert!(attempts_used <= max);
                        used = attempts_used;
                    }
                    ResetDecision::Demote => used = 0,
                    ResetDecision::NotEligible => prop_assert!(false, "iron is reset-eligible"),
                }
            }
        }
    }
}
