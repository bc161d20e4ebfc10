//! History module - immutable records of closed challenges

use crate::agent::AgentId;
use crate::challenge::{Challenge, ChallengeId, ChallengeStatus};
use crate::tier::TierName;
use crate::time::Timestamp;
use std::fmt;

/// How a challenge ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChallengeResult {
    /// Threshold reached
    Success,
    /// Window exhausted
    Failed,
    /// Closed administratively
    Expired,
}

impl ChallengeResult {
    /// Get the result as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            ChallengeResult::Success => "success",
            ChallengeResult::Failed => "failed",
            ChallengeResult::Expired => "expired",
        }
    }

    /// Parse a result string (internal use)
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "success" => Some(ChallengeResult::Success),
            "failed" => Some(ChallengeResult::Failed),
            "expired" => Some(ChallengeResult::Expired),
            _ => None,
        }
    }

    /// The result a terminal status maps to, `None` for `Active`
    pub fn from_status(status: ChallengeStatus) -> Option<Self> {
        match status {
            ChallengeStatus::Active => None,
            ChallengeStatus::Succeeded => Some(ChallengeResult::Success),
            ChallengeStatus::Failed => Some(ChallengeResult::Failed),
            ChallengeStatus::Expired => Some(ChallengeResult::Expired),
        }
    }
}

impl fmt::Display for ChallengeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Append-only trace of one closed challenge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeHistoryRecord {
    /// Challenge that closed
    pub challenge_id: ChallengeId,

    /// Agent who attempted it
    pub agent_id: AgentId,

    /// Tier that was targeted
    pub target_tier: TierName,

    /// Window start
    pub start_date: Timestamp,

    /// Window end
    pub end_date: Timestamp,

    /// When the engine closed the challenge (may be after `end_date`)
    pub closed_at: Timestamp,

    /// 0 for the original attempt, 1.. for resets
    pub attempt_number: u32,

    /// Baseline progress was measured from
    pub starting_referral_count: u64,

    /// Count under the snapshot rule at close
    pub final_referral_count: u64,

    /// Highest count under the snapshot rule while active
    pub peak_referral_count: u64,

    /// Threshold snapshot
    pub required_referrals: u64,

    /// Outcome
    pub result: ChallengeResult,

    /// Commission rate (percent) unlocked by a successful challenge
    pub commission_earned_on_success: Option<u32>,

    /// Tier the agent held before this attempt
    pub tier_held_at_time: TierName,
}

impl ChallengeHistoryRecord {
    /// Build the record for a challenge that has just been closed
    ///
    /// Returns `None` if the challenge is still active.
    pub fn from_closed(
        challenge: &Challenge,
        final_referral_count: u64,
        tier_held_at_time: TierName,
        commission_earned_on_success: Option<u32>,
        closed_at: Timestamp,
    ) -> Option<Self> {
        let result = ChallengeResult::from_status(challenge.status)?;
        Some(Self {
            challenge_id: challenge.id,
            agent_id: challenge.agent_id.clone(),
            target_tier: challenge.target_tier,
            start_date: challenge.start_date,
            end_date: challenge.end_date,
            closed_at,
            attempt_number: challenge.attempt_number,
            starting_referral_count: challenge.starting_referral_count,
            final_referral_count,
            peak_referral_count: challenge.max_count_reached.max(final_referral_count),
            required_referrals: challenge.required_referrals,
            result,
            commission_earned_on_success: match result {
                ChallengeResult::Success => commission_earned_on_success,
                _ => None,
            },
            tier_held_at_time,
        })
    }

    /// Referrals earned during the attempt
    pub fn progress(&self) -> u64 {
        self.final_referral_count
            .saturating_sub(self.starting_referral_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tier::CountingRule;

    fn closed(status: ChallengeStatus) -> Challenge {
        Challenge {
            id: ChallengeId::from_value(1),
            agent_id: AgentId::new("agent-1"),
            target_tier: TierName::Iron,
            start_date: 10,
            end_date: 20,
            starting_referral_count: 20,
            original_baseline: 0,
            required_referrals: 200,
            counting_rule_snapshot: CountingRule::DirectOnly,
            attempt_number: 1,
            max_count_reached: 150,
            status,
        }
    }

    #[test]
    fn test_active_challenge_has_no_record() {
        let c = closed(ChallengeStatus::Active);
        assert!(ChallengeHistoryRecord::from_closed(&c, 100, TierName::Bronze, None, 30).is_none());
    }

    #[test]
    fn test_failed_record_drops_commission() {
        let c = closed(ChallengeStatus::Failed);
        let record =
            ChallengeHistoryRecord::from_closed(&c, 170, TierName::Bronze, Some(10), 30).unwrap();
        assert_eq!(record.result, ChallengeResult::Failed);
        assert_eq!(record.commission_earned_on_success, None);
        assert_eq!(record.peak_referral_count, 170);
        assert_eq!(record.progress(), 150);
        assert_eq!(record.attempt_number, 1);
    }

    #[test]
    fn test_success_record_keeps_commission() {
        let c = closed(ChallengeStatus::Succeeded);
        let record =
            ChallengeHistoryRecord::from_closed(&c, 230, TierName::Bronze, Some(10), 30).unwrap();
        assert_eq!(record.result, ChallengeResult::Success);
        assert_eq!(record.commission_earned_on_success, Some(10));
        assert_eq!(record.tier_held_at_time, TierName::Bronze);
    }
}
