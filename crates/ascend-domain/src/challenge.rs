//! Challenge module - a time-boxed attempt to reach the next tier

use crate::agent::AgentId;
use crate::referral::ReferralCounts;
use crate::tier::{CountingRule, TierName};
use crate::time::Timestamp;
use std::fmt;

/// Unique identifier for a challenge based on UUIDv7
///
/// UUIDv7 ids sort chronologically, so challenges of one agent order by
/// creation time without a separate sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChallengeId(u128);

impl ChallengeId {
    /// Generate a new UUIDv7-based ChallengeId
    ///
    /// # Examples
    ///
    /// ```
    /// use ascend_domain::ChallengeId;
    ///
    /// let id = ChallengeId::new();
    /// assert!(id.value() > 0);
    /// ```
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7().as_u128())
    }

    /// Create a ChallengeId from a raw u128 value
    ///
    /// This is primarily for storage layer deserialization.
    pub fn from_value(value: u128) -> Self {
        Self(value)
    }

    /// Parse a ChallengeId from a UUID string
    pub fn from_string(s: &str) -> Result<Self, String> {
        uuid::Uuid::parse_str(s)
            .map(|u| Self(u.as_u128()))
            .map_err(|e| format!("Invalid challenge id: {}", e))
    }

    /// Get the raw u128 value
    pub fn value(&self) -> u128 {
        self.0
    }
}

impl Default for ChallengeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ChallengeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", uuid::Uuid::from_u128(self.0))
    }
}

/// Lifecycle status of a challenge
///
/// A challenge starts `Active` and moves exactly once to one of the three
/// terminal states. Terminal states never change afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChallengeStatus {
    /// Still running
    Active,
    /// Threshold reached
    Succeeded,
    /// Window exhausted without reaching the threshold
    Failed,
    /// Closed administratively before an outcome
    Expired,
}

impl ChallengeStatus {
    /// Get the status as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            ChallengeStatus::Active => "ACTIVE",
            ChallengeStatus::Succeeded => "SUCCEEDED",
            ChallengeStatus::Failed => "FAILED",
            ChallengeStatus::Expired => "EXPIRED",
        }
    }

    /// Parse a status string (internal use)
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ACTIVE" => Some(ChallengeStatus::Active),
            "SUCCEEDED" => Some(ChallengeStatus::Succeeded),
            "FAILED" => Some(ChallengeStatus::Failed),
            "EXPIRED" => Some(ChallengeStatus::Expired),
            _ => None,
        }
    }

    /// Whether the status is final
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ChallengeStatus::Active)
    }
}

impl fmt::Display for ChallengeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attempted status change that the lifecycle does not allow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidStatusTransition {
    /// Status the challenge was in
    pub from: ChallengeStatus,
    /// Status that was requested
    pub to: ChallengeStatus,
}

impl fmt::Display for InvalidStatusTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "challenge cannot move from {} to {}", self.from, self.to)
    }
}

impl std::error::Error for InvalidStatusTransition {}

/// A live attempt at the next tier
///
/// `required_referrals` and `counting_rule_snapshot` are copied from the
/// catalog when the challenge is created and are never re-read, so catalog
/// edits cannot move the goalposts of a running challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    /// Unique identifier
    pub id: ChallengeId,

    /// Agent attempting the challenge
    pub agent_id: AgentId,

    /// Tier the agent is trying to reach
    pub target_tier: TierName,

    /// Start of the window
    pub start_date: Timestamp,

    /// End of the window (start + window days)
    pub end_date: Timestamp,

    /// Count under the snapshot rule that progress is measured from
    pub starting_referral_count: u64,

    /// Baseline of the first attempt in this reset cycle; reset credit never
    /// goes below it
    pub original_baseline: u64,

    /// Threshold snapshot
    pub required_referrals: u64,

    /// Counting rule snapshot
    pub counting_rule_snapshot: CountingRule,

    /// 0 for the original attempt, 1.. for reset attempts
    pub attempt_number: u32,

    /// Highest count under the snapshot rule seen while active
    pub max_count_reached: u64,

    /// Lifecycle status
    pub status: ChallengeStatus,
}

impl Challenge {
    /// Count that qualifies for this challenge given lifetime counts
    pub fn qualifying_count(&self, counts: &ReferralCounts) -> u64 {
        counts.count_under(self.counting_rule_snapshot)
    }

    /// Referrals earned since the baseline
    pub fn progress(&self, counts: &ReferralCounts) -> u64 {
        self.qualifying_count(counts)
            .saturating_sub(self.starting_referral_count)
    }

    /// Whether the challenge is still running
    pub fn is_active(&self) -> bool {
        self.status == ChallengeStatus::Active
    }

    /// Whether `now` lies past the end of the window
    pub fn is_past_window(&self, now: Timestamp) -> bool {
        now > self.end_date
    }

    /// Fraction of the window elapsed at `now`, clamped to [0, 1]
    pub fn elapsed_fraction(&self, now: Timestamp) -> f64 {
        let span = self.end_date.saturating_sub(self.start_date);
        if span == 0 {
            return 1.0;
        }
        let elapsed = now.saturating_sub(self.start_date).min(span);
        elapsed as f64 / span as f64
    }

    /// Remember the highest qualifying count seen so far
    pub fn observe(&mut self, counts: &ReferralCounts) {
        self.max_count_reached = self.max_count_reached.max(self.qualifying_count(counts));
    }

    /// Move the challenge to a terminal status
    ///
    /// Only `Active → {Succeeded, Failed, Expired}` is allowed.
    pub fn close(&mut self, to: ChallengeStatus) -> Result<(), InvalidStatusTransition> {
        if self.status.is_terminal() || !to.is_terminal() {
            return Err(InvalidStatusTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }
}
