//! Agent identity and progression profile

use crate::challenge::Challenge;
use crate::referral::ReferralCounts;
use crate::tier::TierName;
use crate::time::Timestamp;
use std::fmt;

/// Opaque identifier of an already-authenticated agent
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AgentId(String);

impl AgentId {
    /// Wrap an external identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AgentId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for AgentId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Progression state of one agent
///
/// The profile embeds its active challenge so that a repository persists
/// `current_tier` and `active_challenge` together. `version` carries the
/// optimistic-concurrency token: a repository rejects a save whose version
/// no longer matches what is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentProgressionProfile {
    /// Agent identifier
    pub agent_id: AgentId,

    /// Tier the agent holds and earns the commission rate of
    pub current_tier: TierName,

    /// Lifetime direct referrals (monotonic)
    pub total_direct_referrals: u64,

    /// Lifetime level-1 indirect referrals (monotonic)
    pub total_level1_indirect_referrals: u64,

    /// At most one running challenge
    pub active_challenge: Option<Challenge>,

    /// Progressive resets consumed for the current target tier
    pub reset_attempts_used: u32,

    /// After a demotion, no new challenge may start before this instant
    pub cooldown_until: Option<Timestamp>,

    /// Stored version this profile was loaded at (0 = never saved)
    pub version: u64,
}

impl AgentProgressionProfile {
    /// Initial state for a new agent: rookie, no challenge
    pub fn new(agent_id: AgentId) -> Self {
        Self {
            agent_id,
            current_tier: TierName::Rookie,
            total_direct_referrals: 0,
            total_level1_indirect_referrals: 0,
            active_challenge: None,
            reset_attempts_used: 0,
            cooldown_until: None,
            version: 0,
        }
    }

    /// Lifetime counts as last recorded on the profile
    pub fn lifetime_counts(&self) -> ReferralCounts {
        ReferralCounts::new(
            self.total_direct_referrals,
            self.total_level1_indirect_referrals,
        )
    }

    /// Record fresh counts; stored totals never go down
    pub fn record_counts(&mut self, counts: ReferralCounts) {
        let merged = self.lifetime_counts().max(counts);
        self.total_direct_referrals = merged.direct;
        self.total_level1_indirect_referrals = merged.level1_indirect;
    }

    /// Whether a challenge is currently running
    pub fn has_active_challenge(&self) -> bool {
        self.active_challenge.as_ref().is_some_and(Challenge::is_active)
    }

    /// Whether the post-demotion cooldown is still running at `now`
    pub fn in_cooldown(&self, now: Timestamp) -> bool {
        self.cooldown_until.is_some_and(|until| now < until)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_profile_is_rookie() {
        let profile = AgentProgressionProfile::new(AgentId::new("a"));
        assert_eq!(profile.current_tier, TierName::Rookie);
        assert!(!profile.has_active_challenge());
        assert_eq!(profile.reset_attempts_used, 0);
        assert_eq!(profile.version, 0);
    }

    #[test]
    fn test_record_counts_is_monotonic() {
        let mut profile = AgentProgressionProfile::new(AgentId::new("a"));
        profile.record_counts(ReferralCounts::new(10, 4));
        profile.record_counts(ReferralCounts::new(7, 9));
        assert_eq!(profile.lifetime_counts(), ReferralCounts::new(10, 9));
    }

    #[test]
    fn test_cooldown_window() {
        let mut profile = AgentProgressionProfile::new(AgentId::new("a"));
        assert!(!profile.in_cooldown(100));
        profile.cooldown_until = Some(200);
        assert!(profile.in_cooldown(199));
        assert!(!profile.in_cooldown(200));
    }
}
