//! Referral counts as reported by referral tracking

use crate::tier::CountingRule;

/// Lifetime referral counts for one agent
///
/// Supplied by a [`crate::traits::ReferralCounter`]. Values are cumulative and
/// never decrease for a given agent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReferralCounts {
    /// People the agent recruited personally
    pub direct: u64,

    /// People recruited by the agent's direct referrals
    pub level1_indirect: u64,
}

impl ReferralCounts {
    /// Create counts from raw values
    pub fn new(direct: u64, level1_indirect: u64) -> Self {
        Self {
            direct,
            level1_indirect,
        }
    }

    /// Direct plus level-1 referrals
    pub fn network_size(&self) -> u64 {
        self.direct.saturating_add(self.level1_indirect)
    }

    /// The count that qualifies under the given rule
    pub fn count_under(&self, rule: CountingRule) -> u64 {
        match rule {
            CountingRule::DirectOnly => self.direct,
            CountingRule::DirectPlusLevel1 => self.network_size(),
        }
    }

    /// Component-wise maximum, used to keep stored lifetime totals monotonic
    pub fn max(self, other: Self) -> Self {
        Self {
            direct: self.direct.max(other.direct),
            level1_indirect: self.level1_indirect.max(other.level1_indirect),
        }
    }
}
