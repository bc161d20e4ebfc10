//! Tier module - ranks an agent can hold

use std::fmt;

/// Highest tier order that counts direct referrals only
///
/// Tiers at or below this order use [`CountingRule::DirectOnly`]; every tier
/// above it uses [`CountingRule::DirectPlusLevel1`]. The same boundary decides
/// which targets are covered by the progressive reset policy.
pub const DIRECT_ONLY_MAX_ORDER: u32 = 4;

/// Name of a tier in the progression ladder
///
/// Agents progress through tiers by completing challenges:
/// - Rookie → Bronze → Iron → Steel: personal recruitment, direct referrals only
/// - Silver → Gold → Platinum → Diamond: network building, direct + level-1 referrals
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TierName {
    /// Entry tier for every new agent
    Rookie,

    /// Second tier
    Bronze,

    /// Third tier
    Iron,

    /// Last direct-only tier
    Steel,

    /// First network tier
    Silver,

    /// Sixth tier
    Gold,

    /// Seventh tier
    Platinum,

    /// Top tier, no outbound challenge
    Diamond,
}

impl TierName {
    /// Every tier name in ascending order
    pub const ALL: [TierName; 8] = [
        TierName::Rookie,
        TierName::Bronze,
        TierName::Iron,
        TierName::Steel,
        TierName::Silver,
        TierName::Gold,
        TierName::Platinum,
        TierName::Diamond,
    ];

    /// Get the tier name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            TierName::Rookie => "rookie",
            TierName::Bronze => "bronze",
            TierName::Iron => "iron",
            TierName::Steel => "steel",
            TierName::Silver => "silver",
            TierName::Gold => "gold",
            TierName::Platinum => "platinum",
            TierName::Diamond => "diamond",
        }
    }

    /// Human-facing label, e.g. "Steel Agent"
    pub fn display_name(&self) -> &'static str {
        match self {
            TierName::Rookie => "Rookie Agent",
            TierName::Bronze => "Bronze Agent",
            TierName::Iron => "Iron Agent",
            TierName::Steel => "Steel Agent",
            TierName::Silver => "Silver Agent",
            TierName::Gold => "Gold Agent",
            TierName::Platinum => "Platinum Agent",
            TierName::Diamond => "Diamond Agent",
        }
    }

    /// Parse a tier name from a string (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "rookie" => Some(TierName::Rookie),
            "bronze" => Some(TierName::Bronze),
            "iron" => Some(TierName::Iron),
            "steel" => Some(TierName::Steel),
            "silver" => Some(TierName::Silver),
            "gold" => Some(TierName::Gold),
            "platinum" => Some(TierName::Platinum),
            "diamond" => Some(TierName::Diamond),
            _ => None,
        }
    }

    /// The fixed rank of this name (rookie = 1 … diamond = 8)
    pub fn rank(&self) -> u32 {
        match self {
            TierName::Rookie => 1,
            TierName::Bronze => 2,
            TierName::Iron => 3,
            TierName::Steel => 4,
            TierName::Silver => 5,
            TierName::Gold => 6,
            TierName::Platinum => 7,
            TierName::Diamond => 8,
        }
    }
}

impl fmt::Display for TierName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TierName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Invalid tier: {}", s))
    }
}

/// Which referral counts qualify toward a challenge threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CountingRule {
    /// Only people the agent recruited personally
    DirectOnly,

    /// Direct referrals plus the people those referrals recruited
    DirectPlusLevel1,
}

impl CountingRule {
    /// The rule a tier of the given order must use
    pub fn for_order(order: u32) -> Self {
        if order <= DIRECT_ONLY_MAX_ORDER {
            CountingRule::DirectOnly
        } else {
            CountingRule::DirectPlusLevel1
        }
    }

    /// Get the rule as its catalog string
    pub fn as_str(&self) -> &'static str {
        match self {
            CountingRule::DirectOnly => "DIRECT_ONLY",
            CountingRule::DirectPlusLevel1 => "DIRECT_PLUS_LEVEL1",
        }
    }

    /// Parse a rule from its catalog string (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "DIRECT_ONLY" => Some(CountingRule::DirectOnly),
            "DIRECT_PLUS_LEVEL1" => Some(CountingRule::DirectPlusLevel1),
            _ => None,
        }
    }
}

impl fmt::Display for CountingRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How demanding a tier's daily pace is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Achievability {
    /// Comfortable daily pace
    Achievable,
    /// Needs steady effort
    Challenging,
    /// Needs sustained effort every day
    VeryDifficult,
    /// Beyond a realistic personal pace
    Extreme,
}

impl Achievability {
    /// Get the rating as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Achievability::Achievable => "achievable",
            Achievability::Challenging => "challenging",
            Achievability::VeryDifficult => "very difficult",
            Achievability::Extreme => "extreme",
        }
    }
}

/// A catalog entry describing one tier
///
/// Tiers are immutable once loaded into a [`crate::TierCatalog`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tier {
    /// Tier name
    pub name: TierName,

    /// Rank in the ladder, starting at 1
    pub order: u32,

    /// Referrals needed to complete the challenge that targets this tier
    pub required_referrals: u64,

    /// Percentage (0-100) of network earnings paid while holding this tier
    pub commission_rate: u32,

    /// Payouts allowed per period while holding this tier
    pub withdrawal_multiplier: u32,

    /// Length of a first attempt at this tier, in days
    pub challenge_window_days: u32,

    /// Length of a reset attempt at this tier, if it differs from the first attempt
    pub reset_window_days: Option<u32>,

    /// Which referral counts qualify toward `required_referrals`
    pub counting_rule: CountingRule,
}

impl Tier {
    /// Window length in days for the given attempt (0 = original attempt)
    pub fn window_days(&self, attempt_number: u32) -> u32 {
        match (attempt_number, self.reset_window_days) {
            (0, _) | (_, None) => self.challenge_window_days,
            (_, Some(days)) => days,
        }
    }

    /// Whether failing a challenge for this tier goes through the progressive reset policy
    pub fn uses_reset_policy(&self) -> bool {
        self.order <= DIRECT_ONLY_MAX_ORDER
    }

    /// Referrals per day needed to finish a first attempt on time (rounded up)
    pub fn daily_target(&self) -> u64 {
        let days = u64::from(self.challenge_window_days.max(1));
        self.required_referrals.div_ceil(days)
    }

    /// Rate the daily pace; network tiers tolerate a higher pace thanks to
    /// level-1 referrals
    pub fn achievability(&self) -> Achievability {
        let daily = self.daily_target();
        let (achievable, challenging, very_difficult) = match self.counting_rule {
            CountingRule::DirectOnly => (10, 25, 50),
            CountingRule::DirectPlusLevel1 => (30, 60, 100),
        };

        if daily <= achievable {
            Achievability::Achievable
        } else if daily <= challenging {
            Achievability::Challenging
        } else if daily <= very_difficult {
            Achievability::VeryDifficult
        } else {
            Achievability::Extreme
        }
    }
}
