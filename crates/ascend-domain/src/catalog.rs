//! Tier catalog - the ordered, validated tier ladder
//!
//! The catalog is loaded once at process start and is read-only afterwards.
//! Loading fails fast when the ladder is malformed: orders must run 1, 2, 3 …
//! without gaps, each tier must sit at the rank of its name, and the
//! direct-only / network counting boundary must hold.

use crate::tier::{CountingRule, Tier, TierName};
use std::fmt;

/// Reasons a catalog is rejected at load time
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// No tiers were supplied
    Empty,

    /// Orders are not 1, 2, 3 … in sequence
    NonContiguous {
        /// Order expected at this position
        expected: u32,
        /// Order found at this position
        found: u32,
    },

    /// A tier's order does not match the rank of its name
    NameOrderMismatch {
        /// Offending tier
        name: TierName,
        /// Order it was given
        order: u32,
    },

    /// A tier violates the direct-only / network counting boundary
    CountingRuleBoundary {
        /// Offending tier
        name: TierName,
        /// Its order
        order: u32,
        /// The rule it declared
        rule: CountingRule,
    },

    /// Commission rate outside 0-100
    InvalidCommissionRate {
        /// Offending tier
        name: TierName,
        /// Declared rate
        rate: u32,
    },

    /// A challenge window of zero days
    ZeroWindow(TierName),
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogError::Empty => write!(f, "tier catalog is empty"),
            CatalogError::NonContiguous { expected, found } => {
                write!(f, "tier order is not contiguous: expected {}, found {}", expected, found)
            }
            CatalogError::NameOrderMismatch { name, order } => {
                write!(f, "tier {} must have order {}, found {}", name, name.rank(), order)
            }
            CatalogError::CountingRuleBoundary { name, order, rule } => write!(
                f,
                "tier {} (order {}) declares {} but must use {}",
                name,
                order,
                rule,
                CountingRule::for_order(*order)
            ),
            CatalogError::InvalidCommissionRate { name, rate } => {
                write!(f, "tier {} has commission rate {}%, expected 0-100", name, rate)
            }
            CatalogError::ZeroWindow(name) => {
                write!(f, "tier {} has a zero-day challenge window", name)
            }
        }
    }
}

impl std::error::Error for CatalogError {}

/// The ordered tier ladder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierCatalog {
    tiers: Vec<Tier>,
}

impl TierCatalog {
    /// Build a catalog from tiers listed in ascending order, validating every invariant
    pub fn new(tiers: Vec<Tier>) -> Result<Self, CatalogError> {
        Self::validate(&tiers)?;
        Ok(Self { tiers })
    }

    /// The built-in ladder
    ///
    /// | Tier | Required | Rate | Withdrawals | Window (reset) | Counting |
    /// |------|---------:|-----:|------------:|---------------:|----------|
    /// | rookie | 0 | 5% | 1 | 7 | direct |
    /// | bronze | 50 | 7% | 1 | 7 | direct |
    /// | iron | 200 | 10% | 2 | 7 | direct |
    /// | steel | 400 | 15% | 2 | 7 (10) | direct |
    /// | silver | 1,000 | 20% | 2 | 30 | network |
    /// | gold | 5,000 | 25% | 3 | 90 | network |
    /// | platinum | 10,000 | 30% | 3 | 150 | network |
    /// | diamond | 25,000 | 35% | 4 | 300 | network |
    ///
    /// `required` is the threshold of the challenge that *reaches* the tier;
    /// rookie is the entry tier and is never targeted.
    pub fn standard() -> Self {
        let entry = |name: TierName, required, rate, withdrawals, window, reset| Tier {
            name,
            order: name.rank(),
            required_referrals: required,
            commission_rate: rate,
            withdrawal_multiplier: withdrawals,
            challenge_window_days: window,
            reset_window_days: reset,
            counting_rule: CountingRule::for_order(name.rank()),
        };

        Self {
            tiers: vec![
                entry(TierName::Rookie, 0, 5, 1, 7, None),
                entry(TierName::Bronze, 50, 7, 1, 7, None),
                entry(TierName::Iron, 200, 10, 2, 7, None),
                entry(TierName::Steel, 400, 15, 2, 7, Some(10)),
                entry(TierName::Silver, 1_000, 20, 2, 30, None),
                entry(TierName::Gold, 5_000, 25, 3, 90, None),
                entry(TierName::Platinum, 10_000, 30, 3, 150, None),
                entry(TierName::Diamond, 25_000, 35, 4, 300, None),
            ],
        }
    }

    fn validate(tiers: &[Tier]) -> Result<(), CatalogError> {
        if tiers.is_empty() {
            return Err(CatalogError::Empty);
        }

        for (index, tier) in tiers.iter().enumerate() {
            let expected = index as u32 + 1;
            if tier.order != expected {
                return Err(CatalogError::NonContiguous {
                    expected,
                    found: tier.order,
                });
            }
            if tier.name.rank() != tier.order {
                return Err(CatalogError::NameOrderMismatch {
                    name: tier.name,
                    order: tier.order,
                });
            }
            if tier.counting_rule != CountingRule::for_order(tier.order) {
                return Err(CatalogError::CountingRuleBoundary {
                    name: tier.name,
                    order: tier.order,
                    rule: tier.counting_rule,
                });
            }
            if tier.commission_rate > 100 {
                return Err(CatalogError::InvalidCommissionRate {
                    name: tier.name,
                    rate: tier.commission_rate,
                });
            }
            if tier.challenge_window_days == 0 || tier.reset_window_days == Some(0) {
                return Err(CatalogError::ZeroWindow(tier.name));
            }
        }

        Ok(())
    }

    /// All tiers in ascending order
    pub fn tiers(&self) -> &[Tier] {
        &self.tiers
    }

    /// Look a tier up by name
    pub fn tier_by_name(&self, name: TierName) -> Option<&Tier> {
        self.tiers.iter().find(|t| t.name == name)
    }

    /// The tier directly above `current`, or `None` at the top of the ladder
    pub fn next_tier(&self, current: TierName) -> Option<&Tier> {
        let current = self.tier_by_name(current)?;
        self.tiers.iter().find(|t| t.order == current.order + 1)
    }

    /// The tier directly below `current`, or `None` at the bottom
    pub fn previous_tier(&self, current: TierName) -> Option<&Tier> {
        let current = self.tier_by_name(current)?;
        let order = current.order.checked_sub(1)?;
        self.tiers.iter().find(|t| t.order == order)
    }

    /// Where an agent lands after exhausting resets for `target`: the tier
    /// one below it, i.e. the tier already held
    pub fn fallback_tier(&self, target: TierName) -> Option<&Tier> {
        self.previous_tier(target)
    }

    /// The entry tier (order 1)
    pub fn entry_tier(&self) -> &Tier {
        // validate() guarantees at least one tier
        &self.tiers[0]
    }

    /// The top tier
    pub fn top_tier(&self) -> &Tier {
        &self.tiers[self.tiers.len() - 1]
    }
}

impl Default for TierCatalog {
    fn default() -> Self {
        Self::standard()
    }
}
