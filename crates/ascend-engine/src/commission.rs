//! Commission entitlement for a payout period
//!
//! Two parts: a flat bonus per referral event (independent of tier, scaled by
//! network depth) and a tier bonus, the held tier's commission rate applied to
//! network earnings reported from outside. Amounts are integer cents; the tier
//! bonus is floored.

use crate::config::FlatBonuses;
use ascend_domain::{AgentProgressionProfile, TierCatalog};
use std::sync::Arc;

/// Depth of a referral in the agent's network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferralLevel {
    /// Recruited by the agent
    Direct,
    /// Recruited by a direct referral
    Level2,
    /// One level further down
    Level3,
}

impl ReferralLevel {
    /// Lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferralLevel::Direct => "direct",
            ReferralLevel::Level2 => "level2",
            ReferralLevel::Level3 => "level3",
        }
    }

    /// Parse from the lowercase name
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "direct" => Some(ReferralLevel::Direct),
            "level2" => Some(ReferralLevel::Level2),
            "level3" => Some(ReferralLevel::Level3),
            _ => None,
        }
    }
}

fn level_slot(level: ReferralLevel) -> usize {
    match level {
        ReferralLevel::Direct => 0,
        ReferralLevel::Level2 => 1,
        ReferralLevel::Level3 => 2,
    }
}

/// A referral that happened in the period
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferralEvent {
    /// Depth of the new referral
    pub level: ReferralLevel,
}

impl ReferralEvent {
    /// Event at the given depth
    pub fn new(level: ReferralLevel) -> Self {
        Self { level }
    }
}

/// Entitlement for one period
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommissionBreakdown {
    /// Sum of flat bonuses
    pub flat_bonus_cents: u64,
    /// Rate applied to network earnings
    pub tier_bonus_cents: u64,
    /// Flat plus tier bonus
    pub total_cents: u64,
    /// Commission rate of the held tier, in percent
    pub commission_rate: u32,
    /// Payouts allowed in the period (informational)
    pub withdrawal_allowance: u32,
    /// Events counted per level: direct, level2, level3
    pub event_counts: [u64; 3],
}

/// Computes period earnings from the held tier
#[derive(Debug, Clone)]
pub struct CommissionCalculator {
    catalog: Arc<TierCatalog>,
    bonuses: FlatBonuses,
}

impl CommissionCalculator {
    /// Calculator over a catalog with the given flat bonuses
    pub fn new(catalog: Arc<TierCatalog>, bonuses: FlatBonuses) -> Self {
        Self { catalog, bonuses }
    }

    /// Flat bonus for one event
    pub fn flat_bonus(&self, level: ReferralLevel) -> u64 {
        match level {
            ReferralLevel::Direct => self.bonuses.direct_cents,
            ReferralLevel::Level2 => self.bonuses.level2_cents,
            ReferralLevel::Level3 => self.bonuses.level3_cents,
        }
    }

    /// Entitlement for a period
    ///
    /// A profile whose tier is missing from the catalog gets a zero breakdown.
    pub fn compute_period_earnings(
        &self,
        profile: &AgentProgressionProfile,
        events: &[ReferralEvent],
        network_earnings_cents: u64,
    ) -> CommissionBreakdown {
        let mut event_counts = [0u64; 3];
        for event in events {
            event_counts[level_slot(event.level)] += 1;
        }
        self.compute_from_counts(profile, event_counts, network_earnings_cents)
    }

    /// Entitlement for a period from per-level event totals
    ///
    /// `event_counts` is direct, level2, level3.
    pub fn compute_from_counts(
        &self,
        profile: &AgentProgressionProfile,
        event_counts: [u64; 3],
        network_earnings_cents: u64,
    ) -> CommissionBreakdown {
        let Some(tier) = self.catalog.tier_by_name(profile.current_tier) else {
            tracing::warn!(
                agent_id = %profile.agent_id,
                tier = %profile.current_tier,
                "Held tier missing from catalog, no commission"
            );
            return CommissionBreakdown::default();
        };

        let flat_bonus_cents = [
            ReferralLevel::Direct,
            ReferralLevel::Level2,
            ReferralLevel::Level3,
        ]
        .into_iter()
        .fold(0u64, |acc, level| {
            let count = event_counts[level_slot(level)];
            acc.saturating_add(count.saturating_mul(self.flat_bonus(level)))
        });

        let tier_bonus_cents =
            (u128::from(network_earnings_cents) * u128::from(tier.commission_rate) / 100) as u64;

        CommissionBreakdown {
            flat_bonus_cents,
            tier_bonus_cents,
            total_cents: flat_bonus_cents.saturating_add(tier_bonus_cents),
            commission_rate: tier.commission_rate,
            withdrawal_allowance: tier.withdrawal_multiplier,
            event_counts,
        }
    }
}
