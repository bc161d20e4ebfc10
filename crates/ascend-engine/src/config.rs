//! Configuration for progression operations
//!
//! Policy constants (reset attempts, reset credit, cooldown, flat bonuses) and
//! an optional catalog override, all loadable from TOML.

use crate::error::{EngineError, Result};
use ascend_domain::{CountingRule, Tier, TierCatalog, TierName};
use serde::{Deserialize, Serialize};

/// Policy configuration for the challenge engine
///
/// # Examples
///
/// ```
/// use ascend_engine::EngineConfig;
///
/// let config = EngineConfig::default();
/// assert_eq!(config.max_attempts_allowed, 2);
/// assert_eq!(config.flat_bonuses.direct_cents, 150);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Failures tolerated on a reset-eligible target before demotion
    /// Default: 2
    #[serde(default = "default_max_attempts")]
    pub max_attempts_allowed: u32,

    /// Reset credit is `required_referrals / reset_credit_divisor`
    /// Default: 2 (half the target)
    #[serde(default = "default_reset_credit_divisor")]
    pub reset_credit_divisor: u64,

    /// Days after a demotion before a new challenge may start
    /// Default: 7
    #[serde(default = "default_cooldown_days")]
    pub demotion_cooldown_days: u32,

    /// Open the next tier's challenge immediately after a success
    /// Default: true
    #[serde(default = "default_true")]
    pub auto_start_next_challenge: bool,

    /// Flat per-referral bonuses
    #[serde(default)]
    pub flat_bonuses: FlatBonuses,
}

/// Flat bonus per referral event, by depth in the agent's network, in cents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatBonuses {
    /// Bonus for a direct referral
    /// Default: 150 ($1.50)
    pub direct_cents: u64,

    /// Bonus for a referral two levels down
    /// Default: 100 ($1.00)
    pub level2_cents: u64,

    /// Bonus for a referral three levels down
    /// Default: 50 ($0.50)
    pub level3_cents: u64,
}

impl Default for FlatBonuses {
    fn default() -> Self {
        Self {
            direct_cents: 150,
            level2_cents: 100,
            level3_cents: 50,
        }
    }
}

fn default_max_attempts() -> u32 {
    2
}

fn default_reset_credit_divisor() -> u64 {
    2
}

fn default_cooldown_days() -> u32 {
    7
}

fn default_true() -> bool {
    true
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_attempts_allowed: default_max_attempts(),
            reset_credit_divisor: default_reset_credit_divisor(),
            demotion_cooldown_days: default_cooldown_days(),
            auto_start_next_challenge: true,
            flat_bonuses: FlatBonuses::default(),
        }
    }
}

impl EngineConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: EngineConfig =
            toml::from_str(contents).map_err(|e| EngineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the policy cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts_allowed == 0 {
            return Err(EngineError::Config(
                "max_attempts_allowed must be at least 1".to_string(),
            ));
        }
        if self.reset_credit_divisor == 0 {
            return Err(EngineError::Config(
                "reset_credit_divisor must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// One tier as written in a config file
///
/// ```toml
/// [[tiers]]
/// name = "silver"
/// order = 5
/// required_referrals = 1000
/// commission_rate = 20
/// withdrawal_multiplier = 2
/// challenge_window_days = 30
/// counting_rule = "DIRECT_PLUS_LEVEL1"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierSpec {
    /// Tier name (rookie … diamond)
    pub name: String,
    /// Rank, starting at 1
    pub order: u32,
    /// Threshold of the challenge targeting this tier
    pub required_referrals: u64,
    /// Percent of network earnings
    pub commission_rate: u32,
    /// Payouts per period
    pub withdrawal_multiplier: u32,
    /// First-attempt window in days
    pub challenge_window_days: u32,
    /// Reset-attempt window in days
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset_window_days: Option<u32>,
    /// Counting rule; derived from `order` when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counting_rule: Option<String>,
}

impl TierSpec {
    fn into_tier(self) -> Result<Tier> {
        let name = TierName::parse(&self.name)
            .ok_or_else(|| EngineError::Config(format!("unknown tier name '{}'", self.name)))?;
        let counting_rule = match &self.counting_rule {
            Some(rule) => CountingRule::parse(rule)
                .ok_or_else(|| EngineError::Config(format!("unknown counting rule '{}'", rule)))?,
            None => CountingRule::for_order(self.order),
        };
        Ok(Tier {
            name,
            order: self.order,
            required_referrals: self.required_referrals,
            commission_rate: self.commission_rate,
            withdrawal_multiplier: self.withdrawal_multiplier,
            challenge_window_days: self.challenge_window_days,
            reset_window_days: self.reset_window_days,
            counting_rule,
        })
    }
}

impl From<&Tier> for TierSpec {
    fn from(tier: &Tier) -> Self {
        Self {
            name: tier.name.as_str().to_string(),
            order: tier.order,
            required_referrals: tier.required_referrals,
            commission_rate: tier.commission_rate,
            withdrawal_multiplier: tier.withdrawal_multiplier,
            challenge_window_days: tier.challenge_window_days,
            reset_window_days: tier.reset_window_days,
            counting_rule: Some(tier.counting_rule.as_str().to_string()),
        }
    }
}

/// Build a validated catalog from config entries, or the standard ladder when
/// no entries are given
pub fn build_catalog(specs: &[TierSpec]) -> Result<TierCatalog> {
    if specs.is_empty() {
        return Ok(TierCatalog::standard());
    }
    let tiers = specs
        .iter()
        .cloned()
        .map(TierSpec::into_tier)
        .collect::<Result<Vec<_>>>()?;
    Ok(TierCatalog::new(tiers)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.max_attempts_allowed, 2);
        assert_eq!(config.reset_credit_divisor, 2);
        assert_eq!(config.demotion_cooldown_days, 7);
        assert!(config.auto_start_next_challenge);
        assert_eq!(config.flat_bonuses.level3_cents, 50);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = EngineConfig::from_toml_str("demotion_cooldown_days = 3").unwrap();
        assert_eq!(config.demotion_cooldown_days, 3);
        assert_eq!(config.max_attempts_allowed, 2);
    }

    #[test]
    fn test_rejects_zero_attempts() {
        let err = EngineConfig::from_toml_str("max_attempts_allowed = 0").unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }

    #[test]
    fn test_serde_roundtrip() {
        let config = EngineConfig::default();
        let serialized = serde_json::to_string(&config).unwrap();
        let deserialized: EngineConfig = serde_json::from_str(&serialized).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_empty_specs_give_standard_catalog() {
        assert_eq!(build_catalog(&[]).unwrap(), TierCatalog::standard());
    }

    #[test]
    fn test_specs_roundtrip_standard_catalog() {
        let specs: Vec<TierSpec> = TierCatalog::standard().tiers().iter().map(TierSpec::from).collect();
        assert_eq!(build_catalog(&specs).unwrap(), TierCatalog::standard());
    }

    #[test]
    fn test_catalog_override_from_toml() {
        #[derive(Deserialize)]
        struct Doc {
            tiers: Vec<TierSpec>,
        }

        let doc: Doc = toml::from_str(
            r#"
            [[tiers]]
            name = "rookie"
            order = 1
            required_referrals = 0
            commission_rate = 5
            withdrawal_multiplier = 1
            challenge_window_days = 7

            [[tiers]]
            name = "bronze"
            order = 2
            required_referrals = 80
            commission_rate = 8
            withdrawal_multiplier = 1
            challenge_window_days = 10
            "#,
        )
        .unwrap();

        let catalog = build_catalog(&doc.tiers).unwrap();
        let bronze = catalog.tier_by_name(TierName::Bronze).unwrap();
        assert_eq!(bronze.required_referrals, 80);
        assert_eq!(bronze.counting_rule, CountingRule::DirectOnly);
        assert!(catalog.next_tier(TierName::Bronze).is_none());
    }

    #[test]
    fn test_catalog_override_fails_fast() {
        let mut specs: Vec<TierSpec> = TierCatalog::standard().tiers().iter().map(TierSpec::from).collect();
        specs[4].counting_rule = Some("DIRECT_ONLY".to_string());
        assert!(matches!(build_catalog(&specs), Err(EngineError::Catalog(_))));

        specs[4].counting_rule = Some("sideways".to_string());
        assert!(matches!(build_catalog(&specs), Err(EngineError::Config(_))));
    }
}
