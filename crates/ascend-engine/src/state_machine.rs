//! Tier state machine
//!
//! States are tier names. The only forward edge is `order → order + 1`
//! (advance); demotion never drops below the tier already held, it only
//! clears the bookkeeping of the failed challenge.

use crate::error::{EngineError, Result};
use ascend_domain::{AgentProgressionProfile, TierCatalog, TierName, Timestamp};
use std::sync::Arc;

/// Effect of an `advance` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The agent moved up a tier
    Advanced {
        /// Previously held tier
        from: TierName,
        /// Newly held tier
        to: TierName,
    },
    /// The agent already held the tier; nothing changed
    Unchanged,
}

/// Applies challenge outcomes to an agent's held tier
#[derive(Debug, Clone)]
pub struct ProgressionStateMachine {
    catalog: Arc<TierCatalog>,
}

impl ProgressionStateMachine {
    /// Create a state machine over a catalog
    pub fn new(catalog: Arc<TierCatalog>) -> Self {
        Self { catalog }
    }

    /// Move the agent up to `new_tier`
    ///
    /// `new_tier` must sit exactly one order above the held tier. Calling
    /// again with the tier already held is a no-op, which makes duplicate
    /// evaluation ticks harmless.
    pub fn advance(
        &self,
        profile: &mut AgentProgressionProfile,
        new_tier: TierName,
    ) -> Result<Transition> {
        if profile.current_tier == new_tier {
            return Ok(Transition::Unchanged);
        }

        let current = self
            .catalog
            .tier_by_name(profile.current_tier)
            .ok_or(EngineError::UnknownTier(profile.current_tier))?;
        let next = self
            .catalog
            .tier_by_name(new_tier)
            .ok_or(EngineError::UnknownTier(new_tier))?;

        if next.order != current.order + 1 {
            return Err(EngineError::InvalidTransition(format!(
                "{} (order {}) cannot advance to {} (order {})",
                current.name, current.order, next.name, next.order
            )));
        }

        let from = profile.current_tier;
        profile.current_tier = new_tier;
        profile.active_challenge = None;
        profile.reset_attempts_used = 0;
        profile.cooldown_until = None;

        tracing::info!(agent_id = %profile.agent_id, %from, to = %new_tier, "Tier advanced");
        Ok(Transition::Advanced { from, to: new_tier })
    }

    /// Close out a challenge cycle whose resets are exhausted
    ///
    /// The agent lands on the fallback tier of `target` (the tier below it,
    /// which is the tier already held), loses the active challenge and its
    /// reset bookkeeping, and may not start again before `cooldown_until`.
    pub fn demote(
        &self,
        profile: &mut AgentProgressionProfile,
        target: TierName,
        cooldown_until: Option<Timestamp>,
    ) -> Result<TierName> {
        let fallback = self
            .catalog
            .fallback_tier(target)
            .ok_or_else(|| {
                EngineError::InvalidTransition(format!("{} has no tier below it", target))
            })?
            .name;

        if fallback != profile.current_tier {
            return Err(EngineError::InvalidTransition(format!(
                "agent holds {} but the failed target {} falls back to {}",
                profile.current_tier, target, fallback
            )));
        }

        profile.current_tier = fallback;
        profile.active_challenge = None;
        profile.reset_attempts_used = 0;
        profile.cooldown_until = cooldown_until;

        tracing::info!(
            agent_id = %profile.agent_id,
            %target,
            held = %fallback,
            "Challenge cycle demoted"
        );
        Ok(fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ascend_domain::AgentId;

    fn machine() -> ProgressionStateMachine {
        ProgressionStateMachine::new(Arc::new(TierCatalog::standard()))
    }

    fn profile_at(tier: TierName) -> AgentProgressionProfile {
        let mut profile = AgentProgressionProfile::new(AgentId::new("agent-1"));
        profile.current_tier = tier;
        profile
    }

    #[test]
    fn test_advance_one_step() {
        let mut profile = profile_at(TierName::Rookie);
        profile.reset_attempts_used = 1;

        let transition = machine().advance(&mut profile, TierName::Bronze).unwrap();

        assert_eq!(
            transition,
            Transition::Advanced {
                from: TierName::Rookie,
                to: TierName::Bronze
            }
        );
        assert_eq!(profile.current_tier, TierName::Bronze);
        assert_eq!(profile.reset_attempts_used, 0);
        assert!(profile.active_challenge.is_none());
    }

    #[test]
    fn test_advance_is_idempotent() {
        let sm = machine();
        let mut once = profile_at(TierName::Iron);
        sm.advance(&mut once, TierName::Steel).unwrap();

        let mut twice = profile_at(TierName::Iron);
        sm.advance(&mut twice, TierName::Steel).unwrap();
        assert_eq!(sm.advance(&mut twice, TierName::Steel).unwrap(), Transition::Unchanged);

        assert_eq!(once, twice);
    }

    #[test]
    fn test_advance_rejects_skipping() {
        let mut profile = profile_at(TierName::Bronze);
        let err = machine().advance(&mut profile, TierName::Steel).unwrap_err();
        assert!(matches!(err, EngineError::InvalidTransition(_)));
        assert_eq!(profile.current_tier, TierName::Bronze);
    }

    #[test]
    fn test_advance_rejects_going_down() {
        let mut profile = profile_at(TierName::Gold);
        assert!(machine().advance(&mut profile, TierName::Silver).is_err());
    }

    #[test]
    fn test_demote_keeps_held_tier() {
        let mut profile = profile_at(TierName::Bronze);
        profile.reset_attempts_used = 1;

        let held = machine()
            .demote(&mut profile, TierName::Iron, Some(500))
            .unwrap();

        assert_eq!(held, TierName::Bronze);
        assert_eq!(profile.current_tier, TierName::Bronze);
        assert_eq!(profile.reset_attempts_used, 0);
        assert_eq!(profile.cooldown_until, Some(500));
        assert!(profile.active_challenge.is_none());
    }

    #[test]
    fn test_demote_rejects_foreign_target() {
        let mut profile = profile_at(TierName::Bronze);
        assert!(machine().demote(&mut profile, TierName::Gold, None).is_err());
        assert!(machine().demote(&mut profile, TierName::Rookie, None).is_err());
    }
}
