//! Challenge engine
//!
//! Opens, evaluates, and resolves the single active challenge of an agent.
//! Every operation works on a profile the caller loaded and will save; the
//! engine itself holds no per-agent state, so re-running an operation from a
//! fresh load always yields the same decision.
//!
//! Evaluation decides in a fixed order:
//! 1. progress ≥ required → SUCCEEDED (even when discovered after the window)
//! 2. now > end date → FAILED, followed by the reset policy
//! 3. otherwise still ACTIVE

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::outcome::{
    ChallengeOutcome, ChallengeProgress, ChallengeStatusReport, Evaluation, FailureResolution,
};
use crate::reset::{ResetDecision, ResetPolicy};
use crate::state_machine::ProgressionStateMachine;
use ascend_domain::time::{add_days, remaining_dhm};
use ascend_domain::{
    AgentProgressionProfile, Challenge, ChallengeHistoryRecord, ChallengeId, ChallengeStatus,
    ReferralCounts, Tier, TierCatalog, Timestamp,
};
use std::sync::Arc;

/// Decision logic for challenges
#[derive(Debug, Clone)]
pub struct ChallengeEngine {
    catalog: Arc<TierCatalog>,
    config: EngineConfig,
    reset_policy: ResetPolicy,
    state_machine: ProgressionStateMachine,
}

impl ChallengeEngine {
    /// Create an engine over a validated catalog
    pub fn new(catalog: Arc<TierCatalog>, config: EngineConfig) -> Self {
        Self {
            reset_policy: ResetPolicy::from_config(&config),
            state_machine: ProgressionStateMachine::new(Arc::clone(&catalog)),
            catalog,
            config,
        }
    }

    /// Engine over the standard catalog with default policy
    pub fn standard() -> Self {
        Self::new(Arc::new(TierCatalog::standard()), EngineConfig::default())
    }

    /// Catalog in use
    pub fn catalog(&self) -> &TierCatalog {
        &self.catalog
    }

    /// Shared handle on the catalog
    pub fn shared_catalog(&self) -> Arc<TierCatalog> {
        Arc::clone(&self.catalog)
    }

    /// Policy configuration in use
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Tier transitions
    pub fn state_machine(&self) -> &ProgressionStateMachine {
        &self.state_machine
    }

    /// Open a challenge for the tier above the one held
    ///
    /// The baseline is expressed under the *target* tier's counting rule, so a
    /// steel agent attempting silver starts from direct + level-1 referrals.
    ///
    /// # Errors
    ///
    /// - `DuplicateActiveChallenge` if a challenge is already running
    /// - `CooldownActive` during the cooldown that follows a demotion
    /// - `NoNextTier` at the top of the ladder
    pub fn start_challenge(
        &self,
        profile: &mut AgentProgressionProfile,
        counts: ReferralCounts,
        now: Timestamp,
    ) -> Result<Challenge> {
        if let Some(active) = profile.active_challenge.as_ref().filter(|c| c.is_active()) {
            return Err(EngineError::DuplicateActiveChallenge {
                agent_id: profile.agent_id.clone(),
                challenge_id: active.id,
            });
        }

        if let Some(until) = profile.cooldown_until.filter(|_| profile.in_cooldown(now)) {
            return Err(EngineError::CooldownActive {
                agent_id: profile.agent_id.clone(),
                until,
            });
        }

        if self.catalog.tier_by_name(profile.current_tier).is_none() {
            return Err(EngineError::UnknownTier(profile.current_tier));
        }
        let target = self
            .catalog
            .next_tier(profile.current_tier)
            .ok_or(EngineError::NoNextTier(profile.current_tier))?;

        profile.record_counts(counts);
        let baseline = profile.lifetime_counts().count_under(target.counting_rule);
        let challenge = self.open(profile, target, baseline, baseline, 0, now);

        profile.active_challenge = Some(challenge.clone());
        profile.cooldown_until = None;

        tracing::info!(
            agent_id = %profile.agent_id,
            challenge_id = %challenge.id,
            target = %target.name,
            baseline,
            required = challenge.required_referrals,
            end_date = challenge.end_date,
            "Challenge started"
        );
        Ok(challenge)
    }

    fn open(
        &self,
        profile: &AgentProgressionProfile,
        target: &Tier,
        starting_referral_count: u64,
        original_baseline: u64,
        attempt_number: u32,
        now: Timestamp,
    ) -> Challenge {
        Challenge {
            id: ChallengeId::new(),
            agent_id: profile.agent_id.clone(),
            target_tier: target.name,
            start_date: now,
            end_date: add_days(now, target.window_days(attempt_number)),
            starting_referral_count,
            original_baseline,
            required_referrals: target.required_referrals,
            counting_rule_snapshot: target.counting_rule,
            attempt_number,
            max_count_reached: starting_referral_count,
            status: ChallengeStatus::Active,
        }
    }

    /// Evaluate the active challenge against fresh counts
    ///
    /// On a terminal outcome the profile is updated (promotion, reset attempt,
    /// or demotion) and the history record to append is returned alongside.
    pub fn evaluate(
        &self,
        profile: &mut AgentProgressionProfile,
        counts: ReferralCounts,
        now: Timestamp,
    ) -> Result<Evaluation> {
        let mut challenge = self.active_challenge(profile)?;

        profile.record_counts(counts);
        let counts = profile.lifetime_counts();
        challenge.observe(&counts);

        let progress = challenge.progress(&counts);
        if progress >= challenge.required_referrals {
            return self.succeed(profile, challenge, counts, now);
        }
        if challenge.is_past_window(now) {
            return self.fail(profile, challenge, counts, now);
        }

        let report = ChallengeProgress::measure(&challenge, &counts, now);
        tracing::debug!(
            agent_id = %profile.agent_id,
            challenge_id = %challenge.id,
            progress,
            required = challenge.required_referrals,
            on_track = report.on_track,
            "Challenge in progress"
        );
        profile.active_challenge = Some(challenge);

        Ok(Evaluation {
            outcome: ChallengeOutcome::InProgress(report),
            record: None,
        })
    }

    fn active_challenge(&self, profile: &AgentProgressionProfile) -> Result<Challenge> {
        profile
            .active_challenge
            .as_ref()
            .filter(|c| c.is_active())
            .cloned()
            .ok_or_else(|| EngineError::NoActiveChallenge(profile.agent_id.clone()))
    }

    fn target_of(&self, challenge: &Challenge) -> Result<&Tier> {
        self.catalog
            .tier_by_name(challenge.target_tier)
            .ok_or(EngineError::UnknownTier(challenge.target_tier))
    }

    fn succeed(
        &self,
        profile: &mut AgentProgressionProfile,
        mut challenge: Challenge,
        counts: ReferralCounts,
        now: Timestamp,
    ) -> Result<Evaluation> {
        let target = self.target_of(&challenge)?;
        challenge.close(ChallengeStatus::Succeeded)?;

        let held = profile.current_tier;
        let record = ChallengeHistoryRecord::from_closed(
            &challenge,
            challenge.qualifying_count(&counts),
            held,
            Some(target.commission_rate),
            now,
        );

        self.state_machine.advance(profile, target.name)?;
        tracing::info!(
            agent_id = %profile.agent_id,
            challenge_id = %challenge.id,
            promoted_to = %target.name,
            overdue = challenge.is_past_window(now),
            "Challenge succeeded"
        );

        let next_challenge = if self.config.auto_start_next_challenge
            && self.catalog.next_tier(target.name).is_some()
        {
            Some(self.start_challenge(profile, counts, now)?)
        } else {
            None
        };

        Ok(Evaluation {
            outcome: ChallengeOutcome::Succeeded {
                promoted_to: target.name,
                closed: challenge,
                next_challenge,
            },
            record,
        })
    }

    fn fail(
        &self,
        profile: &mut AgentProgressionProfile,
        mut challenge: Challenge,
        counts: ReferralCounts,
        now: Timestamp,
    ) -> Result<Evaluation> {
        let target = self.target_of(&challenge)?;
        challenge.close(ChallengeStatus::Failed)?;

        let final_count = challenge.qualifying_count(&counts);
        let record =
            ChallengeHistoryRecord::from_closed(&challenge, final_count, profile.current_tier, None, now);

        let decision = self.reset_policy.decide(
            target,
            profile.reset_attempts_used,
            counts.count_under(target.counting_rule),
            challenge.original_baseline,
        );

        let resolution = match decision {
            ResetDecision::Reset {
                attempts_used,
                starting_referral_count,
            } => {
                let reset = self.open(
                    profile,
                    target,
                    starting_referral_count,
                    challenge.original_baseline,
                    challenge.attempt_number + 1,
                    now,
                );
                profile.reset_attempts_used = attempts_used;
                profile.active_challenge = Some(reset.clone());

                tracing::info!(
                    agent_id = %profile.agent_id,
                    failed = %challenge.id,
                    reset = %reset.id,
                    target = %target.name,
                    attempts_used,
                    baseline = starting_referral_count,
                    "Challenge failed, reset attempt opened"
                );
                FailureResolution::Reset(reset)
            }
            ResetDecision::Demote => {
                let cooldown_until = (self.config.demotion_cooldown_days > 0)
                    .then(|| add_days(now, self.config.demotion_cooldown_days));
                let held = self.state_machine.demote(profile, target.name, cooldown_until)?;

                tracing::warn!(
                    agent_id = %profile.agent_id,
                    challenge_id = %challenge.id,
                    target = %target.name,
                    "Challenge failed, resets exhausted"
                );
                FailureResolution::Demoted {
                    held,
                    cooldown_until,
                }
            }
            ResetDecision::NotEligible => {
                profile.active_challenge = None;
                tracing::info!(
                    agent_id = %profile.agent_id,
                    challenge_id = %challenge.id,
                    target = %target.name,
                    "Challenge failed"
                );
                FailureResolution::Closed
            }
        };

        Ok(Evaluation {
            outcome: ChallengeOutcome::Failed {
                closed: challenge,
                resolution,
            },
            record,
        })
    }

    /// Close the active challenge administratively
    ///
    /// No reset and no demotion follow; reset bookkeeping is left as is, so a
    /// later challenge for the same target continues the same cycle.
    pub fn expire(
        &self,
        profile: &mut AgentProgressionProfile,
        counts: ReferralCounts,
        now: Timestamp,
    ) -> Result<Evaluation> {
        let mut challenge = self.active_challenge(profile)?;

        profile.record_counts(counts);
        let counts = profile.lifetime_counts();
        challenge.observe(&counts);
        challenge.close(ChallengeStatus::Expired)?;

        let record = ChallengeHistoryRecord::from_closed(
            &challenge,
            challenge.qualifying_count(&counts),
            profile.current_tier,
            None,
            now,
        );
        profile.active_challenge = None;

        tracing::info!(
            agent_id = %profile.agent_id,
            challenge_id = %challenge.id,
            target = %challenge.target_tier,
            "Challenge expired"
        );
        Ok(Evaluation {
            outcome: ChallengeOutcome::Expired { closed: challenge },
            record,
        })
    }

    /// Read-only report on the active challenge
    pub fn status(
        &self,
        profile: &AgentProgressionProfile,
        counts: ReferralCounts,
        now: Timestamp,
    ) -> Result<ChallengeStatusReport> {
        let challenge = self.active_challenge(profile)?;
        let target = self.target_of(&challenge)?;
        let counts = profile.lifetime_counts().max(counts);

        let (days_remaining, hours_remaining, minutes_remaining) =
            remaining_dhm(now, challenge.end_date);

        let next_reset_baseline = match self.reset_policy.decide(
            target,
            profile.reset_attempts_used,
            counts.count_under(target.counting_rule),
            challenge.original_baseline,
        ) {
            ResetDecision::Reset {
                starting_referral_count,
                ..
            } => Some(starting_referral_count),
            _ => None,
        };

        let extended_window = challenge.attempt_number > 0
            && target.window_days(challenge.attempt_number) != target.challenge_window_days;

        Ok(ChallengeStatusReport {
            progress: ChallengeProgress::measure(&challenge, &counts, now),
            counting_rule: challenge.counting_rule_snapshot,
            start_date: challenge.start_date,
            end_date: challenge.end_date,
            days_remaining,
            hours_remaining,
            minutes_remaining,
            attempt_number: challenge.attempt_number,
            attempts_used: profile.reset_attempts_used,
            max_attempts: target
                .uses_reset_policy()
                .then_some(self.reset_policy.max_attempts_allowed),
            attempts_remaining: self
                .reset_policy
                .attempts_remaining(target, profile.reset_attempts_used),
            next_reset_baseline,
            extended_window,
            overdue: now > challenge.end_date,
        })
    }
}
