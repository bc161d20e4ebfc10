//! Progression service
//!
//! Wires the engine to its collaborators. Each operation is one unit of work:
//! load the profile, fetch fresh referral counts, decide, then save. A save
//! that closes a challenge writes the profile and its history record
//! together, so any failure leaves the challenge active and the whole
//! operation can be re-run from a fresh load. A `StaleWrite` means another
//! writer got there first.

use crate::commission::{CommissionBreakdown, CommissionCalculator, ReferralEvent};
use crate::engine::ChallengeEngine;
use crate::error::{EngineError, Result};
use crate::ledger::{HistoryLedger, HistorySummary};
use crate::outcome::{ChallengeStatusReport, Evaluation};
use ascend_domain::traits::{
    Clock, HistoryRepository, ProfileRepository, ReferralCounter, RepositoryError,
};
use ascend_domain::{AgentId, AgentProgressionProfile, Challenge, ChallengeHistoryRecord};

/// Engine plus repositories, referral counter, and clock
pub struct ProgressionService<P, H, R, C> {
    engine: ChallengeEngine,
    commission: CommissionCalculator,
    profiles: P,
    ledger: HistoryLedger<H>,
    counter: R,
    clock: C,
}

impl<P, H, R, C> ProgressionService<P, H, R, C>
where
    P: ProfileRepository,
    H: HistoryRepository,
    R: ReferralCounter,
    C: Clock,
{
    /// Assemble a service
    pub fn new(engine: ChallengeEngine, profiles: P, history: H, counter: R, clock: C) -> Self {
        let commission =
            CommissionCalculator::new(engine.shared_catalog(), engine.config().flat_bonuses);
        Self {
            engine,
            commission,
            profiles,
            ledger: HistoryLedger::new(history),
            counter,
            clock,
        }
    }

    /// Decision logic in use
    pub fn engine(&self) -> &ChallengeEngine {
        &self.engine
    }

    /// Clock in use
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Create a rookie profile with no active challenge
    pub fn enroll(&self, agent_id: &AgentId) -> Result<AgentProgressionProfile> {
        match self.profiles.load(agent_id) {
            Ok(_) => return Err(EngineError::AlreadyEnrolled(agent_id.clone())),
            Err(RepositoryError::NotFound(_)) => {}
            Err(e) => return Err(e.into()),
        }

        let mut profile = AgentProgressionProfile::new(agent_id.clone());
        profile.current_tier = self.engine.catalog().entry_tier().name;
        profile.version = match self.profiles.save(&profile) {
            Ok(version) => version,
            Err(RepositoryError::StaleWrite { .. }) => {
                return Err(EngineError::AlreadyEnrolled(agent_id.clone()))
            }
            Err(e) => return Err(e.into()),
        };

        tracing::info!(agent_id = %agent_id, tier = %profile.current_tier, "Agent enrolled");
        Ok(profile)
    }

    /// Current stored profile
    pub fn profile(&self, agent_id: &AgentId) -> Result<AgentProgressionProfile> {
        Ok(self.profiles.load(agent_id)?)
    }

    /// Open the next tier's challenge
    pub fn start_challenge(&self, agent_id: &AgentId) -> Result<Challenge> {
        let mut profile = self.profiles.load(agent_id)?;
        let counts = self.counter.get_counts(agent_id)?;

        let challenge = self
            .engine
            .start_challenge(&mut profile, counts, self.clock.now())?;
        self.persist(&mut profile, None)?;
        Ok(challenge)
    }

    /// Evaluate the active challenge and persist the result
    pub fn evaluate(&self, agent_id: &AgentId) -> Result<Evaluation> {
        let mut profile = self.profiles.load(agent_id)?;
        let counts = self.counter.get_counts(agent_id).map_err(|e| {
            tracing::warn!(agent_id = %agent_id, error = %e, "Referral counts unavailable, challenge untouched");
            EngineError::from(e)
        })?;

        let evaluation = self
            .engine
            .evaluate(&mut profile, counts, self.clock.now())?;
        self.persist(&mut profile, evaluation.record.as_ref())?;
        Ok(evaluation)
    }

    /// Evaluate without saving anything
    pub fn preview_evaluation(&self, agent_id: &AgentId) -> Result<Evaluation> {
        let mut profile = self.profiles.load(agent_id)?;
        let counts = self.counter.get_counts(agent_id)?;
        self.engine.evaluate(&mut profile, counts, self.clock.now())
    }

    /// Close the active challenge administratively
    pub fn expire(&self, agent_id: &AgentId) -> Result<Evaluation> {
        let mut profile = self.profiles.load(agent_id)?;
        let counts = self.counter.get_counts(agent_id)?;

        let evaluation = self.engine.expire(&mut profile, counts, self.clock.now())?;
        self.persist(&mut profile, evaluation.record.as_ref())?;
        Ok(evaluation)
    }

    /// Read-only report on the active challenge
    pub fn status(&self, agent_id: &AgentId) -> Result<ChallengeStatusReport> {
        let profile = self.profiles.load(agent_id)?;
        let counts = self.counter.get_counts(agent_id)?;
        self.engine.status(&profile, counts, self.clock.now())
    }

    /// Commission entitlement for a period at the held tier
    pub fn period_earnings(
        &self,
        agent_id: &AgentId,
        events: &[ReferralEvent],
        network_earnings_cents: u64,
    ) -> Result<CommissionBreakdown> {
        let profile = self.profiles.load(agent_id)?;
        Ok(self
            .commission
            .compute_period_earnings(&profile, events, network_earnings_cents))
    }

    /// Commission entitlement from per-level event totals (direct, level2, level3)
    pub fn period_earnings_from_counts(
        &self,
        agent_id: &AgentId,
        event_counts: [u64; 3],
        network_earnings_cents: u64,
    ) -> Result<CommissionBreakdown> {
        let profile = self.profiles.load(agent_id)?;
        Ok(self
            .commission
            .compute_from_counts(&profile, event_counts, network_earnings_cents))
    }

    /// Closed challenges, oldest first
    pub fn history(&self, agent_id: &AgentId) -> Result<Vec<ChallengeHistoryRecord>> {
        self.ledger.history_for(agent_id)
    }

    /// Totals over the agent's history
    pub fn history_summary(&self, agent_id: &AgentId) -> Result<HistorySummary> {
        self.ledger.summary(agent_id)
    }

    /// Agents the scheduler should evaluate
    pub fn agents_with_active_challenge(&self) -> Result<Vec<AgentId>> {
        Ok(self.profiles.agents_with_active_challenge()?)
    }

    fn persist(
        &self,
        profile: &mut AgentProgressionProfile,
        record: Option<&ChallengeHistoryRecord>,
    ) -> Result<()> {
        profile.version = match record {
            Some(record) => {
                let version = self.profiles.save_closed(profile, record)?;
                tracing::debug!(
                    agent_id = %record.agent_id,
                    challenge_id = %record.challenge_id,
                    result = %record.result,
                    "Challenge closed and recorded"
                );
                version
            }
            None => self.profiles.save(profile)?,
        };
        Ok(())
    }
}
