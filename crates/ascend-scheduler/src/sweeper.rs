//! Sweep every active challenge through the engine

use crate::{SchedulerConfig, SchedulerError, SweepMetrics};
use ascend_domain::traits::{Clock, HistoryRepository, ProfileRepository, ReferralCounter};
use ascend_domain::{AgentId, TierName};
use ascend_engine::{ChallengeOutcome, EngineError, FailureResolution, ProgressionService};
use std::time::{Duration, Instant};

/// What one agent's evaluation did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SweepResult {
    /// Window still open, threshold not reached
    StillActive,
    /// Threshold reached
    Promoted(TierName),
    /// Window missed, reset attempt opened
    ResetOpened,
    /// Window missed with resets exhausted
    Demoted,
    /// Window missed on a tier without resets
    Closed,
    /// Referral counts could not be fetched; nothing changed
    CounterUnavailable,
    /// Challenge was closed by another writer before this evaluation ran
    AlreadyClosed,
    /// Evaluation failed
    Error(String),
}

/// Result of evaluating a single agent, with the retries it took
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentSweep {
    /// Agent evaluated
    pub agent_id: AgentId,
    /// Outcome
    pub result: SweepResult,
    /// Evaluations re-run after stale writes
    pub stale_retries: u32,
}

impl SweepResult {
    fn from_outcome(outcome: &ChallengeOutcome) -> Self {
        match outcome {
            ChallengeOutcome::InProgress(_) => SweepResult::StillActive,
            ChallengeOutcome::Succeeded { promoted_to, .. } => SweepResult::Promoted(*promoted_to),
            ChallengeOutcome::Failed { resolution, .. } => match resolution {
                FailureResolution::Reset(_) => SweepResult::ResetOpened,
                FailureResolution::Demoted { .. } => SweepResult::Demoted,
                FailureResolution::Closed => SweepResult::Closed,
            },
            // sweeps never expire; only reachable if an admin raced us
            ChallengeOutcome::Expired { .. } => SweepResult::AlreadyClosed,
        }
    }
}

/// Evaluate one agent, reloading and re-running after stale writes
///
/// In dry-run mode the evaluation is previewed and nothing is persisted.
pub fn evaluate_agent<P, H, R, C>(
    service: &ProgressionService<P, H, R, C>,
    agent_id: &AgentId,
    config: &SchedulerConfig,
) -> AgentSweep
where
    P: ProfileRepository,
    H: HistoryRepository,
    R: ReferralCounter,
    C: Clock,
{
    let mut stale_retries = 0;
    loop {
        let attempt = if config.dry_run {
            service.preview_evaluation(agent_id)
        } else {
            service.evaluate(agent_id)
        };

        let result = match attempt {
            Ok(evaluation) => SweepResult::from_outcome(&evaluation.outcome),
            // retried on the next tick, not within this one
            Err(EngineError::ReferralCounterUnavailable(reason)) => {
                tracing::warn!("Skipping {}: referral counter unavailable ({})", agent_id, reason);
                SweepResult::CounterUnavailable
            }
            Err(e) if e.is_retryable() && stale_retries < config.max_stale_retries => {
                stale_retries += 1;
                tracing::debug!(
                    "{} for {}, retrying ({}/{})",
                    e,
                    agent_id,
                    stale_retries,
                    config.max_stale_retries
                );
                continue;
            }
            Err(EngineError::NoActiveChallenge(_)) => SweepResult::AlreadyClosed,
            Err(e) => {
                tracing::error!("Evaluation of {} failed: {}", agent_id, e);
                SweepResult::Error(e.to_string())
            }
        };

        return AgentSweep {
            agent_id: agent_id.clone(),
            result,
            stale_retries,
        };
    }
}

/// Periodic evaluator of active challenges
///
/// Walks every agent with an active challenge, evaluates it, and keeps
/// running metrics across sweeps.
///
/// # Examples
///
/// ```no_run
/// use ascend_engine::{ChallengeEngine, ProgressionService, SystemClock};
/// use ascend_scheduler::{SchedulerConfig, Sweeper};
/// use ascend_store::SqliteStore;
/// use std::sync::Arc;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let store = Arc::new(SqliteStore::new("ascend.db")?);
/// let service = ProgressionService::new(
///     ChallengeEngine::standard(),
///     Arc::clone(&store),
///     Arc::clone(&store),
///     Arc::clone(&store),
///     SystemClock,
/// );
/// let mut sweeper = Sweeper::new(SchedulerConfig::default());
///
/// let metrics = sweeper.sweep(&service)?;
/// println!("{}", metrics.summary());
/// # Ok(())
/// # }
/// ```
pub struct Sweeper {
    config: SchedulerConfig,
    metrics: SweepMetrics,
}

impl Sweeper {
    /// Create a new Sweeper with the given configuration
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            metrics: SweepMetrics::new(),
        }
    }

    /// Create a Sweeper with default configuration
    pub fn default_config() -> Self {
        Self::new(SchedulerConfig::default())
    }

    /// Configuration in use
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Get a reference to the current metrics
    pub fn metrics(&self) -> &SweepMetrics {
        &self.metrics
    }

    /// Reset metrics counters
    pub fn reset_metrics(&mut self) {
        self.metrics.reset();
    }

    /// Evaluate every active challenge once, one agent after another
    ///
    /// Per-agent failures are counted and logged; only failing to list the
    /// agents aborts the sweep. Returns the updated metrics.
    pub fn sweep<P, H, R, C>(
        &mut self,
        service: &ProgressionService<P, H, R, C>,
    ) -> Result<SweepMetrics, SchedulerError>
    where
        P: ProfileRepository,
        H: HistoryRepository,
        R: ReferralCounter,
        C: Clock,
    {
        let start = Instant::now();
        let agents = service.agents_with_active_challenge()?;
        tracing::debug!("Sweeping {} active challenges", agents.len());

        for agent_id in &agents {
            let outcome = evaluate_agent(service, agent_id, &self.config);
            self.record(&outcome);
        }

        Ok(self.finish(start.elapsed()))
    }

    /// Fold one agent's result into the metrics
    pub(crate) fn record(&mut self, sweep: &AgentSweep) {
        let metrics = &mut self.metrics;
        metrics.evaluated += 1;
        metrics.stale_retries += sweep.stale_retries as usize;
        match &sweep.result {
            SweepResult::StillActive => metrics.still_active += 1,
            SweepResult::Promoted(to) => {
                tracing::info!("{} promoted to {}", sweep.agent_id, to);
                metrics.record_promotion(*to);
            }
            SweepResult::ResetOpened => metrics.resets += 1,
            SweepResult::Demoted => metrics.demotions += 1,
            SweepResult::Closed => metrics.closed += 1,
            SweepResult::CounterUnavailable => metrics.skipped_unavailable += 1,
            SweepResult::AlreadyClosed => {}
            SweepResult::Error(_) => metrics.errors += 1,
        }
    }

    pub(crate) fn finish(&mut self, elapsed: Duration) -> SweepMetrics {
        self.metrics.record_sweep(elapsed.as_millis() as u64);
        self.metrics.clone()
    }
}
