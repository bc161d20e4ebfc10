//! Results of evaluating a challenge

use ascend_domain::{
    Challenge, ChallengeHistoryRecord, ChallengeId, ChallengeStatus, CountingRule,
    ReferralCounts, TierName, Timestamp,
};

/// Progress of an active challenge at one instant
#[derive(Debug, Clone, PartialEq)]
pub struct ChallengeProgress {
    /// Challenge being measured
    pub challenge_id: ChallengeId,
    /// Tier the agent is attempting
    pub target_tier: TierName,
    /// Qualifying referrals gained since the baseline
    pub current_progress: u64,
    /// Snapshot of the threshold
    pub required_referrals: u64,
    /// `current_progress / required * 100`, clamped to [0, 100]
    pub percent_complete: f64,
    /// Referrals still missing, never negative
    pub referrals_needed: u64,
    /// Progress is at least proportional to elapsed time
    pub on_track: bool,
    /// Share of the window already used, in [0, 1]
    pub elapsed_fraction: f64,
}

impl ChallengeProgress {
    /// Measure `challenge` against lifetime counts at `now`
    pub fn measure(challenge: &Challenge, counts: &ReferralCounts, now: Timestamp) -> Self {
        let current_progress = challenge.progress(counts);
        let required = challenge.required_referrals;
        let elapsed_fraction = challenge.elapsed_fraction(now);

        let percent_complete = if required == 0 {
            100.0
        } else {
            (current_progress as f64 / required as f64 * 100.0).clamp(0.0, 100.0)
        };

        Self {
            challenge_id: challenge.id,
            target_tier: challenge.target_tier,
            current_progress,
            required_referrals: required,
            percent_complete,
            referrals_needed: required.saturating_sub(current_progress),
            on_track: current_progress as f64 >= required as f64 * elapsed_fraction,
            elapsed_fraction,
        }
    }
}

/// How a failed challenge was resolved
#[derive(Debug, Clone, PartialEq)]
pub enum FailureResolution {
    /// A reset attempt was opened for the same target
    Reset(Challenge),
    /// Resets exhausted; the cycle was demoted
    Demoted {
        /// Tier the agent keeps
        held: TierName,
        /// No new challenge before this instant
        cooldown_until: Option<Timestamp>,
    },
    /// Target outside the reset policy; the agent may start again at once
    Closed,
}

/// Outcome of one evaluation
#[derive(Debug, Clone, PartialEq)]
pub enum ChallengeOutcome {
    /// Still running
    InProgress(ChallengeProgress),
    /// Threshold reached
    Succeeded {
        /// The closed challenge
        closed: Challenge,
        /// Tier the agent now holds
        promoted_to: TierName,
        /// Challenge opened for the following tier, if any
        next_challenge: Option<Challenge>,
    },
    /// Window exhausted below the threshold
    Failed {
        /// The closed challenge
        closed: Challenge,
        /// What happened next
        resolution: FailureResolution,
    },
    /// Closed administratively
    Expired {
        /// The closed challenge
        closed: Challenge,
    },
}

impl ChallengeOutcome {
    /// Status of the evaluated challenge after this outcome
    pub fn status(&self) -> ChallengeStatus {
        match self {
            ChallengeOutcome::InProgress(_) => ChallengeStatus::Active,
            ChallengeOutcome::Succeeded { .. } => ChallengeStatus::Succeeded,
            ChallengeOutcome::Failed { .. } => ChallengeStatus::Failed,
            ChallengeOutcome::Expired { .. } => ChallengeStatus::Expired,
        }
    }

    /// Whether the evaluated challenge closed
    pub fn is_terminal(&self) -> bool {
        self.status().is_terminal()
    }
}

/// Outcome plus the history record to append, if the challenge closed
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// What happened
    pub outcome: ChallengeOutcome,
    /// Record of the closed challenge
    pub record: Option<ChallengeHistoryRecord>,
}

/// Read-only view of an agent's active challenge
#[derive(Debug, Clone, PartialEq)]
pub struct ChallengeStatusReport {
    /// Progress figures
    pub progress: ChallengeProgress,
    /// Rule the challenge counts with
    pub counting_rule: CountingRule,
    /// Window start
    pub start_date: Timestamp,
    /// Window end
    pub end_date: Timestamp,
    /// Whole days left
    pub days_remaining: u64,
    /// Hours left after whole days
    pub hours_remaining: u64,
    /// Minutes left after whole hours
    pub minutes_remaining: u64,
    /// 0 for the original attempt
    pub attempt_number: u32,
    /// Resets consumed for this target
    pub attempts_used: u32,
    /// Failures tolerated, `None` when the target has no reset policy
    pub max_attempts: Option<u32>,
    /// Failures left before demotion, `None` when the target has no reset policy
    pub attempts_remaining: Option<u32>,
    /// Baseline a reset attempt would get if the challenge failed now
    pub next_reset_baseline: Option<u64>,
    /// The window is a reset window that differs from the first-attempt window
    pub extended_window: bool,
    /// Window ran out unmet; the next evaluation closes the challenge
    pub overdue: bool,
}
