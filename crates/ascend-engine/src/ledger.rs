//! Append-only history of closed challenges

use crate::error::Result;
use ascend_domain::traits::HistoryRepository;
use ascend_domain::{AgentId, ChallengeHistoryRecord, ChallengeResult};

/// Totals over an agent's history
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HistorySummary {
    /// Closed challenges
    pub attempts: usize,
    /// Promotions
    pub successes: usize,
    /// Window exhausted
    pub failures: usize,
    /// Closed administratively
    pub expiries: usize,
    /// Reset attempts among the closed challenges
    pub reset_attempts: usize,
}

impl HistorySummary {
    /// Share of closed challenges that succeeded, 0.0 with no history
    pub fn success_rate(&self) -> f64 {
        if self.attempts == 0 {
            return 0.0;
        }
        self.successes as f64 / self.attempts as f64
    }
}

/// Reads history records through a repository
///
/// Records are written by the profile repository in the same unit of work
/// that closes the challenge.
pub struct HistoryLedger<H> {
    repository: H,
}

impl<H: HistoryRepository> HistoryLedger<H> {
    /// Wrap a history repository
    pub fn new(repository: H) -> Self {
        Self { repository }
    }

    /// All records for an agent, oldest first
    pub fn history_for(&self, agent_id: &AgentId) -> Result<Vec<ChallengeHistoryRecord>> {
        Ok(self.repository.list(agent_id)?)
    }

    /// Totals for an agent
    pub fn summary(&self, agent_id: &AgentId) -> Result<HistorySummary> {
        Ok(summarize(&self.history_for(agent_id)?))
    }
}

/// Count results over a slice of records
pub fn summarize(records: &[ChallengeHistoryRecord]) -> HistorySummary {
    records.iter().fold(HistorySummary::default(), |mut acc, r| {
        acc.attempts += 1;
        match r.result {
            ChallengeResult::Success => acc.successes += 1,
            ChallengeResult::Failed => acc.failures += 1,
            ChallengeResult::Expired => acc.expiries += 1,
        }
        if r.attempt_number > 0 {
            acc.reset_attempts += 1;
        }
        acc
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ascend_domain::traits::HistoryRepository;
    use ascend_domain::{ChallengeId, TierName};
    use ascend_store::InMemoryStore;

    fn record(id: u128, result: ChallengeResult, attempt_number: u32) -> ChallengeHistoryRecord {
        ChallengeHistoryRecord {
            challenge_id: ChallengeId::from_value(id),
            agent_id: AgentId::new("agent-1"),
            target_tier: TierName::Iron,
            start_date: id as u64 * 10,
            end_date: id as u64 * 10 + 5,
            closed_at: id as u64 * 10 + 5,
            attempt_number,
            starting_referral_count: 0,
            final_referral_count: 10,
            peak_referral_count: 10,
            required_referrals: 200,
            result,
            commission_earned_on_success: None,
            tier_held_at_time: TierName::Bronze,
        }
    }

    #[test]
    fn test_history_and_summary() {
        let store = InMemoryStore::new();
        store.append(&record(1, ChallengeResult::Failed, 0)).unwrap();
        store.append(&record(2, ChallengeResult::Failed, 1)).unwrap();
        store.append(&record(3, ChallengeResult::Success, 0)).unwrap();
        store.append(&record(4, ChallengeResult::Expired, 0)).unwrap();
        let ledger = HistoryLedger::new(store);

        let agent = AgentId::new("agent-1");
        let history = ledger.history_for(&agent).unwrap();
        assert_eq!(history.len(), 4);
        assert_eq!(history[0].challenge_id, ChallengeId::from_value(1));

        let summary = ledger.summary(&agent).unwrap();
        assert_eq!(
            summary,
            HistorySummary {
                attempts: 4,
                successes: 1,
                failures: 2,
                expiries: 1,
                reset_attempts: 1,
            }
        );
        assert_eq!(summary.success_rate(), 0.25);
    }

    #[test]
    fn test_empty_history() {
        let ledger = HistoryLedger::new(InMemoryStore::new());
        let summary = ledger.summary(&AgentId::new("nobody")).unwrap();
        assert_eq!(summary, HistorySummary::default());
        assert_eq!(summary.success_rate(), 0.0);
    }
}
