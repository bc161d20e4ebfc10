//! In-memory adapter

use crate::StoreError;
use ascend_domain::traits::{
    CounterError, HistoryRepository, ProfileRepository, ReferralCounter, RepositoryError,
};
use ascend_domain::{AgentId, AgentProgressionProfile, ChallengeHistoryRecord, ReferralCounts};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

/// Mutex-guarded maps implementing every progression port
///
/// Referral tracking can be switched off to exercise the
/// counter-unavailable path.
#[derive(Debug)]
pub struct InMemoryStore {
    profiles: Mutex<HashMap<AgentId, AgentProgressionProfile>>,
    history: Mutex<Vec<ChallengeHistoryRecord>>,
    counts: Mutex<HashMap<AgentId, ReferralCounts>>,
    counter_available: AtomicBool,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, StoreError> {
    mutex.lock().map_err(|_| StoreError::Poisoned)
}

fn next_version(
    profiles: &HashMap<AgentId, AgentProgressionProfile>,
    profile: &AgentProgressionProfile,
) -> Result<u64, RepositoryError> {
    let stored = profiles.get(&profile.agent_id).map_or(0, |p| p.version);
    if stored != profile.version {
        return Err(RepositoryError::StaleWrite {
            agent_id: profile.agent_id.clone(),
            expected: profile.version,
            actual: stored,
        });
    }
    Ok(stored + 1)
}

fn store_profile(
    profiles: &mut HashMap<AgentId, AgentProgressionProfile>,
    profile: &AgentProgressionProfile,
    version: u64,
) {
    let mut saved = profile.clone();
    saved.version = version;
    profiles.insert(saved.agent_id.clone(), saved);
}

fn ensure_unrecorded(
    history: &[ChallengeHistoryRecord],
    record: &ChallengeHistoryRecord,
) -> Result<(), RepositoryError> {
    if history.iter().any(|r| r.challenge_id == record.challenge_id) {
        return Err(RepositoryError::Backend(format!(
            "challenge {} already recorded",
            record.challenge_id
        )));
    }
    Ok(())
}

impl InMemoryStore {
    /// Empty store with referral tracking available
    pub fn new() -> Self {
        Self {
            profiles: Mutex::new(HashMap::new()),
            history: Mutex::new(Vec::new()),
            counts: Mutex::new(HashMap::new()),
            counter_available: AtomicBool::new(true),
        }
    }

    /// Record lifetime referral counts; stored values never decrease
    pub fn set_counts(&self, agent_id: &AgentId, counts: ReferralCounts) -> Result<(), StoreError> {
        let mut map = lock(&self.counts)?;
        let entry = map.entry(agent_id.clone()).or_default();
        *entry = (*entry).max(counts);
        Ok(())
    }

    /// Toggle referral tracking availability
    pub fn set_counter_available(&self, available: bool) {
        self.counter_available.store(available, Ordering::SeqCst);
    }

    /// Total number of history records, all agents
    pub fn history_len(&self) -> usize {
        lock(&self.history).map(|h| h.len()).unwrap_or(0)
    }
}

impl ProfileRepository for InMemoryStore {
    fn load(&self, agent_id: &AgentId) -> Result<AgentProgressionProfile, RepositoryError> {
        lock(&self.profiles)?
            .get(agent_id)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(agent_id.clone()))
    }

    fn save(&self, profile: &AgentProgressionProfile) -> Result<u64, RepositoryError> {
        let mut profiles = lock(&self.profiles)?;
        let version = next_version(&profiles, profile)?;
        store_profile(&mut profiles, profile, version);
        Ok(version)
    }

    fn save_closed(
        &self,
        profile: &AgentProgressionProfile,
        record: &ChallengeHistoryRecord,
    ) -> Result<u64, RepositoryError> {
        // profiles before history, everywhere both are held
        let mut profiles = lock(&self.profiles)?;
        let mut history = lock(&self.history)?;
        let version = next_version(&profiles, profile)?;
        ensure_unrecorded(&history, record)?;

        store_profile(&mut profiles, profile, version);
        history.push(record.clone());
        Ok(version)
    }

    fn agents_with_active_challenge(&self) -> Result<Vec<AgentId>, RepositoryError> {
        let mut ids: Vec<AgentId> = lock(&self.profiles)?
            .values()
            .filter(|p| p.has_active_challenge())
            .map(|p| p.agent_id.clone())
            .collect();
        ids.sort();
        Ok(ids)
    }
}

impl HistoryRepository for InMemoryStore {
    fn append(&self, record: &ChallengeHistoryRecord) -> Result<(), RepositoryError> {
        let mut history = lock(&self.history)?;
        ensure_unrecorded(&history, record)?;
        history.push(record.clone());
        Ok(())
    }

    fn list(&self, agent_id: &AgentId) -> Result<Vec<ChallengeHistoryRecord>, RepositoryError> {
        let mut records: Vec<ChallengeHistoryRecord> = lock(&self.history)?
            .iter()
            .filter(|r| &r.agent_id == agent_id)
            .cloned()
            .collect();
        records.sort_by_key(|r| r.end_date);
        Ok(records)
    }
}

impl ReferralCounter for InMemoryStore {
    fn get_counts(&self, agent_id: &AgentId) -> Result<ReferralCounts, CounterError> {
        if !self.counter_available.load(Ordering::SeqCst) {
            return Err(CounterError::Unavailable(
                "referral tracking offline".to_string(),
            ));
        }
        let counts = lock(&self.counts).map_err(|e| CounterError::Unavailable(e.to_string()))?;
        Ok(counts.get(agent_id).copied().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ascend_domain::{ChallengeId, ChallengeResult, TierName};

    fn closed_record(agent: &AgentId) -> ChallengeHistoryRecord {
        ChallengeHistoryRecord {
            challenge_id: ChallengeId::new(),
            agent_id: agent.clone(),
            target_tier: TierName::Bronze,
            start_date: 0,
            end_date: 604_800,
            closed_at: 604_801,
            attempt_number: 0,
            starting_referral_count: 0,
            final_referral_count: 12,
            peak_referral_count: 12,
            required_referrals: 50,
            result: ChallengeResult::Failed,
            commission_earned_on_success: None,
            tier_held_at_time: TierName::Rookie,
        }
    }

    #[test]
    fn test_save_bumps_version() {
        let store = InMemoryStore::new();
        let mut profile = AgentProgressionProfile::new(AgentId::new("a"));

        profile.version = store.save(&profile).unwrap();
        assert_eq!(profile.version, 1);
        profile.version = store.save(&profile).unwrap();
        assert_eq!(profile.version, 2);
        assert_eq!(store.load(&profile.agent_id).unwrap().version, 2);
    }

    #[test]
    fn test_stale_save_rejected() {
        let store = InMemoryStore::new();
        let profile = AgentProgressionProfile::new(AgentId::new("a"));
        store.save(&profile).unwrap();

        // still carries version 0
        let err = store.save(&profile).unwrap_err();
        assert_eq!(
            err,
            RepositoryError::StaleWrite {
                agent_id: AgentId::new("a"),
                expected: 0,
                actual: 1
            }
        );
    }

    #[test]
    fn test_save_closed_writes_both_or_neither() {
        let store = InMemoryStore::new();
        let agent = AgentId::new("a");
        let mut profile = AgentProgressionProfile::new(agent.clone());
        profile.version = store.save(&profile).unwrap();

        let record = closed_record(&agent);
        store.append(&record).unwrap();

        // the record is already there, so the profile must not move either
        profile.reset_attempts_used = 1;
        assert!(matches!(
            store.save_closed(&profile, &record),
            Err(RepositoryError::Backend(_))
        ));
        assert_eq!(store.load(&agent).unwrap().version, 1);
        assert_eq!(store.load(&agent).unwrap().reset_attempts_used, 0);

        let fresh = closed_record(&agent);
        assert_eq!(store.save_closed(&profile, &fresh).unwrap(), 2);
        assert_eq!(store.history_len(), 2);

        // stale profile: nothing recorded
        let stale = closed_record(&agent);
        assert!(matches!(
            store.save_closed(&profile, &stale),
            Err(RepositoryError::StaleWrite { .. })
        ));
        assert_eq!(store.history_len(), 2);
    }

    #[test]
    fn test_counter_can_go_offline() {
        let store = InMemoryStore::new();
        let agent = AgentId::new("a");
        store.set_counts(&agent, ReferralCounts::new(3, 4)).unwrap();
        assert_eq!(store.get_counts(&agent).unwrap(), ReferralCounts::new(3, 4));

        store.set_counter_available(false);
        assert!(matches!(store.get_counts(&agent), Err(CounterError::Unavailable(_))));
    }
}
