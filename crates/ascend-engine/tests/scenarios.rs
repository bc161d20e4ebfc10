//! End-to-end progression scenarios
//!
//! Each test drives a `ProgressionService` over the in-memory store with a
//! manual clock, the way the scheduler would, and checks the stored state.

use ascend_domain::traits::{ProfileRepository, RepositoryError};
use ascend_domain::{
    AgentId, AgentProgressionProfile, ChallengeHistoryRecord, ChallengeResult, ChallengeStatus,
    CountingRule, ReferralCounts, Tier, TierCatalog, TierName, SECONDS_PER_DAY,
};
use ascend_engine::{
    ChallengeEngine, ChallengeOutcome, EngineConfig, EngineError, FailureResolution, ManualClock,
    ProgressionService, ReferralEvent, ReferralLevel,
};
use ascend_store::InMemoryStore;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

const DAY: u64 = SECONDS_PER_DAY;
const T0: u64 = 1_700_000_000;

type Service =
    ProgressionService<Arc<InMemoryStore>, Arc<InMemoryStore>, Arc<InMemoryStore>, Arc<ManualClock>>;

struct Harness {
    store: Arc<InMemoryStore>,
    clock: Arc<ManualClock>,
    service: Service,
}

impl Harness {
    fn new() -> Self {
        Self::with_engine(ChallengeEngine::standard())
    }

    fn with_engine(engine: ChallengeEngine) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let clock = Arc::new(ManualClock::new(T0));
        Self::sharing(engine, store, clock)
    }

    fn sharing(engine: ChallengeEngine, store: Arc<InMemoryStore>, clock: Arc<ManualClock>) -> Self {
        let service = ProgressionService::new(
            engine,
            Arc::clone(&store),
            Arc::clone(&store),
            Arc::clone(&store),
            Arc::clone(&clock),
        );
        Self {
            store,
            clock,
            service,
        }
    }

    /// Store a profile that already holds `tier`
    fn agent_at(&self, name: &str, tier: TierName) -> AgentId {
        let id = AgentId::new(name);
        let mut profile = AgentProgressionProfile::new(id.clone());
        profile.current_tier = tier;
        self.store.save(&profile).unwrap();
        id
    }

    fn counts(&self, id: &AgentId, direct: u64, level1: u64) {
        self.store
            .set_counts(id, ReferralCounts::new(direct, level1))
            .unwrap();
    }

    fn profile(&self, id: &AgentId) -> AgentProgressionProfile {
        self.service.profile(id).unwrap()
    }
}

#[test]
fn test_scenario_a_rookie_promoted_to_bronze() {
    let h = Harness::new();
    let id = AgentId::new("rookie-agent");
    h.service.enroll(&id).unwrap();

    let challenge = h.service.start_challenge(&id).unwrap();
    assert_eq!(challenge.target_tier, TierName::Bronze);
    assert_eq!(challenge.starting_referral_count, 0);
    assert_eq!(challenge.required_referrals, 50);
    assert_eq!(challenge.end_date, T0 + 7 * DAY);

    h.clock.advance_days(3);
    h.counts(&id, 51, 0);
    let evaluation = h.service.evaluate(&id).unwrap();

    assert_eq!(evaluation.outcome.status(), ChallengeStatus::Succeeded);
    let profile = h.profile(&id);
    assert_eq!(profile.current_tier, TierName::Bronze);
    assert_eq!(profile.reset_attempts_used, 0);

    let history = h.service.history(&id).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].result, ChallengeResult::Success);
    assert_eq!(history[0].tier_held_at_time, TierName::Rookie);
    assert_eq!(history[0].final_referral_count, 51);
}

#[test]
fn test_scenario_b_first_failure_opens_reset() {
    let h = Harness::new();
    let id = h.agent_at("bronze-agent", TierName::Bronze);

    let original = h.service.start_challenge(&id).unwrap();
    assert_eq!(original.target_tier, TierName::Iron);
    assert_eq!(original.required_referrals, 200);

    h.counts(&id, 120, 0);
    h.clock.set(original.end_date + 1);
    let evaluation = h.service.evaluate(&id).unwrap();

    let reset = match evaluation.outcome {
        ChallengeOutcome::Failed {
            resolution: FailureResolution::Reset(reset),
            ..
        } => reset,
        other => panic!("expected a reset attempt, got {:?}", other),
    };

    // needs only 100 more from the current absolute count of 120
    assert_eq!(reset.starting_referral_count, 20);
    assert_eq!(reset.required_referrals - (120 - reset.starting_referral_count), 100);
    assert_eq!(reset.attempt_number, 1);
    assert_eq!(reset.original_baseline, 0);

    let profile = h.profile(&id);
    assert_eq!(profile.reset_attempts_used, 1);
    assert_eq!(profile.current_tier, TierName::Bronze);
    assert_eq!(profile.active_challenge.as_ref().map(|c| c.id), Some(reset.id));

    let history = h.service.history(&id).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].result, ChallengeResult::Failed);
    assert_eq!(history[0].final_referral_count, 120);
    assert_eq!(history[0].commission_earned_on_success, None);
}

#[test]
fn test_scenario_c_second_failure_demotes() {
    let h = Harness::new();
    let id = h.agent_at("bronze-agent", TierName::Bronze);

    let original = h.service.start_challenge(&id).unwrap();
    h.counts(&id, 120, 0);
    h.clock.set(original.end_date + 1);
    h.service.evaluate(&id).unwrap();

    let reset = h.profile(&id).active_challenge.unwrap();
    h.counts(&id, 170, 0);
    h.clock.set(reset.end_date + 1);
    let evaluation = h.service.evaluate(&id).unwrap();

    match evaluation.outcome {
        ChallengeOutcome::Failed {
            resolution:
                FailureResolution::Demoted {
                    held,
                    cooldown_until,
                },
            ..
        } => {
            assert_eq!(held, TierName::Bronze);
            assert_eq!(cooldown_until, Some(reset.end_date + 1 + 7 * DAY));
        }
        other => panic!("expected demotion, got {:?}", other),
    }

    let profile = h.profile(&id);
    assert_eq!(profile.current_tier, TierName::Bronze);
    assert_eq!(profile.reset_attempts_used, 0);
    assert!(profile.active_challenge.is_none());

    // a fresh qualification cycle is required first
    let err = h.service.start_challenge(&id).unwrap_err();
    assert!(matches!(err, EngineError::CooldownActive { .. }));

    h.clock.advance_days(7);
    let fresh = h.service.start_challenge(&id).unwrap();
    assert_eq!(fresh.attempt_number, 0);
    assert_eq!(fresh.starting_referral_count, 170);

    let summary = h.service.history_summary(&id).unwrap();
    assert_eq!(summary.failures, 2);
    assert_eq!(summary.reset_attempts, 1);
}

#[test]
fn test_scenario_d_steel_to_silver_switches_counting_rule() {
    let h = Harness::new();
    let id = h.agent_at("iron-agent", TierName::Iron);
    h.counts(&id, 200, 150);

    let steel = h.service.start_challenge(&id).unwrap();
    assert_eq!(steel.target_tier, TierName::Steel);
    assert_eq!(steel.counting_rule_snapshot, CountingRule::DirectOnly);
    assert_eq!(steel.starting_referral_count, 200);

    h.clock.advance_days(5);
    h.counts(&id, 600, 400);
    let evaluation = h.service.evaluate(&id).unwrap();

    let silver = match evaluation.outcome {
        ChallengeOutcome::Succeeded {
            promoted_to,
            next_challenge: Some(next),
            ..
        } => {
            assert_eq!(promoted_to, TierName::Steel);
            next
        }
        other => panic!("expected promotion with next challenge, got {:?}", other),
    };

    assert_eq!(silver.target_tier, TierName::Silver);
    assert_eq!(silver.required_referrals, 1000);
    assert_eq!(silver.counting_rule_snapshot, CountingRule::DirectPlusLevel1);
    assert_eq!(silver.end_date, T0 + 5 * DAY + 30 * DAY);
    // combined direct + level-1 count at that instant
    assert_eq!(silver.starting_referral_count, 1000);
    assert_eq!(h.profile(&id).current_tier, TierName::Steel);
}

#[test]
fn test_boundary_progress_neither_double_counts_nor_undercounts() {
    let h = Harness::new();
    let id = h.agent_at("steel-agent", TierName::Steel);
    h.counts(&id, 420, 300);

    let silver = h.service.start_challenge(&id).unwrap();
    assert_eq!(silver.starting_referral_count, 720);

    h.clock.advance_days(1);
    h.counts(&id, 520, 400);
    let report = h.service.status(&id).unwrap();
    assert_eq!(report.progress.current_progress, 200);
    assert_eq!(report.counting_rule, CountingRule::DirectPlusLevel1);
    assert_eq!(report.max_attempts, None);

    h.counts(&id, 1000, 720);
    let evaluation = h.service.evaluate(&id).unwrap();
    assert_eq!(evaluation.outcome.status(), ChallengeStatus::Succeeded);
    assert_eq!(h.profile(&id).current_tier, TierName::Silver);
    assert_eq!(
        evaluation.record.unwrap().commission_earned_on_success,
        Some(20)
    );
}

#[test]
fn test_scenario_e_diamond_has_no_challenge() {
    let h = Harness::new();
    let id = h.agent_at("diamond-agent", TierName::Diamond);

    let err = h.service.start_challenge(&id).unwrap_err();
    assert!(matches!(err, EngineError::NoNextTier(TierName::Diamond)));
    assert!(h.profile(&id).active_challenge.is_none());
    assert_eq!(h.profile(&id).version, 1);
}

#[test]
fn test_catalog_edit_does_not_touch_running_challenge() {
    let store = Arc::new(InMemoryStore::new());
    let clock = Arc::new(ManualClock::new(T0));
    let before = Harness::sharing(ChallengeEngine::standard(), Arc::clone(&store), Arc::clone(&clock));
    let id = before.agent_at("bronze-agent", TierName::Bronze);
    let challenge = before.service.start_challenge(&id).unwrap();

    // iron now asks for 900
    let edited: Vec<Tier> = TierCatalog::standard()
        .tiers()
        .iter()
        .cloned()
        .map(|mut t| {
            if t.name == TierName::Iron {
                t.required_referrals = 900;
            }
            t
        })
        .collect();
    let after = Harness::sharing(
        ChallengeEngine::new(
            Arc::new(TierCatalog::new(edited).unwrap()),
            EngineConfig::default(),
        ),
        store,
        clock,
    );

    after.counts(&id, 200, 0);
    after.clock.advance_days(2);
    let evaluation = after.service.evaluate(&id).unwrap();

    match evaluation.outcome {
        ChallengeOutcome::Succeeded { closed, .. } => {
            assert_eq!(closed.id, challenge.id);
            assert_eq!(closed.required_referrals, 200);
            assert_eq!(closed.counting_rule_snapshot, CountingRule::DirectOnly);
        }
        other => panic!("expected success under the snapshot, got {:?}", other),
    }
}

#[test]
fn test_counter_unavailable_leaves_state_untouched() {
    let h = Harness::new();
    let id = h.agent_at("bronze-agent", TierName::Bronze);
    let challenge = h.service.start_challenge(&id).unwrap();
    let before = h.profile(&id);

    h.store.set_counter_available(false);
    h.clock.set(challenge.end_date + DAY);
    let err = h.service.evaluate(&id).unwrap_err();

    assert!(matches!(err, EngineError::ReferralCounterUnavailable(_)));
    assert!(err.is_retryable());
    assert_eq!(h.profile(&id), before);
    assert!(h.service.history(&id).unwrap().is_empty());

    // once tracking is back the late evaluation fails the window normally
    h.store.set_counter_available(true);
    let evaluation = h.service.evaluate(&id).unwrap();
    assert_eq!(evaluation.outcome.status(), ChallengeStatus::Failed);
}

/// Profile repository that lets another writer sneak in before the first save
struct RacingProfiles {
    inner: Arc<InMemoryStore>,
    raced: AtomicBool,
}

impl ProfileRepository for RacingProfiles {
    fn load(&self, agent_id: &AgentId) -> Result<AgentProgressionProfile, RepositoryError> {
        self.inner.load(agent_id)
    }

    fn save(&self, profile: &AgentProgressionProfile) -> Result<u64, RepositoryError> {
        if !self.raced.swap(true, Ordering::SeqCst) {
            let other = self.inner.load(&profile.agent_id)?;
            self.inner.save(&other)?;
        }
        self.inner.save(profile)
    }

    fn save_closed(
        &self,
        profile: &AgentProgressionProfile,
        record: &ChallengeHistoryRecord,
    ) -> Result<u64, RepositoryError> {
        self.inner.save_closed(profile, record)
    }

    fn agents_with_active_challenge(&self) -> Result<Vec<AgentId>, RepositoryError> {
        self.inner.agents_with_active_challenge()
    }
}

#[test]
fn test_stale_write_surfaces_and_retry_succeeds() {
    let store = Arc::new(InMemoryStore::new());
    let clock = Arc::new(ManualClock::new(T0));
    let id = AgentId::new("raced");
    let mut profile = AgentProgressionProfile::new(id.clone());
    profile.current_tier = TierName::Rookie;
    profile.version = store.save(&profile).unwrap();

    let service = ProgressionService::new(
        ChallengeEngine::standard(),
        RacingProfiles {
            inner: Arc::clone(&store),
            raced: AtomicBool::new(false),
        },
        Arc::clone(&store),
        Arc::clone(&store),
        Arc::clone(&clock),
    );

    let err = service.start_challenge(&id).unwrap_err();
    assert!(matches!(err, EngineError::StaleWrite { expected: 1, actual: 2, .. }));
    assert!(store.load(&id).unwrap().active_challenge.is_none());

    // re-run from a fresh load
    let challenge = service.start_challenge(&id).unwrap();
    assert_eq!(
        store.load(&id).unwrap().active_challenge.map(|c| c.id),
        Some(challenge.id)
    );
}

/// Profile repository whose first closing write fails as a unit
struct BusyOnClose {
    inner: Arc<InMemoryStore>,
    failed: AtomicBool,
}

impl ProfileRepository for BusyOnClose {
    fn load(&self, agent_id: &AgentId) -> Result<AgentProgressionProfile, RepositoryError> {
        self.inner.load(agent_id)
    }

    fn save(&self, profile: &AgentProgressionProfile) -> Result<u64, RepositoryError> {
        self.inner.save(profile)
    }

    fn save_closed(
        &self,
        profile: &AgentProgressionProfile,
        record: &ChallengeHistoryRecord,
    ) -> Result<u64, RepositoryError> {
        if !self.failed.swap(true, Ordering::SeqCst) {
            return Err(RepositoryError::Backend("busy".to_string()));
        }
        self.inner.save_closed(profile, record)
    }

    fn agents_with_active_challenge(&self) -> Result<Vec<AgentId>, RepositoryError> {
        self.inner.agents_with_active_challenge()
    }
}

#[test]
fn test_failed_close_keeps_challenge_and_retry_records_once() {
    let store = Arc::new(InMemoryStore::new());
    let clock = Arc::new(ManualClock::new(T0));
    let service = ProgressionService::new(
        ChallengeEngine::standard(),
        BusyOnClose {
            inner: Arc::clone(&store),
            failed: AtomicBool::new(false),
        },
        Arc::clone(&store),
        Arc::clone(&store),
        Arc::clone(&clock),
    );

    let id = AgentId::new("flaky");
    service.enroll(&id).unwrap();
    let challenge = service.start_challenge(&id).unwrap();
    store.set_counts(&id, ReferralCounts::new(60, 0)).unwrap();

    let err = service.evaluate(&id).unwrap_err();
    assert!(matches!(err, EngineError::Store(_)));
    let profile = service.profile(&id).unwrap();
    assert_eq!(profile.current_tier, TierName::Rookie);
    assert_eq!(profile.active_challenge.map(|c| c.id), Some(challenge.id));
    assert_eq!(store.history_len(), 0);

    // the same challenge is still there to close
    let evaluation = service.evaluate(&id).unwrap();
    assert_eq!(evaluation.outcome.status(), ChallengeStatus::Succeeded);
    assert_eq!(service.profile(&id).unwrap().current_tier, TierName::Bronze);

    let history = service.history(&id).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].challenge_id, challenge.id);
    assert_eq!(history[0].result, ChallengeResult::Success);
}

#[test]
fn test_reset_attempts_never_exceed_max() {
    let h = Harness::new();
    let id = h.agent_at("stubborn", TierName::Bronze);
    let mut direct = 0;

    for _ in 0..6 {
        if !h.profile(&id).has_active_challenge() {
            h.service.start_challenge(&id).unwrap();
        }
        let end = h.profile(&id).active_challenge.unwrap().end_date;
        direct += 10;
        h.counts(&id, direct, 0);
        h.clock.set(end + 1);
        h.service.evaluate(&id).unwrap();

        let profile = h.profile(&id);
        assert!(profile.reset_attempts_used <= 2);
        if profile.cooldown_until.is_some() {
            h.clock.advance_days(7);
        }
    }

    let summary = h.service.history_summary(&id).unwrap();
    assert_eq!(summary.attempts, 6);
    assert_eq!(summary.failures, 6);
    assert_eq!(h.profile(&id).current_tier, TierName::Bronze);
}

#[test]
fn test_single_active_challenge_per_agent() {
    let h = Harness::new();
    let id = h.agent_at("racer", TierName::Rookie);
    h.service.start_challenge(&id).unwrap();

    let err = h.service.start_challenge(&id).unwrap_err();
    assert!(matches!(err, EngineError::DuplicateActiveChallenge { .. }));
    assert_eq!(h.service.agents_with_active_challenge().unwrap(), vec![id]);
}

#[test]
fn test_preview_does_not_persist() {
    let h = Harness::new();
    let id = h.agent_at("preview", TierName::Rookie);
    h.service.start_challenge(&id).unwrap();
    let before = h.profile(&id);

    h.counts(&id, 80, 0);
    let preview = h.service.preview_evaluation(&id).unwrap();
    assert_eq!(preview.outcome.status(), ChallengeStatus::Succeeded);
    assert_eq!(h.profile(&id), before);
    assert!(h.service.history(&id).unwrap().is_empty());
}

#[test]
fn test_expire_records_expired_result() {
    let h = Harness::new();
    let id = h.agent_at("suspended", TierName::Iron);
    h.service.start_challenge(&id).unwrap();

    let evaluation = h.service.expire(&id).unwrap();
    assert_eq!(evaluation.outcome.status(), ChallengeStatus::Expired);
    assert!(h.profile(&id).active_challenge.is_none());

    let history = h.service.history(&id).unwrap();
    assert_eq!(history[0].result, ChallengeResult::Expired);
    assert!(matches!(
        h.service.expire(&id),
        Err(EngineError::NoActiveChallenge(_))
    ));
}

#[test]
fn test_enroll_twice_fails() {
    let h = Harness::new();
    let id = AgentId::new("new-agent");
    let profile = h.service.enroll(&id).unwrap();
    assert_eq!(profile.current_tier, TierName::Rookie);
    assert_eq!(profile.version, 1);

    assert!(matches!(
        h.service.enroll(&id),
        Err(EngineError::AlreadyEnrolled(_))
    ));
}

#[test]
fn test_period_earnings_follow_held_tier() {
    let h = Harness::new();
    let id = h.agent_at("earner", TierName::Gold);
    let events = vec![
        ReferralEvent::new(ReferralLevel::Direct),
        ReferralEvent::new(ReferralLevel::Level3),
    ];

    let breakdown = h.service.period_earnings(&id, &events, 40_000).unwrap();
    assert_eq!(breakdown.flat_bonus_cents, 200);
    assert_eq!(breakdown.tier_bonus_cents, 10_000);
    assert_eq!(breakdown.total_cents, 10_200);
    assert_eq!(breakdown.withdrawal_allowance, 3);
}

#[test]
fn test_unknown_agent() {
    let h = Harness::new();
    assert!(matches!(
        h.service.start_challenge(&AgentId::new("ghost")),
        Err(EngineError::AgentNotFound(_))
    ));
}
