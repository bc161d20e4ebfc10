//! SQLite adapter

use crate::StoreError;
use ascend_domain::traits::{
    CounterError, HistoryRepository, ProfileRepository, ReferralCounter, RepositoryError,
};
use ascend_domain::{
    AgentId, AgentProgressionProfile, Challenge, ChallengeHistoryRecord, ChallengeId,
    ChallengeResult, ChallengeStatus, CountingRule, ReferralCounts, TierName,
};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const PROFILE_COLUMNS: &str = "agent_id, current_tier, total_direct_referrals, total_level1_indirect_referrals,
     reset_attempts_used, cooldown_until, version,
     challenge_id, challenge_target_tier, challenge_start_date, challenge_end_date,
     challenge_starting_count, challenge_original_baseline, challenge_required,
     challenge_counting_rule, challenge_attempt_number, challenge_max_count, challenge_status";

const HISTORY_COLUMNS: &str = "challenge_id, agent_id, target_tier, start_date, end_date, closed_at,
     attempt_number, starting_referral_count, final_referral_count, peak_referral_count,
     required_referrals, result, commission_earned_on_success, tier_held_at_time";

/// SQLite-based implementation of the progression ports
///
/// One connection behind a mutex; every port method takes `&self`, so a
/// single store can be shared across worker threads.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a database at `path`
    ///
    /// Use `:memory:` for an in-memory database (useful for testing).
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use ascend_store::SqliteStore;
    ///
    /// let store = SqliteStore::new("ascend.db").unwrap();
    /// ```
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(include_str!("schema.sql"))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory database
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::new(":memory:")
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Record lifetime referral counts for an agent
    ///
    /// Stored values never decrease: each component keeps the larger of the
    /// stored and the new value.
    pub fn set_counts(&self, agent_id: &AgentId, counts: ReferralCounts) -> Result<(), StoreError> {
        let direct = to_sql(counts.direct, "direct count")?;
        let level1 = to_sql(counts.level1_indirect, "level-1 count")?;
        self.conn()?.execute(
            "INSERT INTO referral_counts (agent_id, direct, level1_indirect) VALUES (?1, ?2, ?3)
             ON CONFLICT(agent_id) DO UPDATE SET
             direct = MAX(direct, excluded.direct),
             level1_indirect = MAX(level1_indirect, excluded.level1_indirect)",
            params![agent_id.as_str(), direct, level1],
        )?;
        Ok(())
    }

    /// Add newly tracked referrals to an agent's counts
    pub fn add_referrals(
        &self,
        agent_id: &AgentId,
        direct: u64,
        level1_indirect: u64,
    ) -> Result<ReferralCounts, StoreError> {
        let direct = to_sql(direct, "direct count")?;
        let level1 = to_sql(level1_indirect, "level-1 count")?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO referral_counts (agent_id, direct, level1_indirect) VALUES (?1, ?2, ?3)
             ON CONFLICT(agent_id) DO UPDATE SET
             direct = direct + excluded.direct,
             level1_indirect = level1_indirect + excluded.level1_indirect",
            params![agent_id.as_str(), direct, level1],
        )?;
        Self::read_counts(&conn, agent_id)
    }

    /// Every stored profile, by agent id
    pub fn list_profiles(&self) -> Result<Vec<AgentProgressionProfile>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM agent_profiles ORDER BY agent_id",
            PROFILE_COLUMNS
        ))?;
        let profiles = stmt
            .query_map([], Self::profile_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(profiles)
    }

    fn read_counts(conn: &Connection, agent_id: &AgentId) -> Result<ReferralCounts, StoreError> {
        let counts = conn
            .query_row(
                "SELECT direct, level1_indirect FROM referral_counts WHERE agent_id = ?1",
                params![agent_id.as_str()],
                |row| Ok(ReferralCounts::new(get_u64(row, 0)?, get_u64(row, 1)?)),
            )
            .optional()?;
        Ok(counts.unwrap_or_default())
    }

    fn load_profile(&self, agent_id: &AgentId) -> Result<AgentProgressionProfile, StoreError> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT {} FROM agent_profiles WHERE agent_id = ?1", PROFILE_COLUMNS),
            params![agent_id.as_str()],
            Self::profile_from_row,
        )
        .optional()?
        .ok_or_else(|| StoreError::NotFound(agent_id.clone()))
    }

    fn save_profile(&self, profile: &AgentProgressionProfile) -> Result<u64, StoreError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let version = Self::write_profile(&tx, profile)?;
        tx.commit()?;

        tracing::trace!(agent_id = %profile.agent_id, version, "Profile saved");
        Ok(version)
    }

    fn save_closing(
        &self,
        profile: &AgentProgressionProfile,
        record: &ChallengeHistoryRecord,
    ) -> Result<u64, StoreError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let version = Self::write_profile(&tx, profile)?;
        Self::insert_record(&tx, record)?;
        tx.commit()?;

        tracing::trace!(
            agent_id = %profile.agent_id,
            version,
            challenge_id = %record.challenge_id,
            "Profile saved with closed challenge"
        );
        Ok(version)
    }

    /// Version-checked upsert; the caller commits
    fn write_profile(
        tx: &Transaction<'_>,
        profile: &AgentProgressionProfile,
    ) -> Result<u64, StoreError> {
        let stored = tx
            .query_row(
                "SELECT version FROM agent_profiles WHERE agent_id = ?1",
                params![profile.agent_id.as_str()],
                |row| get_u64(row, 0),
            )
            .optional()?
            .unwrap_or(0);

        if stored != profile.version {
            return Err(StoreError::StaleWrite {
                agent_id: profile.agent_id.clone(),
                expected: profile.version,
                actual: stored,
            });
        }
        let version = stored + 1;

        let challenge = match profile.active_challenge.as_ref() {
            Some(c) => Some(ChallengeRow {
                id: id_to_bytes(c.id),
                target_tier: c.target_tier.as_str(),
                start_date: to_sql(c.start_date, "start date")?,
                end_date: to_sql(c.end_date, "end date")?,
                starting_count: to_sql(c.starting_referral_count, "starting count")?,
                original_baseline: to_sql(c.original_baseline, "original baseline")?,
                required: to_sql(c.required_referrals, "required referrals")?,
                counting_rule: c.counting_rule_snapshot.as_str(),
                attempt_number: c.attempt_number,
                max_count: to_sql(c.max_count_reached, "peak count")?,
                status: c.status.as_str(),
            }),
            None => None,
        };
        let c = challenge.as_ref();

        tx.execute(
            &format!(
                "INSERT INTO agent_profiles ({}) VALUES
                 (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)
                 ON CONFLICT(agent_id) DO UPDATE SET
                 current_tier = excluded.current_tier,
                 total_direct_referrals = excluded.total_direct_referrals,
                 total_level1_indirect_referrals = excluded.total_level1_indirect_referrals,
                 reset_attempts_used = excluded.reset_attempts_used,
                 cooldown_until = excluded.cooldown_until,
                 version = excluded.version,
                 challenge_id = excluded.challenge_id,
                 challenge_target_tier = excluded.challenge_target_tier,
                 challenge_start_date = excluded.challenge_start_date,
                 challenge_end_date = excluded.challenge_end_date,
                 challenge_starting_count = excluded.challenge_starting_count,
                 challenge_original_baseline = excluded.challenge_original_baseline,
                 challenge_required = excluded.challenge_required,
                 challenge_counting_rule = excluded.challenge_counting_rule,
                 challenge_attempt_number = excluded.challenge_attempt_number,
                 challenge_max_count = excluded.challenge_max_count,
                 challenge_status = excluded.challenge_status",
                PROFILE_COLUMNS
            ),
            params![
                profile.agent_id.as_str(),
                profile.current_tier.as_str(),
                to_sql(profile.total_direct_referrals, "direct referrals")?,
                to_sql(profile.total_level1_indirect_referrals, "level-1 referrals")?,
                profile.reset_attempts_used,
                profile
                    .cooldown_until
                    .map(|t| to_sql(t, "cooldown"))
                    .transpose()?,
                to_sql(version, "version")?,
                c.map(|c| c.id.clone()),
                c.map(|c| c.target_tier),
                c.map(|c| c.start_date),
                c.map(|c| c.end_date),
                c.map(|c| c.starting_count),
                c.map(|c| c.original_baseline),
                c.map(|c| c.required),
                c.map(|c| c.counting_rule),
                c.map(|c| c.attempt_number),
                c.map(|c| c.max_count),
                c.map(|c| c.status),
            ],
        )?;
        Ok(version)
    }

    fn insert_record(conn: &Connection, record: &ChallengeHistoryRecord) -> Result<(), StoreError> {
        conn.execute(
            &format!(
                "INSERT INTO challenge_history ({}) VALUES
                 (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
                HISTORY_COLUMNS
            ),
            params![
                id_to_bytes(record.challenge_id),
                record.agent_id.as_str(),
                record.target_tier.as_str(),
                to_sql(record.start_date, "start date")?,
                to_sql(record.end_date, "end date")?,
                to_sql(record.closed_at, "closed at")?,
                record.attempt_number,
                to_sql(record.starting_referral_count, "starting count")?,
                to_sql(record.final_referral_count, "final count")?,
                to_sql(record.peak_referral_count, "peak count")?,
                to_sql(record.required_referrals, "required referrals")?,
                record.result.as_str(),
                record.commission_earned_on_success,
                record.tier_held_at_time.as_str(),
            ],
        )?;
        Ok(())
    }

    fn profile_from_row(row: &Row<'_>) -> rusqlite::Result<AgentProgressionProfile> {
        let agent_id: String = row.get(0)?;
        let current_tier = parse_tier(row, 1)?;

        let active_challenge = match row.get::<_, Option<Vec<u8>>>(7)? {
            None => None,
            Some(id_bytes) => Some(Challenge {
                id: bytes_to_id(&id_bytes).map_err(|e| conversion(7, Type::Blob, e))?,
                agent_id: AgentId::new(agent_id.clone()),
                target_tier: parse_tier(row, 8)?,
                start_date: get_u64(row, 9)?,
                end_date: get_u64(row, 10)?,
                starting_referral_count: get_u64(row, 11)?,
                original_baseline: get_u64(row, 12)?,
                required_referrals: get_u64(row, 13)?,
                counting_rule_snapshot: parse_text(row, 14, CountingRule::parse, "counting rule")?,
                attempt_number: row.get(15)?,
                max_count_reached: get_u64(row, 16)?,
                status: parse_text(row, 17, ChallengeStatus::parse, "challenge status")?,
            }),
        };

        Ok(AgentProgressionProfile {
            agent_id: AgentId::new(agent_id),
            current_tier,
            total_direct_referrals: get_u64(row, 2)?,
            total_level1_indirect_referrals: get_u64(row, 3)?,
            active_challenge,
            reset_attempts_used: row.get(4)?,
            cooldown_until: get_opt_u64(row, 5)?,
            version: get_u64(row, 6)?,
        })
    }

    fn record_from_row(row: &Row<'_>) -> rusqlite::Result<ChallengeHistoryRecord> {
        let id_bytes: Vec<u8> = row.get(0)?;
        Ok(ChallengeHistoryRecord {
            challenge_id: bytes_to_id(&id_bytes).map_err(|e| conversion(0, Type::Blob, e))?,
            agent_id: AgentId::new(row.get::<_, String>(1)?),
            target_tier: parse_tier(row, 2)?,
            start_date: get_u64(row, 3)?,
            end_date: get_u64(row, 4)?,
            closed_at: get_u64(row, 5)?,
            attempt_number: row.get(6)?,
            starting_referral_count: get_u64(row, 7)?,
            final_referral_count: get_u64(row, 8)?,
            peak_referral_count: get_u64(row, 9)?,
            required_referrals: get_u64(row, 10)?,
            result: parse_text(row, 11, ChallengeResult::parse, "challenge result")?,
            commission_earned_on_success: row.get(12)?,
            tier_held_at_time: parse_tier(row, 13)?,
        })
    }
}

/// Convert ChallengeId to bytes for storage
fn id_to_bytes(id: ChallengeId) -> Vec<u8> {
    id.value().to_be_bytes().to_vec()
}

/// Convert bytes to ChallengeId
fn bytes_to_id(bytes: &[u8]) -> Result<ChallengeId, StoreError> {
    let arr: [u8; 16] = bytes.try_into().map_err(|_| {
        StoreError::InvalidData(format!(
            "Expected 16 bytes for ChallengeId, got {}",
            bytes.len()
        ))
    })?;
    Ok(ChallengeId::from_value(u128::from_be_bytes(arr)))
}

fn conversion(idx: usize, ty: Type, err: StoreError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, ty, Box::new(err))
}

/// Columns hold SQLite's signed integers
fn to_sql(value: u64, what: &str) -> Result<i64, StoreError> {
    i64::try_from(value)
        .map_err(|_| StoreError::InvalidData(format!("{} out of range: {}", what, value)))
}

fn from_sql(idx: usize, value: i64) -> rusqlite::Result<u64> {
    u64::try_from(value).map_err(|_| {
        conversion(
            idx,
            Type::Integer,
            StoreError::InvalidData(format!("Negative value in column {}: {}", idx, value)),
        )
    })
}

fn get_u64(row: &Row<'_>, idx: usize) -> rusqlite::Result<u64> {
    from_sql(idx, row.get(idx)?)
}

fn get_opt_u64(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<u64>> {
    row.get::<_, Option<i64>>(idx)?
        .map(|v| from_sql(idx, v))
        .transpose()
}

/// Active challenge columns, converted before binding
struct ChallengeRow {
    id: Vec<u8>,
    target_tier: &'static str,
    start_date: i64,
    end_date: i64,
    starting_count: i64,
    original_baseline: i64,
    required: i64,
    counting_rule: &'static str,
    attempt_number: u32,
    max_count: i64,
    status: &'static str,
}

fn parse_text<T>(
    row: &Row<'_>,
    idx: usize,
    parse: fn(&str) -> Option<T>,
    what: &str,
) -> rusqlite::Result<T> {
    let text: String = row.get(idx)?;
    parse(&text).ok_or_else(|| {
        conversion(
            idx,
            Type::Text,
            StoreError::InvalidData(format!("Unknown {}: {}", what, text)),
        )
    })
}

fn parse_tier(row: &Row<'_>, idx: usize) -> rusqlite::Result<TierName> {
    parse_text(row, idx, TierName::parse, "tier")
}

impl ProfileRepository for SqliteStore {
    fn load(&self, agent_id: &AgentId) -> Result<AgentProgressionProfile, RepositoryError> {
        Ok(self.load_profile(agent_id)?)
    }

    fn save(&self, profile: &AgentProgressionProfile) -> Result<u64, RepositoryError> {
        Ok(self.save_profile(profile)?)
    }

    fn save_closed(
        &self,
        profile: &AgentProgressionProfile,
        record: &ChallengeHistoryRecord,
    ) -> Result<u64, RepositoryError> {
        Ok(self.save_closing(profile, record)?)
    }

    fn agents_with_active_challenge(&self) -> Result<Vec<AgentId>, RepositoryError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT agent_id FROM agent_profiles WHERE challenge_status = 'ACTIVE' ORDER BY agent_id",
            )
            .map_err(StoreError::from)?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0).map(AgentId::new))
            .map_err(StoreError::from)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::from)?;
        Ok(ids)
    }
}

impl HistoryRepository for SqliteStore {
    fn append(&self, record: &ChallengeHistoryRecord) -> Result<(), RepositoryError> {
        let conn = self.conn()?;
        Self::insert_record(&conn, record)?;
        Ok(())
    }

    fn list(&self, agent_id: &AgentId) -> Result<Vec<ChallengeHistoryRecord>, RepositoryError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM challenge_history WHERE agent_id = ?1 ORDER BY end_date, seq",
                HISTORY_COLUMNS
            ))
            .map_err(StoreError::from)?;
        let records = stmt
            .query_map(params![agent_id.as_str()], Self::record_from_row)
            .map_err(StoreError::from)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::from)?;
        Ok(records)
    }
}

impl ReferralCounter for SqliteStore {
    fn get_counts(&self, agent_id: &AgentId) -> Result<ReferralCounts, CounterError> {
        let conn = self
            .conn()
            .map_err(|e| CounterError::Unavailable(e.to_string()))?;
        Self::read_counts(&conn, agent_id).map_err(|e| CounterError::Unavailable(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_bytes_roundtrip() {
        let id = ChallengeId::new();
        assert_eq!(bytes_to_id(&id_to_bytes(id)).unwrap(), id);
        assert!(matches!(bytes_to_id(&[1, 2, 3]), Err(StoreError::InvalidData(_))));
    }

    #[test]
    fn test_missing_counts_are_zero() {
        let store = SqliteStore::in_memory().unwrap();
        assert_eq!(
            store.get_counts(&AgentId::new("nobody")).unwrap(),
            ReferralCounts::default()
        );
    }

    #[test]
    fn test_set_counts_never_decreases() {
        let store = SqliteStore::in_memory().unwrap();
        let agent = AgentId::new("a");
        store.set_counts(&agent, ReferralCounts::new(10, 5)).unwrap();
        store.set_counts(&agent, ReferralCounts::new(8, 9)).unwrap();
        assert_eq!(store.get_counts(&agent).unwrap(), ReferralCounts::new(10, 9));

        let after = store.add_referrals(&agent, 2, 1).unwrap();
        assert_eq!(after, ReferralCounts::new(12, 10));
    }

    #[test]
    fn test_counts_beyond_i64_rejected() {
        let store = SqliteStore::in_memory().unwrap();
        let agent = AgentId::new("a");
        assert!(matches!(
            store.set_counts(&agent, ReferralCounts::new(u64::MAX, 0)),
            Err(StoreError::InvalidData(_))
        ));
        assert!(matches!(
            store.add_referrals(&agent, 0, i64::MAX as u64 + 1),
            Err(StoreError::InvalidData(_))
        ));
        assert_eq!(store.get_counts(&agent).unwrap(), ReferralCounts::default());
    }
}
