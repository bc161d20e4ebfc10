//! Trait definitions for external collaborators
//!
//! These traits define the boundaries between progression logic and
//! infrastructure. Implementations live in other crates (ascend-store) or in
//! the embedding service.
//!
//! All methods take `&self`: adapters synchronise internally so one adapter
//! can serve several agents evaluated in parallel.

use crate::{AgentId, AgentProgressionProfile, ChallengeHistoryRecord, ReferralCounts, Timestamp};
use std::fmt;
use std::sync::Arc;

/// Errors surfaced by profile and history repositories
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// No profile stored for the agent
    NotFound(AgentId),

    /// Optimistic-concurrency conflict: the stored version moved since load
    StaleWrite {
        /// Agent whose profile was being saved
        agent_id: AgentId,
        /// Version the caller loaded
        expected: u64,
        /// Version currently stored
        actual: u64,
    },

    /// Backend failure (I/O, database, corrupt row)
    Backend(String),
}

impl fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepositoryError::NotFound(agent_id) => write!(f, "no profile for agent {}", agent_id),
            RepositoryError::StaleWrite {
                agent_id,
                expected,
                actual,
            } => write!(
                f,
                "stale write for agent {}: loaded version {}, stored version {}",
                agent_id, expected, actual
            ),
            RepositoryError::Backend(msg) => write!(f, "repository backend error: {}", msg),
        }
    }
}

impl std::error::Error for RepositoryError {}

/// Errors surfaced by referral tracking
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CounterError {
    /// Referral tracking could not answer right now
    Unavailable(String),
}

impl fmt::Display for CounterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CounterError::Unavailable(msg) => write!(f, "referral counter unavailable: {}", msg),
        }
    }
}

impl std::error::Error for CounterError {}

/// Read-only oracle for an agent's lifetime referral counts
///
/// Implementations must return non-decreasing values over time for a given
/// agent; the engine does not check this.
pub trait ReferralCounter {
    /// Current direct and level-1 indirect counts
    fn get_counts(&self, agent_id: &AgentId) -> Result<ReferralCounts, CounterError>;
}

/// Storage for progression profiles
pub trait ProfileRepository {
    /// Load a profile, `RepositoryError::NotFound` if the agent is unknown
    fn load(&self, agent_id: &AgentId) -> Result<AgentProgressionProfile, RepositoryError>;

    /// Persist a profile atomically (tier and active challenge together)
    ///
    /// The stored version must equal `profile.version` (0 = insert a new
    /// profile), otherwise `RepositoryError::StaleWrite` is returned and
    /// nothing is written. Returns the new stored version.
    fn save(&self, profile: &AgentProgressionProfile) -> Result<u64, RepositoryError>;

    /// Persist a profile together with the record of the challenge it closed
    ///
    /// Same version check as [`ProfileRepository::save`]. The profile and the
    /// record are written as one unit: on any error neither is stored, so the
    /// closed challenge is still active on the next load.
    fn save_closed(
        &self,
        profile: &AgentProgressionProfile,
        record: &ChallengeHistoryRecord,
    ) -> Result<u64, RepositoryError>;

    /// Agents that currently have an active challenge
    fn agents_with_active_challenge(&self) -> Result<Vec<AgentId>, RepositoryError>;
}

/// Append-only storage for challenge history
pub trait HistoryRepository {
    /// Append one record; there is no update or delete
    fn append(&self, record: &ChallengeHistoryRecord) -> Result<(), RepositoryError>;

    /// Records for one agent, oldest first
    fn list(&self, agent_id: &AgentId) -> Result<Vec<ChallengeHistoryRecord>, RepositoryError>;
}

/// Source of the current time
pub trait Clock {
    /// Current Unix timestamp in seconds
    fn now(&self) -> Timestamp;
}

impl<T: ReferralCounter + ?Sized> ReferralCounter for Arc<T> {
    fn get_counts(&self, agent_id: &AgentId) -> Result<ReferralCounts, CounterError> {
        (**self).get_counts(agent_id)
    }
}

impl<T: ProfileRepository + ?Sized> ProfileRepository for Arc<T> {
    fn load(&self, agent_id: &AgentId) -> Result<AgentProgressionProfile, RepositoryError> {
        (**self).load(agent_id)
    }

    fn save(&self, profile: &AgentProgressionProfile) -> Result<u64, RepositoryError> {
        (**self).save(profile)
    }

    fn save_closed(
        &self,
        profile: &AgentProgressionProfile,
        record: &ChallengeHistoryRecord,
    ) -> Result<u64, RepositoryError> {
        (**self).save_closed(profile, record)
    }

    fn agents_with_active_challenge(&self) -> Result<Vec<AgentId>, RepositoryError> {
        (**self).agents_with_active_challenge()
    }
}

impl<T: HistoryRepository + ?Sized> HistoryRepository for Arc<T> {
    fn append(&self, record: &ChallengeHistoryRecord) -> Result<(), RepositoryError> {
        (**self).append(record)
    }

    fn list(&self, agent_id: &AgentId) -> Result<Vec<ChallengeHistoryRecord>, RepositoryError> {
        (**self).list(agent_id)
    }
}

impl<T: Clock + ?Sized> Clock for Arc<T> {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}
