//! Error types for progression operations

use ascend_domain::traits::{CounterError, RepositoryError};
use ascend_domain::{
    AgentId, CatalogError, ChallengeId, InvalidStatusTransition, TierName, Timestamp,
};
use thiserror::Error;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors that can occur while starting, evaluating, or closing challenges
#[derive(Error, Debug)]
pub enum EngineError {
    /// The agent already holds the top tier; no challenge is available
    #[error("No challenge available: {0} is the top tier")]
    NoNextTier(TierName),

    /// A challenge is already running for the agent (two callers racing)
    #[error("Agent {agent_id} already has active challenge {challenge_id}")]
    DuplicateActiveChallenge {
        /// Agent
        agent_id: AgentId,
        /// The challenge that is already active
        challenge_id: ChallengeId,
    },

    /// Operation needs an active challenge and there is none
    #[error("Agent {0} has no active challenge")]
    NoActiveChallenge(AgentId),

    /// Profile changed since it was loaded; reload and retry the whole operation
    #[error("Stale write for agent {agent_id} (loaded version {expected}, stored {actual})")]
    StaleWrite {
        /// Agent
        agent_id: AgentId,
        /// Version that was loaded
        expected: u64,
        /// Version found in storage
        actual: u64,
    },

    /// Referral tracking could not be reached; challenge state left untouched
    #[error("Referral counter unavailable: {0}")]
    ReferralCounterUnavailable(String),

    /// Agent is in its post-demotion cooldown
    #[error("Agent {agent_id} cannot start a challenge before {until}")]
    CooldownActive {
        /// Agent
        agent_id: AgentId,
        /// End of the cooldown
        until: Timestamp,
    },

    /// Tier transition not allowed by the state machine
    #[error("Invalid tier transition: {0}")]
    InvalidTransition(String),

    /// Tier referenced by a profile or challenge is missing from the catalog
    #[error("Tier {0} is not in the catalog")]
    UnknownTier(TierName),

    /// Agent enrolment attempted twice
    #[error("Agent {0} is already enrolled")]
    AlreadyEnrolled(AgentId),

    /// Unknown agent
    #[error("Agent {0} not found")]
    AgentNotFound(AgentId),

    /// Catalog failed validation
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Storage layer error
    #[error("Storage error: {0}")]
    Store(String),
}

impl EngineError {
    /// Whether the caller should reload and run the operation again
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EngineError::StaleWrite { .. } | EngineError::ReferralCounterUnavailable(_)
        )
    }
}

impl From<RepositoryError> for EngineError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(agent_id) => EngineError::AgentNotFound(agent_id),
            RepositoryError::StaleWrite {
                agent_id,
                expected,
                actual,
            } => EngineError::StaleWrite {
                agent_id,
                expected,
                actual,
            },
            RepositoryError::Backend(msg) => EngineError::Store(msg),
        }
    }
}

impl From<CounterError> for EngineError {
    fn from(err: CounterError) -> Self {
        match err {
            CounterError::Unavailable(msg) => EngineError::ReferralCounterUnavailable(msg),
        }
    }
}

impl From<InvalidStatusTransition> for EngineError {
    fn from(err: InvalidStatusTransition) -> Self {
        EngineError::InvalidTransition(err.to_string())
    }
}
