//! Ascend Storage Layer
//!
//! Adapters for the progression ports: profiles, challenge history, and
//! referral counts.
//!
//! # Architecture
//!
//! - [`SqliteStore`]: SQLite, one row per profile with the active challenge
//!   inline, so a save is a single atomic row write guarded by a version check
//! - [`InMemoryStore`]: the same contract over mutex-guarded maps, for tests
//!   and simulations
//!
//! # Examples
//!
//! ```no_run
//! use ascend_store::SqliteStore;
//!
//! let store = SqliteStore::new(":memory:").unwrap();
//! // Store is now ready for profile operations
//! ```

#![warn(missing_docs)]

mod memory;
mod sqlite;

pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;

use ascend_domain::traits::RepositoryError;
use ascend_domain::AgentId;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Profile not found
    #[error("Profile not found: {0}")]
    NotFound(AgentId),

    /// Stored version moved since the profile was loaded
    #[error("Stale write for {agent_id}: expected version {expected}, found {actual}")]
    StaleWrite {
        /// Agent
        agent_id: AgentId,
        /// Version carried by the profile being saved
        expected: u64,
        /// Version in storage
        actual: u64,
    },

    /// Invalid data format
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// A lock holder panicked
    #[error("Store lock poisoned")]
    Poisoned,
}

impl From<StoreError> for RepositoryError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(agent_id) => RepositoryError::NotFound(agent_id),
            StoreError::StaleWrite {
                agent_id,
                expected,
                actual,
            } => RepositoryError::StaleWrite {
                agent_id,
                expected,
                actual,
            },
            other => RepositoryError::Backend(other.to_string()),
        }
    }
}
