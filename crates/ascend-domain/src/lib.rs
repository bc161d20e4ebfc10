//! Ascend Domain Layer
//!
//! This crate contains the core domain model for agent tier progression.
//! It carries almost no external dependencies and defines the value objects,
//! entities, and port traits that the engine, storage adapters, and scheduler
//! all build upon.
//!
//! ## Key Concepts
//!
//! - **Tier**: A named rank with a referral threshold, commission rate, and challenge window
//! - **Tier Catalog**: The ordered, validated list of tiers (rookie → diamond)
//! - **Challenge**: A time-boxed attempt to reach the next tier
//! - **Profile**: One agent's progression state (held tier, active challenge, reset bookkeeping)
//! - **History Record**: The immutable trace of a closed challenge
//!
//! ## Architecture
//!
//! - Pure data and invariants only
//! - Persistence, referral tracking, and time are reached through traits in [`traits`]
//! - Infrastructure implementations live in other crates

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod agent;
pub mod catalog;
pub mod challenge;
pub mod history;
pub mod referral;
pub mod tier;
pub mod time;
pub mod traits;

// Re-exports for convenience
pub use agent::{AgentId, AgentProgressionProfile};
pub use catalog::{CatalogError, TierCatalog};
pub use challenge::{Challenge, ChallengeId, ChallengeStatus, InvalidStatusTransition};
pub use history::{ChallengeHistoryRecord, ChallengeResult};
pub use referral::ReferralCounts;
pub use tier::{Achievability, CountingRule, Tier, TierName};
pub use time::{Timestamp, SECONDS_PER_DAY};
