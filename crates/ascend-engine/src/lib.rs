//! Ascend Challenge Engine
//!
//! Decision logic for agent tier progression: opening and evaluating
//! time-boxed challenges, the progressive reset policy, tier transitions,
//! commission entitlement, and the history ledger.
//!
//! ## Layers
//!
//! - [`ChallengeEngine`]: pure decisions over a loaded profile and fresh counts
//! - [`ProgressionStateMachine`]: advance and demote
//! - [`CommissionCalculator`]: flat bonuses plus the held tier's rate
//! - [`HistoryLedger`]: append-only record of closed challenges
//! - [`ProgressionService`]: load → decide → save → append, over the port traits
//!
//! ## Example
//!
//! ```
//! use ascend_domain::{AgentId, AgentProgressionProfile, ReferralCounts, TierName};
//! use ascend_engine::{ChallengeEngine, ChallengeOutcome};
//!
//! let engine = ChallengeEngine::standard();
//! let mut profile = AgentProgressionProfile::new(AgentId::new("agent-7"));
//!
//! let challenge = engine
//!     .start_challenge(&mut profile, ReferralCounts::default(), 0)
//!     .unwrap();
//! assert_eq!(challenge.target_tier, TierName::Bronze);
//!
//! let evaluation = engine
//!     .evaluate(&mut profile, ReferralCounts::new(51, 0), 3 * 86_400)
//!     .unwrap();
//! assert!(matches!(evaluation.outcome, ChallengeOutcome::Succeeded { .. }));
//! assert_eq!(profile.current_tier, TierName::Bronze);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod clock;
pub mod commission;
pub mod config;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod outcome;
pub mod reset;
pub mod service;
pub mod state_machine;

pub use clock::{ManualClock, SystemClock};
pub use commission::{CommissionBreakdown, CommissionCalculator, ReferralEvent, ReferralLevel};
pub use config::{build_catalog, EngineConfig, FlatBonuses, TierSpec};
pub use engine::ChallengeEngine;
pub use error::{EngineError, Result};
pub use ledger::{HistoryLedger, HistorySummary};
pub use outcome::{
    ChallengeOutcome, ChallengeProgress, ChallengeStatusReport, Evaluation, FailureResolution,
};
pub use reset::{ResetDecision, ResetPolicy};
pub use service::ProgressionService;
pub use state_machine::{ProgressionStateMachine, Transition};
