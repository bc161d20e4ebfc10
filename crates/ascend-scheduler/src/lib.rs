//! Ascend Scheduler
//!
//! Periodic evaluation of every active challenge.
//!
//! # Overview
//!
//! Agents do not have to ask for their promotion. The scheduler walks every
//! profile with an active challenge and runs the engine's evaluation:
//! - **Promotion**: the threshold was reached, the tier advances
//! - **Reset or demotion**: the window closed below the threshold
//! - **Peak tracking**: running challenges record the highest count observed
//!
//! A profile that changed under the evaluation (stale write) is reloaded and
//! evaluated again, up to `max_stale_retries` times. When referral tracking is
//! down the agent is skipped and its challenge is left untouched.
//!
//! # Usage
//!
//! ## One-time Sweep
//!
//! ```no_run
//! use ascend_engine::{ChallengeEngine, ProgressionService, SystemClock};
//! use ascend_scheduler::Sweeper;
//! use ascend_store::SqliteStore;
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(SqliteStore::new("ascend.db")?);
//! let service = ProgressionService::new(
//!     ChallengeEngine::standard(),
//!     Arc::clone(&store),
//!     Arc::clone(&store),
//!     Arc::clone(&store),
//!     SystemClock,
//! );
//! let mut sweeper = Sweeper::default_config();
//!
//! let metrics = sweeper.sweep(&service)?;
//! println!("{}", metrics.summary());
//! # Ok(())
//! # }
//! ```
//!
//! ## Background Worker
//!
//! See [`SchedulerWorker`].

#![warn(missing_docs)]

mod config;
mod error;
mod metrics;
mod sweeper;
mod worker;

pub use config::SchedulerConfig;
pub use error::SchedulerError;
pub use metrics::SweepMetrics;
pub use sweeper::{evaluate_agent, AgentSweep, SweepResult, Sweeper};
pub use worker::SchedulerWorker;
