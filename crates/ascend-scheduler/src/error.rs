//! Error types for scheduler operations

use ascend_engine::EngineError;
use thiserror::Error;

/// Errors that can occur while sweeping active challenges
#[derive(Error, Debug)]
pub enum SchedulerError {
    /// Engine or storage error that stopped the whole sweep
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Worker error (tokio runtime issues)
    #[error("Worker error: {0}")]
    Worker(String),
}
