//! Configuration for scheduled evaluation
//!
//! Defines the sweep interval, retry budget for stale writes, and how many
//! agents are evaluated side by side.

use crate::SchedulerError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the evaluation scheduler
///
/// # Examples
///
/// ```
/// use ascend_scheduler::SchedulerConfig;
///
/// // Default configuration (hourly)
/// let config = SchedulerConfig::default();
/// assert_eq!(config.sweep_interval_minutes, 60);
///
/// // Frequent sweeps
/// let config = SchedulerConfig::aggressive();
/// assert_eq!(config.sweep_interval_minutes, 15);
///
/// // Infrequent sweeps
/// let config = SchedulerConfig::lenient();
/// assert_eq!(config.sweep_interval_minutes, 240);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// How often to evaluate every active challenge (in minutes)
    /// Default: Every 60 minutes (hourly)
    #[serde(default = "default_interval")]
    pub sweep_interval_minutes: u64,

    /// Re-runs of one agent's evaluation after a stale write
    /// Default: 3
    #[serde(default = "default_retries")]
    pub max_stale_retries: u32,

    /// Agents evaluated concurrently by the background worker
    /// Default: 8
    #[serde(default = "default_parallel")]
    pub max_parallel_agents: usize,

    /// Dry-run mode: evaluate and log outcomes without saving anything
    /// Default: false
    #[serde(default)]
    pub dry_run: bool,
}

fn default_interval() -> u64 {
    60
}

fn default_retries() -> u32 {
    3
}

fn default_parallel() -> usize {
    8
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            sweep_interval_minutes: default_interval(),
            max_stale_retries: default_retries(),
            max_parallel_agents: default_parallel(),
            dry_run: false,
        }
    }
}

impl SchedulerConfig {
    /// Frequent sweeps with a larger retry budget
    ///
    /// Suitable when agents expect promotions to show up within minutes.
    pub fn aggressive() -> Self {
        Self {
            sweep_interval_minutes: 15,
            max_stale_retries: 5,
            max_parallel_agents: 16,
            dry_run: false,
        }
    }

    /// Infrequent sweeps, light on the database
    pub fn lenient() -> Self {
        Self {
            sweep_interval_minutes: 240,
            max_stale_retries: 2,
            max_parallel_agents: 4,
            dry_run: false,
        }
    }

    /// Get sweep interval as Duration
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_minutes * 60)
    }

    /// Reject values the worker cannot run with
    pub fn validate(&self) -> Result<(), SchedulerError> {
        if self.sweep_interval_minutes == 0 {
            return Err(SchedulerError::Config(
                "sweep_interval_minutes must be at least 1".to_string(),
            ));
        }
        if self.max_parallel_agents == 0 {
            return Err(SchedulerError::Config(
                "max_parallel_agents must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SchedulerConfig::default();
        assert_eq!(config.sweep_interval_minutes, 60);
        assert_eq!(config.max_stale_retries, 3);
        assert_eq!(config.max_parallel_agents, 8);
        assert!(!config.dry_run);
    }

    #[test]
    fn test_presets() {
        assert!(
            SchedulerConfig::aggressive().sweep_interval()
                < SchedulerConfig::default().sweep_interval()
        );
        assert!(
            SchedulerConfig::lenient().sweep_interval() > SchedulerConfig::default().sweep_interval()
        );
    }

    #[test]
    fn test_duration_conversion() {
        let config = SchedulerConfig::default();
        assert_eq!(config.sweep_interval(), Duration::from_secs(60 * 60));
    }

    #[test]
    fn test_validate() {
        assert!(SchedulerConfig::default().validate().is_ok());
        let zero = SchedulerConfig {
            sweep_interval_minutes: 0,
            ..Default::default()
        };
        assert!(matches!(zero.validate(), Err(SchedulerError::Config(_))));
    }

    #[test]
    fn test_serde_roundtrip() {
        let config = SchedulerConfig::lenient();
        let serialized = serde_json::to_string(&config).unwrap();
        let deserialized: SchedulerConfig = serde_json::from_str(&serialized).unwrap();
        assert_eq!(config, deserialized);

        let partial: SchedulerConfig = serde_json::from_str(r#"{"dry_run": true}"#).unwrap();
        assert!(partial.dry_run);
        assert_eq!(partial.max_stale_retries, 3);
    }
}
