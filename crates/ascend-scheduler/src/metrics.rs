//! Metrics collection for sweep operations

use ascend_domain::TierName;
use std::collections::HashMap;

/// Metrics collected across sweeps
///
/// Tracks evaluation outcomes, retries, and skipped agents.
#[derive(Debug, Clone, Default)]
pub struct SweepMetrics {
    /// Agents evaluated (including skipped ones)
    pub evaluated: usize,

    /// Challenges still running after evaluation
    pub still_active: usize,

    /// Promotions per newly held tier
    pub promoted: HashMap<TierName, usize>,

    /// Reset attempts opened
    pub resets: usize,

    /// Cycles demoted after exhausting resets
    pub demotions: usize,

    /// Failures with no reset policy
    pub closed: usize,

    /// Agents skipped because referral counts were unavailable
    pub skipped_unavailable: usize,

    /// Evaluations re-run after a stale write
    pub stale_retries: usize,

    /// Agents whose evaluation errored
    pub errors: usize,

    /// Total sweep iterations completed
    pub sweep_count: usize,

    /// Total runtime in milliseconds
    pub total_runtime_ms: u64,
}

impl SweepMetrics {
    /// Create new empty metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a promotion
    pub fn record_promotion(&mut self, to: TierName) {
        *self.promoted.entry(to).or_insert(0) += 1;
    }

    /// Record a sweep cycle completion
    pub fn record_sweep(&mut self, runtime_ms: u64) {
        self.sweep_count += 1;
        self.total_runtime_ms += runtime_ms;
    }

    /// Get total promotions across all tiers
    pub fn total_promoted(&self) -> usize {
        self.promoted.values().sum()
    }

    /// Reset all metrics
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Generate a summary report of metrics
    pub fn summary(&self) -> String {
        let mut lines = vec![
            "Sweep Metrics Summary".to_string(),
            "=====================".to_string(),
            format!("Sweep cycles: {}", self.sweep_count),
            format!("Total runtime: {}ms", self.total_runtime_ms),
            format!("Agents evaluated: {}", self.evaluated),
            format!("Still active: {}", self.still_active),
            String::new(),
        ];

        if !self.promoted.is_empty() {
            lines.push("Promotions to tier:".to_string());
            let mut promoted: Vec<_> = self.promoted.iter().collect();
            promoted.sort_by_key(|(tier, _)| tier.rank());
            for (tier, count) in promoted {
                lines.push(format!("  {}: {}", tier.display_name(), count));
            }
            lines.push(format!("  Total: {}", self.total_promoted()));
            lines.push(String::new());
        }

        lines.push(format!("Resets opened: {}", self.resets));
        lines.push(format!("Demotions: {}", self.demotions));
        lines.push(format!("Closed without reset: {}", self.closed));
        lines.push(format!("Stale-write retries: {}", self.stale_retries));
        lines.push(format!("Skipped (counts unavailable): {}", self.skipped_unavailable));
        lines.push(format!("Errors: {}", self.errors));

        lines.join("\n")
    }
}
