//! Background worker for continuous challenge evaluation

use crate::sweeper::evaluate_agent;
use crate::{SchedulerConfig, SchedulerError, Sweeper, SweepMetrics};
use ascend_domain::traits::{Clock, HistoryRepository, ProfileRepository, ReferralCounter};
use ascend_engine::ProgressionService;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{interval, Duration};

/// Background worker that sweeps active challenges on a schedule
///
/// Agents are split into at most `max_parallel_agents` batches, each
/// evaluated on tokio's blocking pool. An agent lands in exactly one batch,
/// so no two evaluations of the same agent run side by side here; writers in
/// other processes are caught by the profile version check.
///
/// # Examples
///
/// ```no_run
/// use ascend_engine::{ChallengeEngine, ProgressionService, SystemClock};
/// use ascend_scheduler::{SchedulerConfig, SchedulerWorker};
/// use ascend_store::SqliteStore;
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = Arc::new(SqliteStore::new("ascend.db")?);
///     let service = Arc::new(ProgressionService::new(
///         ChallengeEngine::standard(),
///         Arc::clone(&store),
///         Arc::clone(&store),
///         Arc::clone(&store),
///         SystemClock,
///     ));
///     let mut worker = SchedulerWorker::new(SchedulerConfig::default());
///
///     // Run indefinitely (until Ctrl+C)
///     worker.run(service).await?;
///     Ok(())
/// }
/// ```
pub struct SchedulerWorker {
    sweeper: Sweeper,
    interval: Duration,
}

impl SchedulerWorker {
    /// Create a new background worker with the given configuration
    pub fn new(config: SchedulerConfig) -> Self {
        let interval = config.sweep_interval();
        Self {
            sweeper: Sweeper::new(config),
            interval,
        }
    }

    /// Create a worker with default configuration
    pub fn default_config() -> Self {
        Self::new(SchedulerConfig::default())
    }

    /// Metrics gathered so far
    pub fn metrics(&self) -> &SweepMetrics {
        self.sweeper.metrics()
    }

    /// Run the worker indefinitely
    ///
    /// Sweeps at the configured interval until a shutdown signal (Ctrl+C) is
    /// received. A failed sweep is logged and the next tick tries again.
    pub async fn run<P, H, R, C>(
        &mut self,
        service: Arc<ProgressionService<P, H, R, C>>,
    ) -> Result<(), SchedulerError>
    where
        P: ProfileRepository + Send + Sync + 'static,
        H: HistoryRepository + Send + Sync + 'static,
        R: ReferralCounter + Send + Sync + 'static,
        C: Clock + Send + Sync + 'static,
    {
        self.sweeper.config().validate()?;
        let mut ticker = interval(self.interval);

        tracing::info!("Scheduler worker started (interval: {:?})", self.interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    tracing::debug!("Starting sweep cycle");

                    match self.sweep_parallel(&service).await {
                        Ok(metrics) => {
                            tracing::info!(
                                "Sweep completed: {} evaluated, {} promoted, {} reset, {} demoted",
                                metrics.evaluated,
                                metrics.total_promoted(),
                                metrics.resets,
                                metrics.demotions
                            );
                        }
                        Err(e) => {
                            tracing::error!("Sweep failed: {}", e);
                        }
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Shutdown signal received, stopping scheduler");
                    break;
                }
            }
        }

        tracing::info!("Scheduler stopped. Final metrics:\n{}", self.metrics().summary());

        Ok(())
    }

    /// Run for a specific number of cycles, then return the metrics
    pub async fn run_cycles<P, H, R, C>(
        &mut self,
        service: Arc<ProgressionService<P, H, R, C>>,
        cycles: usize,
    ) -> Result<SweepMetrics, SchedulerError>
    where
        P: ProfileRepository + Send + Sync + 'static,
        H: HistoryRepository + Send + Sync + 'static,
        R: ReferralCounter + Send + Sync + 'static,
        C: Clock + Send + Sync + 'static,
    {
        self.sweeper.config().validate()?;
        let mut ticker = interval(self.interval);

        tracing::info!(
            "Scheduler worker started for {} cycles (interval: {:?})",
            cycles,
            self.interval
        );

        for cycle in 0..cycles {
            ticker.tick().await;

            tracing::debug!("Starting sweep cycle {}/{}", cycle + 1, cycles);

            let metrics = self.sweep_parallel(&service).await?;
            tracing::info!(
                "Sweep {}/{} completed: {} evaluated, {} promoted",
                cycle + 1,
                cycles,
                metrics.evaluated,
                metrics.total_promoted()
            );
        }

        Ok(self.metrics().clone())
    }

    async fn sweep_parallel<P, H, R, C>(
        &mut self,
        service: &Arc<ProgressionService<P, H, R, C>>,
    ) -> Result<SweepMetrics, SchedulerError>
    where
        P: ProfileRepository + Send + Sync + 'static,
        H: HistoryRepository + Send + Sync + 'static,
        R: ReferralCounter + Send + Sync + 'static,
        C: Clock + Send + Sync + 'static,
    {
        let start = Instant::now();

        let lister = Arc::clone(service);
        let agents = tokio::task::spawn_blocking(move || lister.agents_with_active_challenge())
            .await
            .map_err(|e| SchedulerError::Worker(e.to_string()))??;

        let batches = self.sweeper.config().max_parallel_agents.max(1);
        let batch_size = agents.len().div_ceil(batches).max(1);

        let mut handles = Vec::with_capacity(batches);
        for batch in agents.chunks(batch_size) {
            let batch = batch.to_vec();
            let service = Arc::clone(service);
            let config = self.sweeper.config().clone();
            handles.push(tokio::task::spawn_blocking(move || {
                batch
                    .iter()
                    .map(|agent_id| evaluate_agent(service.as_ref(), agent_id, &config))
                    .collect::<Vec<_>>()
            }));
        }

        for handle in handles {
            let results = handle
                .await
                .map_err(|e| SchedulerError::Worker(e.to_string()))?;
            for result in &results {
                self.sweeper.record(result);
            }
        }

        Ok(self.sweeper.finish(start.elapsed()))
    }
}
