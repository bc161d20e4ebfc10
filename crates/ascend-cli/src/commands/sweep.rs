//! Sweep command implementation.

use super::App;
use crate::cli::SweepArgs;
use crate::error::Result;
use ascend_scheduler::{SchedulerWorker, Sweeper};
use std::sync::Arc;

/// Execute the sweep command.
///
/// Without flags this is a single pass; `--cycles` and `--watch` hand the
/// service to the background worker.
pub async fn execute_sweep(args: SweepArgs, app: &App) -> Result<String> {
    let mut config = app.config.scheduler.clone();
    config.dry_run |= args.dry_run;

    if args.watch {
        let mut worker = SchedulerWorker::new(config);
        worker.run(Arc::clone(&app.service)).await?;
        return app.formatter.format_metrics(worker.metrics());
    }

    if let Some(cycles) = args.cycles {
        let mut worker = SchedulerWorker::new(config);
        let metrics = worker.run_cycles(Arc::clone(&app.service), cycles).await?;
        return app.formatter.format_metrics(&metrics);
    }

    let mut sweeper = Sweeper::new(config);
    let metrics = sweeper.sweep(app.service.as_ref())?;
    app.formatter.format_metrics(&metrics)
}
