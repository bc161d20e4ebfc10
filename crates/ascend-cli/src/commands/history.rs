//! History command implementation.

use super::App;
use crate::cli::HistoryArgs;
use crate::error::Result;
use ascend_domain::AgentId;

/// Execute the history command.
pub fn execute_history(args: HistoryArgs, app: &App) -> Result<String> {
    let id = AgentId::new(args.agent);
    if args.summary {
        let summary = app.service.history_summary(&id)?;
        return app.formatter.format_summary(&summary);
    }
    let records = app.service.history(&id)?;
    app.formatter.format_history(&records)
}
