//! Referral tracking and commission commands.

use super::App;
use crate::cli::{CommissionArgs, RecordReferralsArgs};
use crate::error::{CliError, Result};
use ascend_domain::AgentId;

/// Execute the record-referrals command.
pub fn execute_record_referrals(args: RecordReferralsArgs, app: &App) -> Result<String> {
    if args.direct == 0 && args.level1 == 0 {
        return Err(CliError::InvalidInput(
            "nothing to record: pass --direct and/or --level1".to_string(),
        ));
    }
    let id = AgentId::new(args.agent);
    let counts = app.store.add_referrals(&id, args.direct, args.level1)?;
    tracing::info!(
        agent_id = %id,
        direct = counts.direct,
        level1 = counts.level1_indirect,
        "Referrals recorded"
    );
    app.formatter.format_counts(&id, &counts)
}

/// Execute the commission command.
pub fn execute_commission(args: CommissionArgs, app: &App) -> Result<String> {
    let breakdown = app.service.period_earnings_from_counts(
        &AgentId::new(args.agent),
        [args.direct, args.level2, args.level3],
        args.network_earnings,
    )?;
    app.formatter.format_commission(&breakdown)
}
