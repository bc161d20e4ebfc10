//! Enrollment and challenge lifecycle commands.

use super::App;
use crate::cli::{AgentArgs, EvaluateArgs};
use crate::error::{CliError, Result};
use ascend_domain::AgentId;

fn agent_id(raw: &str) -> Result<AgentId> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(CliError::InvalidInput("agent id must not be empty".to_string()));
    }
    Ok(AgentId::new(trimmed))
}

/// Execute the enroll command.
pub fn execute_enroll(args: AgentArgs, app: &App) -> Result<String> {
    let profile = app.service.enroll(&agent_id(&args.agent)?)?;
    app.formatter.format_profile(&profile)
}

/// Execute the start command.
pub fn execute_start(args: AgentArgs, app: &App) -> Result<String> {
    let challenge = app.service.start_challenge(&agent_id(&args.agent)?)?;
    app.formatter.format_challenge(&challenge)
}

/// Execute the evaluate command.
pub fn execute_evaluate(args: EvaluateArgs, app: &App) -> Result<String> {
    let id = agent_id(&args.agent)?;
    let evaluation = if args.dry_run {
        app.service.preview_evaluation(&id)?
    } else {
        app.service.evaluate(&id)?
    };
    app.formatter.format_evaluation(&evaluation)
}

/// Execute the expire command.
pub fn execute_expire(args: AgentArgs, app: &App) -> Result<String> {
    let evaluation = app.service.expire(&agent_id(&args.agent)?)?;
    app.formatter.format_evaluation(&evaluation)
}

/// Execute the status command.
pub fn execute_status(args: AgentArgs, app: &App) -> Result<String> {
    let report = app.service.status(&agent_id(&args.agent)?)?;
    app.formatter.format_status(&report)
}

/// Execute the show command.
pub fn execute_show(args: AgentArgs, app: &App) -> Result<String> {
    let profile = app.service.profile(&agent_id(&args.agent)?)?;
    app.formatter.format_profile(&profile)
}

/// Execute the agents command.
pub fn execute_agents(app: &App) -> Result<String> {
    let profiles = app.store.list_profiles()?;
    app.formatter.format_profiles(&profiles)
}
