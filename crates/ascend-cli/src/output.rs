//! Output formatting for the CLI.

use crate::config::OutputFormat;
use crate::error::Result;
use ascend_domain::{
    AgentId, AgentProgressionProfile, Challenge, ChallengeHistoryRecord, ReferralCounts,
    TierCatalog,
};
use ascend_engine::{
    ChallengeOutcome, ChallengeStatusReport, CommissionBreakdown, Evaluation, FailureResolution,
    HistorySummary,
};
use ascend_scheduler::SweepMetrics;
use colored::*;
use serde_json::{json, Value};
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};

/// Output formatter.
pub struct Formatter {
    format: OutputFormat,
    color_enabled: bool,
}

/// Render cents as dollars.
pub fn format_cents(cents: u64) -> String {
    format!("${}.{:02}", cents / 100, cents % 100)
}

fn challenge_json(challenge: &Challenge) -> Value {
    json!({
        "id": challenge.id.to_string(),
        "agent_id": challenge.agent_id.as_str(),
        "target_tier": challenge.target_tier.as_str(),
        "start_date": challenge.start_date,
        "end_date": challenge.end_date,
        "starting_referral_count": challenge.starting_referral_count,
        "original_baseline": challenge.original_baseline,
        "required_referrals": challenge.required_referrals,
        "counting_rule": challenge.counting_rule_snapshot.as_str(),
        "attempt_number": challenge.attempt_number,
        "max_count_reached": challenge.max_count_reached,
        "status": challenge.status.as_str(),
    })
}

fn profile_json(profile: &AgentProgressionProfile) -> Value {
    json!({
        "agent_id": profile.agent_id.as_str(),
        "current_tier": profile.current_tier.as_str(),
        "total_direct_referrals": profile.total_direct_referrals,
        "total_level1_indirect_referrals": profile.total_level1_indirect_referrals,
        "reset_attempts_used": profile.reset_attempts_used,
        "cooldown_until": profile.cooldown_until,
        "active_challenge": profile.active_challenge.as_ref().map(challenge_json),
        "version": profile.version,
    })
}

fn record_json(record: &ChallengeHistoryRecord) -> Value {
    json!({
        "challenge_id": record.challenge_id.to_string(),
        "agent_id": record.agent_id.as_str(),
        "target_tier": record.target_tier.as_str(),
        "start_date": record.start_date,
        "end_date": record.end_date,
        "closed_at": record.closed_at,
        "attempt_number": record.attempt_number,
        "starting_referral_count": record.starting_referral_count,
        "final_referral_count": record.final_referral_count,
        "peak_referral_count": record.peak_referral_count,
        "required_referrals": record.required_referrals,
        "result": record.result.as_str(),
        "commission_earned_on_success": record.commission_earned_on_success,
        "tier_held_at_time": record.tier_held_at_time.as_str(),
    })
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(format: OutputFormat, color_enabled: bool) -> Self {
        Self {
            format,
            color_enabled,
        }
    }

    /// Format a profile.
    pub fn format_profile(&self, profile: &AgentProgressionProfile) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(&profile_json(profile))?),
            OutputFormat::Quiet => Ok(profile.current_tier.as_str().to_string()),
            OutputFormat::Table => {
                let challenge = profile
                    .active_challenge
                    .as_ref()
                    .map(|c| format!("{} → {}", c.id, c.target_tier.display_name()))
                    .unwrap_or_else(|| "-".to_string());
                let cooldown = profile
                    .cooldown_until
                    .map(|t| t.to_string())
                    .unwrap_or_else(|| "-".to_string());
                Ok(self.fields(vec![
                    ("Agent", profile.agent_id.to_string()),
                    ("Tier", profile.current_tier.display_name().to_string()),
                    ("Direct referrals", profile.total_direct_referrals.to_string()),
                    (
                        "Level-1 referrals",
                        profile.total_level1_indirect_referrals.to_string(),
                    ),
                    ("Active challenge", challenge),
                    ("Resets used", profile.reset_attempts_used.to_string()),
                    ("Cooldown until", cooldown),
                ]))
            }
        }
    }

    /// Format a list of profiles.
    pub fn format_profiles(&self, profiles: &[AgentProgressionProfile]) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let values: Vec<Value> = profiles.iter().map(profile_json).collect();
                Ok(serde_json::to_string_pretty(&values)?)
            }
            OutputFormat::Quiet => Ok(profiles
                .iter()
                .map(|p| p.agent_id.to_string())
                .collect::<Vec<_>>()
                .join("\n")),
            OutputFormat::Table => {
                if profiles.is_empty() {
                    return Ok(self.colorize("No agents enrolled.", "yellow"));
                }
                let mut builder = Builder::default();
                builder.push_record(["Agent", "Tier", "Direct", "Level-1", "Challenge"]);
                for profile in profiles {
                    let target = profile
                        .active_challenge
                        .as_ref()
                        .map(|c| c.target_tier.display_name())
                        .unwrap_or("-");
                    builder.push_record([
                        profile.agent_id.as_str(),
                        profile.current_tier.display_name(),
                        &profile.total_direct_referrals.to_string(),
                        &profile.total_level1_indirect_referrals.to_string(),
                        target,
                    ]);
                }
                Ok(self.table(builder))
            }
        }
    }

    /// Format a newly started challenge.
    pub fn format_challenge(&self, challenge: &Challenge) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(&challenge_json(challenge))?),
            OutputFormat::Quiet => Ok(challenge.id.to_string()),
            OutputFormat::Table => {
                let header = self.success(&format!(
                    "Challenge started: {} → {}",
                    challenge.agent_id,
                    challenge.target_tier.display_name()
                ));
                let table = self.fields(vec![
                    ("Challenge", challenge.id.to_string()),
                    ("Counting", challenge.counting_rule_snapshot.to_string()),
                    ("Baseline", challenge.starting_referral_count.to_string()),
                    ("Required", challenge.required_referrals.to_string()),
                    ("Attempt", challenge.attempt_number.to_string()),
                    ("Ends at", challenge.end_date.to_string()),
                ]);
                Ok(format!("{}\n{}", header, table))
            }
        }
    }

    /// Format the outcome of an evaluation.
    pub fn format_evaluation(&self, evaluation: &Evaluation) -> Result<String> {
        let outcome = &evaluation.outcome;
        match self.format {
            OutputFormat::Json => {
                let mut value = json!({
                    "status": outcome.status().as_str(),
                    "record": evaluation.record.as_ref().map(record_json),
                });
                match outcome {
                    ChallengeOutcome::InProgress(progress) => {
                        value["progress"] = json!({
                            "current": progress.current_progress,
                            "required": progress.required_referrals,
                            "percent_complete": progress.percent_complete,
                            "on_track": progress.on_track,
                        });
                    }
                    ChallengeOutcome::Succeeded {
                        promoted_to,
                        next_challenge,
                        ..
                    } => {
                        value["promoted_to"] = json!(promoted_to.as_str());
                        value["next_challenge"] = json!(next_challenge.as_ref().map(challenge_json));
                    }
                    ChallengeOutcome::Failed { resolution, .. } => {
                        value["resolution"] = match resolution {
                            FailureResolution::Reset(reset) => {
                                json!({ "reset": challenge_json(reset) })
                            }
                            FailureResolution::Demoted {
                                held,
                                cooldown_until,
                            } => json!({
                                "demoted": { "held": held.as_str(), "cooldown_until": cooldown_until }
                            }),
                            FailureResolution::Closed => json!("closed"),
                        };
                    }
                    ChallengeOutcome::Expired { .. } => {}
                }
                Ok(serde_json::to_string_pretty(&value)?)
            }
            OutputFormat::Quiet => Ok(outcome.status().as_str().to_string()),
            OutputFormat::Table => Ok(match outcome {
                ChallengeOutcome::InProgress(progress) => self.info(&format!(
                    "{} → {}: {}/{} ({:.1}%), {} to go{}",
                    progress.challenge_id,
                    progress.target_tier.display_name(),
                    progress.current_progress,
                    progress.required_referrals,
                    progress.percent_complete,
                    progress.referrals_needed,
                    if progress.on_track { "" } else { ", behind pace" }
                )),
                ChallengeOutcome::Succeeded {
                    promoted_to,
                    next_challenge,
                    ..
                } => {
                    let mut msg =
                        self.success(&format!("Promoted to {}", promoted_to.display_name()));
                    if let Some(next) = next_challenge {
                        msg.push('\n');
                        msg.push_str(&self.info(&format!(
                            "Next challenge: {} ({} referrals by {})",
                            next.target_tier.display_name(),
                            next.required_referrals,
                            next.end_date
                        )));
                    }
                    msg
                }
                ChallengeOutcome::Failed { closed, resolution } => match resolution {
                    FailureResolution::Reset(reset) => self.warning(&format!(
                        "{} missed; reset attempt {} opened, {} more referrals by {}",
                        closed.target_tier.display_name(),
                        reset.attempt_number,
                        reset.required_referrals,
                        reset.end_date
                    )),
                    FailureResolution::Demoted {
                        held,
                        cooldown_until,
                    } => self.error(&format!(
                        "{} missed with resets exhausted; stays {}{}",
                        closed.target_tier.display_name(),
                        held.display_name(),
                        cooldown_until
                            .map(|t| format!(", next challenge after {}", t))
                            .unwrap_or_default()
                    )),
                    FailureResolution::Closed => self.warning(&format!(
                        "{} missed; a new challenge may start now",
                        closed.target_tier.display_name()
                    )),
                },
                ChallengeOutcome::Expired { closed } => {
                    self.warning(&format!("Challenge {} expired", closed.id))
                }
            }),
        }
    }

    /// Format a challenge status report.
    pub fn format_status(&self, report: &ChallengeStatusReport) -> Result<String> {
        let progress = &report.progress;
        match self.format {
            OutputFormat::Json => {
                let value = json!({
                    "challenge_id": progress.challenge_id.to_string(),
                    "target_tier": progress.target_tier.as_str(),
                    "counting_rule": report.counting_rule.as_str(),
                    "current_progress": progress.current_progress,
                    "required_referrals": progress.required_referrals,
                    "percent_complete": progress.percent_complete,
                    "referrals_needed": progress.referrals_needed,
                    "on_track": progress.on_track,
                    "start_date": report.start_date,
                    "end_date": report.end_date,
                    "time_remaining": {
                        "days": report.days_remaining,
                        "hours": report.hours_remaining,
                        "minutes": report.minutes_remaining,
                    },
                    "attempt_number": report.attempt_number,
                    "attempts_used": report.attempts_used,
                    "max_attempts": report.max_attempts,
                    "attempts_remaining": report.attempts_remaining,
                    "next_reset_baseline": report.next_reset_baseline,
                    "extended_window": report.extended_window,
                    "overdue": report.overdue,
                });
                Ok(serde_json::to_string_pretty(&value)?)
            }
            OutputFormat::Quiet => Ok(format!("{:.1}", progress.percent_complete)),
            OutputFormat::Table => {
                let mut rows = vec![
                    ("Target", progress.target_tier.display_name().to_string()),
                    ("Counting", report.counting_rule.to_string()),
                    (
                        "Progress",
                        format!(
                            "{}/{} ({:.1}%)",
                            progress.current_progress,
                            progress.required_referrals,
                            progress.percent_complete
                        ),
                    ),
                    ("Still needed", progress.referrals_needed.to_string()),
                    (
                        "On track",
                        if progress.on_track { "yes" } else { "no" }.to_string(),
                    ),
                    (
                        "Time left",
                        format!(
                            "{}d {}h {}m",
                            report.days_remaining, report.hours_remaining, report.minutes_remaining
                        ),
                    ),
                    (
                        "Attempt",
                        match report.attempts_remaining {
                            Some(left) => format!(
                                "{} ({} before demotion)",
                                report.attempt_number, left
                            ),
                            None => report.attempt_number.to_string(),
                        },
                    ),
                ];
                if let Some(baseline) = report.next_reset_baseline {
                    rows.push(("Reset baseline", baseline.to_string()));
                }
                if report.extended_window {
                    rows.push(("Window", "extended reset window".to_string()));
                }
                if report.overdue {
                    rows.push(("Overdue", self.colorize("closes on next evaluation", "red")));
                }
                Ok(self.fields(rows))
            }
        }
    }

    /// Format closed challenges.
    pub fn format_history(&self, records: &[ChallengeHistoryRecord]) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let values: Vec<Value> = records.iter().map(record_json).collect();
                Ok(serde_json::to_string_pretty(&values)?)
            }
            OutputFormat::Quiet => Ok(records
                .iter()
                .map(|r| r.challenge_id.to_string())
                .collect::<Vec<_>>()
                .join("\n")),
            OutputFormat::Table => {
                if records.is_empty() {
                    return Ok(self.colorize("No closed challenges.", "yellow"));
                }
                let mut builder = Builder::default();
                builder.push_record([
                    "Challenge", "Target", "Attempt", "Start", "Final", "Peak", "Required",
                    "Result", "Held",
                ]);
                for record in records {
                    let id = record.challenge_id.to_string();
                    builder.push_record([
                        &id[..id.len().min(8)],
                        record.target_tier.display_name(),
                        &record.attempt_number.to_string(),
                        &record.starting_referral_count.to_string(),
                        &record.final_referral_count.to_string(),
                        &record.peak_referral_count.to_string(),
                        &record.required_referrals.to_string(),
                        record.result.as_str(),
                        record.tier_held_at_time.display_name(),
                    ]);
                }
                Ok(self.table(builder))
            }
        }
    }

    /// Format history totals.
    pub fn format_summary(&self, summary: &HistorySummary) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(&json!({
                "attempts": summary.attempts,
                "successes": summary.successes,
                "failures": summary.failures,
                "expiries": summary.expiries,
                "reset_attempts": summary.reset_attempts,
                "success_rate": summary.success_rate(),
            }))?),
            OutputFormat::Quiet => Ok(summary.attempts.to_string()),
            OutputFormat::Table => Ok(self.fields(vec![
                ("Attempts", summary.attempts.to_string()),
                ("Successes", summary.successes.to_string()),
                ("Failures", summary.failures.to_string()),
                ("Expired", summary.expiries.to_string()),
                ("Reset attempts", summary.reset_attempts.to_string()),
                ("Success rate", format!("{:.0}%", summary.success_rate() * 100.0)),
            ])),
        }
    }

    /// Format the tier catalog.
    pub fn format_tiers(&self, catalog: &TierCatalog) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let values: Vec<Value> = catalog
                    .tiers()
                    .iter()
                    .map(|t| {
                        json!({
                            "name": t.name.as_str(),
                            "order": t.order,
                            "required_referrals": t.required_referrals,
                            "commission_rate": t.commission_rate,
                            "withdrawal_multiplier": t.withdrawal_multiplier,
                            "challenge_window_days": t.challenge_window_days,
                            "reset_window_days": t.reset_window_days,
                            "counting_rule": t.counting_rule.as_str(),
                            "daily_target": t.daily_target(),
                            "achievability": t.achievability().as_str(),
                        })
                    })
                    .collect();
                Ok(serde_json::to_string_pretty(&values)?)
            }
            OutputFormat::Quiet => Ok(catalog
                .tiers()
                .iter()
                .map(|t| t.name.as_str())
                .collect::<Vec<_>>()
                .join("\n")),
            OutputFormat::Table => {
                let mut builder = Builder::default();
                builder.push_record([
                    "Tier", "Required", "Rate", "Withdrawals", "Window", "Counting", "Per day",
                    "Pace",
                ]);
                for tier in catalog.tiers() {
                    let window = match tier.reset_window_days {
                        Some(reset) => format!("{}d ({}d reset)", tier.challenge_window_days, reset),
                        None => format!("{}d", tier.challenge_window_days),
                    };
                    builder.push_record([
                        tier.name.display_name(),
                        &tier.required_referrals.to_string(),
                        &format!("{}%", tier.commission_rate),
                        &format!("{}x", tier.withdrawal_multiplier),
                        &window,
                        tier.counting_rule.as_str(),
                        &tier.daily_target().to_string(),
                        tier.achievability().as_str(),
                    ]);
                }
                Ok(self.table(builder))
            }
        }
    }

    /// Format a period earnings breakdown.
    pub fn format_commission(&self, breakdown: &CommissionBreakdown) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(&json!({
                "flat_bonus_cents": breakdown.flat_bonus_cents,
                "tier_bonus_cents": breakdown.tier_bonus_cents,
                "total_cents": breakdown.total_cents,
                "commission_rate": breakdown.commission_rate,
                "withdrawal_allowance": breakdown.withdrawal_allowance,
                "events": {
                    "direct": breakdown.event_counts[0],
                    "level2": breakdown.event_counts[1],
                    "level3": breakdown.event_counts[2],
                },
            }))?),
            OutputFormat::Quiet => Ok(breakdown.total_cents.to_string()),
            OutputFormat::Table => Ok(self.fields(vec![
                (
                    "Referral events",
                    format!(
                        "{} direct / {} level-2 / {} level-3",
                        breakdown.event_counts[0], breakdown.event_counts[1], breakdown.event_counts[2]
                    ),
                ),
                ("Flat bonus", format_cents(breakdown.flat_bonus_cents)),
                (
                    "Tier bonus",
                    format!(
                        "{} ({}%)",
                        format_cents(breakdown.tier_bonus_cents),
                        breakdown.commission_rate
                    ),
                ),
                ("Total", format_cents(breakdown.total_cents)),
                ("Withdrawals", breakdown.withdrawal_allowance.to_string()),
            ])),
        }
    }

    /// Format updated referral counts.
    pub fn format_counts(&self, agent_id: &AgentId, counts: &ReferralCounts) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(&json!({
                "agent_id": agent_id.as_str(),
                "direct": counts.direct,
                "level1_indirect": counts.level1_indirect,
            }))?),
            OutputFormat::Quiet => Ok(format!("{} {}", counts.direct, counts.level1_indirect)),
            OutputFormat::Table => Ok(self.success(&format!(
                "{} now has {} direct and {} level-1 referrals",
                agent_id, counts.direct, counts.level1_indirect
            ))),
        }
    }

    /// Format sweep metrics.
    pub fn format_metrics(&self, metrics: &SweepMetrics) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let promoted: serde_json::Map<String, Value> = metrics
                    .promoted
                    .iter()
                    .map(|(tier, n)| (tier.as_str().to_string(), json!(n)))
                    .collect();
                Ok(serde_json::to_string_pretty(&json!({
                    "sweep_count": metrics.sweep_count,
                    "evaluated": metrics.evaluated,
                    "still_active": metrics.still_active,
                    "promoted": promoted,
                    "resets": metrics.resets,
                    "demotions": metrics.demotions,
                    "closed": metrics.closed,
                    "stale_retries": metrics.stale_retries,
                    "skipped_unavailable": metrics.skipped_unavailable,
                    "errors": metrics.errors,
                    "total_runtime_ms": metrics.total_runtime_ms,
                }))?)
            }
            OutputFormat::Quiet => Ok(metrics.evaluated.to_string()),
            OutputFormat::Table => Ok(metrics.summary()),
        }
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        self.colorize(&format!("✓ {}", message), "green")
    }

    /// Format an error message.
    pub fn error(&self, message: &str) -> String {
        self.colorize(&format!("✗ {}", message), "red")
    }

    /// Format an info message.
    pub fn info(&self, message: &str) -> String {
        self.colorize(&format!("ℹ {}", message), "blue")
    }

    /// Format a warning message.
    pub fn warning(&self, message: &str) -> String {
        self.colorize(&format!("⚠ {}", message), "yellow")
    }

    /// Two-column field/value table.
    fn fields(&self, rows: Vec<(&str, String)>) -> String {
        let mut builder = Builder::default();
        builder.push_record(["Field", "Value"]);
        for (field, value) in rows {
            builder.push_record([field, value.as_str()]);
        }
        self.table(builder)
    }

    fn table(&self, builder: Builder) -> String {
        let mut table = builder.build();
        table
            .with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()));
        table.to_string()
    }

    /// Colorize text if color is enabled.
    fn colorize(&self, text: &str, color: &str) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match color {
            "red" => text.red().to_string(),
            "green" => text.green().to_string(),
            "blue" => text.blue().to_string(),
            "yellow" => text.yellow().to_string(),
            _ => text.to_string(),
        }
    }
}
