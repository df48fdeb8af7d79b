//! `rolekeeper simulate`: one convergence run against the simulated platform.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::adapters::memory::{FaultScript, InMemoryGuildConfigStore, SimulatedPlatform};
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::{
    Config, ConvergenceKey, ConvergenceRequest, GuildSettings, MismatchPolicy, RoleAction,
    RunReport,
};
use crate::domain::ports::GuildConfigStore;
use crate::infrastructure::logging::AuditLogger;
use crate::services::ConvergenceEngine;

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Guild the member belongs to
    #[arg(short, long, default_value = "guild")]
    pub guild: String,

    /// Member to converge
    #[arg(short, long, default_value = "member")]
    pub user: String,

    /// Desired change: grant or revoke
    #[arg(short, long, default_value = "grant", value_parser = parse_action)]
    pub action: RoleAction,

    /// Member role for a guild missing from the configuration
    #[arg(long, default_value = "member-role")]
    pub role: String,

    /// Audit channel for a guild missing from the configuration
    #[arg(long)]
    pub audit_channel: Option<String>,

    /// Reason attached to the change and its audit record
    #[arg(short, long, default_value = "simulated membership change")]
    pub reason: String,

    /// Avatar shown in the audit record
    #[arg(long)]
    pub avatar_url: Option<String>,

    /// Attempt budget (engine default when unset)
    #[arg(long)]
    pub max_tries: Option<u32>,

    /// Delay between attempts in milliseconds (engine default when unset)
    #[arg(long)]
    pub period_ms: Option<u64>,

    /// Overall deadline in milliseconds (engine default when unset)
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Fail the first N platform calls with a 503
    #[arg(long, default_value = "0")]
    pub fail_first: u32,

    /// Accept the next N platform calls without applying them
    #[arg(long, default_value = "0")]
    pub ignore_first: u32,

    /// Refuse every platform call with 403
    #[arg(long)]
    pub forbidden: bool,

    /// Delay before an applied change shows up as a member update
    #[arg(long, default_value = "50")]
    pub propagation_ms: u64,

    /// Keep retrying through member updates that do not show the change
    #[arg(long)]
    pub ignore_mismatch: bool,
}

fn parse_action(value: &str) -> Result<RoleAction, String> {
    RoleAction::from_str(value)
        .ok_or_else(|| format!("unknown action '{value}', expected grant or revoke"))
}

#[derive(Debug, Serialize)]
pub struct SimulateOutput {
    pub report: RunReport,
    pub platform_calls: u32,
    pub final_roles: Vec<String>,
}

impl CommandOutput for SimulateOutput {
    fn to_human(&self) -> String {
        let report = &self.report;
        let mut lines = vec![format!("Convergence run {}", report.run_id)];
        lines.push(format!("  Member:         {}", report.key));
        lines.push(format!(
            "  Action:         {} ({})",
            report.action.label(),
            report.target_role_id
        ));
        lines.push(format!("  Outcome:        {}", report.outcome));
        lines.push(format!(
            "  Attempts:       {}/{}",
            report.attempts, report.max_tries
        ));
        if let Some(ref err) = report.last_error {
            lines.push(format!("  Last error:     {err}"));
        }
        lines.push(format!("  Platform calls: {}", self.platform_calls));
        lines.push(format!("  Final roles:    [{}]", self.final_roles.join(", ")));
        lines.push(format!("  Duration:       {}ms", report.duration_ms()));
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

pub async fn execute(args: SimulateArgs, config: &Config, json_mode: bool) -> Result<()> {
    let store = InMemoryGuildConfigStore::from_config(&config.guilds);
    let settings = match store.guild_settings(&args.guild).await {
        Some(settings) => settings,
        None => {
            let settings = GuildSettings {
                member_role_id: args.role.clone(),
                audit_channel_id: args.audit_channel.clone(),
            };
            store.upsert(args.guild.clone(), settings.clone()).await;
            settings
        }
    };

    let (platform, updates) = SimulatedPlatform::new(FaultScript {
        fail_first: args.fail_first,
        ignore_first: args.ignore_first,
        forbidden: args.forbidden,
        propagation_delay: Duration::from_millis(args.propagation_ms),
    });
    if args.action == RoleAction::Revoke {
        platform.set_member_roles(&args.guild, &args.user, &[settings.member_role_id.as_str()]);
    }

    let audit = AuditLogger::from_path(config.audit.log_path.as_deref())
        .await
        .context("Failed to open audit log")?;

    let mut engine_config = config.engine.clone();
    if args.ignore_mismatch {
        engine_config = engine_config.with_mismatch_policy(MismatchPolicy::Ignore);
    }

    let engine = ConvergenceEngine::new(Arc::new(platform.clone()), Arc::new(store), engine_config)
        .with_audit_emitter(Arc::new(audit));
    let pump = engine.router().spawn(updates);

    let mut request = ConvergenceRequest::new(
        ConvergenceKey::new(args.guild.clone(), args.user.clone()),
        args.action,
        args.reason,
    );
    if let Some(avatar_url) = args.avatar_url {
        request = request.with_avatar_url(avatar_url);
    }
    if let Some(max_tries) = args.max_tries {
        request = request.with_max_tries(max_tries);
    }
    if let Some(period_ms) = args.period_ms {
        request = request.with_period(Duration::from_millis(period_ms));
    }
    if let Some(timeout_ms) = args.timeout_ms {
        request = request.with_timeout(Duration::from_millis(timeout_ms));
    }

    let report = engine
        .start_convergence(request)
        .await
        .context("Failed to start convergence run")?
        .outcome()
        .await?;
    pump.abort();

    let out = SimulateOutput {
        platform_calls: platform.call_count(),
        final_roles: platform.member_roles(&args.guild, &args.user),
        report,
    };
    output(&out, json_mode);
    Ok(())
}
