//! Convergence run: the retry loop for one member and one desired role state.
//!
//! A run makes its first attempt immediately, then one per period tick, and
//! listens for member updates in between. It stops at the first of:
//!
//! - a member update showing the desired state (`Confirmed`)
//! - the attempt budget running out (`RetryBudgetExhausted`)
//! - the deadline elapsing (`DeadlineExceeded`)
//! - the guild's member role changing under it (`TargetConfigurationChanged`)
//! - the platform refusing on authorization grounds (`PermanentActionError`)
//! - a mismatching member update under [`MismatchPolicy::Terminate`]
//!
//! The run is the only writer of its own state. The loop has a single exit,
//! after which the timer is dropped, the event slot closed and the registry
//! entry removed, in that order. The audit record for a confirmed run is
//! emitted only after teardown, so a slow emitter never holds the key.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tokio::time::{interval_at, sleep_until, Instant, MissedTickBehavior};
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::domain::models::{
    ConvergenceKey, MemberAuditRecord, MemberUpdate, MismatchPolicy, Outcome, RoleAction,
    RunReport,
};
use crate::domain::ports::{AuditEmitter, GuildConfigStore};
use crate::services::action_invoker::ActionInvoker;
use crate::services::registry::{EventStream, Registration};

/// Resolved limits for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunLimits {
    /// Maximum number of mutation attempts (at least 1).
    pub max_tries: u32,
    /// Delay between attempts.
    pub period: Duration,
    /// Overall deadline, measured from the start of the run.
    pub timeout: Duration,
}

/// Collaborators shared by every run of an engine.
#[derive(Clone)]
pub struct RunContext {
    pub invoker: ActionInvoker,
    pub config_store: Arc<dyn GuildConfigStore>,
    pub audit_emitter: Option<Arc<dyn AuditEmitter>>,
    pub mismatch_policy: MismatchPolicy,
    pub reports: broadcast::Sender<RunReport>,
}

/// State of one convergence run.
pub struct ConvergenceRun {
    run_id: Uuid,
    key: ConvergenceKey,
    action: RoleAction,
    reason: String,
    avatar_url: Option<String>,
    limits: RunLimits,
    /// Member role id captured when the run started.
    target_role_id: String,
    /// Attempts made so far. Never exceeds `limits.max_tries`.
    attempts: u32,
    last_error: Option<String>,
    started_at: DateTime<Utc>,
    deadline: Instant,
    events: EventStream,
    registration: Registration,
    context: RunContext,
}

impl ConvergenceRun {
    /// Create a run for a key the caller has already claimed in the registry.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        run_id: Uuid,
        key: ConvergenceKey,
        action: RoleAction,
        reason: String,
        avatar_url: Option<String>,
        limits: RunLimits,
        target_role_id: String,
        events: EventStream,
        registration: Registration,
        context: RunContext,
    ) -> Self {
        Self {
            run_id,
            key,
            action,
            reason,
            avatar_url,
            limits,
            target_role_id,
            attempts: 0,
            last_error: None,
            started_at: Utc::now(),
            deadline: Instant::now() + limits.timeout,
            events,
            registration,
            context,
        }
    }

    pub const fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Drive the run to its terminal outcome and tear it down.
    pub async fn run(mut self) -> RunReport {
        let span = info_span!(
            "convergence_run",
            run_id = %self.run_id,
            guild_id = %self.key.guild_id,
            user_id = %self.key.user_id,
            role_id = %self.target_role_id,
            action = %self.action,
            reason = %self.reason,
        );

        async move {
            info!(
                max_tries = self.limits.max_tries,
                period_ms = self.limits.period.as_millis() as u64,
                timeout_ms = self.limits.timeout.as_millis() as u64,
                "starting convergence run"
            );
            let outcome = self.drive().await;
            self.finish(outcome).await
        }
        .instrument(span)
        .await
    }

    async fn drive(&mut self) -> Outcome {
        // First attempt happens before the ticker starts.
        if let Some(outcome) = self.attempt().await {
            return outcome;
        }

        let mut ticker = interval_at(Instant::now() + self.limits.period, self.limits.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let deadline = sleep_until(self.deadline);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                biased;

                () = &mut deadline => {
                    warn!(retry = self.attempts, "deadline exceeded before confirmation");
                    return Outcome::DeadlineExceeded;
                }
                Ok(()) = self.events.changed() => {
                    let update = self.events.borrow_and_update().clone();
                    if let Some(outcome) = update.and_then(|update| self.confirm(update)) {
                        return outcome;
                    }
                }
                _ = ticker.tick() => {
                    if let Some(outcome) = self.attempt().await {
                        return outcome;
                    }
                }
            }
        }
    }

    /// One pass of the attempt procedure. Returns the terminal outcome, if any.
    async fn attempt(&mut self) -> Option<Outcome> {
        if self.attempts >= self.limits.max_tries {
            error!(retry = self.attempts, "reached max retries, terminating convergence run");
            return Some(Outcome::RetryBudgetExhausted);
        }

        let live_role_id = self
            .context
            .config_store
            .guild_settings(&self.key.guild_id)
            .await
            .map(|settings| settings.member_role_id);
        if live_role_id.as_deref() != Some(self.target_role_id.as_str()) {
            info!(
                old_role_id = %self.target_role_id,
                new_role_id = ?live_role_id,
                "member role changed, terminating convergence run"
            );
            return Some(Outcome::TargetConfigurationChanged);
        }

        self.attempts += 1;
        info!(retry = self.attempts, "attempting to {} role", self.action);

        match self
            .context
            .invoker
            .invoke(self.action, &self.key, &self.reason)
            .await
        {
            Ok(()) => {
                debug!(retry = self.attempts, "role change accepted, awaiting member update");
                None
            }
            Err(err) if err.is_permanent() => {
                error!(retry = self.attempts, error = %err, "platform refused role change, cancelling retries");
                self.last_error = Some(err.to_string());
                Some(Outcome::PermanentActionError)
            }
            Err(err) => {
                warn!(retry = self.attempts, error = %err, "role change attempt failed");
                self.last_error = Some(err.to_string());
                None
            }
        }
    }

    /// Handle a member update for this run's key.
    fn confirm(&self, update: MemberUpdate) -> Option<Outcome> {
        if self
            .action
            .is_satisfied_by(&update.roles, &self.target_role_id)
        {
            info!(retry = self.attempts, "member update confirms role change");
            return Some(Outcome::Confirmed);
        }

        match self.context.mismatch_policy {
            MismatchPolicy::Terminate => {
                warn!(
                    retry = self.attempts,
                    roles = ?update.roles,
                    "member update does not show the role change, terminating convergence run"
                );
                Some(Outcome::UnconfirmedMemberUpdate)
            }
            MismatchPolicy::Ignore => {
                debug!(roles = ?update.roles, "ignoring mismatching member update");
                None
            }
        }
    }

    /// Tear down the run, emit its audit record and publish its report.
    async fn finish(self, outcome: Outcome) -> RunReport {
        let Self {
            run_id,
            key,
            action,
            reason,
            avatar_url,
            limits,
            target_role_id,
            attempts,
            last_error,
            started_at,
            events,
            registration,
            context,
            ..
        } = self;

        drop(events);
        drop(registration);

        if outcome == Outcome::Confirmed {
            context
                .emit_audit(&key, action, avatar_url, reason.clone())
                .await;
        }

        let report = RunReport {
            run_id,
            key,
            action,
            reason,
            target_role_id,
            outcome,
            attempts,
            max_tries: limits.max_tries,
            last_error,
            started_at,
            finished_at: Utc::now(),
        };

        if outcome.is_failure() {
            warn!(outcome = %outcome, retry = report.attempts, "convergence run finished");
        } else {
            info!(outcome = %outcome, retry = report.attempts, "convergence run finished");
        }

        // No subscribers is fine: the handle still carries the report.
        let _ = context.reports.send(report.clone());
        report
    }
}

impl RunContext {
    /// Emit the audit record for a confirmed change, if the guild has an audit
    /// channel configured at this moment.
    async fn emit_audit(
        &self,
        key: &ConvergenceKey,
        action: RoleAction,
        avatar_url: Option<String>,
        reason: String,
    ) {
        let Some(emitter) = self.audit_emitter.as_ref() else {
            return;
        };
        let channel_id = self
            .config_store
            .guild_settings(&key.guild_id)
            .await
            .and_then(|settings| settings.audit_channel_id);
        let Some(channel_id) = channel_id else {
            return;
        };

        emitter
            .emit(MemberAuditRecord {
                channel_id,
                guild_id: key.guild_id.clone(),
                action,
                user_id: key.user_id.clone(),
                avatar_url,
                reason,
            })
            .await;
    }
}
