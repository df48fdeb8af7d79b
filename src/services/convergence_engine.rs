//! Convergence engine service.
//!
//! The `ConvergenceEngine` is the entry point for callers that want a member's
//! role changed. It owns:
//!
//! - **Registry** -- at most one live run per (guild, member) key.
//! - **Runs** -- one spawned task per accepted request, see [`ConvergenceRun`].
//! - **Reports** -- a broadcast of every finished run's [`RunReport`].
//!
//! Starting a run is fire-and-forget: `start_convergence` returns as soon as
//! the run is spawned. The returned [`RunHandle`] can be awaited for the
//! outcome or dropped to detach.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::info;
use uuid::Uuid;

use crate::domain::errors::{ConvergenceError, ConvergenceResult};
use crate::domain::models::{
    ConvergenceKey, ConvergenceRequest, EngineConfig, RoleAction, RunReport,
};
use crate::domain::ports::{AuditEmitter, GuildConfigStore, RoleMutator};
use crate::services::action_invoker::ActionInvoker;
use crate::services::convergence_run::{ConvergenceRun, RunContext, RunLimits};
use crate::services::event_router::EventRouter;
use crate::services::registry::{event_slot, Registration, RunRegistry};

// ---------------------------------------------------------------------------
// RunHandle
// ---------------------------------------------------------------------------

/// Handle to a spawned convergence run.
///
/// Dropping the handle detaches the run; it still runs to its terminal outcome.
#[derive(Debug)]
pub struct RunHandle {
    run_id: Uuid,
    key: ConvergenceKey,
    action: RoleAction,
    task: JoinHandle<RunReport>,
}

impl RunHandle {
    pub const fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub const fn key(&self) -> &ConvergenceKey {
        &self.key
    }

    pub const fn action(&self) -> RoleAction {
        self.action
    }

    /// Whether the run has reached a terminal outcome.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the run's terminal outcome.
    pub async fn outcome(self) -> ConvergenceResult<RunReport> {
        self.task
            .await
            .map_err(|err| ConvergenceError::RunAborted(err.to_string()))
    }
}

// ---------------------------------------------------------------------------
// ConvergenceEngine
// ---------------------------------------------------------------------------

/// Starts and deduplicates convergence runs.
pub struct ConvergenceEngine {
    registry: RunRegistry,
    invoker: ActionInvoker,
    config_store: Arc<dyn GuildConfigStore>,
    audit_emitter: Option<Arc<dyn AuditEmitter>>,
    reports: broadcast::Sender<RunReport>,
    config: EngineConfig,
}

impl ConvergenceEngine {
    /// Create a new engine over the given platform and configuration store.
    pub fn new(
        mutator: Arc<dyn RoleMutator>,
        config_store: Arc<dyn GuildConfigStore>,
        config: EngineConfig,
    ) -> Self {
        let (reports, _) = broadcast::channel(config.report_channel_capacity.max(1));
        Self {
            registry: RunRegistry::new(),
            invoker: ActionInvoker::new(mutator, config_store.clone()),
            config_store,
            audit_emitter: None,
            reports,
            config,
        }
    }

    /// Emit audit records for confirmed changes in guilds with an audit channel.
    pub fn with_audit_emitter(mut self, emitter: Arc<dyn AuditEmitter>) -> Self {
        self.audit_emitter = Some(emitter);
        self
    }

    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub const fn registry(&self) -> &RunRegistry {
        &self.registry
    }

    /// Router delivering member updates to this engine's live runs.
    pub fn router(&self) -> EventRouter {
        EventRouter::new(self.registry.clone())
    }

    /// Subscribe to reports of runs finishing after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<RunReport> {
        self.reports.subscribe()
    }

    /// Whether a run is live for `key`.
    pub fn is_running(&self, key: &ConvergenceKey) -> bool {
        self.registry.is_active(key)
    }

    /// Number of live runs.
    pub fn active_runs(&self) -> usize {
        self.registry.active_count()
    }

    /// Resolve a request's limits against the engine defaults.
    pub fn resolve_limits(&self, request: &ConvergenceRequest) -> ConvergenceResult<RunLimits> {
        let limits = RunLimits {
            max_tries: request.max_tries.unwrap_or(self.config.default_max_tries),
            period: request.period.unwrap_or_else(|| self.config.default_period()),
            timeout: request.timeout.unwrap_or_else(|| self.config.default_timeout()),
        };

        if limits.max_tries == 0 {
            return Err(ConvergenceError::InvalidRequest(
                "max_tries must be at least 1".to_string(),
            ));
        }
        if limits.period == Duration::ZERO {
            return Err(ConvergenceError::InvalidRequest(
                "period must be greater than zero".to_string(),
            ));
        }
        if limits.timeout == Duration::ZERO {
            return Err(ConvergenceError::InvalidRequest(
                "timeout must be greater than zero".to_string(),
            ));
        }

        Ok(limits)
    }

    /// Start converging a member towards the requested role state.
    ///
    /// Returns once the run is spawned. A request for a key that already has a
    /// live run is rejected with [`ConvergenceError::AlreadyInProgress`]; the
    /// live run is not affected.
    pub async fn start_convergence(
        &self,
        request: ConvergenceRequest,
    ) -> ConvergenceResult<RunHandle> {
        let limits = self.resolve_limits(&request)?;
        let ConvergenceRequest {
            key,
            action,
            reason,
            avatar_url,
            ..
        } = request;

        let settings = self
            .config_store
            .guild_settings(&key.guild_id)
            .await
            .ok_or_else(|| ConvergenceError::UnknownGuild(key.guild_id.clone()))?;

        let run_id = Uuid::new_v4();
        let (sink, events) = event_slot();
        if !self.registry.try_start(&key, run_id, sink) {
            info!(
                guild_id = %key.guild_id,
                user_id = %key.user_id,
                action = %action,
                "ignoring request, pending change already in progress"
            );
            return Err(ConvergenceError::AlreadyInProgress(key));
        }

        let registration = Registration::new(self.registry.clone(), key.clone(), run_id);
        let run = ConvergenceRun::new(
            run_id,
            key.clone(),
            action,
            reason,
            avatar_url,
            limits,
            settings.member_role_id,
            events,
            registration,
            RunContext {
                invoker: self.invoker.clone(),
                config_store: self.config_store.clone(),
                audit_emitter: self.audit_emitter.clone(),
                mismatch_policy: self.config.mismatch_policy,
                reports: self.reports.clone(),
            },
        );

        let task = tokio::spawn(run.run());
        Ok(RunHandle {
            run_id,
            key,
            action,
            task,
        })
    }
}
