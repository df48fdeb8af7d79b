//! Terminal outcomes of a convergence run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::role_change::{ConvergenceKey, RoleAction};

/// Why a convergence run stopped. Every run ends with exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// A member update showed the member in the desired state.
    Confirmed,
    /// Every allowed attempt was made without confirmation.
    RetryBudgetExhausted,
    /// The run's deadline elapsed before confirmation.
    DeadlineExceeded,
    /// The guild's target role changed (or vanished) while the run was in flight.
    TargetConfigurationChanged,
    /// The platform refused the change on authorization grounds.
    PermanentActionError,
    /// A member update arrived that did not show the desired state, and the
    /// mismatch policy says to stop on any update.
    UnconfirmedMemberUpdate,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Confirmed => "confirmed",
            Self::RetryBudgetExhausted => "retry_budget_exhausted",
            Self::DeadlineExceeded => "deadline_exceeded",
            Self::TargetConfigurationChanged => "target_configuration_changed",
            Self::PermanentActionError => "permanent_action_error",
            Self::UnconfirmedMemberUpdate => "unconfirmed_member_update",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Confirmed)
    }

    /// Outcomes that mean the change did not happen for a reason worth alerting on.
    ///
    /// A changed target is not a failure: the goal itself went away.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::RetryBudgetExhausted | Self::DeadlineExceeded | Self::PermanentActionError
        )
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observable summary of a finished convergence run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub key: ConvergenceKey,
    pub action: RoleAction,
    pub reason: String,
    /// Role id captured when the run started.
    pub target_role_id: String,
    pub outcome: Outcome,
    /// Number of mutation attempts made. Never exceeds `max_tries`.
    pub attempts: u32,
    pub max_tries: u32,
    /// Last error returned by the platform, if any attempt failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    /// Wall-clock duration of the run in milliseconds.
    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_classification() {
        assert!(Outcome::Confirmed.is_success());
        assert!(!Outcome::Confirmed.is_failure());
        assert!(Outcome::RetryBudgetExhausted.is_failure());
        assert!(Outcome::DeadlineExceeded.is_failure());
        assert!(Outcome::PermanentActionError.is_failure());
        assert!(!Outcome::TargetConfigurationChanged.is_failure());
        assert!(!Outcome::UnconfirmedMemberUpdate.is_failure());
    }

    #[test]
    fn test_outcome_serializes_snake_case() {
        let json = serde_json::to_string(&Outcome::RetryBudgetExhausted).unwrap();
        assert_eq!(json, "\"retry_budget_exhausted\"");
        assert_eq!(Outcome::DeadlineExceeded.to_string(), "deadline_exceeded");
    }
}
