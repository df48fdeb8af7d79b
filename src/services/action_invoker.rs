//! Action invoker: one grant/revoke attempt against the platform.

use std::sync::Arc;

use crate::domain::errors::ActionError;
use crate::domain::models::{ConvergenceKey, RoleAction};
use crate::domain::ports::{GuildConfigStore, PlatformError, RoleMutator};

/// Result of a single invocation.
pub type ActionResult = Result<(), ActionError>;

/// Issues the platform call for a role action and classifies its failure.
///
/// The role is read from the configuration store at call time, so an attempt
/// always targets the guild's current member role.
#[derive(Clone)]
pub struct ActionInvoker {
    mutator: Arc<dyn RoleMutator>,
    config_store: Arc<dyn GuildConfigStore>,
}

impl ActionInvoker {
    pub fn new(mutator: Arc<dyn RoleMutator>, config_store: Arc<dyn GuildConfigStore>) -> Self {
        Self {
            mutator,
            config_store,
        }
    }

    /// Perform `action` for the member identified by `key`.
    ///
    /// A guild missing from the configuration store is reported as a transient
    /// failure; the run's drift check decides what that means for the goal.
    pub async fn invoke(
        &self,
        action: RoleAction,
        key: &ConvergenceKey,
        reason: &str,
    ) -> ActionResult {
        let Some(settings) = self.config_store.guild_settings(&key.guild_id).await else {
            return Err(ActionError::Transient(PlatformError::Http {
                status: 404,
                code: None,
                message: format!("guild {} is not configured", key.guild_id),
            }));
        };

        let result = match action {
            RoleAction::Grant => {
                self.mutator
                    .add_member_role(&key.guild_id, &key.user_id, &settings.member_role_id, reason)
                    .await
            }
            RoleAction::Revoke => {
                self.mutator
                    .remove_member_role(&key.guild_id, &key.user_id, &settings.member_role_id, reason)
                    .await
            }
        };

        result.map_err(ActionError::from)
    }
}
