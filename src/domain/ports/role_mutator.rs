//! Role mutator port - interface to the chat platform's member role endpoints.

use async_trait::async_trait;

use super::errors::PlatformError;

/// Issues member role changes against the chat platform.
///
/// Both calls are idempotent on the platform side: adding a role the member
/// already holds, or removing one they lack, succeeds without effect.
/// Success only means the platform accepted the request, not that the change
/// is visible yet.
#[async_trait]
pub trait RoleMutator: Send + Sync {
    /// Add `role_id` to the member.
    async fn add_member_role(
        &self,
        guild_id: &str,
        user_id: &str,
        role_id: &str,
        reason: &str,
    ) -> Result<(), PlatformError>;

    /// Remove `role_id` from the member.
    async fn remove_member_role(
        &self,
        guild_id: &str,
        user_id: &str,
        role_id: &str,
        reason: &str,
    ) -> Result<(), PlatformError>;
}
