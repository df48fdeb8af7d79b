//! Role change domain models.
//!
//! A role change converges one guild member towards holding (or not holding)
//! the guild's configured member role.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Identifies at most one in-flight convergence run: a guild scope plus a member.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConvergenceKey {
    /// Guild (scope) the role lives in.
    pub guild_id: String,
    /// Member whose roles are being changed.
    pub user_id: String,
}

impl ConvergenceKey {
    pub fn new(guild_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            guild_id: guild_id.into(),
            user_id: user_id.into(),
        }
    }
}

impl std::fmt::Display for ConvergenceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.guild_id, self.user_id)
    }
}

/// Desired end state for the member's role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleAction {
    /// The member should hold the role.
    Grant,
    /// The member should not hold the role.
    Revoke,
}

impl RoleAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Grant => "grant",
            Self::Revoke => "revoke",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "grant" | "add" => Some(Self::Grant),
            "revoke" | "remove" => Some(Self::Revoke),
            _ => None,
        }
    }

    /// Human-readable label used in audit records.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Grant => "Grant role",
            Self::Revoke => "Revoke role",
        }
    }

    /// Whether a member holding `roles` is in the state this action asks for.
    pub fn is_satisfied_by<S: AsRef<str>>(&self, roles: &[S], target_role_id: &str) -> bool {
        let holds_role = roles.iter().any(|role| role.as_ref() == target_role_id);
        match self {
            Self::Grant => holds_role,
            Self::Revoke => !holds_role,
        }
    }
}

impl std::fmt::Display for RoleAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of a member's roles, as delivered by the platform's event stream.
///
/// This is the confirmation signal: the engine only trusts a role change once
/// a member update shows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberUpdate {
    pub guild_id: String,
    pub user_id: String,
    /// Full role set of the member after the change.
    pub roles: Vec<String>,
}

impl MemberUpdate {
    pub fn new(
        guild_id: impl Into<String>,
        user_id: impl Into<String>,
        roles: Vec<String>,
    ) -> Self {
        Self {
            guild_id: guild_id.into(),
            user_id: user_id.into(),
            roles,
        }
    }

    pub fn key(&self) -> ConvergenceKey {
        ConvergenceKey::new(self.guild_id.clone(), self.user_id.clone())
    }
}

/// Per-guild settings read from the configuration store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildSettings {
    /// Role the engine grants or revokes. May change over the guild's lifetime.
    pub member_role_id: String,
    /// Channel that receives audit records, if auditing is enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audit_channel_id: Option<String>,
}

/// Record handed to the audit emitter once a change is confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberAuditRecord {
    pub channel_id: String,
    pub guild_id: String,
    pub action: RoleAction,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    pub reason: String,
}

/// A request to converge one member to one desired role state.
#[derive(Debug, Clone)]
pub struct ConvergenceRequest {
    pub key: ConvergenceKey,
    pub action: RoleAction,
    pub reason: String,
    /// Avatar reference forwarded to the audit record.
    pub avatar_url: Option<String>,
    /// Maximum number of mutation attempts. Engine default when `None`.
    pub max_tries: Option<u32>,
    /// Delay between attempts. Engine default when `None`.
    pub period: Option<Duration>,
    /// Overall deadline for the run. Engine default when `None`.
    pub timeout: Option<Duration>,
}

impl ConvergenceRequest {
    pub fn new(key: ConvergenceKey, action: RoleAction, reason: impl Into<String>) -> Self {
        Self {
            key,
            action,
            reason: reason.into(),
            avatar_url: None,
            max_tries: None,
            period: None,
            timeout: None,
        }
    }

    pub fn grant(key: ConvergenceKey, reason: impl Into<String>) -> Self {
        Self::new(key, RoleAction::Grant, reason)
    }

    pub fn revoke(key: ConvergenceKey, reason: impl Into<String>) -> Self {
        Self::new(key, RoleAction::Revoke, reason)
    }

    pub fn with_avatar_url(mut self, avatar_url: impl Into<String>) -> Self {
        self.avatar_url = Some(avatar_url.into());
        self
    }

    pub const fn with_max_tries(mut self, max_tries: u32) -> Self {
        self.max_tries = Some(max_tries);
        self
    }

    pub const fn with_period(mut self, period: Duration) -> Self {
        self.period = Some(period);
        self
    }

    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_display() {
        let key = ConvergenceKey::new("guild", "user");
        assert_eq!(key.to_string(), "guild-user");
    }

    #[test]
    fn test_action_from_str() {
        assert_eq!(RoleAction::from_str("grant"), Some(RoleAction::Grant));
        assert_eq!(RoleAction::from_str("ADD"), Some(RoleAction::Grant));
        assert_eq!(RoleAction::from_str("revoke"), Some(RoleAction::Revoke));
        assert_eq!(RoleAction::from_str("remove"), Some(RoleAction::Revoke));
        assert_eq!(RoleAction::from_str("kick"), None);
    }

    #[test]
    fn test_grant_satisfied_only_when_role_held() {
        let roles = vec!["a".to_string(), "member".to_string()];
        assert!(RoleAction::Grant.is_satisfied_by(&roles, "member"));
        assert!(!RoleAction::Grant.is_satisfied_by(&roles, "other"));
        assert!(!RoleAction::Grant.is_satisfied_by::<String>(&[], "member"));
    }

    #[test]
    fn test_revoke_satisfied_only_when_role_absent() {
        let roles = vec!["a".to_string(), "member".to_string()];
        assert!(!RoleAction::Revoke.is_satisfied_by(&roles, "member"));
        assert!(RoleAction::Revoke.is_satisfied_by(&roles, "other"));
        assert!(RoleAction::Revoke.is_satisfied_by::<String>(&[], "member"));
    }

    #[test]
    fn test_member_update_key() {
        let update = MemberUpdate::new("g", "u", vec![]);
        assert_eq!(update.key(), ConvergenceKey::new("g", "u"));
    }

    #[test]
    fn test_request_builder() {
        let request = ConvergenceRequest::grant(ConvergenceKey::new("g", "u"), "joined")
            .with_max_tries(3)
            .with_period(Duration::from_millis(10))
            .with_avatar_url("https://cdn/avatar.png");

        assert_eq!(request.action, RoleAction::Grant);
        assert_eq!(request.reason, "joined");
        assert_eq!(request.max_tries, Some(3));
        assert_eq!(request.period, Some(Duration::from_millis(10)));
        assert_eq!(request.timeout, None);
        assert_eq!(request.avatar_url.as_deref(), Some("https://cdn/avatar.png"));
    }
}
