//! Guild configuration port - read-only view of per-guild settings.

use async_trait::async_trait;

use crate::domain::models::GuildSettings;

/// Read access to the settings the engine converges towards.
#[async_trait]
pub trait GuildConfigStore: Send + Sync {
    /// Current settings for the guild, or `None` when the guild is not configured.
    async fn guild_settings(&self, guild_id: &str) -> Option<GuildSettings>;
}
