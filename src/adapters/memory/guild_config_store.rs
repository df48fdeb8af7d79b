//! In-memory guild configuration store.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::models::{GuildConfig, GuildSettings};
use crate::domain::ports::GuildConfigStore;

/// Guild settings held in memory, seeded from configuration and mutable at runtime.
#[derive(Debug, Clone, Default)]
pub struct InMemoryGuildConfigStore {
    guilds: Arc<RwLock<HashMap<String, GuildSettings>>>,
}

impl InMemoryGuildConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a store from the `guilds` section of the configuration.
    pub fn from_config(guilds: &[GuildConfig]) -> Self {
        let map = guilds
            .iter()
            .map(|guild| {
                (
                    guild.id.clone(),
                    GuildSettings {
                        member_role_id: guild.member_role_id.clone(),
                        audit_channel_id: guild.audit_channel_id.clone(),
                    },
                )
            })
            .collect();
        Self {
            guilds: Arc::new(RwLock::new(map)),
        }
    }

    /// Insert or replace a guild's settings.
    pub async fn upsert(&self, guild_id: impl Into<String>, settings: GuildSettings) {
        self.guilds.write().await.insert(guild_id.into(), settings);
    }

    /// Change a guild's member role. Returns false when the guild is unknown.
    pub async fn set_member_role(&self, guild_id: &str, role_id: impl Into<String>) -> bool {
        match self.guilds.write().await.get_mut(guild_id) {
            Some(settings) => {
                settings.member_role_id = role_id.into();
                true
            }
            None => false,
        }
    }

    /// Forget a guild entirely.
    pub async fn remove(&self, guild_id: &str) -> Option<GuildSettings> {
        self.guilds.write().await.remove(guild_id)
    }
}

#[async_trait]
impl GuildConfigStore for InMemoryGuildConfigStore {
    async fn guild_settings(&self, guild_id: &str) -> Option<GuildSettings> {
        self.guilds.read().await.get(guild_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_from_config_seeds_guilds() {
        let store = InMemoryGuildConfigStore::from_config(&[GuildConfig {
            id: "g".to_string(),
            member_role_id: "member".to_string(),
            audit_channel_id: Some("audit".to_string()),
        }]);

        let settings = store.guild_settings("g").await.unwrap();
        assert_eq!(settings.member_role_id, "member");
        assert_eq!(settings.audit_channel_id.as_deref(), Some("audit"));
        assert!(store.guild_settings("other").await.is_none());
    }

    #[tokio::test]
    async fn test_set_member_role() {
        let store = InMemoryGuildConfigStore::new();
        assert!(!store.set_member_role("g", "new").await);

        store
            .upsert(
                "g",
                GuildSettings {
                    member_role_id: "old".to_string(),
                    audit_channel_id: None,
                },
            )
            .await;
        assert!(store.set_member_role("g", "new").await);
        assert_eq!(store.guild_settings("g").await.unwrap().member_role_id, "new");
    }

    #[tokio::test]
    async fn test_remove_guild() {
        let store = InMemoryGuildConfigStore::new();
        store
            .upsert(
                "g",
                GuildSettings {
                    member_role_id: "member".to_string(),
                    audit_channel_id: None,
                },
            )
            .await;

        assert!(store.remove("g").await.is_some());
        assert!(store.guild_settings("g").await.is_none());
    }
}
