//! Common test utilities for integration tests
//!
//! Provides recording fakes for the engine's ports and fixtures shared
//! across integration test files.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rolekeeper::adapters::memory::InMemoryGuildConfigStore;
use rolekeeper::domain::models::{GuildSettings, MemberAuditRecord, MemberUpdate, RoleAction};
use rolekeeper::domain::ports::{AuditEmitter, PlatformError, RoleMutator};

pub const GUILD: &str = "guild-1";
pub const USER: &str = "user-1";
pub const MEMBER_ROLE: &str = "member-role";
pub const AUDIT_CHANNEL: &str = "audit-channel";

/// Setup test logging
///
/// Initializes tracing subscriber for test output.
/// Call this at the beginning of tests that need logging.
pub fn setup_test_logging() {
    use tracing_subscriber::fmt;

    let _ = fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// One call received by [`ScriptedMutator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutatorCall {
    pub action: RoleAction,
    pub guild_id: String,
    pub user_id: String,
    pub role_id: String,
}

/// Role mutator answering from a script, then with `Ok(())` once it runs out.
#[derive(Default)]
pub struct ScriptedMutator {
    responses: Mutex<VecDeque<Result<(), PlatformError>>>,
    fallback: Option<PlatformError>,
    /// Time each call takes before it answers.
    latency: Option<Duration>,
    calls: Mutex<Vec<MutatorCall>>,
}

impl ScriptedMutator {
    /// Accept every call.
    pub fn accepting() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Answer calls in order from `responses`, then accept.
    pub fn scripted(responses: Vec<Result<(), PlatformError>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            ..Default::default()
        })
    }

    /// Accept every call after `latency`.
    pub fn slow(latency: Duration) -> Arc<Self> {
        Arc::new(Self {
            latency: Some(latency),
            ..Default::default()
        })
    }

    /// Fail every call with `err`.
    pub fn failing(err: PlatformError) -> Arc<Self> {
        Arc::new(Self {
            fallback: Some(err),
            ..Default::default()
        })
    }

    pub fn calls(&self) -> Vec<MutatorCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    async fn answer(
        &self,
        action: RoleAction,
        guild_id: &str,
        user_id: &str,
        role_id: &str,
    ) -> Result<(), PlatformError> {
        self.calls.lock().unwrap().push(MutatorCall {
            action,
            guild_id: guild_id.to_string(),
            user_id: user_id.to_string(),
            role_id: role_id.to_string(),
        });
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let scripted = self.responses.lock().unwrap().pop_front();
        if let Some(response) = scripted {
            return response;
        }
        match &self.fallback {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RoleMutator for ScriptedMutator {
    async fn add_member_role(
        &self,
        guild_id: &str,
        user_id: &str,
        role_id: &str,
        _reason: &str,
    ) -> Result<(), PlatformError> {
        self.answer(RoleAction::Grant, guild_id, user_id, role_id).await
    }

    async fn remove_member_role(
        &self,
        guild_id: &str,
        user_id: &str,
        role_id: &str,
        _reason: &str,
    ) -> Result<(), PlatformError> {
        self.answer(RoleAction::Revoke, guild_id, user_id, role_id).await
    }
}

/// Audit emitter keeping every record it receives.
#[derive(Default)]
pub struct RecordingAuditEmitter {
    records: Mutex<Vec<MemberAuditRecord>>,
    /// Time each emit takes before the record is kept.
    latency: Option<Duration>,
}

impl RecordingAuditEmitter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Keep each record only after `latency`.
    pub fn slow(latency: Duration) -> Arc<Self> {
        Arc::new(Self {
            latency: Some(latency),
            ..Default::default()
        })
    }

    pub fn records(&self) -> Vec<MemberAuditRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuditEmitter for RecordingAuditEmitter {
    async fn emit(&self, record: MemberAuditRecord) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.records.lock().unwrap().push(record);
    }
}

/// Store holding [`GUILD`] with [`MEMBER_ROLE`] and, optionally, [`AUDIT_CHANNEL`].
pub async fn guild_store(with_audit_channel: bool) -> Arc<InMemoryGuildConfigStore> {
    let store = InMemoryGuildConfigStore::new();
    store
        .upsert(
            GUILD,
            GuildSettings {
                member_role_id: MEMBER_ROLE.to_string(),
                audit_channel_id: with_audit_channel.then(|| AUDIT_CHANNEL.to_string()),
            },
        )
        .await;
    Arc::new(store)
}

/// Member update for [`GUILD`]/[`USER`] with the given roles.
pub fn member_update(roles: &[&str]) -> MemberUpdate {
    MemberUpdate::new(
        GUILD,
        USER,
        roles.iter().map(|role| (*role).to_string()).collect(),
    )
}

pub fn service_unavailable() -> PlatformError {
    PlatformError::from_status(503, None, "Service Unavailable")
}

pub fn missing_permissions() -> PlatformError {
    PlatformError::from_status(403, Some(50_013), "Missing Permissions")
}
