//! Simulated chat platform with eventually-consistent member roles.
//!
//! Accepted role changes are published as [`MemberUpdate`]s after a
//! propagation delay, the way a gateway would. A [`FaultScript`] injects the
//! failure modes the convergence engine exists for: transient errors,
//! accepted-but-never-applied requests, and authorization refusals.

use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

use crate::domain::models::MemberUpdate;
use crate::domain::ports::{PlatformError, RoleMutator};

/// Buffer of the simulated gateway's member update stream.
const UPDATE_STREAM_CAPACITY: usize = 64;

/// Failure injection for [`SimulatedPlatform`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FaultScript {
    /// The first N calls fail with a 503.
    pub fail_first: u32,
    /// The next N calls are accepted but never applied.
    pub ignore_first: u32,
    /// Every call is refused with 403 / missing permissions.
    pub forbidden: bool,
    /// Delay between applying a change and publishing the member update.
    pub propagation_delay: Duration,
}

type MemberKey = (String, String);

/// In-process stand-in for the platform's member role API and gateway.
#[derive(Clone)]
pub struct SimulatedPlatform {
    members: Arc<Mutex<HashMap<MemberKey, BTreeSet<String>>>>,
    script: FaultScript,
    calls: Arc<AtomicU32>,
    updates: mpsc::Sender<MemberUpdate>,
}

impl SimulatedPlatform {
    /// Create a platform and the receiving end of its member update stream.
    pub fn new(script: FaultScript) -> (Self, mpsc::Receiver<MemberUpdate>) {
        let (updates, rx) = mpsc::channel(UPDATE_STREAM_CAPACITY);
        let platform = Self {
            members: Arc::new(Mutex::new(HashMap::new())),
            script,
            calls: Arc::new(AtomicU32::new(0)),
            updates,
        };
        (platform, rx)
    }

    fn members(&self) -> MutexGuard<'_, HashMap<MemberKey, BTreeSet<String>>> {
        self.members
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Set a member's roles directly, without publishing an update.
    pub fn set_member_roles(&self, guild_id: &str, user_id: &str, roles: &[&str]) {
        self.members().insert(
            (guild_id.to_string(), user_id.to_string()),
            roles.iter().map(|role| (*role).to_string()).collect(),
        );
    }

    /// Current roles of a member.
    pub fn member_roles(&self, guild_id: &str, user_id: &str) -> Vec<String> {
        self.members()
            .get(&(guild_id.to_string(), user_id.to_string()))
            .map(|roles| roles.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of role calls received so far.
    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    async fn apply(
        &self,
        guild_id: &str,
        user_id: &str,
        role_id: &str,
        grant: bool,
    ) -> Result<(), PlatformError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;

        if self.script.forbidden {
            return Err(PlatformError::from_status(
                403,
                Some(50_013),
                "Missing Permissions",
            ));
        }
        if call <= self.script.fail_first {
            return Err(PlatformError::from_status(503, None, "Service Unavailable"));
        }
        if call - self.script.fail_first <= self.script.ignore_first {
            debug!(call, "simulated platform accepted role change without applying it");
            return Ok(());
        }

        let roles = {
            let mut members = self.members();
            let roles = members
                .entry((guild_id.to_string(), user_id.to_string()))
                .or_default();
            let changed = if grant {
                roles.insert(role_id.to_string())
            } else {
                roles.remove(role_id)
            };
            if !changed {
                return Ok(());
            }
            roles.iter().cloned().collect::<Vec<_>>()
        };

        let update = MemberUpdate::new(guild_id, user_id, roles);
        let updates = self.updates.clone();
        let delay = self.script.propagation_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Gateway consumer gone: nothing left to notify.
            let _ = updates.send(update).await;
        });

        Ok(())
    }
}

#[async_trait]
impl RoleMutator for SimulatedPlatform {
    async fn add_member_role(
        &self,
        guild_id: &str,
        user_id: &str,
        role_id: &str,
        _reason: &str,
    ) -> Result<(), PlatformError> {
        self.apply(guild_id, user_id, role_id, true).await
    }

    async fn remove_member_role(
        &self,
        guild_id: &str,
        user_id: &str,
        role_id: &str,
        _reason: &str,
    ) -> Result<(), PlatformError> {
        self.apply(guild_id, user_id, role_id, false).await
    }
}
