//! Event router: delivers member updates from the platform's event stream to
//! the live convergence run for the same member.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::domain::models::MemberUpdate;
use crate::services::registry::RunRegistry;

/// Routes member updates to live runs. Updates without a live run are dropped.
#[derive(Debug, Clone)]
pub struct EventRouter {
    registry: RunRegistry,
}

impl EventRouter {
    pub const fn new(registry: RunRegistry) -> Self {
        Self { registry }
    }

    /// Route one member update. Returns whether a live run received it.
    ///
    /// Most updates have no run waiting for them; that is the steady state,
    /// not an error.
    pub fn on_member_update(&self, update: MemberUpdate) -> bool {
        let key = update.key();
        let delivered = self.registry.dispatch(&key, update);
        if delivered {
            debug!(key = %key, "member update delivered to convergence run");
        }
        delivered
    }

    /// Route every update from `updates` until the stream closes.
    ///
    /// Returns the number of updates delivered to a live run.
    pub async fn pump(self, mut updates: mpsc::Receiver<MemberUpdate>) -> u64 {
        let mut delivered = 0u64;
        while let Some(update) = updates.recv().await {
            if self.on_member_update(update) {
                delivered += 1;
            }
        }
        info!(delivered, "member update stream closed");
        delivered
    }

    /// Spawn [`pump`](Self::pump) on the current runtime.
    pub fn spawn(self, updates: mpsc::Receiver<MemberUpdate>) -> JoinHandle<u64> {
        tokio::spawn(self.pump(updates))
    }
}
