//! Audit emitter port.

use async_trait::async_trait;

use crate::domain::models::MemberAuditRecord;

/// Receives a record for every confirmed role change in a guild with auditing enabled.
///
/// Emission is fire-and-forget: implementations log their own failures.
#[async_trait]
pub trait AuditEmitter: Send + Sync {
    async fn emit(&self, record: MemberAuditRecord);
}
