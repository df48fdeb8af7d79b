//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines the async trait interfaces the convergence engine consumes:
//! - RoleMutator: grant/revoke calls against the chat platform
//! - GuildConfigStore: per-guild target role and audit settings
//! - AuditEmitter: audit records for confirmed changes
//!
//! These traits keep the engine independent of any concrete platform client.

pub mod audit_emitter;
pub mod errors;
pub mod guild_config_store;
pub mod role_mutator;

pub use audit_emitter::AuditEmitter;
pub use errors::PlatformError;
pub use guild_config_store::GuildConfigStore;
pub use role_mutator::RoleMutator;
