//! Domain models for membership role convergence.

pub mod config;
pub mod outcome;
pub mod role_change;

pub use config::{AuditConfig, Config, EngineConfig, GuildConfig, LoggingConfig, MismatchPolicy};
pub use outcome::{Outcome, RunReport};
pub use role_change::{
    ConvergenceKey, ConvergenceRequest, GuildSettings, MemberAuditRecord, MemberUpdate,
    RoleAction,
};
