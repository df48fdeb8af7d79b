//! Rolekeeper - membership role convergence engine
//!
//! Rolekeeper drives a guild member's role towards a desired state on a chat
//! platform whose role API is eventually consistent. Each request becomes a
//! convergence run that retries the mutation on a fixed period and finishes
//! once a member update from the platform's event stream confirms the change,
//! or when its attempt budget or deadline runs out.
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): Models, errors and the port traits
//! - **Service Layer** (`services`): Registry, runs, the engine and the event router
//! - **Adapters** (`adapters`): In-memory guild settings and a simulated platform
//! - **Infrastructure Layer** (`infrastructure`): Configuration, logging and the audit trail
//! - **CLI Layer** (`cli`): Command-line interface
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use rolekeeper::{ConvergenceEngine, ConvergenceKey, ConvergenceRequest, EngineConfig};
//!
//! let engine = ConvergenceEngine::new(platform, guild_store, EngineConfig::default());
//! engine.router().spawn(member_updates);
//!
//! let handle = engine
//!     .start_convergence(ConvergenceRequest::grant(ConvergenceKey::new("guild", "user"), "verified"))
//!     .await?;
//! let report = handle.outcome().await?;
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{ActionError, ConvergenceError, ConvergenceResult};
pub use domain::models::{
    Config, ConvergenceKey, ConvergenceRequest, EngineConfig, GuildSettings, MemberAuditRecord,
    MemberUpdate, MismatchPolicy, Outcome, RoleAction, RunReport,
};
pub use domain::ports::{AuditEmitter, GuildConfigStore, PlatformError, RoleMutator};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{ConvergenceEngine, EventRouter, RunHandle, RunRegistry};
