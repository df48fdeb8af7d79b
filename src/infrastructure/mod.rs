//! Infrastructure layer module
//!
//! - Configuration management (figment)
//! - Logging and the audit trail (tracing)
//!
//! The audit logger satisfies the `AuditEmitter` port defined in the domain layer.

pub mod config;
pub mod logging;
