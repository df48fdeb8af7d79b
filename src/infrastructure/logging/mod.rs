//! Logging infrastructure
//!
//! Structured logging using tracing and tracing-subscriber:
//! - JSON or pretty formatting
//! - Rolling log files
//! - Audit trail for confirmed role changes

pub mod audit;
pub mod config;
pub mod logger;

pub use audit::{AuditEntry, AuditLogger};
pub use config::{LogConfig, LogFormat, RotationPolicy};
pub use logger::LoggerImpl;
