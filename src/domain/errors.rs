//! Domain errors for the Rolekeeper convergence engine.

use thiserror::Error;

use super::models::ConvergenceKey;
use super::ports::PlatformError;

/// Result of one mutation attempt that did not succeed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ActionError {
    /// The platform refused on authorization grounds. Retrying cannot help.
    #[error("Permanent action error: {0}")]
    Permanent(PlatformError),

    /// Anything else: network failure, rate limiting, temporary unavailability.
    #[error("Transient action error: {0}")]
    Transient(PlatformError),
}

impl ActionError {
    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::Permanent(_))
    }

    pub fn platform_error(&self) -> &PlatformError {
        match self {
            Self::Permanent(err) | Self::Transient(err) => err,
        }
    }
}

impl From<PlatformError> for ActionError {
    fn from(err: PlatformError) -> Self {
        if err.is_permanent() {
            Self::Permanent(err)
        } else {
            Self::Transient(err)
        }
    }
}

/// Errors surfaced to callers of the convergence engine.
#[derive(Debug, Error)]
pub enum ConvergenceError {
    #[error("Convergence already in progress for {0}")]
    AlreadyInProgress(ConvergenceKey),

    #[error("Guild not configured: {0}")]
    UnknownGuild(String),

    #[error("Invalid convergence request: {0}")]
    InvalidRequest(String),

    #[error("Convergence run aborted: {0}")]
    RunAborted(String),
}

pub type ConvergenceResult<T> = Result<T, ConvergenceError>;
