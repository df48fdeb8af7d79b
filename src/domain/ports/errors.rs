use std::time::Duration;
use thiserror::Error;

/// Platform codes meaning the bot lacks access to the resource.
const MISSING_ACCESS: u32 = 50_001;
/// Platform codes meaning the bot lacks a permission for the operation.
const MISSING_PERMISSIONS: u32 = 50_013;

/// Errors returned by the chat platform when mutating member roles
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlatformError {
    /// The platform answered with a non-success HTTP status
    #[error("HTTP {status}: {message}")]
    Http {
        status: u16,
        /// Platform-specific JSON error code, when the body carried one
        code: Option<u32>,
        message: String,
    },

    /// Request was rate limited
    #[error("Rate limited (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    /// Transport failure before a response arrived
    #[error("Network error: {0}")]
    Network(String),

    /// Request timed out waiting for response
    #[error("Timeout waiting for response")]
    Timeout,
}

impl PlatformError {
    /// Create error from HTTP status code, optional platform code and response body
    ///
    /// - 429 maps to `RateLimited`
    /// - everything else keeps its status and code for classification
    pub fn from_status(status: u16, code: Option<u32>, message: impl Into<String>) -> Self {
        match status {
            429 => Self::RateLimited { retry_after: None },
            _ => Self::Http {
                status,
                code,
                message: message.into(),
            },
        }
    }

    /// Returns true when no retry can succeed: the platform refused on
    /// authorization grounds.
    ///
    /// Permanent errors are:
    /// - HTTP 401 and 403
    /// - platform codes 50001 (missing access) and 50013 (missing permissions)
    pub fn is_permanent(&self) -> bool {
        match self {
            Self::Http { status, code, .. } => {
                matches!(status, 401 | 403)
                    || matches!(code, Some(MISSING_ACCESS | MISSING_PERMISSIONS))
            }
            Self::RateLimited { .. } | Self::Network(_) | Self::Timeout => false,
        }
    }
}
