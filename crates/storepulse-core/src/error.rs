//! Error types for StorePulse Core

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    // Transport errors (retryable)
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Page request timed out after {0}ms")]
    Timeout(u64),

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    // Terminal errors (never retried)
    #[error("Session expired or unauthorized")]
    Unauthorized,

    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),

    // Protocol faults (soft, the traversal stops early with a truncated result)
    #[error("Malformed page: {0}")]
    MalformedPage(String),

    #[error("Traversal cancelled")]
    Cancelled,

    #[error("Cached value type mismatch for '{0}'")]
    TypeMismatch(String),

    #[error("Query task failed: {0}")]
    TaskFailed(String),

    // Setup errors
    #[error("Invalid traversal limits: {0}")]
    InvalidLimits(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the egress layer may retry the request that produced this error
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Transport(_) | Error::Timeout(_) => true,
            Error::Http { status, .. } => matches!(status, 408 | 429 | 500..=599),
            _ => false,
        }
    }

    /// Protocol faults stop a traversal early but still yield a (truncated) result
    pub fn is_soft(&self) -> bool {
        matches!(self, Error::MalformedPage(_))
    }

    /// Short stable label used for metrics and structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Transport(_) => "transport",
            Error::Timeout(_) => "timeout",
            Error::Http { .. } => "http",
            Error::Unauthorized => "unauthorized",
            Error::InvalidCursor(_) => "invalid_cursor",
            Error::MalformedPage(_) => "malformed_page",
            Error::Cancelled => "cancelled",
            Error::TypeMismatch(_) => "type_mismatch",
            Error::TaskFailed(_) => "task_failed",
            Error::InvalidLimits(_) => "invalid_limits",
            Error::Config(_) => "config",
            Error::Serialization(_) => "serialization",
            Error::Io(_) => "io",
        }
    }
}

/// Clone keeps the variant so a shared failure classifies the same way for
/// every consumer. Wrapped library errors are rebuilt from their message.
impl Clone for Error {
    fn clone(&self) -> Self {
        match self {
            Error::Transport(msg) => Error::Transport(msg.clone()),
            Error::Timeout(ms) => Error::Timeout(*ms),
            Error::Http { status, message } => Error::Http {
                status: *status,
                message: message.clone(),
            },
            Error::Unauthorized => Error::Unauthorized,
            Error::InvalidCursor(msg) => Error::InvalidCursor(msg.clone()),
            Error::MalformedPage(msg) => Error::MalformedPage(msg.clone()),
            Error::Cancelled => Error::Cancelled,
            Error::TypeMismatch(key) => Error::TypeMismatch(key.clone()),
            Error::TaskFailed(msg) => Error::TaskFailed(msg.clone()),
            Error::InvalidLimits(msg) => Error::InvalidLimits(msg.clone()),
            Error::Config(msg) => Error::Config(msg.clone()),
            Error::Serialization(e) => {
                Error::Serialization(<serde_json::Error as serde::de::Error>::custom(e))
            }
            Error::Io(e) => Error::Io(std::io::Error::new(e.kind(), e.to_string())),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
