//! Error types for action primitives

use cdp_adapter::{AdapterError, AdapterErrorKind};
use thiserror::Error;

/// Comprehensive error types for action primitive operations
#[derive(Debug, Error, Clone)]
pub enum ActionError {
    /// Navigation timed out waiting for page load
    #[error("Navigation timeout: {0}")]
    NavTimeout(String),

    /// Wait operation timed out
    #[error("Wait timeout: {0}")]
    WaitTimeout(String),

    /// Operation was cancelled or interrupted
    #[error("Operation interrupted: {0}")]
    Interrupted(String),

    /// Element anchor could not be resolved
    #[error("Anchor not found: {0}")]
    AnchorNotFound(String),

    /// Scroll target is invalid or unreachable
    #[error("Scroll target invalid: {0}")]
    ScrollTargetInvalid(String),

    /// In-page script threw or returned an unusable value
    #[error("Script failed: {0}")]
    ScriptFailed(String),

    /// No session token in browser storage
    #[error("Authentication token missing: {0}")]
    AuthMissing(String),

    /// CDP communication or protocol error
    #[error("CDP I/O error: {0}")]
    CdpIo(String),

    /// Local filesystem error
    #[error("I/O error: {0}")]
    Io(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ActionError {
    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ActionError::WaitTimeout(_) | ActionError::NavTimeout(_) | ActionError::CdpIo(_)
        )
    }

    /// Get error severity level (0=low, 1=medium, 2=high, 3=critical)
    pub fn severity(&self) -> u8 {
        match self {
            ActionError::Internal(_) => 3,
            ActionError::NavTimeout(_)
            | ActionError::AuthMissing(_)
            | ActionError::CdpIo(_)
            | ActionError::Io(_) => 2,
            ActionError::WaitTimeout(_)
            | ActionError::AnchorNotFound(_)
            | ActionError::ScriptFailed(_) => 1,
            _ => 0,
        }
    }

    pub fn is_interrupted(&self) -> bool {
        matches!(self, ActionError::Interrupted(_))
    }
}

impl From<AdapterError> for ActionError {
    fn from(err: AdapterError) -> Self {
        let message = err.to_string();
        match err.kind {
            AdapterErrorKind::TargetNotFound => {
                ActionError::AnchorNotFound(err.hint.unwrap_or(message))
            }
            AdapterErrorKind::NavTimeout => ActionError::NavTimeout(message),
            AdapterErrorKind::Internal if err.data.is_some() => ActionError::ScriptFailed(message),
            AdapterErrorKind::Internal => ActionError::Internal(message),
            AdapterErrorKind::CdpIo => ActionError::CdpIo(message),
        }
    }
}

impl From<std::io::Error> for ActionError {
    fn from(err: std::io::Error) -> Self {
        ActionError::Io(err.to_string())
    }
}
