//! Error types for target resolution

use action_primitives::ActionError;
use thiserror::Error;

/// Locator error enumeration
#[derive(Debug, Error, Clone)]
pub enum LocatorError {
    /// Target has nothing to resolve with
    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    /// Strategy execution failed
    #[error("Strategy '{strategy}' failed: {reason}")]
    StrategyFailed { strategy: String, reason: String },

    /// API fallback had no session token
    #[error("Authentication missing: {0}")]
    AuthMissing(String),

    /// Resolution was cancelled
    #[error("Resolution cancelled: {0}")]
    Cancelled(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl LocatorError {
    pub fn strategy_failed(strategy: &str, err: &ActionError) -> Self {
        match err {
            ActionError::Interrupted(reason) => LocatorError::Cancelled(reason.clone()),
            ActionError::AuthMissing(reason) => LocatorError::AuthMissing(reason.clone()),
            other => LocatorError::StrategyFailed {
                strategy: strategy.to_string(),
                reason: other.to_string(),
            },
        }
    }

    /// Errors that must stop the chain instead of falling through
    pub fn is_fatal(&self) -> bool {
        matches!(self, LocatorError::Cancelled(_))
    }

    /// Get error severity (0=low, 1=medium, 2=high, 3=critical)
    pub fn severity(&self) -> u8 {
        match self {
            LocatorError::Internal(_) => 3,
            LocatorError::AuthMissing(_) => 2,
            LocatorError::StrategyFailed { .. } | LocatorError::InvalidTarget(_) => 1,
            LocatorError::Cancelled(_) => 0,
        }
    }
}
