//! Flow execution error types

use crate::types::SequencerState;
use action_locator::LocatorError;
use action_primitives::ActionError;
use thiserror::Error;

/// Flow execution errors
#[derive(Debug, Error)]
pub enum FlowError {
    /// Runbook failed to parse or validate
    #[error("Invalid runbook: {0}")]
    InvalidRunbook(String),

    /// Browser session could not be started
    #[error("Session launch failed: {0}")]
    Launch(String),

    /// No session token after a login that required one
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Operator declined at a checkpoint
    #[error("Operator aborted: {0}")]
    OperatorAborted(String),

    /// Run was cancelled (Ctrl-C)
    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// Target could not be found by any strategy
    #[error("Target not found: {0}")]
    TargetNotFound(String),

    /// Action primitive error
    #[error("Action failed: {0}")]
    Action(ActionError),

    /// Target resolution error
    #[error("Resolution failed: {0}")]
    Locator(LocatorError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Sequencer state machine violation
    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: SequencerState,
        to: SequencerState,
    },
}

impl FlowError {
    /// Errors that end the run regardless of policy
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            FlowError::Cancelled(_) | FlowError::OperatorAborted(_) | FlowError::Launch(_)
        )
    }
}

impl From<ActionError> for FlowError {
    fn from(err: ActionError) -> Self {
        match err {
            ActionError::Interrupted(reason) => FlowError::Cancelled(reason),
            other => FlowError::Action(other),
        }
    }
}

impl From<LocatorError> for FlowError {
    fn from(err: LocatorError) -> Self {
        match err {
            LocatorError::Cancelled(reason) => FlowError::Cancelled(reason),
            LocatorError::InvalidTarget(reason) => FlowError::InvalidRunbook(reason),
            other => FlowError::Locator(other),
        }
    }
}
