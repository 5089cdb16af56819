//! Error type for the root utilities (cards, pdf, jobs, session launch)

use action_flow::FlowError;
use cdp_adapter::AdapterError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReelError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("browser error: {0}")]
    Browser(#[from] AdapterError),

    #[error(transparent)]
    Flow(#[from] FlowError),

    #[error("{0}")]
    NotFound(String),

    #[error("api returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl ReelError {
    pub fn invalid(message: impl Into<String>) -> Self {
        ReelError::InvalidInput(message.into())
    }
}

pub type ReelResult<T> = Result<T, ReelError>;
