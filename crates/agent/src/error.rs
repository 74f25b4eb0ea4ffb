//! Handshake errors.

use tda_core::ErrorKind;

use crate::workflow::WorkflowError;

/// A request the agent could not serve.
///
/// The display form is the message placed in the error envelope.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// Request addressed to another agent
    #[error("Expected agent '{expected}' but received '{received}'.")]
    InvalidAgent {
        /// This agent's id
        expected: String,
        /// Name the request carried
        received: String,
    },

    /// Intent this agent does not serve
    #[error("Intent '{intent}' is not supported. Use {supported}.")]
    UnsupportedIntent {
        /// Requested intent
        intent: String,
        /// Supported intents, formatted as a list
        supported: String,
    },

    /// Missing or malformed task payload
    #[error("{0}")]
    InvalidInput(String),

    /// Failure while resolving
    #[error("{0}")]
    Runtime(String),
}

impl AgentError {
    /// Envelope category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AgentError::InvalidAgent { .. } => ErrorKind::InvalidAgent,
            AgentError::UnsupportedIntent { .. } => ErrorKind::UnsupportedIntent,
            AgentError::InvalidInput(_) => ErrorKind::InvalidInput,
            AgentError::Runtime(_) => ErrorKind::RuntimeError,
        }
    }
}

impl From<WorkflowError> for AgentError {
    fn from(err: WorkflowError) -> Self {
        AgentError::Runtime(err.to_string())
    }
}

/// Result type for handshake steps.
pub type Result<T> = std::result::Result<T, AgentError>;
