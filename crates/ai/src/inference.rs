//! Dependency inference interface.

use std::collections::HashMap;

use async_trait::async_trait;
use tda_core::TaskBrief;

/// Inferred edges: task id to the ids it depends on.
pub type InferredDependencies = HashMap<String, Vec<String>>;

/// Inference errors.
#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    /// Nothing to infer from
    #[error("Tasks list cannot be empty")]
    EmptyInput,

    /// No API key configured
    #[error("OpenRouter API key not found. Set OPENROUTER_API_KEY environment variable.")]
    MissingApiKey,

    /// Rejected credentials (HTTP 401)
    #[error("Authentication failed. Check your OpenRouter API key. Error: {0}")]
    Authentication(String),

    /// Throttled (HTTP 429)
    #[error("Rate limit exceeded. Please retry later. Error: {0}")]
    RateLimited(String),

    /// Any other non-success status
    #[error("OpenRouter API request failed with status {status}: {body}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body
        body: String,
    },

    /// Transport failure
    #[error("Network error connecting to OpenRouter API: {0}")]
    Network(String),

    /// Response could not be turned into a dependency map
    #[error("Error parsing API response: {0}")]
    InvalidResponse(String),
}

/// Something that can guess which tasks depend on which.
#[async_trait]
pub trait DependencyInference: Send + Sync {
    /// Infer dependencies among `tasks`.
    ///
    /// Every key and every listed dependency of the result is the id of one
    /// of `tasks`. Tasks without dependencies may be omitted.
    async fn infer_dependencies(
        &self,
        tasks: &[TaskBrief],
    ) -> Result<InferredDependencies, InferenceError>;
}
