//! Dependency inference
//!
//! Asks a language model which tasks depend on which, for stored tasks that
//! carry no declared dependencies.

#![warn(missing_docs)]

pub mod inference;
pub mod openrouter;
pub mod prompt;

pub use inference::{DependencyInference, InferenceError, InferredDependencies};
pub use openrouter::{OpenRouterClient, OpenRouterConfig, DEFAULT_BASE_URL, DEFAULT_MODEL};
