//! Task dependency agent
//!
//! Answers supervisor requests to resolve task dependencies, either from a
//! task list carried in the request or from a task store whose dependencies
//! are inferred by a language model.

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod extract;
pub mod handshake;
pub mod server;
pub mod workflow;

pub use config::{
    AgentConfig, DATABASE_TRIGGER, DEFAULT_AGENT_ID, HEALTH_DETAILS, HEALTH_INTENT, RESOLVE_INTENT,
    SUCCESS_CONFIDENCE, SUCCESS_DETAILS,
};
pub use error::AgentError;
pub use extract::{extract_tasks, validate_tasks};
pub use handshake::TaskDependencyAgent;
pub use server::AgentServer;
pub use workflow::{resolve_from_store, write_back_updates, WorkflowError, NO_TASKS_MESSAGE};
