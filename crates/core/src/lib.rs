//! Task dependency agent core data models.
//!
//! This crate defines the task shapes, the dependency graph, the resolution
//! result and the supervisor request/response envelope shared by every
//! other crate in the workspace.

#![warn(missing_docs)]

// Identities
mod id;

// Tasks and graphs
mod task;
mod graph;
mod resolution;

// Supervisor handshake
mod envelope;

// Re-exports
pub use id::RequestId;
pub use task::{json_id, StoredTask, TaskBrief, TaskSpec, TaskUpdate, UpdateStatus};
pub use graph::DependencyGraph;
pub use resolution::{ResolutionOutcome, ResolutionResult, WorkflowResult};
pub use envelope::{
    AgentOutput, AgentRequest, AgentResponse, ErrorBody, ErrorKind, ResponseStatus,
};
