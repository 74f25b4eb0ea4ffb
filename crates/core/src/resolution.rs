//! Resolution results.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::graph::DependencyGraph;

/// Outcome of resolving one dependency graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionResult {
    /// Topological order over the schedulable tasks
    pub execution_order: Vec<String>,

    /// Tasks that could not be placed in the order
    pub blocked_tasks: Vec<String>,

    /// Closed loops found in the graph, first element repeated at the end
    pub cycles_detected: Vec<Vec<String>>,

    /// The graph that was resolved
    pub raw_graph: DependencyGraph,
}

impl ResolutionResult {
    /// Whether every task made it into the execution order.
    pub fn is_fully_resolved(&self) -> bool {
        self.blocked_tasks.is_empty()
    }

    /// Cycles that pass through `id`.
    pub fn cycles_containing(&self, id: &str) -> Vec<Vec<String>> {
        self.cycles_detected
            .iter()
            .filter(|c| c.iter().any(|n| n == id))
            .cloned()
            .collect()
    }
}

/// A resolution result tagged with where it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionOutcome {
    /// Served from the result cache rather than recomputed
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub from_cache: bool,

    /// The result itself
    #[serde(flatten)]
    pub result: ResolutionResult,
}

/// Result of the store-backed inference workflow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowResult {
    /// Complete dependency mapping, one entry per stored task
    pub dependencies: IndexMap<String, Vec<String>>,

    /// Topological order over the schedulable tasks
    pub execution_order: Vec<String>,

    /// Tasks that could not be placed in the order
    #[serde(default)]
    pub blocked_tasks: Vec<String>,

    /// Cycles found in the inferred graph
    #[serde(default)]
    pub cycles_detected: Vec<Vec<String>>,

    /// Explanatory note, set when there was nothing to do
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl WorkflowResult {
    /// The result returned when the store holds no tasks.
    pub fn empty(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::default()
        }
    }
}
