//! Agent configuration.

use std::path::PathBuf;

use tda_execution::EngineConfig;

/// Identity the agent answers to unless configured otherwise.
pub const DEFAULT_AGENT_ID: &str = "task_dependency_agent";

/// The only intent the agent serves.
pub const RESOLVE_INTENT: &str = "task.resolve_dependencies";

/// Confidence reported on every success envelope.
pub const SUCCESS_CONFIDENCE: f64 = 0.92;

/// Details string reported on every success envelope.
pub const SUCCESS_DETAILS: &str = "Dependency resolution completed";

/// Liveness intent, answered regardless of the addressed agent name.
pub const HEALTH_INTENT: &str = "agent.health";

/// Details string reported on health responses.
pub const HEALTH_DETAILS: &str = "Agent is running";

/// Value of `input.trigger` that selects the store-backed workflow.
pub const DATABASE_TRIGGER: &str = "database_update";

/// Configuration for [`TaskDependencyAgent`](crate::TaskDependencyAgent).
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Name requests must be addressed to
    pub agent_id: String,
    /// File mirror for the result cache (None = memory only)
    pub cache_path: Option<PathBuf>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            agent_id: DEFAULT_AGENT_ID.to_string(),
            cache_path: None,
        }
    }
}

impl AgentConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the agent id.
    pub fn with_agent_id(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = agent_id.into();
        self
    }

    /// Mirror the result cache to `path`.
    pub fn with_cache_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_path = Some(path.into());
        self
    }

    /// Engine settings derived from this configuration.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            cache_path: self.cache_path.clone(),
        }
    }
}
