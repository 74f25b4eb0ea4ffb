//! The supervisor handshake.
//!
//! Every request runs the same linear sequence:
//!
//! ```text
//! health? → identity → intent → ┬ trigger == database_update → store workflow
//!                     └ otherwise → extract → validate → resolve
//! ```
//!
//! A health request is answered first, whatever agent name it carries.
//! Any failure short-circuits into an error envelope. A response is always
//! produced and always carries a request id.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Value};
use tda_ai::DependencyInference;
use tda_core::{
    json_id, AgentRequest, AgentResponse, ErrorKind, RequestId, ResolutionOutcome, TaskSpec,
    WorkflowResult,
};
use tda_execution::{DependencyResolver, ResolutionEngine};
use tda_storage::TaskStore;
use tracing::{debug, info, warn};

use crate::config::{
    AgentConfig, DATABASE_TRIGGER, HEALTH_DETAILS, HEALTH_INTENT, RESOLVE_INTENT,
    SUCCESS_CONFIDENCE, SUCCESS_DETAILS,
};
use crate::error::{AgentError, Result};
use crate::extract::{extract_tasks, validate_tasks};
use crate::workflow::{self, WorkflowError};

/// Worker agent resolving task dependencies for a supervisor.
pub struct TaskDependencyAgent {
    config: AgentConfig,
    engine: Arc<ResolutionEngine>,
    store: Option<Arc<dyn TaskStore>>,
    inference: Option<Arc<dyn DependencyInference>>,
}

impl TaskDependencyAgent {
    /// Create an agent with no store or inference client.
    pub fn new(config: AgentConfig) -> Self {
        let engine = Arc::new(ResolutionEngine::from_config(&config.engine_config()));
        Self {
            config,
            engine,
            store: None,
            inference: None,
        }
    }

    /// Attach the task store used by the store workflow.
    pub fn with_store(mut self, store: Arc<dyn TaskStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Attach the inference client used by the store workflow.
    pub fn with_inference(mut self, inference: Arc<dyn DependencyInference>) -> Self {
        self.inference = Some(inference);
        self
    }

    /// Name requests must be addressed to.
    pub fn agent_id(&self) -> &str {
        &self.config.agent_id
    }

    /// Intents this agent serves.
    pub fn supported_intents(&self) -> &'static [&'static str] {
        &[RESOLVE_INTENT]
    }

    /// Get a reference to the resolution engine.
    pub fn engine(&self) -> &ResolutionEngine {
        &self.engine
    }

    /// Resolve a validated task list through the cache.
    ///
    /// Runs on a blocking thread, since a cache miss rewrites the cache file.
    pub async fn resolve(&self, tasks: Vec<TaskSpec>) -> Result<ResolutionOutcome> {
        let engine = Arc::clone(&self.engine);
        tokio::task::spawn_blocking(move || engine.process(&tasks))
            .await
            .map_err(|e| AgentError::Runtime(format!("Resolution task failed: {}", e)))
    }

    /// Liveness payload for health requests.
    pub fn health(&self) -> Value {
        json!({"status": "ok", "agent": self.agent_id()})
    }

    /// Run the store workflow with the configured collaborators.
    pub async fn resolve_from_store(&self) -> std::result::Result<WorkflowResult, WorkflowError> {
        let store = self.store.as_deref().ok_or(WorkflowError::StoreNotConfigured)?;
        workflow::resolve_from_store(store, self.inference.as_deref(), &DependencyResolver::new())
            .await
    }

    /// Answer one request.
    pub async fn handle_request(&self, request: AgentRequest) -> AgentResponse {
        let request_id = RequestId::echo_or_generate(request.request_id().as_deref());
        debug!("Handling request {}", request_id);

        if request.intent() == HEALTH_INTENT {
            return AgentResponse::success(
                request_id,
                self.agent_id(),
                self.health(),
                1.0,
                HEALTH_DETAILS,
            );
        }

        match self.dispatch(&request).await {
            Ok(result) => AgentResponse::success(
                request_id,
                request.agent_name(),
                result,
                SUCCESS_CONFIDENCE,
                SUCCESS_DETAILS,
            ),
            Err(e) => {
                warn!("Request {} failed ({}): {}", request_id, e.kind(), e);
                self.error_response(request_id, request.agent_name(), e.kind(), e.to_string())
            }
        }
    }

    /// Answer a request given as an arbitrary JSON value.
    ///
    /// Values that do not decode as a request envelope get an
    /// `invalid_input` response, echoing whatever id and name can be read.
    pub async fn handle_value(&self, raw: Value) -> AgentResponse {
        match serde_json::from_value::<AgentRequest>(raw.clone()) {
            Ok(request) if raw.is_object() => self.handle_request(request).await,
            outcome => {
                let message = match outcome {
                    Err(e) => format!("Malformed request envelope: {}", e),
                    Ok(_) => "Request envelope must be a JSON object.".to_string(),
                };
                let request_id = RequestId::echo_or_generate(
                    raw.get("request_id").and_then(json_id).as_deref(),
                );
                let agent_name = raw.get("agent_name").and_then(Value::as_str).unwrap_or("");
                warn!("Request {} rejected: {}", request_id, message);
                self.error_response(request_id, agent_name, ErrorKind::InvalidInput, message)
            }
        }
    }

    /// Answer a request given as one line of text.
    pub async fn handle_line(&self, line: &str) -> AgentResponse {
        match serde_json::from_str::<Value>(line) {
            Ok(raw) => self.handle_value(raw).await,
            Err(e) => {
                let request_id = RequestId::new();
                warn!("Request {} is not JSON: {}", request_id, e);
                self.error_response(
                    request_id,
                    "",
                    ErrorKind::InvalidInput,
                    format!("Request is not valid JSON: {}", e),
                )
            }
        }
    }

    async fn dispatch(&self, request: &AgentRequest) -> Result<Value> {
        let agent_name = request.agent_name();
        if agent_name != self.agent_id() {
            return Err(AgentError::InvalidAgent {
                expected: self.agent_id().to_string(),
                received: agent_name.to_string(),
            });
        }

        let intent = request.intent();
        if !self.supported_intents().contains(&intent) {
            return Err(AgentError::UnsupportedIntent {
                intent: intent.to_string(),
                supported: self.format_supported_intents(),
            });
        }

        if request.input.get("trigger").and_then(Value::as_str) == Some(DATABASE_TRIGGER) {
            info!("Store trigger received");
            let result = self.resolve_from_store().await?;
            return to_result(&result);
        }

        let raw = extract_tasks(&request.input)?;
        let tasks = validate_tasks(&raw)?;
        info!("Resolving {} tasks", tasks.len());
        to_result(&self.resolve(tasks).await?)
    }

    fn format_supported_intents(&self) -> String {
        let mut intents: Vec<_> = self.supported_intents().to_vec();
        intents.sort_unstable();
        let quoted: Vec<String> = intents.iter().map(|i| format!("'{}'", i)).collect();
        format!("[{}]", quoted.join(", "))
    }

    fn error_response(
        &self,
        request_id: RequestId,
        agent_name: &str,
        kind: ErrorKind,
        message: String,
    ) -> AgentResponse {
        let name = if agent_name.is_empty() {
            self.agent_id()
        } else {
            agent_name
        };
        AgentResponse::error(request_id, name, kind, message)
    }
}

fn to_result<T: Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| AgentError::Runtime(e.to_string()))
}
