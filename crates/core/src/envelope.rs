//! Supervisor request/response envelope.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::id::RequestId;
use crate::task::json_id;

/// Inbound request from the supervisor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentRequest {
    /// Caller-supplied id, echoed back when present
    ///
    /// Kept as raw JSON so numeric ids are echoed rather than rejected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<Value>,

    /// Name of the agent this request is addressed to
    #[serde(default)]
    pub agent_name: Option<String>,

    /// Requested operation
    #[serde(default)]
    pub intent: Option<String>,

    /// Operation payload
    #[serde(default)]
    pub input: Value,

    /// Opaque caller context, ignored
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

impl AgentRequest {
    /// Create a request addressed to `agent_name`.
    pub fn new(agent_name: impl Into<String>, intent: impl Into<String>, input: Value) -> Self {
        Self {
            request_id: None,
            agent_name: Some(agent_name.into()),
            intent: Some(intent.into()),
            input,
            context: None,
        }
    }

    /// Set the request id.
    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = Some(Value::String(id.into()));
        self
    }

    /// Caller-supplied id in string form, if it is a string or number.
    pub fn request_id(&self) -> Option<String> {
        self.request_id.as_ref().and_then(json_id)
    }

    /// Addressed agent, empty when absent.
    pub fn agent_name(&self) -> &str {
        self.agent_name.as_deref().unwrap_or("")
    }

    /// Intent, empty when absent.
    pub fn intent(&self) -> &str {
        self.intent.as_deref().unwrap_or("")
    }
}

/// Response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    /// The request was handled
    Success,
    /// The request was rejected or failed
    Error,
}

/// Error category reported to the supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Request addressed to another agent
    InvalidAgent,
    /// Intent not handled by this agent
    UnsupportedIntent,
    /// Malformed or missing task data
    InvalidInput,
    /// Anything that failed while resolving or talking to collaborators
    RuntimeError,
}

impl ErrorKind {
    /// Wire form of the error type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidAgent => "invalid_agent",
            Self::UnsupportedIntent => "unsupported_intent",
            Self::InvalidInput => "invalid_input",
            Self::RuntimeError => "runtime_error",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed error carried in an error envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Error category
    #[serde(rename = "type")]
    pub kind: ErrorKind,
    /// Human-readable detail
    pub message: String,
}

/// Payload of a success envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentOutput {
    /// Operation result
    pub result: Value,
    /// Fixed confidence score
    pub confidence: f64,
    /// Human-readable summary
    pub details: String,
}

/// Outbound response to the supervisor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentResponse {
    /// Echoed or generated request id
    pub request_id: RequestId,
    /// Responding agent
    pub agent_name: String,
    /// Outcome
    pub status: ResponseStatus,
    /// Result, null on error
    pub output: Option<AgentOutput>,
    /// Error, null on success
    pub error: Option<ErrorBody>,
}

impl AgentResponse {
    /// Build a success envelope.
    pub fn success(
        request_id: RequestId,
        agent_name: impl Into<String>,
        result: Value,
        confidence: f64,
        details: impl Into<String>,
    ) -> Self {
        Self {
            request_id,
            agent_name: agent_name.into(),
            status: ResponseStatus::Success,
            output: Some(AgentOutput {
                result,
                confidence,
                details: details.into(),
            }),
            error: None,
        }
    }

    /// Build an error envelope.
    pub fn error(
        request_id: RequestId,
        agent_name: impl Into<String>,
        kind: ErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            request_id,
            agent_name: agent_name.into(),
            status: ResponseStatus::Error,
            output: None,
            error: Some(ErrorBody {
                kind,
                message: message.into(),
            }),
        }
    }

    /// Whether this is a success envelope.
    pub fn is_success(&self) -> bool {
        self.status == ResponseStatus::Success
    }

    /// Error category, if this is an error envelope.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(|e| e.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_tolerates_missing_fields() {
        let request: AgentRequest = serde_json::from_value(json!({"intent": "x"})).unwrap();
        assert_eq!(request.agent_name(), "");
        assert_eq!(request.intent(), "x");
        assert!(request.input.is_null());
        assert!(request.request_id.is_none());
    }

    #[test]
    fn test_numeric_request_id_is_accepted() {
        let request: AgentRequest =
            serde_json::from_value(json!({"request_id": 42, "intent": "x"})).unwrap();
        assert_eq!(request.request_id().as_deref(), Some("42"));

        let request: AgentRequest =
            serde_json::from_value(json!({"request_id": {"nested": true}})).unwrap();
        assert_eq!(request.request_id(), None);
    }

    #[test]
    fn test_error_envelope_shape() {
        let response = AgentResponse::error(
            RequestId::echo_or_generate(Some("req-9")),
            "wrong",
            ErrorKind::InvalidAgent,
            "nope",
        );
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(
            value,
            json!({
                "request_id": "req-9",
                "agent_name": "wrong",
                "status": "error",
                "output": null,
                "error": {"type": "invalid_agent", "message": "nope"}
            })
        );
    }

    #[test]
    fn test_success_envelope_shape() {
        let response = AgentResponse::success(
            RequestId::echo_or_generate(Some("req-1")),
            "agent",
            json!({"execution_order": ["A"]}),
            0.92,
            "done",
        );
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["status"], "success");
        assert_eq!(value["output"]["confidence"], json!(0.92));
        assert_eq!(value["error"], Value::Null);
        assert!(response.is_success());
        assert_eq!(response.error_kind(), None);
    }
}
