//! Task models - what callers submit and what the task store holds.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Convert a JSON task identifier into its string form.
///
/// Strings are taken as-is and numbers use their decimal representation.
/// Anything else is not a usable identifier.
pub fn json_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// A task as submitted for resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSpec {
    /// Opaque identifier, unique within a request
    pub id: String,

    /// Declared dependencies, in declaration order
    #[serde(default)]
    pub depends_on: Vec<String>,
}

impl TaskSpec {
    /// Create a task with the given dependencies.
    pub fn new<I, S>(id: impl Into<String>, depends_on: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            depends_on: depends_on.into_iter().map(Into::into).collect(),
        }
    }
}

/// A task record as held by the task store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredTask {
    /// Identifier
    pub id: String,

    /// Short name
    pub name: String,

    /// Free-text description, the input to dependency inference
    pub description: String,

    /// Deadline, kept verbatim
    pub deadline: String,

    /// Store-level status (`pending`, `ready`, `blocked`, ...)
    pub status: String,

    /// Dependencies currently recorded for this task
    pub depends_on: Vec<String>,

    /// 1-indexed position in the last computed execution order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_order: Option<usize>,
}

impl StoredTask {
    /// Create a pending task with no recorded dependencies.
    pub fn new(id: impl Into<String>, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            deadline: String::new(),
            status: "pending".to_string(),
            depends_on: Vec::new(),
            execution_order: None,
        }
    }

    /// Normalize a raw store document.
    ///
    /// Prefixed field names (`task_id`, `task_name`, ...) win over the plain
    /// ones. A missing or non-list `depends_on` becomes an empty list.
    pub fn from_document(doc: &Value) -> Self {
        let text = |keys: &[&str], default: &str| -> String {
            keys.iter()
                .filter_map(|k| doc.get(*k))
                .find_map(|v| match v {
                    Value::String(s) if !s.is_empty() => Some(s.clone()),
                    Value::Null | Value::String(_) => None,
                    other => Some(other.to_string()),
                })
                .unwrap_or_else(|| default.to_string())
        };

        let depends_on = match doc.get("depends_on") {
            Some(Value::Array(items)) => items.iter().filter_map(json_id).collect(),
            _ => Vec::new(),
        };

        let execution_order = doc
            .get("execution_order")
            .and_then(Value::as_u64)
            .map(|n| n as usize);

        Self {
            id: ["task_id", "id", "_id"]
                .iter()
                .filter_map(|k| doc.get(*k))
                .find_map(json_id)
                .unwrap_or_default(),
            name: text(&["task_name", "name"], "Unnamed Task"),
            description: text(&["task_description", "description"], "No description"),
            deadline: text(&["task_deadline", "deadline"], ""),
            status: text(&["task_status", "status"], "pending"),
            depends_on,
            execution_order,
        }
    }
}

/// The slice of a task sent to dependency inference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskBrief {
    /// Identifier
    pub id: String,
    /// Short name
    pub name: String,
    /// Free-text description
    pub description: String,
}

impl From<&StoredTask> for TaskBrief {
    fn from(task: &StoredTask) -> Self {
        Self {
            id: task.id.clone(),
            name: task.name.clone(),
            description: task.description.clone(),
        }
    }
}

/// Status written back to the store after resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateStatus {
    /// Placed in the execution order
    Ready,
    /// Cyclic, or waiting on something that can never complete
    Blocked,
}

impl UpdateStatus {
    /// Wire form of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::Blocked => "blocked",
        }
    }
}

/// A partial update applied to one stored task.
///
/// Absent fields are left untouched by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskUpdate {
    /// Task to update
    pub id: String,

    /// New dependency list
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depends_on: Option<Vec<String>>,

    /// 1-indexed execution position
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_order: Option<usize>,

    /// New status
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<UpdateStatus>,

    /// Cycles this task takes part in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cycle_info: Option<Vec<Vec<String>>>,
}

impl TaskUpdate {
    /// An update touching nothing but the id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            depends_on: None,
            execution_order: None,
            status: None,
            cycle_info: None,
        }
    }

    /// Set the dependency list.
    pub fn with_depends_on(mut self, depends_on: Vec<String>) -> Self {
        self.depends_on = Some(depends_on);
        self
    }

    /// Set the execution position.
    pub fn with_execution_order(mut self, position: usize) -> Self {
        self.execution_order = Some(position);
        self
    }

    /// Set the status.
    pub fn with_status(mut self, status: UpdateStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Attach cycle information.
    pub fn with_cycle_info(mut self, cycles: Vec<Vec<String>>) -> Self {
        self.cycle_info = Some(cycles);
        self
    }
}
