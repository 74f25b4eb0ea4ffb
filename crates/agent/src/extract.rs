//! Task payload extraction and validation.

use serde_json::Value;
use tda_core::{json_id, TaskSpec};

use crate::error::{AgentError, Result};

const NO_TASKS: &str =
    "Provide tasks via input.tasks, input.metadata.extra.tasks, or JSON in input.text.";

/// Locate the raw task list inside a request input.
///
/// Sources are tried in order: `input.tasks`, `input.metadata.extra.tasks`,
/// then `input.text` holding JSON that is either an object with a `tasks`
/// list or a bare list.
pub fn extract_tasks(input: &Value) -> Result<Vec<Value>> {
    if let Some(Value::Array(tasks)) = input.get("tasks") {
        return Ok(tasks.clone());
    }

    if let Some(Value::Array(tasks)) = input
        .get("metadata")
        .and_then(|m| m.get("extra"))
        .and_then(|e| e.get("tasks"))
    {
        return Ok(tasks.clone());
    }

    if let Some(Value::String(text)) = input.get("text") {
        match serde_json::from_str::<Value>(text) {
            Ok(Value::Array(tasks)) => return Ok(tasks),
            Ok(Value::Object(mut parsed)) => {
                if let Some(Value::Array(tasks)) = parsed.remove("tasks") {
                    return Ok(tasks);
                }
            }
            _ => {}
        }
    }

    Err(AgentError::InvalidInput(NO_TASKS.into()))
}

/// Check the raw task list and convert it to task specs.
///
/// The first violation in index order is reported.
pub fn validate_tasks(raw: &[Value]) -> Result<Vec<TaskSpec>> {
    if raw.is_empty() {
        return Err(invalid("Task list must be a non-empty list."));
    }

    let mut tasks = Vec::with_capacity(raw.len());
    for (idx, entry) in raw.iter().enumerate() {
        let Value::Object(fields) = entry else {
            return Err(invalid(format!("Task entry at index {} must be an object.", idx)));
        };

        let Some(raw_id) = fields.get("id") else {
            return Err(invalid(format!(
                "Task entry at index {} is missing required field 'id'.",
                idx
            )));
        };
        let Some(id) = json_id(raw_id) else {
            return Err(invalid(format!(
                "Task entry at index {} has an 'id' that is not a string or number.",
                idx
            )));
        };

        let depends_on = match fields.get("depends_on") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(deps)) => {
                let mut ids = Vec::with_capacity(deps.len());
                for dep in deps {
                    let Some(dep_id) = json_id(dep) else {
                        return Err(invalid(format!(
                            "Task '{}' depends_on entries must be strings or numbers.",
                            id
                        )));
                    };
                    ids.push(dep_id);
                }
                ids
            }
            Some(_) => {
                return Err(invalid(format!("Task '{}' depends_on must be a list.", id)));
            }
        };

        tasks.push(TaskSpec { id, depends_on });
    }

    Ok(tasks)
}

fn invalid(message: impl Into<String>) -> AgentError {
    AgentError::InvalidInput(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_prefers_direct_tasks() {
        let input = json!({
            "tasks": [{"id": "direct"}],
            "metadata": {"extra": {"tasks": [{"id": "meta"}]}},
        });
        let tasks = extract_tasks(&input).unwrap();
        assert_eq!(tasks, vec![json!({"id": "direct"})]);
    }

    #[test]
    fn test_extract_from_metadata() {
        let input = json!({"tasks": "not a list", "metadata": {"extra": {"tasks": [{"id": "m"}]}}});
        assert_eq!(extract_tasks(&input).unwrap(), vec![json!({"id": "m"})]);
    }

    #[test]
    fn test_extract_from_text() {
        let wrapped = json!({"text": r#"{"tasks": [{"id": "w"}]}"#});
        assert_eq!(extract_tasks(&wrapped).unwrap(), vec![json!({"id": "w"})]);

        let bare = json!({"text": r#"[{"id": "b"}]"#});
        assert_eq!(extract_tasks(&bare).unwrap(), vec![json!({"id": "b"})]);
    }

    #[test]
    fn test_extract_failure_message() {
        for input in [json!({}), json!({"text": "not json"}), json!({"text": "{\"x\": 1}"}), json!(null)] {
            let err = extract_tasks(&input).unwrap_err();
            assert_eq!(err.to_string(), NO_TASKS);
        }
    }

    #[test]
    fn test_validate_empty_list() {
        let err = validate_tasks(&[]).unwrap_err();
        assert_eq!(err.to_string(), "Task list must be a non-empty list.");
    }

    #[test]
    fn test_validate_reports_first_violation() {
        let raw = vec![json!({"id": "a"}), json!("b"), json!({"name": "c"})];
        let err = validate_tasks(&raw).unwrap_err();
        assert_eq!(err.to_string(), "Task entry at index 1 must be an object.");

        let raw = vec![json!({"id": "a"}), json!({"name": "c"})];
        let err = validate_tasks(&raw).unwrap_err();
        assert_eq!(err.to_string(), "Task entry at index 1 is missing required field 'id'.");
    }

    #[test]
    fn test_validate_depends_on_shape() {
        let raw = vec![json!({"id": "a", "depends_on": "b"})];
        let err = validate_tasks(&raw).unwrap_err();
        assert_eq!(err.to_string(), "Task 'a' depends_on must be a list.");

        let raw = vec![json!({"id": "a", "depends_on": [{"id": "b"}]})];
        assert!(validate_tasks(&raw).is_err());

        let raw = vec![json!({"id": true})];
        assert!(validate_tasks(&raw).is_err());
    }

    #[test]
    fn test_validate_normalizes_ids() {
        let raw = vec![
            json!({"id": 1}),
            json!({"id": "2", "depends_on": [1]}),
            json!({"id": "3", "depends_on": null}),
        ];
        let tasks = validate_tasks(&raw).unwrap();
        assert_eq!(tasks[0], TaskSpec::new("1", Vec::<String>::new()));
        assert_eq!(tasks[1], TaskSpec::new("2", ["1"]));
        assert!(tasks[2].depends_on.is_empty());
    }
}
