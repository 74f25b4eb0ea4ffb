//! Prompt construction and response parsing for dependency inference.

use std::collections::HashSet;

use regex::Regex;
use serde_json::Value;
use tda_core::{json_id, TaskBrief};

use crate::{InferenceError, InferredDependencies};

/// System message sent with every inference request.
pub const SYSTEM_MESSAGE: &str = "You are a task dependency analyzer. Given a list of tasks \
with descriptions, identify which tasks depend on others. A task depends on another if it \
requires the other task's output or completion. Return results in strict JSON format. Only \
use task IDs from the provided list.";

// Opening and closing markers are matched independently
const FENCE_PATTERN: &str = r"^```(?:json)?|```$";

/// Build the user prompt listing every task.
pub fn build_prompt(tasks: &[TaskBrief]) -> String {
    let listing = tasks
        .iter()
        .map(|t| {
            format!(
                "- ID: {}\n  Name: {}\n  Description: {}",
                t.id, t.name, t.description
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        r#"Analyze these tasks and identify which tasks depend on others. A task depends on another if it requires the other task's output or completion.

Tasks:
{listing}

Return a JSON object with this exact structure:
{{
  "dependencies": {{
    "task-id": ["dependency-id-1", "dependency-id-2"],
    ...
  }}
}}

Only include task IDs that have dependencies. Only use task IDs from the provided list. If a task has no dependencies, omit it from the response."#
    )
}

/// Remove a leading and a trailing markdown code fence marker, if any.
pub fn strip_code_fence(content: &str) -> String {
    let trimmed = content.trim();
    match Regex::new(FENCE_PATTERN) {
        Ok(re) => re.replace_all(trimmed, "").trim().to_string(),
        Err(_) => trimmed.to_string(),
    }
}

/// Parse the model's message content into a validated dependency map.
pub fn parse_dependencies(
    content: &str,
    tasks: &[TaskBrief],
) -> Result<InferredDependencies, InferenceError> {
    let body = strip_code_fence(content);
    if body.is_empty() {
        return Err(InferenceError::InvalidResponse(
            "API response message content is empty".into(),
        ));
    }

    let parsed: Value = serde_json::from_str(&body).map_err(|e| {
        InferenceError::InvalidResponse(format!("Failed to parse JSON from API response: {}", e))
    })?;

    let Value::Object(root) = &parsed else {
        return Err(InferenceError::InvalidResponse(
            "API response must be a JSON object".into(),
        ));
    };

    let entries = match root.get("dependencies") {
        None => return Ok(InferredDependencies::new()),
        Some(Value::Object(map)) => map,
        Some(_) => {
            return Err(InferenceError::InvalidResponse(
                "Dependencies field must be a dictionary".into(),
            ))
        }
    };

    let known: HashSet<&str> = tasks.iter().map(|t| t.id.as_str()).collect();
    let mut dependencies = InferredDependencies::new();

    for (task_id, deps) in entries {
        if !known.contains(task_id.as_str()) {
            return Err(InferenceError::InvalidResponse(format!(
                "Invalid task ID in dependencies: {}",
                task_id
            )));
        }
        let Value::Array(deps) = deps else {
            return Err(InferenceError::InvalidResponse(format!(
                "Dependencies for task {} must be a list",
                task_id
            )));
        };

        let mut ids = Vec::with_capacity(deps.len());
        for dep in deps {
            match json_id(dep) {
                Some(dep_id) if known.contains(dep_id.as_str()) => ids.push(dep_id),
                _ => {
                    return Err(InferenceError::InvalidResponse(format!(
                        "Invalid dependency ID '{}' for task '{}'",
                        dep, task_id
                    )))
                }
            }
        }
        dependencies.insert(task_id.clone(), ids);
    }

    Ok(dependencies)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tasks() -> Vec<TaskBrief> {
        vec![
            TaskBrief {
                id: "t1".into(),
                name: "Design schema".into(),
                description: "Define tables".into(),
            },
            TaskBrief {
                id: "t2".into(),
                name: "Write migrations".into(),
                description: "Create tables from the schema".into(),
            },
        ]
    }

    #[test]
    fn test_prompt_lists_every_task() {
        let prompt = build_prompt(&tasks());
        assert!(prompt.contains(
            "- ID: t1\n  Name: Design schema\n  Description: Define tables\n\n- ID: t2"
        ));
        assert!(prompt.contains("\"dependencies\": {"));
    }

    #[test]
    fn test_strips_json_fence() {
        let content = "```json\n{\"dependencies\": {}}\n```";
        assert_eq!(strip_code_fence(content), "{\"dependencies\": {}}");
        assert_eq!(strip_code_fence("  {}  "), "{}");
    }

    #[test]
    fn test_strips_unclosed_fence() {
        assert_eq!(strip_code_fence("```json\n{\"dependencies\": {}}"), "{\"dependencies\": {}}");
        assert_eq!(strip_code_fence("{\"dependencies\": {}}\n```"), "{\"dependencies\": {}}");
        assert_eq!(strip_code_fence("```\n{}\n```"), "{}");

        let deps = parse_dependencies("```json\n{\"dependencies\": {\"t2\": [\"t1\"]}}\n", &tasks()).unwrap();
        assert_eq!(deps.get("t2"), Some(&vec!["t1".to_string()]));
    }

    #[test]
    fn test_parses_fenced_response() {
        let content = "```json\n{\"dependencies\": {\"t2\": [\"t1\"]}}\n```";
        let deps = parse_dependencies(content, &tasks()).unwrap();
        assert_eq!(deps.get("t2"), Some(&vec!["t1".to_string()]));
        assert_eq!(deps.len(), 1);
    }

    #[test]
    fn test_rejects_unknown_task_id() {
        let content = r#"{"dependencies": {"t9": ["t1"]}}"#;
        let err = parse_dependencies(content, &tasks()).unwrap_err();
        assert!(err.to_string().contains("Invalid task ID in dependencies: t9"));
    }

    #[test]
    fn test_rejects_unknown_dependency_id() {
        let content = r#"{"dependencies": {"t2": ["t1", "t7"]}}"#;
        let err = parse_dependencies(content, &tasks()).unwrap_err();
        assert!(matches!(err, InferenceError::InvalidResponse(_)));
        assert!(err.to_string().contains("t7"));
    }

    #[test]
    fn test_rejects_non_list_dependencies() {
        let content = r#"{"dependencies": {"t2": "t1"}}"#;
        assert!(parse_dependencies(content, &tasks()).is_err());

        let content = r#"{"dependencies": ["t1"]}"#;
        assert!(parse_dependencies(content, &tasks()).is_err());
    }

    #[test]
    fn test_rejects_non_json_content() {
        let err = parse_dependencies("I think t2 depends on t1.", &tasks()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse JSON"));
    }

    #[test]
    fn test_missing_dependencies_field_is_empty() {
        let deps = parse_dependencies("{}", &tasks()).unwrap();
        assert!(deps.is_empty());
    }

    #[test]
    fn test_rejects_null_dependencies() {
        let err = parse_dependencies(r#"{"dependencies": null}"#, &tasks()).unwrap_err();
        assert!(err.to_string().contains("Dependencies field must be a dictionary"));
    }

    #[test]
    fn test_rejects_non_object_response() {
        let err = parse_dependencies(r#"[{"t2": ["t1"]}]"#, &tasks()).unwrap_err();
        assert!(matches!(err, InferenceError::InvalidResponse(_)));
    }
}
