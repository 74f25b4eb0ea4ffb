//! JSON file task store.
//!
//! Keeps every task document in a single JSON array file. Documents are kept
//! raw so fields this crate does not know about survive updates; they are
//! normalized into [`StoredTask`] on read. Batch updates are applied to an
//! in-memory copy first and the file is replaced through a temp file + rename,
//! so a failed batch leaves the file untouched.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tda_core::{json_id, StoredTask, TaskUpdate};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

use super::trait_::check_update_ids;
use super::{Result, StoreError, TaskStore};

/// File-based JSON task store.
pub struct JsonTaskStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonTaskStore {
    /// Open the store at `path`, creating an empty task file if needed.
    pub async fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        if fs::metadata(&path).await.is_err() {
            fs::write(&path, b"[]").await?;
        }

        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    /// Location of the task file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_documents(&self) -> Result<Vec<Value>> {
        let raw = fs::read_to_string(&self.path).await?;
        match serde_json::from_str::<Value>(&raw)? {
            Value::Array(docs) => Ok(docs),
            _ => Err(StoreError::Other(format!(
                "{} does not contain a JSON array",
                self.path.display()
            ))),
        }
    }

    async fn write_documents(&self, docs: &[Value]) -> Result<()> {
        let tmp = self.path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(docs)?;
        fs::write(&tmp, json.as_bytes()).await?;
        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl TaskStore for JsonTaskStore {
    async fn get_all_tasks(&self) -> Result<Vec<StoredTask>> {
        let docs = self.read_documents().await?;
        Ok(docs.iter().map(StoredTask::from_document).collect())
    }

    async fn update_tasks_batch(&self, updates: &[TaskUpdate]) -> Result<()> {
        check_update_ids(updates)?;

        let _guard = self.write_lock.lock().await;
        let mut docs = self.read_documents().await?;
        let now = chrono::Utc::now().to_rfc3339();

        for update in updates {
            let doc = docs
                .iter_mut()
                .find(|d| document_id(d).as_deref() == Some(update.id.as_str()))
                .ok_or_else(|| StoreError::NotFound(update.id.clone()))?;
            apply_update(doc, update, &now)?;
        }

        self.write_documents(&docs).await?;
        debug!("Applied {} task updates to {}", updates.len(), self.path.display());
        Ok(())
    }
}

/// Identifier of a raw document, `task_id` first.
fn document_id(doc: &Value) -> Option<String> {
    ["task_id", "id"]
        .iter()
        .filter_map(|k| doc.get(*k))
        .find_map(json_id)
}

fn apply_update(doc: &mut Value, update: &TaskUpdate, now: &str) -> Result<()> {
    let Value::Object(fields) = doc else {
        return Err(StoreError::InvalidUpdate(format!(
            "document for '{}' is not an object",
            update.id
        )));
    };

    if let Some(depends_on) = &update.depends_on {
        fields.insert("depends_on".into(), Value::from(depends_on.clone()));
    }
    if let Some(position) = update.execution_order {
        fields.insert("execution_order".into(), Value::from(position));
    }
    if let Some(status) = update.status {
        // Mirror into `task_status` so prefixed readers see it too
        fields.insert("status".into(), Value::from(status.as_str()));
        fields.insert("task_status".into(), Value::from(status.as_str()));
    }
    if let Some(cycles) = &update.cycle_info {
        fields.insert("cycle_info".into(), serde_json::to_value(cycles)?);
    }
    fields.insert("updated_at".into(), Value::from(now));

    Ok(())
}
