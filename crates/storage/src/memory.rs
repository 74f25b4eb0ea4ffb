//! In-memory task store.

use async_trait::async_trait;
use tda_core::{StoredTask, TaskUpdate};
use tokio::sync::Mutex;

use super::trait_::check_update_ids;
use super::{Result, StoreError, TaskStore};

/// Task store holding everything in memory.
#[derive(Default)]
pub struct MemoryTaskStore {
    tasks: Mutex<Vec<StoredTask>>,
}

impl MemoryTaskStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `tasks`.
    pub fn with_tasks(tasks: Vec<StoredTask>) -> Self {
        Self {
            tasks: Mutex::new(tasks),
        }
    }

    /// Copy of the current contents.
    pub async fn snapshot(&self) -> Vec<StoredTask> {
        self.tasks.lock().await.clone()
    }
}

#[async_trait]
impl TaskStore for MemoryTaskStore {
    async fn get_all_tasks(&self) -> Result<Vec<StoredTask>> {
        Ok(self.snapshot().await)
    }

    async fn update_tasks_batch(&self, updates: &[TaskUpdate]) -> Result<()> {
        check_update_ids(updates)?;

        let mut tasks = self.tasks.lock().await;
        let mut staged = tasks.clone();

        for update in updates {
            let task = staged
                .iter_mut()
                .find(|t| t.id == update.id)
                .ok_or_else(|| StoreError::NotFound(update.id.clone()))?;

            if let Some(depends_on) = &update.depends_on {
                task.depends_on = depends_on.clone();
            }
            if let Some(position) = update.execution_order {
                task.execution_order = Some(position);
            }
            if let Some(status) = update.status {
                task.status = status.as_str().to_string();
            }
        }

        *tasks = staged;
        Ok(())
    }
}
