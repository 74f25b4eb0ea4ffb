//! Task store trait abstraction.

use async_trait::async_trait;
use tda_core::{StoredTask, TaskUpdate};

/// Error type for task store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur during task store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Backend temporarily unreachable
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A referenced task does not exist
    #[error("Task with id '{0}' not found in database")]
    NotFound(String),

    /// An update is malformed
    #[error("invalid update: {0}")]
    InvalidUpdate(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl StoreError {
    /// Whether retrying the same call may succeed.
    ///
    /// Only connection-level failures qualify; application errors such as a
    /// missing task never do.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Unavailable(_))
    }
}

/// Storage abstraction for task records.
///
/// Implementations use interior mutability so one store can be shared
/// behind an `Arc` by concurrent requests.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Load every task, normalized.
    async fn get_all_tasks(&self) -> Result<Vec<StoredTask>>;

    /// Apply all updates atomically.
    ///
    /// Either every update is applied or none is. Fails with
    /// [`StoreError::NotFound`] if any referenced id is absent.
    async fn update_tasks_batch(&self, updates: &[TaskUpdate]) -> Result<()>;
}

#[async_trait]
impl<T: TaskStore + ?Sized> TaskStore for std::sync::Arc<T> {
    async fn get_all_tasks(&self) -> Result<Vec<StoredTask>> {
        (**self).get_all_tasks().await
    }

    async fn update_tasks_batch(&self, updates: &[TaskUpdate]) -> Result<()> {
        (**self).update_tasks_batch(updates).await
    }
}

/// Reject updates with an empty id before touching any backend.
pub(crate) fn check_update_ids(updates: &[TaskUpdate]) -> Result<()> {
    match updates.iter().position(|u| u.id.is_empty()) {
        Some(idx) => Err(StoreError::InvalidUpdate(format!(
            "update at index {} is missing 'id'",
            idx
        ))),
        None => Ok(()),
    }
}
