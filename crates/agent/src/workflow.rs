//! Store-backed workflow: fetch tasks, infer dependencies, resolve, write back.

use tda_ai::{DependencyInference, InferenceError};
use tda_core::{
    DependencyGraph, ResolutionResult, TaskBrief, TaskUpdate, UpdateStatus, WorkflowResult,
};
use tda_execution::DependencyResolver;
use tda_storage::{StoreError, TaskStore};
use tracing::{error, info, warn};

/// Message returned when the store is empty.
pub const NO_TASKS_MESSAGE: &str = "No tasks found in database";

/// Workflow failures.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// No store configured
    #[error("Database client not initialized")]
    StoreNotConfigured,

    /// No inference client configured
    #[error("Inference client not initialized")]
    InferenceNotConfigured,

    /// Reading the store failed
    #[error("Failed to retrieve tasks from database: {0}")]
    Retrieve(#[source] StoreError),

    /// Inference failed
    #[error("Failed to infer dependencies: {0}")]
    Infer(#[source] InferenceError),

    /// Writing results back failed
    #[error("Failed to update tasks in database: {0}")]
    Update(#[source] StoreError),
}

/// Run the store-backed workflow once.
///
/// Every stored task ends up in the dependency mapping, with an empty list
/// when inference named no dependencies for it. The whole write-back is one
/// batch, so the store never holds a half-applied result.
///
/// An empty store succeeds without consulting `inference`, so a missing
/// inference client only fails when there is something to infer.
pub async fn resolve_from_store(
    store: &dyn TaskStore,
    inference: Option<&dyn DependencyInference>,
    resolver: &DependencyResolver,
) -> Result<WorkflowResult, WorkflowError> {
    info!("Starting store workflow: retrieve -> infer -> update");

    let tasks = store.get_all_tasks().await.map_err(|e| {
        error!("Task retrieval failed: {}", e);
        WorkflowError::Retrieve(e)
    })?;

    if tasks.is_empty() {
        warn!("{}", NO_TASKS_MESSAGE);
        return Ok(WorkflowResult::empty(NO_TASKS_MESSAGE));
    }

    let inference = inference.ok_or(WorkflowError::InferenceNotConfigured)?;
    let briefs: Vec<TaskBrief> = tasks.iter().map(TaskBrief::from).collect();
    let mut inferred = inference.infer_dependencies(&briefs).await.map_err(|e| {
        error!("Dependency inference failed: {}", e);
        WorkflowError::Infer(e)
    })?;

    let graph: DependencyGraph = tasks
        .iter()
        .map(|t| (t.id.clone(), inferred.remove(&t.id).unwrap_or_default()))
        .collect();

    let result = resolver.resolve(&graph);
    let updates = write_back_updates(&result);

    store.update_tasks_batch(&updates).await.map_err(|e| {
        error!("Task write-back failed: {}", e);
        WorkflowError::Update(e)
    })?;

    info!(
        "Store workflow completed: {} ordered, {} blocked",
        result.execution_order.len(),
        result.blocked_tasks.len()
    );

    Ok(WorkflowResult {
        dependencies: result.raw_graph.as_map().clone(),
        execution_order: result.execution_order,
        blocked_tasks: result.blocked_tasks,
        cycles_detected: result.cycles_detected,
        message: None,
    })
}

/// Updates recording a resolution in the store.
///
/// Ordered tasks get their 1-based position and `ready`; blocked tasks get
/// `blocked` and the cycles that pass through them.
pub fn write_back_updates(result: &ResolutionResult) -> Vec<TaskUpdate> {
    let deps_of = |id: &str| {
        result
            .raw_graph
            .dependencies(id)
            .map(<[String]>::to_vec)
            .unwrap_or_default()
    };

    let ordered = result.execution_order.iter().enumerate().map(|(i, id)| {
        TaskUpdate::new(id.clone())
            .with_depends_on(deps_of(id))
            .with_execution_order(i + 1)
            .with_status(UpdateStatus::Ready)
    });

    let blocked = result.blocked_tasks.iter().map(|id| {
        TaskUpdate::new(id.clone())
            .with_depends_on(deps_of(id))
            .with_status(UpdateStatus::Blocked)
            .with_cycle_info(result.cycles_containing(id))
    });

    ordered.chain(blocked).collect()
}
