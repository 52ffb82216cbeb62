pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::task::{NewTask, TaskPatch, TaskRecord, TaskView};

pub use postgres::PgTaskStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("task store unavailable: {0}")]
    Unavailable(String),
}

/// Persistence seam for tasks. Every read returns the task joined with the
/// owning user's public projection, so handlers never resolve the foreign
/// key themselves. Single-row operations are atomic per the backing store;
/// there is no cross-call transaction.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// All tasks, optionally restricted to a project, in insertion order.
    async fn find(&self, project_id: Option<&str>) -> Result<Vec<TaskView>, StoreError>;

    async fn find_by_id(&self, id: i32) -> Result<Option<TaskView>, StoreError>;

    async fn insert(&self, task: NewTask) -> Result<TaskView, StoreError>;

    /// Persists the patch over an existing task. `None` when the id is gone.
    async fn update(&self, id: i32, patch: TaskPatch) -> Result<Option<TaskView>, StoreError>;

    /// Removes the task, returning the deleted row so the caller can clean
    /// up its attachment. `None` when the id is gone.
    async fn delete(&self, id: i32) -> Result<Option<TaskRecord>, StoreError>;
}
