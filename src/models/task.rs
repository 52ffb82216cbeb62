use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

use crate::models::auth::UserPublic;
use crate::storage::StoredAttachment;

/// Task workflow status. Stored as text in the `tasks` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Done,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Done => "done",
        }
    }
}

impl FromStr for TaskStatus {
    type Err = InvalidStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "todo" => Ok(TaskStatus::Todo),
            "in_progress" => Ok(TaskStatus::InProgress),
            "done" => Ok(TaskStatus::Done),
            other => Err(InvalidStatus(other.to_string())),
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub struct InvalidStatus(pub String);

impl fmt::Display for InvalidStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid task status '{}'", self.0)
    }
}

impl std::error::Error for InvalidStatus {}

/// A task row as persisted, without the owner expansion.
#[derive(Debug, Clone, Serialize)]
pub struct TaskRecord {
    pub id: i32,
    pub project_id: String,
    pub title: String,
    pub description: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub status: TaskStatus,
    pub user_id: i32,
    pub username: String,
    pub email: String,
    pub file_url: Option<String>,
    pub file_public_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TaskRecord {
    /// The attachment pair, present only when both halves are set.
    pub fn attachment(&self) -> Option<StoredAttachment> {
        match (&self.file_url, &self.file_public_id) {
            (Some(url), Some(public_id)) => Some(StoredAttachment {
                url: url.clone(),
                public_id: public_id.clone(),
            }),
            _ => None,
        }
    }
}

/// A task joined with the owning user's public projection. This is the
/// response shape for every task endpoint.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskView {
    pub id: i32,
    pub project_id: String,
    pub title: String,
    pub description: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub status: TaskStatus,
    /// Owning user, expanded from `user_id`. Null when the user row is gone.
    pub user: Option<UserPublic>,
    /// Username snapshot taken from the create request, not kept in sync
    /// with the user record.
    pub username: String,
    /// Email snapshot, same rules as `username`.
    pub email: String,
    pub file: Option<String>,
    pub file_public_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for a task insert. `user_id` comes from the authenticated session;
/// everything else comes from the multipart body.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub project_id: String,
    pub title: String,
    pub description: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub status: TaskStatus,
    pub user_id: i32,
    pub username: String,
    pub email: String,
    pub attachment: Option<StoredAttachment>,
}

/// Fields persisted over an existing task on update. The owner and the
/// username/email snapshot are immutable and deliberately absent here.
/// `attachment` is the final attachment state, already resolved by the
/// handler (replacement or carry-forward).
#[derive(Debug, Clone)]
pub struct TaskPatch {
    pub project_id: String,
    pub title: String,
    pub description: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub status: TaskStatus,
    pub attachment: Option<StoredAttachment>,
}

/// Multipart request shape for create/update, documented for Swagger only.
#[derive(Debug, Deserialize, ToSchema)]
#[allow(dead_code)]
pub struct TaskMultipartRequest {
    pub title: String,
    pub description: Option<String>,
    /// RFC 3339 timestamp.
    pub date: Option<String>,
    #[serde(rename = "projectId")]
    pub project_id: String,
    pub status: String,
    pub username: Option<String>,
    pub email: Option<String>,
    /// Optional attachment payload.
    #[schema(format = "binary")]
    pub file: Option<String>,
}
