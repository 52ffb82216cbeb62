use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use crate::models::auth::UserPublic;
use crate::models::task::{NewTask, TaskPatch, TaskRecord, TaskStatus, TaskView};
use crate::store::{StoreError, TaskStore};

const TASK_USER_COLUMNS: &str = "t.id, t.project_id, t.title, t.description, t.date, t.status, \
     t.user_id, t.username, t.email, t.file_url, t.file_public_id, t.created_at, t.updated_at, \
     u.id AS owner_id, u.username AS owner_username, u.name AS owner_name, u.email AS owner_email";

pub struct PgTaskStore {
    pool: PgPool,
}

impl PgTaskStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn parse_status(raw: &str) -> Result<TaskStatus, sqlx::Error> {
    raw.parse()
        .map_err(|e| sqlx::Error::Decode(Box::new(e)))
}

/// Maps a joined task/user row to the composed view. The LEFT JOIN means a
/// missing user row comes back as a null expansion, not an error.
fn view_from_row(row: &PgRow) -> Result<TaskView, sqlx::Error> {
    let status: String = row.try_get("status")?;
    let owner_id: Option<i32> = row.try_get("owner_id")?;

    let user = match owner_id {
        Some(id) => Some(UserPublic {
            id,
            username: row.try_get("owner_username")?,
            name: row.try_get("owner_name")?,
            email: row.try_get("owner_email")?,
        }),
        None => None,
    };

    Ok(TaskView {
        id: row.try_get("id")?,
        project_id: row.try_get("project_id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        date: row.try_get("date")?,
        status: parse_status(&status)?,
        user,
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        file: row.try_get("file_url")?,
        file_public_id: row.try_get("file_public_id")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn record_from_row(row: &PgRow) -> Result<TaskRecord, sqlx::Error> {
    let status: String = row.try_get("status")?;
    Ok(TaskRecord {
        id: row.try_get("id")?,
        project_id: row.try_get("project_id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        date: row.try_get("date")?,
        status: parse_status(&status)?,
        user_id: row.try_get("user_id")?,
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        file_url: row.try_get("file_url")?,
        file_public_id: row.try_get("file_public_id")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl TaskStore for PgTaskStore {
    async fn find(&self, project_id: Option<&str>) -> Result<Vec<TaskView>, StoreError> {
        let rows = match project_id {
            Some(project_id) => {
                sqlx::query(&format!(
                    "SELECT {TASK_USER_COLUMNS} FROM tasks t \
                     LEFT JOIN users u ON u.id = t.user_id \
                     WHERE t.project_id = $1 ORDER BY t.id"
                ))
                .bind(project_id)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(&format!(
                    "SELECT {TASK_USER_COLUMNS} FROM tasks t \
                     LEFT JOIN users u ON u.id = t.user_id ORDER BY t.id"
                ))
                .fetch_all(&self.pool)
                .await?
            }
        };

        let mut tasks = Vec::with_capacity(rows.len());
        for row in &rows {
            tasks.push(view_from_row(row)?);
        }
        Ok(tasks)
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<TaskView>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {TASK_USER_COLUMNS} FROM tasks t \
             LEFT JOIN users u ON u.id = t.user_id WHERE t.id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(view_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn insert(&self, task: NewTask) -> Result<TaskView, StoreError> {
        let (file_url, file_public_id) = match &task.attachment {
            Some(attachment) => (Some(attachment.url.as_str()), Some(attachment.public_id.as_str())),
            None => (None, None),
        };

        let row = sqlx::query(
            "INSERT INTO tasks \
             (project_id, title, description, date, status, user_id, username, email, file_url, file_public_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING id",
        )
        .bind(&task.project_id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.date)
        .bind(task.status.as_str())
        .bind(task.user_id)
        .bind(&task.username)
        .bind(&task.email)
        .bind(file_url)
        .bind(file_public_id)
        .fetch_one(&self.pool)
        .await?;

        let id: i32 = row.try_get("id").map_err(StoreError::Database)?;
        self.find_by_id(id)
            .await?
            .ok_or(StoreError::Database(sqlx::Error::RowNotFound))
    }

    async fn update(&self, id: i32, patch: TaskPatch) -> Result<Option<TaskView>, StoreError> {
        let (file_url, file_public_id) = match &patch.attachment {
            Some(attachment) => (Some(attachment.url.as_str()), Some(attachment.public_id.as_str())),
            None => (None, None),
        };

        let row = sqlx::query(
            "UPDATE tasks SET project_id = $1, title = $2, description = $3, date = $4, \
             status = $5, file_url = $6, file_public_id = $7, updated_at = NOW() \
             WHERE id = $8 RETURNING id",
        )
        .bind(&patch.project_id)
        .bind(&patch.title)
        .bind(&patch.description)
        .bind(patch.date)
        .bind(patch.status.as_str())
        .bind(file_url)
        .bind(file_public_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        if row.is_none() {
            return Ok(None);
        }
        self.find_by_id(id).await
    }

    async fn delete(&self, id: i32) -> Result<Option<TaskRecord>, StoreError> {
        let row = sqlx::query(
            "DELETE FROM tasks WHERE id = $1 \
             RETURNING id, project_id, title, description, date, status, user_id, \
             username, email, file_url, file_public_id, created_at, updated_at",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(record_from_row(&row)?)),
            None => Ok(None),
        }
    }
}
