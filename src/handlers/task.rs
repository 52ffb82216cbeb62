use actix_multipart::Multipart;
use actix_web::{web, HttpRequest, HttpResponse, Result};
use chrono::{DateTime, Utc};
use futures_util::TryStreamExt;
use serde::Deserialize;

use crate::config::AppConfig;
use crate::handlers::auth::authenticate;
use crate::models::task::{NewTask, TaskPatch, TaskStatus};
use crate::storage::{AttachmentStore, StoredAttachment, UploadedFile};
use crate::store::TaskStore;
use crate::utils::errors::ServiceError;

const MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

#[derive(Debug, Deserialize)]
pub struct ListTasksQuery {
    #[serde(rename = "projectId")]
    pub project_id: Option<String>,
}

/// Text fields and the optional file pulled out of a multipart body.
#[derive(Debug, Default)]
pub struct TaskForm {
    pub title: Option<String>,
    pub description: Option<String>,
    pub date: Option<String>,
    pub project_id: Option<String>,
    pub status: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub file: Option<UploadedFile>,
}

async fn parse_task_form(payload: &mut Multipart) -> Result<TaskForm, ServiceError> {
    let mut form = TaskForm::default();

    while let Some(mut field) = payload.try_next().await.map_err(|e| {
        log::error!("Multipart error: {}", e);
        ServiceError::Validation("Invalid multipart data".to_string())
    })? {
        let (name, file_name) = match field.content_disposition() {
            Some(cd) => (
                cd.get_name().map(|n| n.to_string()),
                cd.get_filename().map(|f| f.to_string()),
            ),
            None => (None, None),
        };
        let Some(name) = name else { continue };

        let mut data = Vec::new();
        while let Some(chunk) = field.try_next().await.map_err(|e| {
            log::error!("Multipart chunk error: {}", e);
            ServiceError::Validation("Error reading multipart data".to_string())
        })? {
            data.extend_from_slice(&chunk);
            if data.len() > MAX_FILE_SIZE {
                return Err(ServiceError::Validation(
                    "File size exceeds 10MB limit".to_string(),
                ));
            }
        }

        if name == "file" {
            if let Some(file_name) = file_name {
                form.file = Some(UploadedFile {
                    name: file_name,
                    bytes: data,
                });
            }
            continue;
        }

        let value = String::from_utf8(data).map_err(|_| {
            ServiceError::Validation(format!("Field '{}' is not valid UTF-8", name))
        })?;

        match name.as_str() {
            "title" => form.title = Some(value),
            "description" => form.description = Some(value),
            "date" => form.date = Some(value),
            "projectId" => form.project_id = Some(value),
            "status" => form.status = Some(value),
            "username" => form.username = Some(value),
            "email" => form.email = Some(value),
            // Unknown fields are ignored, as the original backend did.
            _ => {}
        }
    }

    Ok(form)
}

fn require(value: Option<String>, field: &str) -> Result<String, ServiceError> {
    value.ok_or_else(|| ServiceError::Validation(format!("Field '{}' is required", field)))
}

fn parse_status(raw: Option<String>) -> Result<TaskStatus, ServiceError> {
    require(raw, "status")?
        .parse()
        .map_err(|e| ServiceError::Validation(format!("{}", e)))
}

fn parse_date(raw: Option<String>) -> Result<Option<DateTime<Utc>>, ServiceError> {
    match raw {
        Some(raw) => DateTime::parse_from_rfc3339(&raw)
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .map_err(|_| {
                ServiceError::Validation("Field 'date' must be an RFC 3339 timestamp".to_string())
            }),
        None => Ok(None),
    }
}

/// List tasks, optionally filtered by project
#[utoipa::path(
    get,
    path = "/api/tasks",
    tag = "tasks",
    security(("bearer_auth" = [])),
    params(
        ("projectId" = Option<String>, Query, description = "Restrict to a single project")
    ),
    responses(
        (status = 200, description = "Tasks retrieved", body = Vec<crate::models::task::TaskView>),
        (status = 401, description = "Unauthorized", body = crate::models::auth::ErrorResponse),
        (status = 500, description = "Store failure", body = crate::models::auth::ErrorResponse)
    )
)]
pub async fn list_tasks(
    req: HttpRequest,
    store: web::Data<dyn TaskStore>,
    config: web::Data<AppConfig>,
    query: web::Query<ListTasksQuery>,
) -> Result<HttpResponse, ServiceError> {
    log::info!("GET /api/tasks (projectId: {:?})", query.project_id);

    let _user_id = authenticate(&req, &config)?;

    let tasks = store.find(query.project_id.as_deref()).await?;

    log::info!("Retrieved {} tasks", tasks.len());
    Ok(HttpResponse::Ok().json(tasks))
}

/// Create a new task, uploading the attachment first when one is supplied
#[utoipa::path(
    post,
    path = "/api/tasks",
    tag = "tasks",
    security(("bearer_auth" = [])),
    request_body(
        content = inline(crate::models::task::TaskMultipartRequest),
        content_type = "multipart/form-data"
    ),
    responses(
        (status = 200, description = "Task created", body = crate::models::task::TaskView),
        (status = 400, description = "Missing or malformed field", body = crate::models::auth::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::models::auth::ErrorResponse),
        (status = 502, description = "Attachment upload failed", body = crate::models::auth::ErrorResponse)
    )
)]
pub async fn create_task(
    req: HttpRequest,
    store: web::Data<dyn TaskStore>,
    attachments: web::Data<dyn AttachmentStore>,
    config: web::Data<AppConfig>,
    mut payload: Multipart,
) -> Result<HttpResponse, ServiceError> {
    log::info!("POST /api/tasks - Creating new task");

    let user_id = authenticate(&req, &config)?;
    let form = parse_task_form(&mut payload).await?;

    // Field validation runs before any attachment-store call so a rejected
    // request cannot leave an orphaned blob behind.
    let project_id = require(form.project_id, "projectId")?;
    let title = require(form.title, "title")?;
    let date = parse_date(form.date)?;
    let status = parse_status(form.status)?;
    let username = require(form.username, "username")?;
    let email = require(form.email, "email")?;

    // Upload happens-before the insert; an upload failure aborts the whole
    // creation and leaves no record behind.
    let attachment = match &form.file {
        Some(file) => Some(attachments.upload(file).await?),
        None => None,
    };

    let task = store
        .insert(NewTask {
            project_id,
            title,
            description: form.description,
            date,
            status,
            user_id,
            username,
            email,
            attachment,
        })
        .await?;

    log::info!("Task created with ID: {}", task.id);
    Ok(HttpResponse::Ok().json(task))
}

/// Get a single task by id
#[utoipa::path(
    get,
    path = "/api/tasks/{id}",
    tag = "tasks",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Task ID")),
    responses(
        (status = 200, description = "Task retrieved", body = crate::models::task::TaskView),
        (status = 401, description = "Unauthorized", body = crate::models::auth::ErrorResponse),
        (status = 404, description = "Task not found", body = crate::models::auth::ErrorResponse)
    )
)]
pub async fn get_task(
    req: HttpRequest,
    store: web::Data<dyn TaskStore>,
    config: web::Data<AppConfig>,
    path: web::Path<i32>,
) -> Result<HttpResponse, ServiceError> {
    let task_id = path.into_inner();
    log::info!("GET /api/tasks/{}", task_id);

    let _user_id = authenticate(&req, &config)?;

    let task = store
        .find_by_id(task_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound("Task not found".to_string()))?;

    Ok(HttpResponse::Ok().json(task))
}

/// Update a task, replacing or carrying forward its attachment
#[utoipa::path(
    put,
    path = "/api/tasks/{id}",
    tag = "tasks",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Task ID")),
    request_body(
        content = inline(crate::models::task::TaskMultipartRequest),
        content_type = "multipart/form-data"
    ),
    responses(
        (status = 200, description = "Task updated", body = crate::models::task::TaskView),
        (status = 401, description = "Unauthorized", body = crate::models::auth::ErrorResponse),
        (status = 404, description = "Task not found", body = crate::models::auth::ErrorResponse),
        (status = 502, description = "Attachment service failed", body = crate::models::auth::ErrorResponse)
    )
)]
pub async fn update_task(
    req: HttpRequest,
    store: web::Data<dyn TaskStore>,
    attachments: web::Data<dyn AttachmentStore>,
    config: web::Data<AppConfig>,
    path: web::Path<i32>,
    mut payload: Multipart,
) -> Result<HttpResponse, ServiceError> {
    let task_id = path.into_inner();
    log::info!("PUT /api/tasks/{}", task_id);

    let _user_id = authenticate(&req, &config)?;

    let existing = store
        .find_by_id(task_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound("Task not found".to_string()))?;

    let form = parse_task_form(&mut payload).await?;

    // Field validation runs before any attachment-store call. A rejected
    // update must leave the existing blob untouched; deleting it first
    // would strand the persisted row's attachment pair.
    let project_id = require(form.project_id, "projectId")?;
    let title = require(form.title, "title")?;
    let date = parse_date(form.date)?;
    let status = parse_status(form.status)?;

    let existing_attachment = existing
        .file
        .clone()
        .zip(existing.file_public_id.clone())
        .map(|(url, public_id)| StoredAttachment { url, public_id });

    // Replacing the attachment deletes the old blob first; without a new
    // file, the stored pair is carried forward so the update cannot null
    // it out.
    let attachment = match &form.file {
        Some(file) => {
            if let Some(old) = &existing_attachment {
                attachments.delete(&old.public_id).await?;
            }
            Some(attachments.upload(file).await?)
        }
        None => existing_attachment,
    };

    let updated = store
        .update(
            task_id,
            TaskPatch {
                project_id,
                title,
                description: form.description,
                date,
                status,
                attachment,
            },
        )
        .await?
        .ok_or_else(|| ServiceError::NotFound("Task not found".to_string()))?;

    log::info!("Task updated: {}", task_id);
    Ok(HttpResponse::Ok().json(updated))
}

/// Delete a task and best-effort delete its attachment
#[utoipa::path(
    delete,
    path = "/api/tasks/{id}",
    tag = "tasks",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Task ID")),
    responses(
        (status = 204, description = "Task deleted"),
        (status = 401, description = "Unauthorized", body = crate::models::auth::ErrorResponse),
        (status = 404, description = "Task not found", body = crate::models::auth::ErrorResponse)
    )
)]
pub async fn delete_task(
    req: HttpRequest,
    store: web::Data<dyn TaskStore>,
    attachments: web::Data<dyn AttachmentStore>,
    config: web::Data<AppConfig>,
    path: web::Path<i32>,
) -> Result<HttpResponse, ServiceError> {
    let task_id = path.into_inner();
    log::info!("DELETE /api/tasks/{}", task_id);

    let _user_id = authenticate(&req, &config)?;

    let deleted = store
        .delete(task_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound("Task not found".to_string()))?;

    // The record is already gone at this point. A failed external delete
    // orphans the blob; the request still succeeds.
    if let Some(attachment) = deleted.attachment() {
        if let Err(e) = attachments.delete(&attachment.public_id).await {
            log::warn!(
                "Orphaned attachment {} for deleted task {}: {}",
                attachment.public_id,
                task_id,
                e
            );
        }
    }

    log::info!("Task deleted: {}", task_id);
    Ok(HttpResponse::NoContent().finish())
}

pub fn task_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/tasks")
            .route("", web::post().to(create_task))
            .route("", web::get().to(list_tasks))
            .route("/{id}", web::get().to(get_task))
            .route("/{id}", web::put().to(update_task))
            .route("/{id}", web::patch().to(update_task))
            .route("/{id}", web::delete().to(delete_task)),
    );
}
