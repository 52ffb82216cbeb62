//! Shared test doubles and request helpers for the task API tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use actix_http::Request;
use actix_web::body::BoxBody;
use actix_web::dev::{Service, ServiceResponse};
use actix_web::{test, web, App};
use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};

use taskdeck_be::config::{AppConfig, CloudinaryConfig};
use taskdeck_be::handlers::auth::Claims;
use taskdeck_be::handlers::task_config;
use taskdeck_be::models::auth::UserPublic;
use taskdeck_be::models::task::{NewTask, TaskPatch, TaskRecord, TaskView};
use taskdeck_be::storage::{AttachmentError, AttachmentStore, StoredAttachment, UploadedFile};
use taskdeck_be::store::{StoreError, TaskStore};

pub const TEST_SECRET: &str = "test-secret";
pub const TEST_USER_ID: i32 = 7;

/// In-memory task store keeping insertion order, with a switch to simulate
/// a database outage.
pub struct MemTaskStore {
    tasks: Mutex<Vec<TaskRecord>>,
    next_id: AtomicI32,
    users: HashMap<i32, UserPublic>,
    pub fail: AtomicBool,
}

impl MemTaskStore {
    pub fn new() -> Self {
        let mut users = HashMap::new();
        users.insert(
            TEST_USER_ID,
            UserPublic {
                id: TEST_USER_ID,
                username: "ada".to_string(),
                name: "Ada Lovelace".to_string(),
                email: "ada@example.com".to_string(),
            },
        );
        Self {
            tasks: Mutex::new(Vec::new()),
            next_id: AtomicI32::new(1),
            users,
            fail: AtomicBool::new(false),
        }
    }

    pub fn len(&self) -> usize {
        self.tasks.lock().unwrap().len()
    }

    fn view(&self, record: &TaskRecord) -> TaskView {
        TaskView {
            id: record.id,
            project_id: record.project_id.clone(),
            title: record.title.clone(),
            description: record.description.clone(),
            date: record.date,
            status: record.status,
            user: self.users.get(&record.user_id).cloned(),
            username: record.username.clone(),
            email: record.email.clone(),
            file: record.file_url.clone(),
            file_public_id: record.file_public_id.clone(),
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.fail.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("simulated outage".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl TaskStore for MemTaskStore {
    async fn find(&self, project_id: Option<&str>) -> Result<Vec<TaskView>, StoreError> {
        self.check()?;
        let tasks = self.tasks.lock().unwrap();
        Ok(tasks
            .iter()
            .filter(|t| project_id.map_or(true, |p| t.project_id == p))
            .map(|t| self.view(t))
            .collect())
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<TaskView>, StoreError> {
        self.check()?;
        let tasks = self.tasks.lock().unwrap();
        Ok(tasks.iter().find(|t| t.id == id).map(|t| self.view(t)))
    }

    async fn insert(&self, task: NewTask) -> Result<TaskView, StoreError> {
        self.check()?;
        let now = Utc::now();
        let (file_url, file_public_id) = match task.attachment {
            Some(a) => (Some(a.url), Some(a.public_id)),
            None => (None, None),
        };
        let record = TaskRecord {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            project_id: task.project_id,
            title: task.title,
            description: task.description,
            date: task.date,
            status: task.status,
            user_id: task.user_id,
            username: task.username,
            email: task.email,
            file_url,
            file_public_id,
            created_at: now,
            updated_at: now,
        };
        let view = self.view(&record);
        self.tasks.lock().unwrap().push(record);
        Ok(view)
    }

    async fn update(&self, id: i32, patch: TaskPatch) -> Result<Option<TaskView>, StoreError> {
        self.check()?;
        let mut tasks = self.tasks.lock().unwrap();
        let Some(record) = tasks.iter_mut().find(|t| t.id == id) else {
            return Ok(None);
        };
        record.project_id = patch.project_id;
        record.title = patch.title;
        record.description = patch.description;
        record.date = patch.date;
        record.status = patch.status;
        match patch.attachment {
            Some(a) => {
                record.file_url = Some(a.url);
                record.file_public_id = Some(a.public_id);
            }
            None => {
                record.file_url = None;
                record.file_public_id = None;
            }
        }
        record.updated_at = Utc::now();
        let record = record.clone();
        drop(tasks);
        Ok(Some(self.view(&record)))
    }

    async fn delete(&self, id: i32) -> Result<Option<TaskRecord>, StoreError> {
        self.check()?;
        let mut tasks = self.tasks.lock().unwrap();
        let pos = tasks.iter().position(|t| t.id == id);
        Ok(pos.map(|pos| tasks.remove(pos)))
    }
}

/// Attachment store double that records every call and hands out
/// sequential url/handle pairs: u1/h1, u2/h2, ...
pub struct RecordingAttachments {
    counter: AtomicU32,
    pub uploads: Mutex<Vec<String>>,
    pub deletes: Mutex<Vec<String>>,
    pub fail_uploads: AtomicBool,
    pub fail_deletes: AtomicBool,
}

impl RecordingAttachments {
    pub fn new() -> Self {
        Self {
            counter: AtomicU32::new(0),
            uploads: Mutex::new(Vec::new()),
            deletes: Mutex::new(Vec::new()),
            fail_uploads: AtomicBool::new(false),
            fail_deletes: AtomicBool::new(false),
        }
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.lock().unwrap().len()
    }

    pub fn deleted_handles(&self) -> Vec<String> {
        self.deletes.lock().unwrap().clone()
    }
}

#[async_trait]
impl AttachmentStore for RecordingAttachments {
    async fn upload(&self, file: &UploadedFile) -> Result<StoredAttachment, AttachmentError> {
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(AttachmentError::Upload("simulated outage".to_string()));
        }
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        self.uploads.lock().unwrap().push(file.name.clone());
        Ok(StoredAttachment {
            url: format!("u{}", n),
            public_id: format!("h{}", n),
        })
    }

    async fn delete(&self, public_id: &str) -> Result<(), AttachmentError> {
        self.deletes.lock().unwrap().push(public_id.to_string());
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(AttachmentError::Delete("simulated outage".to_string()));
        }
        Ok(())
    }
}

pub fn test_config() -> AppConfig {
    AppConfig {
        database_url: "postgres://unused".to_string(),
        port: 0,
        jwt_secret: TEST_SECRET.to_string(),
        environment: "test".to_string(),
        frontend_urls: vec![],
        cloudinary: CloudinaryConfig {
            cloud_name: "test".to_string(),
            api_key: "key".to_string(),
            api_secret: "secret".to_string(),
            folder: "taskdeck".to_string(),
        },
    }
}

pub fn bearer_token() -> String {
    let now = Utc::now();
    let claims = Claims {
        sub: TEST_USER_ID.to_string(),
        username: "ada".to_string(),
        exp: (now.timestamp() + 3600) as usize,
        iat: now.timestamp() as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_SECRET.as_ref()),
    )
    .unwrap()
}

pub fn auth_header() -> (&'static str, String) {
    ("Authorization", format!("Bearer {}", bearer_token()))
}

pub async fn init_app(
    store: Arc<MemTaskStore>,
    attachments: Arc<RecordingAttachments>,
) -> impl Service<Request, Response = ServiceResponse<BoxBody>, Error = actix_web::Error> {
    let store: Arc<dyn TaskStore> = store;
    let attachments: Arc<dyn AttachmentStore> = attachments;
    test::init_service(
        App::new()
            .app_data(web::Data::from(store))
            .app_data(web::Data::from(attachments))
            .app_data(web::Data::new(test_config()))
            .configure(task_config),
    )
    .await
}

pub const BOUNDARY: &str = "taskdeck-test-boundary";

pub fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={}", BOUNDARY)
}

/// Builds a multipart/form-data body from text fields plus an optional file
/// part named `file`.
pub fn multipart_body(fields: &[(&str, &str)], file: Option<(&str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
        );
        body.extend_from_slice(value.as_bytes());
        body.extend_from_slice(b"\r\n");
    }
    if let Some((file_name, bytes)) = file {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n",
                file_name
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

/// Standard create form for a task in the given project.
pub fn task_fields<'a>(title: &'a str, project_id: &'a str) -> Vec<(&'a str, &'a str)> {
    vec![
        ("title", title),
        ("description", "a task"),
        ("date", "2026-09-01T09:00:00Z"),
        ("projectId", project_id),
        ("status", "todo"),
        ("username", "ada"),
        ("email", "ada@example.com"),
    ]
}
