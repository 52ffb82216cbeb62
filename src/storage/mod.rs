pub mod cloudinary;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use cloudinary::CloudinaryClient;

/// A file payload pulled out of a multipart request.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// What the media host hands back for a stored blob: a public retrieval URL
/// and the opaque handle needed to delete it later. The two always travel
/// together on a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredAttachment {
    pub url: String,
    pub public_id: String,
}

#[derive(Debug, Error)]
pub enum AttachmentError {
    #[error("attachment upload failed: {0}")]
    Upload(String),
    #[error("attachment delete failed: {0}")]
    Delete(String),
    #[error("attachment service request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// The external media host, seen by handlers as upload/delete only. Calls
/// block the request path; there is no timeout or retry policy here.
#[async_trait]
pub trait AttachmentStore: Send + Sync {
    async fn upload(&self, file: &UploadedFile) -> Result<StoredAttachment, AttachmentError>;

    async fn delete(&self, public_id: &str) -> Result<(), AttachmentError>;
}
