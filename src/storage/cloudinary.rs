use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config::CloudinaryConfig;
use crate::storage::{AttachmentError, AttachmentStore, StoredAttachment, UploadedFile};

const DEFAULT_API_BASE: &str = "https://api.cloudinary.com";

/// Cloudinary REST client. Uploads land under the configured folder with a
/// generated public id, so the deletion handle is known up front.
pub struct CloudinaryClient {
    http: reqwest::Client,
    cloud_name: String,
    api_key: String,
    api_secret: String,
    folder: String,
    api_base: String,
}

#[derive(Debug, Deserialize)]
struct UploadResult {
    secure_url: String,
    public_id: String,
}

#[derive(Debug, Deserialize)]
struct DestroyResult {
    result: String,
}

impl CloudinaryClient {
    pub fn new(config: &CloudinaryConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            cloud_name: config.cloud_name.clone(),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
            folder: config.folder.clone(),
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }

    #[cfg(test)]
    fn with_api_base(mut self, base: &str) -> Self {
        self.api_base = base.to_string();
        self
    }

    /// Signature over the alphabetically ordered request params, with the
    /// API secret appended, per Cloudinary's signing rules.
    fn sign(&self, params: &[(&str, &str)]) -> String {
        let to_sign = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");

        let mut hasher = Sha256::new();
        hasher.update(to_sign.as_bytes());
        hasher.update(self.api_secret.as_bytes());
        hasher
            .finalize()
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect()
    }

    fn endpoint(&self, action: &str) -> String {
        format!("{}/v1_1/{}/image/{}", self.api_base, self.cloud_name, action)
    }
}

#[async_trait]
impl AttachmentStore for CloudinaryClient {
    async fn upload(&self, file: &UploadedFile) -> Result<StoredAttachment, AttachmentError> {
        let public_id = format!("{}/{}", self.folder, Uuid::new_v4());
        let timestamp = Utc::now().timestamp().to_string();
        let signature = self.sign(&[
            ("public_id", public_id.as_str()),
            ("signature_algorithm", "sha256"),
            ("timestamp", timestamp.as_str()),
        ]);

        let form = reqwest::multipart::Form::new()
            .text("api_key", self.api_key.clone())
            .text("public_id", public_id)
            .text("signature_algorithm", "sha256")
            .text("timestamp", timestamp)
            .text("signature", signature)
            .part(
                "file",
                reqwest::multipart::Part::bytes(file.bytes.clone()).file_name(file.name.clone()),
            );

        let response = self
            .http
            .post(self.endpoint("upload"))
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AttachmentError::Upload(format!("{}: {}", status, body)));
        }

        let result: UploadResult = response.json().await?;
        log::info!("Uploaded attachment {} to Cloudinary", result.public_id);

        Ok(StoredAttachment {
            url: result.secure_url,
            public_id: result.public_id,
        })
    }

    async fn delete(&self, public_id: &str) -> Result<(), AttachmentError> {
        let timestamp = Utc::now().timestamp().to_string();
        let signature = self.sign(&[
            ("public_id", public_id),
            ("signature_algorithm", "sha256"),
            ("timestamp", timestamp.as_str()),
        ]);

        let response = self
            .http
            .post(self.endpoint("destroy"))
            .form(&[
                ("api_key", self.api_key.as_str()),
                ("public_id", public_id),
                ("signature_algorithm", "sha256"),
                ("timestamp", &timestamp),
                ("signature", &signature),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AttachmentError::Delete(format!("{}: {}", status, body)));
        }

        let result: DestroyResult = response.json().await?;
        // "not found" means the blob is already gone; nothing left to do.
        match result.result.as_str() {
            "ok" | "not found" => {
                log::info!("Deleted attachment {} from Cloudinary", public_id);
                Ok(())
            }
            other => Err(AttachmentError::Delete(format!(
                "unexpected destroy result '{}' for {}",
                other, public_id
            ))),
        }
    }
}
