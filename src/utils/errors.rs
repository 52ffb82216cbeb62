use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

use crate::models::auth::ErrorResponse;
use crate::storage::AttachmentError;
use crate::store::StoreError;

/// Top-level request error. Not-found is typed separately from
/// infrastructure failures so the two map to distinct status codes: 404 for
/// a missing resource, 502 for the attachment service, 500 for the store.
/// Clients get fixed messages; the raw cause is logged server-side only.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Attachment(#[from] AttachmentError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    fn client_message(&self) -> String {
        match self {
            ServiceError::Unauthorized(msg)
            | ServiceError::Validation(msg)
            | ServiceError::NotFound(msg) => msg.clone(),
            ServiceError::Attachment(_) => "Attachment service unavailable".to_string(),
            ServiceError::Store(_) | ServiceError::Internal(_) => {
                "Something went wrong".to_string()
            }
        }
    }
}

impl ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Attachment(_) => StatusCode::BAD_GATEWAY,
            ServiceError::Store(_) | ServiceError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            ServiceError::NotFound(msg) => log::warn!("Not found: {}", msg),
            other => log::error!("Request failed: {}", other),
        }
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            message: self.client_message(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_taxonomy() {
        assert_eq!(
            ServiceError::NotFound("Task not found".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ServiceError::Attachment(AttachmentError::Upload("down".into())).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ServiceError::Store(StoreError::Unavailable("down".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ServiceError::Validation("bad status".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::Unauthorized("no token".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn infra_errors_hide_detail_from_clients() {
        let err = ServiceError::Store(StoreError::Unavailable("pool exhausted".into()));
        assert_eq!(err.client_message(), "Something went wrong");

        let err = ServiceError::Attachment(AttachmentError::Upload("dns".into()));
        assert_eq!(err.client_message(), "Attachment service unavailable");

        let err = ServiceError::NotFound("Task not found".into());
        assert_eq!(err.client_message(), "Task not found");
    }
}
