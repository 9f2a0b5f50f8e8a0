use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Every way a request against the uploads directory can fail.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Invalid folder name. Use only letters, numbers, _ and -.")]
    InvalidFolder,

    #[error("Invalid file name. Use only letters, numbers, ., _ and -.")]
    InvalidFileName,

    #[error("Invalid file path.")]
    InvalidPath,

    #[error("No image files uploaded. Use field name images[].")]
    NoFiles,

    #[error("Only image files (jpg, jpeg, png, webp) are allowed.")]
    UnsupportedType,

    #[error("File too large. Max allowed size is 10MB.")]
    TooLarge,

    #[error("Unexpected field: {0}")]
    UnexpectedField(String),

    #[error("Malformed upload request: {0}")]
    MalformedRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, UploadError>;

impl UploadError {
    pub fn folder_not_found() -> Self {
        UploadError::NotFound("Folder not found.".into())
    }

    pub fn file_not_found() -> Self {
        UploadError::NotFound("File not found.".into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            UploadError::NotFound(_) => StatusCode::NOT_FOUND,
            UploadError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    /// Message sent to the client. I/O details stay in the server log.
    pub fn public_message(&self) -> String {
        match self {
            UploadError::Storage(_) => "Storage operation failed.".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for UploadError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("internal error: {}", self);
        } else {
            tracing::warn!("request error: {}", self);
        }

        let body = Json(json!({
            "success": false,
            "message": self.public_message(),
        }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn validation_errors_are_bad_requests() {
        for err in [
            UploadError::InvalidFolder,
            UploadError::InvalidFileName,
            UploadError::InvalidPath,
            UploadError::NoFiles,
            UploadError::UnsupportedType,
            UploadError::TooLarge,
            UploadError::UnexpectedField("avatar".into()),
        ] {
            assert_eq!(err.status_code(), StatusCode::BAD_REQUEST, "{}", err);
        }
    }

    #[test]
    fn missing_entries_map_to_not_found() {
        assert_eq!(UploadError::folder_not_found().status_code(), StatusCode::NOT_FOUND);
        assert_eq!(UploadError::file_not_found().to_string(), "File not found.");
    }

    #[test]
    fn storage_errors_hide_io_details() {
        let err = UploadError::from(io::Error::new(io::ErrorKind::PermissionDenied, "/srv/uploads"));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message(), "Storage operation failed.");
        assert!(err.to_string().contains("/srv/uploads"));
    }

    #[test]
    fn size_and_type_messages_name_their_cause() {
        assert_eq!(UploadError::TooLarge.to_string(), "File too large. Max allowed size is 10MB.");
        assert_eq!(
            UploadError::UnsupportedType.to_string(),
            "Only image files (jpg, jpeg, png, webp) are allowed."
        );
    }
}
