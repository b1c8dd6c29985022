//! Custom error types for the API service

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use medialibrary::{MediaError, RepositoryError, StorageError};
use serde_json::json;
use thiserror::Error;

/// Custom error type for the API service
#[derive(Error, Debug)]
pub enum ApiError {
    /// No media record with this ID
    #[error("Media {0} not found")]
    NotFound(u64),

    /// Bad request with message
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Failure reported by the media library
    #[error(transparent)]
    Media(#[from] MediaError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Media(error) => media_status(error),
        }
    }
}

fn media_status(error: &MediaError) -> StatusCode {
    match error {
        MediaError::InvalidSource(_) => StatusCode::BAD_REQUEST,
        MediaError::MissingObject { .. } | MediaError::Transform(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        MediaError::Storage(StorageError::DiskNotFound(_) | StorageError::InvalidPath(_)) => {
            StatusCode::BAD_REQUEST
        }
        MediaError::Storage(StorageError::Http(_) | StorageError::HttpStatus { .. }) => {
            StatusCode::BAD_GATEWAY
        }
        MediaError::Repository(RepositoryError::Unsupported(_)) => StatusCode::NOT_IMPLEMENTED,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let error_message = if status.is_server_error() && status != StatusCode::NOT_IMPLEMENTED {
            tracing::error!("Request failed: {}", self);
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;
