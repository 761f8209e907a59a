pub mod codes;
pub mod handlers;

pub use codes::ErrorCode;

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Body of every error response.
///
/// ```json
/// { "error": "Invalid ID format" }
/// ```
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Human-readable error message
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Application error type that can be converted to HTTP responses.
///
/// Client errors carry the message shown to the caller. `Internal` carries a
/// generic message for the caller and the underlying error, which is logged
/// and never rendered.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppError {
    #[error("JSON extraction error: {0}")]
    JsonExtractorRejection(#[from] JsonRejection),

    #[error("Query extraction error: {0}")]
    QueryExtractorRejection(#[from] QueryRejection),

    #[error("Path extraction error: {0}")]
    PathExtractorRejection(#[from] PathRejection),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Invalid ID: {0}")]
    InvalidId(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("{message}: {source}")]
    Internal {
        message: String,
        #[source]
        source: BoxError,
    },
}

impl AppError {
    /// An internal error with a caller-facing `message` and a logged `source`.
    pub fn internal(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Internal {
            message: message.into(),
            source: source.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::JsonExtractorRejection(e) => e.status(),
            AppError::QueryExtractorRejection(e) => e.status(),
            AppError::PathExtractorRejection(e) => e.status(),
            AppError::BadRequest(_) | AppError::InvalidId(_) => StatusCode::BAD_REQUEST,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let message = match self {
            AppError::JsonExtractorRejection(e) => {
                tracing::warn!(
                    error_code = ErrorCode::JsonExtraction.code(),
                    "JSON extraction error: {:?}",
                    e
                );
                e.body_text()
            }
            AppError::QueryExtractorRejection(e) => {
                tracing::info!(
                    error_code = ErrorCode::QueryExtraction.code(),
                    "Query extraction error: {:?}",
                    e
                );
                e.body_text()
            }
            AppError::PathExtractorRejection(e) => {
                tracing::warn!(
                    error_code = ErrorCode::PathExtraction.code(),
                    "Path extraction error: {:?}",
                    e
                );
                e.body_text()
            }
            AppError::BadRequest(msg) => {
                tracing::info!(
                    error_code = ErrorCode::ValidationError.code(),
                    "Bad request: {}",
                    msg
                );
                msg
            }
            AppError::InvalidId(id) => {
                tracing::info!(
                    error_code = ErrorCode::InvalidObjectId.code(),
                    id = %id,
                    "Invalid object id"
                );
                ErrorCode::InvalidObjectId.default_message().to_string()
            }
            AppError::Forbidden(msg) => {
                tracing::info!(error_code = ErrorCode::Forbidden.code(), "Forbidden: {}", msg);
                msg
            }
            AppError::NotFound(msg) => {
                tracing::info!(error_code = ErrorCode::NotFound.code(), "Not found: {}", msg);
                msg
            }
            AppError::Internal { message, source } => {
                tracing::error!(
                    error_code = ErrorCode::InternalError.code(),
                    error = %source,
                    "{}",
                    message
                );
                message
            }
        };

        (status, Json(ErrorResponse::new(message))).into_response()
    }
}
