//! Event domain error types

use axum_helpers::{AppError, ErrorCode};
use thiserror::Error;

/// Result type for event operations
pub type Result<T> = std::result::Result<T, EventError>;

/// Event domain errors
#[derive(Debug, Error)]
pub enum EventError {
    /// Identifier is not a valid ObjectId
    #[error("Invalid ID format: {0}")]
    InvalidId(String),

    /// Missing or out-of-range input
    #[error("{0}")]
    Validation(String),

    #[error("Event not found")]
    EventNotFound,

    #[error("Comment not found")]
    CommentNotFound,

    /// Requester is not the comment author
    #[error("not allowed")]
    NotAllowed,

    /// Store failure with the message shown to the caller
    #[error("{message}: {source}")]
    Store {
        message: &'static str,
        #[source]
        source: mongodb::error::Error,
    },

    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("BSON deserialization error: {0}")]
    Deserialization(#[from] mongodb::bson::de::Error),
}

impl EventError {
    /// Tags a raw database error with the caller-facing `message`.
    ///
    /// ```ignore
    /// repository.list_events(&filter).await.map_err(EventError::store("Failed to fetch events"))
    /// ```
    pub fn store(message: &'static str) -> impl FnOnce(EventError) -> EventError {
        move |err| match err {
            EventError::Database(source) => EventError::Store { message, source },
            other => other,
        }
    }
}

impl From<EventError> for AppError {
    fn from(err: EventError) -> Self {
        match err {
            EventError::InvalidId(id) => AppError::InvalidId(id),
            EventError::Validation(message) => AppError::BadRequest(message),
            err @ (EventError::EventNotFound | EventError::CommentNotFound) => {
                AppError::NotFound(err.to_string())
            }
            EventError::NotAllowed => AppError::Forbidden(EventError::NotAllowed.to_string()),
            EventError::Store { message, source } => AppError::internal(message, source),
            EventError::Database(e) => {
                AppError::internal(ErrorCode::InternalError.default_message(), e)
            }
            EventError::Deserialization(e) => {
                AppError::internal(ErrorCode::InternalError.default_message(), e)
            }
        }
    }
}

impl axum::response::IntoResponse for EventError {
    fn into_response(self) -> axum::response::Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}
