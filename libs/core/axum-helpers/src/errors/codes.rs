//! Error codes attached to error logs.
//!
//! Clients only ever see the `{ "error": "..." }` body; the code travels in
//! the `error_code` field of the log event so failures can be grouped.
//!
//! ```rust
//! use axum_helpers::errors::ErrorCode;
//!
//! let code = ErrorCode::InvalidObjectId;
//! assert_eq!(code.as_str(), "INVALID_OBJECT_ID");
//! assert_eq!(code.code(), 1002);
//! assert_eq!(code.default_message(), "Invalid ID format");
//! ```

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Client errors (1000-1999)
    /// Request failed a required-field or range check
    ValidationError,

    /// Path identifier is not a 24-character hex ObjectId
    InvalidObjectId,

    /// Request body could not be extracted as JSON
    JsonExtraction,

    /// Requested resource was not found
    NotFound,

    /// An unexpected internal server error occurred
    InternalError,

    /// Caller is not allowed to act on the resource
    Forbidden,

    /// Query string could not be extracted
    QueryExtraction,

    /// Path parameters could not be extracted
    PathExtraction,

    // Database errors (2000-2999)
    /// Store operation failed
    DatabaseError,
}

impl ErrorCode {
    /// SCREAMING_SNAKE_CASE identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ValidationError => "VALIDATION_ERROR",
            Self::InvalidObjectId => "INVALID_OBJECT_ID",
            Self::JsonExtraction => "JSON_EXTRACTION",
            Self::NotFound => "NOT_FOUND",
            Self::InternalError => "INTERNAL_ERROR",
            Self::Forbidden => "FORBIDDEN",
            Self::QueryExtraction => "QUERY_EXTRACTION",
            Self::PathExtraction => "PATH_EXTRACTION",
            Self::DatabaseError => "DATABASE_ERROR",
        }
    }

    /// Integer code for logging and monitoring.
    ///
    /// - 1000-1999: Client errors
    /// - 2000-2999: Database errors
    pub fn code(&self) -> i32 {
        match self {
            Self::ValidationError => 1001,
            Self::InvalidObjectId => 1002,
            Self::JsonExtraction => 1003,
            Self::NotFound => 1004,
            Self::InternalError => 1005,
            Self::Forbidden => 1007,
            Self::QueryExtraction => 1012,
            Self::PathExtraction => 1013,

            Self::DatabaseError => 2003,
        }
    }

    /// Message used when a handler has nothing more specific to say.
    pub fn default_message(&self) -> &'static str {
        match self {
            Self::ValidationError => "Request validation failed",
            Self::InvalidObjectId => "Invalid ID format",
            Self::JsonExtraction => "Failed to parse request body",
            Self::NotFound => "The requested resource was not found",
            Self::InternalError => "An internal server error occurred",
            Self::Forbidden => "not allowed",
            Self::QueryExtraction => "Failed to parse query string",
            Self::PathExtraction => "Failed to parse path parameters",
            Self::DatabaseError => "Database error occurred",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
