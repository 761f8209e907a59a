use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::{ErrorCode, ErrorResponse};

/// Fallback handler for unknown routes.
pub async fn not_found() -> Response {
    let body = Json(ErrorResponse::new(ErrorCode::NotFound.default_message()));

    (StatusCode::NOT_FOUND, body).into_response()
}
