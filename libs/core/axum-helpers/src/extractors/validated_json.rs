//! JSON extractor with automatic validation using the validator crate.

use super::first_validation_message;
use crate::errors::AppError;
use axum::{
    extract::{FromRequest, Json, Request},
    response::{IntoResponse, Response},
};
use serde::de::DeserializeOwned;
use validator::Validate;

/// JSON extractor with automatic validation.
///
/// Body rejections keep axum's status (400, 415 or 422). A failed
/// `Validate` check becomes 400 with the first field message as the error.
///
/// ```ignore
/// #[derive(Deserialize, Validate)]
/// struct JoinRequest {
///     #[validate(required(message = "eventId is required"))]
///     event_id: Option<String>,
/// }
///
/// async fn join(ValidatedJson(payload): ValidatedJson<JoinRequest>) -> String {
///     payload.event_id.unwrap_or_default()
/// }
/// ```
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(data) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| AppError::from(e).into_response())?;

        data.validate().map_err(|e| {
            AppError::BadRequest(first_validation_message(&e)).into_response()
        })?;

        Ok(ValidatedJson(data))
    }
}
