//! ObjectId path parameter extractor.

use crate::errors::AppError;
use axum::{
    extract::{FromRequestParts, Path},
    http::request::Parts,
    response::{IntoResponse, Response},
};
use mongodb::bson::oid::ObjectId;

/// Extractor for a single ObjectId path parameter.
///
/// Anything other than 24 hex characters is rejected with
/// 400 `{ "error": "Invalid ID format" }` before the handler runs.
///
/// ```ignore
/// async fn get_event(ObjectIdPath(id): ObjectIdPath) -> String {
///     id.to_hex()
/// }
///
/// let app = Router::new().route("/events/{id}", get(get_event));
/// ```
pub struct ObjectIdPath(pub ObjectId);

impl<S> FromRequestParts<S> for ObjectIdPath
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|e| AppError::from(e).into_response())?;

        ObjectId::parse_str(&id)
            .map(ObjectIdPath)
            .map_err(|_| AppError::InvalidId(id).into_response())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, body::Body, http::Request, http::StatusCode, routing::get};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn app() -> Router {
        Router::new().route(
            "/events/{id}",
            get(|ObjectIdPath(id): ObjectIdPath| async move { id.to_hex() }),
        )
    }

    async fn call(uri: &str) -> (StatusCode, String) {
        let response = app()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_valid_object_id() {
        let (status, body) = call("/events/65f1a2b3c4d5e6f708192a3b").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "65f1a2b3c4d5e6f708192a3b");
    }

    #[tokio::test]
    async fn test_path_rejection_renders_json_error() {
        // Two captures where one String is expected.
        let app: Router = Router::new().route(
            "/events/{id}/comments/{comment}",
            get(|ObjectIdPath(id): ObjectIdPath| async move { id.to_hex() }),
        );
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/events/65f1a2b3c4d5e6f708192a3b/comments/1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert!(response.status().is_server_error());
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(body["error"].as_str().is_some_and(|m| !m.is_empty()));
    }

    #[tokio::test]
    async fn test_rejects_short_and_non_hex_ids() {
        for id in ["123", "zzzzzzzzzzzzzzzzzzzzzzzz", "65f1a2b3c4d5e6f708192a3b00"] {
            let (status, body) = call(&format!("/events/{id}")).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "id {id}");
            assert_eq!(body, r#"{"error":"Invalid ID format"}"#);
        }
    }
}
