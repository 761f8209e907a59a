use super::shutdown::ShutdownCoordinator;
use crate::errors::handlers::not_found;
use crate::http::{cors_layer_from_env, security_headers};
use axum::{Json, Router, middleware, routing::get};
use core_config::server::ServerConfig;
use std::io;
use std::time::Duration;
use tower_http::compression::CompressionLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{Level, info};
use utoipa::OpenApi;

/// Path of the generated OpenAPI document.
pub const OPENAPI_JSON_PATH: &str = "/api-docs/openapi.json";

/// Wraps `apis` with documentation routes and the common middleware stack.
///
/// - `GET /api-docs/openapi.json` and a Scalar UI at `/scalar`
/// - `apis` merged at the root
/// - 404 fallback with `{ "error": "The requested resource was not found" }`
/// - request tracing, security headers, CORS and response compression
///
/// CORS follows `CORS_ALLOWED_ORIGIN` (comma-separated); when it is unset any
/// origin is allowed. Health endpoints are merged by the app.
///
/// # Errors
/// Returns an error if `CORS_ALLOWED_ORIGIN` contains an invalid header value.
///
/// ```ignore
/// #[derive(OpenApi)]
/// #[openapi(paths(/* your paths */))]
/// struct ApiDoc;
///
/// let api_routes = Router::new()
///     .route("/events", get(list_events))
///     .with_state(service);
///
/// let router = create_router::<ApiDoc>(api_routes).await?;
/// ```
pub async fn create_router<T>(apis: Router) -> io::Result<Router>
where
    T: OpenApi + 'static,
{
    use utoipa_scalar::{Scalar, Servable};

    let cors_layer = cors_layer_from_env()?;
    let spec = T::openapi();
    let spec_json = spec.clone();

    let router = Router::new()
        .route(
            OPENAPI_JSON_PATH,
            get(move || {
                let spec = spec_json.clone();
                async move { Json(spec) }
            }),
        )
        .merge(Scalar::with_url("/scalar", spec))
        .merge(apis)
        .fallback(not_found)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(middleware::from_fn(security_headers))
        .layer(cors_layer)
        .layer(CompressionLayer::new());

    Ok(router)
}

/// Serve `router` until SIGINT/SIGTERM, then run `cleanup` bounded by
/// `shutdown_timeout`.
///
/// In-flight requests drain before the call returns.
///
/// ```ignore
/// let client = state.mongo_client.clone();
/// let cleanup = async move {
///     client.shutdown().await;
/// };
///
/// create_production_app(router, &config.server, Duration::from_secs(30), cleanup).await?;
/// ```
pub async fn create_production_app<F>(
    router: Router,
    server_config: &ServerConfig,
    shutdown_timeout: Duration,
    cleanup: F,
) -> io::Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let (coordinator, mut shutdown_rx) = ShutdownCoordinator::new();

    let listener = tokio::net::TcpListener::bind(server_config.address()).await?;
    info!("Server starting on {}", listener.local_addr()?);

    let cleanup_handle = tokio::spawn(async move {
        let _ = shutdown_rx.recv().await;

        info!("Starting cleanup tasks (timeout: {:?})", shutdown_timeout);
        match tokio::time::timeout(shutdown_timeout, cleanup).await {
            Ok(()) => info!("Cleanup completed successfully"),
            Err(_) => {
                tracing::warn!(
                    "Cleanup exceeded timeout of {:?}, forcing shutdown",
                    shutdown_timeout
                );
            }
        }
    });

    let serve_result = axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(async move { coordinator.wait_for_signal().await })
        .await
        .inspect_err(|e| {
            tracing::error!("Server encountered an error: {:?}", e);
        });

    cleanup_handle.await.ok();

    serve_result
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    #[derive(OpenApi)]
    #[openapi(info(title = "router-test", version = "0.0.1"))]
    struct TestDoc;

    async fn router() -> Router {
        let apis = Router::new().route("/", get(|| async { "root" }));
        temp_env::async_with_vars([("CORS_ALLOWED_ORIGIN", None::<&str>)], async move {
            create_router::<TestDoc>(apis).await.unwrap()
        })
        .await
    }

    async fn get_body(app: Router, uri: &str) -> (StatusCode, Vec<u8>) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, bytes.to_vec())
    }

    #[tokio::test]
    async fn test_apis_are_merged_at_root() {
        let (status, body) = get_body(router().await, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"root");
    }

    #[tokio::test]
    async fn test_openapi_document_is_served() {
        let (status, body) = get_body(router().await, OPENAPI_JSON_PATH).await;
        assert_eq!(status, StatusCode::OK);
        let doc: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(doc["info"]["title"], "router-test");
    }

    #[tokio::test]
    async fn test_unknown_route_uses_json_fallback() {
        let (status, body) = get_body(router().await, "/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            body,
            serde_json::json!({ "error": "The requested resource was not found" })
        );
    }
}
