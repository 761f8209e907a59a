//! Readiness endpoint with a real MongoDB check

use axum::{
    Router,
    extract::State,
    response::{IntoResponse, Response},
    routing::get,
};
use axum_helpers::server::{HealthCheckFuture, run_health_checks};

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ready", get(ready_handler))
        .with_state(state)
}

/// 200 when MongoDB answers a ping, 503 otherwise or when running degraded.
pub async fn ready_handler(State(state): State<AppState>) -> Response {
    let checks: Vec<(&str, HealthCheckFuture<'_>)> = vec![(
        "mongodb",
        Box::pin(async {
            let Some(mongo) = state.mongo.as_ref() else {
                return Err("MongoDB is not connected".to_string());
            };
            if database::mongodb::check_health(&mongo.client).await {
                Ok(())
            } else {
                Err("MongoDB ping failed".to_string())
            }
        }),
    )];

    match run_health_checks(checks).await {
        Ok((status, json)) => (status, json).into_response(),
        Err((status, json)) => (status, json).into_response(),
    }
}
