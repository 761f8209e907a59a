//! API routes module

pub mod events;
pub mod health;

use axum::{Router, routing::get};

use crate::state::AppState;

/// Liveness text served at `/`
pub const ROOT_MESSAGE: &str = "Hello World! server ready";

async fn root() -> &'static str {
    ROOT_MESSAGE
}

/// Create all API routes.
///
/// Event and comment routes are only mounted when MongoDB is connected.
pub fn routes(state: &AppState) -> Router {
    let router = Router::new()
        .route("/", get(root))
        .merge(health::router(state.clone()));

    match &state.mongo {
        Some(mongo) => router.merge(events::router(&mongo.db)),
        None => router,
    }
}
