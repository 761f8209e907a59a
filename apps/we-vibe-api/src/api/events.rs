//! Events API routes

use axum::Router;
use domain_events::{EventService, MongoEventRepository};
use mongodb::Database;
use std::sync::Arc;
use tracing::{info, warn};

/// Create the events router over `db`
pub fn router(db: &Database) -> Router {
    let repository = MongoEventRepository::new(db);
    let service = Arc::new(EventService::new(repository));

    domain_events::events_router().with_state(service)
}

/// Create the events and comments indexes. A failure is logged and the
/// server keeps running without them.
pub async fn init_indexes(db: &Database) {
    match MongoEventRepository::new(db).create_indexes().await {
        Ok(()) => info!("Event and comment indexes created"),
        Err(e) => warn!(error = %e, "Failed to create event indexes"),
    }
}
