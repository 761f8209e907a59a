use axum_helpers::server::{create_production_app, health_router};
use core_config::tracing::{init_tracing, install_color_eyre};
use std::time::Duration;
use tracing::{error, info, warn};

mod api;
mod config;
mod openapi;
mod state;

use config::Config;
use state::{AppState, MongoConnection};

/// Connect with retry, or `None` to start degraded.
async fn connect_mongo(config: &Config) -> Option<MongoConnection> {
    match database::mongodb::connect_from_config_with_retry(&config.mongodb, None).await {
        Ok(client) => {
            let db = client.database(config.mongodb.database());
            info!(database = config.mongodb.database(), "Connected to MongoDB");
            api::events::init_indexes(&db).await;
            Some(MongoConnection { client, db })
        }
        Err(e) => {
            error!(error = %e, "Could not connect to MongoDB");
            warn!("Starting in degraded mode: only /, /health and /ready are served");
            None
        }
    }
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    install_color_eyre();

    let config = Config::from_env()?;

    init_tracing(&config.environment);

    let mongo = connect_mongo(&config).await;
    let state = AppState { config, mongo };

    let api_routes = api::routes(&state);
    let router = axum_helpers::create_router::<openapi::ApiDoc>(api_routes).await?;
    let app = router.merge(health_router(state.config.app.clone()));

    info!("Starting We Vibe API with graceful shutdown (30s timeout)");

    let client = state.mongo.as_ref().map(|mongo| mongo.client.clone());
    create_production_app(
        app,
        &state.config.server,
        Duration::from_secs(30),
        async move {
            if let Some(client) = client {
                info!("Shutting down: closing MongoDB connections");
                client.shutdown().await;
                info!("MongoDB connection closed successfully");
            }
        },
    )
    .await
    .map_err(|e| eyre::eyre!("Server error: {}", e))?;

    info!("We Vibe API shutdown complete");
    Ok(())
}
