//! Application state management.

use mongodb::{Client, Database};

/// An established MongoDB connection
#[derive(Clone)]
pub struct MongoConnection {
    /// Cloneable, shares the underlying connection pool
    pub client: Client,
    pub db: Database,
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: crate::config::Config,
    /// `None` while running degraded after a failed startup connection
    pub mongo: Option<MongoConnection>,
}
