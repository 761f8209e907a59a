//! Database library providing the MongoDB connector and shared connection utilities
//!
//! # Features
//!
//! - `mongodb` (default) - MongoDB client, connector and health check
//! - `config` - Configuration support with `core_config::FromEnv`
//!
//! # Example
//!
//! ```ignore
//! use database::mongodb::{MongoConfig, connect_from_config_with_retry};
//!
//! let config = MongoConfig::with_database("mongodb://localhost:27017", "we-vibe");
//! let client = connect_from_config_with_retry(&config, None).await?;
//! let events = client.database(config.database()).collection::<Document>("events");
//! ```

pub mod common;

#[cfg(feature = "mongodb")]
pub mod mongodb;

pub use common::{RetryConfig, retry, retry_with_backoff};
