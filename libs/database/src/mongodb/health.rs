use mongodb::Client;
use std::time::Instant;

use super::connector::ping;

/// Result of a MongoDB ping
#[derive(Debug, Clone)]
pub struct HealthStatus {
    pub healthy: bool,
    /// Driver error text when unhealthy
    pub message: Option<String>,
    pub response_time_ms: u64,
}

/// `true` when the deployment answers `{ ping: 1 }`.
pub async fn check_health(client: &Client) -> bool {
    ping(client).await.is_ok()
}

/// Ping with timing and error details.
pub async fn check_health_detailed(client: &Client) -> HealthStatus {
    let start = Instant::now();
    let result = ping(client).await;
    let response_time_ms = start.elapsed().as_millis() as u64;

    match result {
        Ok(()) => HealthStatus {
            healthy: true,
            message: None,
            response_time_ms,
        },
        Err(e) => HealthStatus {
            healthy: false,
            message: Some(e.to_string()),
            response_time_ms,
        },
    }
}
