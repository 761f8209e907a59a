use axum::http::{HeaderValue, Method, header};
use std::io;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};

/// Environment variable holding comma-separated allowed origins.
pub const CORS_ALLOWED_ORIGIN: &str = "CORS_ALLOWED_ORIGIN";

/// Creates a CORS layer restricted to `origins`.
///
/// - Methods: GET, POST, PUT, DELETE, PATCH, OPTIONS
/// - Headers: Content-Type, Authorization, Accept
/// - 1 hour max age
pub fn create_cors_layer(origins: Vec<HeaderValue>) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
        .max_age(Duration::from_secs(3600))
}

/// Creates a permissive CORS layer that allows any origin.
pub fn create_permissive_cors_layer() -> CorsLayer {
    CorsLayer::permissive()
}

/// Parse a comma-separated origin list, skipping blank entries.
pub fn parse_origins(raw: &str) -> io::Result<Vec<HeaderValue>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<HeaderValue>().map_err(|e| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("Invalid {CORS_ALLOWED_ORIGIN} value '{s}': {e}"),
                )
            })
        })
        .collect()
}

/// CORS layer from `CORS_ALLOWED_ORIGIN`.
///
/// When the variable is unset or blank every origin is allowed. An
/// unparseable entry is an error.
pub fn cors_layer_from_env() -> io::Result<CorsLayer> {
    let raw = std::env::var(CORS_ALLOWED_ORIGIN).unwrap_or_default();
    let origins = parse_origins(&raw)?;

    if origins.is_empty() {
        warn!("{CORS_ALLOWED_ORIGIN} not set, allowing any origin");
        return Ok(create_permissive_cors_layer());
    }

    info!("CORS configured with allowed origins: {}", raw);
    Ok(create_cors_layer(origins))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_origins_trims_and_skips_blanks() {
        let origins = parse_origins(" http://localhost:5173 , ,https://vibe.example.com").unwrap();
        assert_eq!(origins.len(), 2);
        assert_eq!(origins[0], "http://localhost:5173");
        assert_eq!(origins[1], "https://vibe.example.com");
    }

    #[test]
    fn test_parse_origins_rejects_invalid_header() {
        let err = parse_origins("http://ok.example.com,bad\norigin").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn test_cors_layer_from_env() {
        temp_env::with_var_unset(CORS_ALLOWED_ORIGIN, || {
            assert!(cors_layer_from_env().is_ok());
        });
        temp_env::with_var(CORS_ALLOWED_ORIGIN, Some("http://localhost:3000"), || {
            assert!(cors_layer_from_env().is_ok());
        });
        temp_env::with_var(CORS_ALLOWED_ORIGIN, Some("bad\u{7f}"), || {
            assert!(cors_layer_from_env().is_err());
        });
    }
}
