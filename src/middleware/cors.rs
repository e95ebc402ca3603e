//! CORS policy for the browser client.
//!
//! Note:
//! - CORS is enforced by browsers. Requests from other origins still reach the
//!   handler; they just don't get the `Access-Control-Allow-*` headers.
//! - Preflight (`OPTIONS` with `Access-Control-Request-Method`) is answered by the
//!   layer itself and never reaches the router.
//!
//! Policy:
//! - Origins: exact match against `Config::cors_allowed_origins`.
//! - Methods: POST, OPTIONS.
//! - Headers: Content-Type.
//! - No credentials.

use std::time::Duration;

use axum::Router;
use axum::http::{Method, header};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::config::Config;

fn layer(config: &Config) -> CorsLayer {
    // An empty allowlist allows nothing (no CORS headers at all).
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(config.cors_allowed_origins.iter().cloned()))
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 10))
}

/// Apply the CORS policy to the given Router.
pub fn apply(router: Router, config: &Config) -> Router {
    router.layer(layer(config))
}
