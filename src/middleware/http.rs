//! HTTP-level middleware (cross-cutting concerns).
//!
//! Responsibility:
//! - Request-Id generation + propagation (X-Request-Id)
//! - Access logging / request tracing (TraceLayer)
//! - Body size limit
//! - Global timeout (bounds the upstream key fetch as well)

use axum::Router;
use axum::error_handling::HandleErrorLayer;
use axum::http::{StatusCode, header::HeaderName};
use tower::timeout::TimeoutLayer;
use tower::{BoxError, ServiceBuilder};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;

/// Apply HTTP-level middleware to the given Router.
///
/// Limits come from `Config` (`REQUEST_BODY_LIMIT_BYTES`, `REQUEST_TIMEOUT_SECONDS`).
pub fn apply(router: Router, config: &Config) -> Router {
    let request_id_header = HeaderName::from_static("x-request-id");

    let layers = ServiceBuilder::new()
        // Make the service error `Infallible` by converting errors into responses.
        .layer(HandleErrorLayer::new(|err: BoxError| async move {
            if err.is::<tower::timeout::error::Elapsed>() {
                tracing::warn!("request timed out");
                StatusCode::REQUEST_TIMEOUT
            } else {
                tracing::error!(error = %err, "unhandled middleware error");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }))
        .layer(SetRequestIdLayer::new(
            request_id_header.clone(),
            MakeRequestUuid,
        ))
        .layer(PropagateRequestIdLayer::new(request_id_header))
        .layer(RequestBodyLimitLayer::new(config.request_body_limit_bytes))
        .layer(TimeoutLayer::new(config.request_timeout))
        .layer(TraceLayer::new_for_http());

    router.layer(layers)
}
