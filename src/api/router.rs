//! Intake API router.
//!
//! Middleware stack (outermost → innermost):
//! 1. Cache-Control header → 2. Audit logger → 3. Body limit

use axum::extract::DefaultBodyLimit;
use axum::http::header::{HeaderValue, CACHE_CONTROL};
use axum::routing::{get, post};
use axum::Router;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;

/// Largest webhook body accepted.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Build the intake router.
///
/// Every response carries `Cache-Control: no-store` since bodies may echo
/// patient data.
pub fn intake_router(ctx: ApiContext) -> Router {
    Router::new()
        .route("/webhook", post(endpoints::webhook::receive))
        .route("/health", get(endpoints::health::check))
        .with_state(ctx)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(axum::middleware::from_fn(middleware::audit::log_access))
        .layer(SetResponseHeaderLayer::overriding(
            CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
}
