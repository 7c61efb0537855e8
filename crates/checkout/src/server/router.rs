//! Axum router construction.

use std::path::Path;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer, services::ServeFile, timeout::TimeoutLayer, trace::TraceLayer,
};

use super::{handlers, middleware, state::AppState};

/// Path Apple fetches to verify domain ownership.
pub const DOMAIN_ASSOCIATION_PATH: &str =
    "/.well-known/apple-developer-merchantid-domain-association";

/// Build the application [`Router`] with all routes and middleware attached.
pub fn build(state: AppState) -> Router {
    let association = Path::new(&state.config.well_known_dir)
        .join("apple-developer-merchantid-domain-association");

    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/debug", get(handlers::debug))
        .route("/api/create-session", get(handlers::create_session))
        .route("/api/apple-pay-session", post(handlers::apple_pay_session))
        .route("/api/process-apple-pay", post(handlers::process_apple_pay))
        .route("/api/save-payment", post(handlers::save_payment))
        .route_service(DOMAIN_ASSOCIATION_PATH, ServeFile::new(association))
        .fallback(handlers::not_found)
        .layer(DefaultBodyLimit::max(middleware::BODY_LIMIT))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(middleware::REQUEST_TIMEOUT))
        .layer(CompressionLayer::new())
        .with_state(state)
}
