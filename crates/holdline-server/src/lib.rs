//! Holdline server library logic.

pub mod api;
pub mod config;

use axum::{
    routing::{get, post},
    Extension, Router,
};
use holdline_call::CallManager;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Builds the application router with all routes.
pub fn app(manager: Arc<CallManager>) -> Router {
    Router::new()
        .route("/voice", get(api::voice).post(api::voice))
        .route("/process_speech", post(api::process_speech))
        .route("/status", get(api::status))
        .route("/health", get(api::health))
        .layer(Extension(manager))
        .layer(TraceLayer::new_for_http())
}
