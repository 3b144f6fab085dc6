//! Router construction.

use std::sync::Arc;

use axum::routing::get;
use axum::{Extension, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers;
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/bundle", get(handlers::bundle::bundle_handler))
        .route("/log", get(handlers::bundle::log_handler))
        .route("/health", get(handlers::health::health_handler))
        .route("/metrics", get(handlers::health::metrics_handler))
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
