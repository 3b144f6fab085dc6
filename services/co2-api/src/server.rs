//! Router construction.

use std::sync::Arc;

use axum::routing::{get, post, put};
use axum::{Extension, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers;
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/predict", get(handlers::predict::predict_handler))
        .route("/sessions", post(handlers::sessions::create_session_handler))
        .route(
            "/sessions/:id",
            get(handlers::sessions::get_session_handler)
                .delete(handlers::sessions::delete_session_handler),
        )
        .route("/sessions/:id/date", put(handlers::sessions::set_date_handler))
        .route(
            "/sessions/:id/location",
            put(handlers::sessions::set_location_handler),
        )
        .route("/health", get(handlers::health::health_handler))
        .route("/ready", get(handlers::health::ready_handler))
        .route("/metrics", get(handlers::health::metrics_handler))
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
