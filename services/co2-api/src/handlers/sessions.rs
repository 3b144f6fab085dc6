//! Interactive session endpoints.

use std::sync::Arc;

use axum::extract::{Extension, Path};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use era5_common::{GeoPoint, RequestDate};
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use crate::error::ApiError;
use crate::pipeline::run_pipeline;
use crate::session::{Attempt, Session};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct DateBody {
    pub date: String,
}

/// POST /sessions
pub async fn create_session_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> (StatusCode, Json<Session>) {
    state.sweep_sessions(Utc::now()).await;
    let session = Session::new();
    state.sessions.write().await.insert(session.id, session.clone());
    debug!(session = %session.id, "Session created");
    (StatusCode::CREATED, Json(session))
}

/// GET /sessions/:id
pub async fn get_session_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Session>, ApiError> {
    snapshot(&state, id).await.map(Json)
}

/// DELETE /sessions/:id
pub async fn delete_session_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state
        .sessions
        .write()
        .await
        .remove(&id)
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or(ApiError::SessionNotFound(id))
}

/// PUT /sessions/:id/date
pub async fn set_date_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(body): Json<DateBody>,
) -> Result<Json<Session>, ApiError> {
    let date = RequestDate::parse(&body.date).map_err(|e| ApiError::InvalidInput(e.to_string()))?;
    let attempt = {
        let mut sessions = state.sessions.write().await;
        let session = sessions.get_mut(&id).ok_or(ApiError::SessionNotFound(id))?;
        session.select_date(date)
    };
    run_attempt(&state, id, attempt).await
}

/// PUT /sessions/:id/location
pub async fn set_location_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(point): Json<GeoPoint>,
) -> Result<Json<Session>, ApiError> {
    let attempt = {
        let mut sessions = state.sessions.write().await;
        let session = sessions.get_mut(&id).ok_or(ApiError::SessionNotFound(id))?;
        session.select_location(point)
    };
    run_attempt(&state, id, attempt).await
}

/// Run the attempt, if any, without holding the session lock, then record
/// its outcome and return the session.
async fn run_attempt(
    state: &AppState,
    id: Uuid,
    attempt: Option<Attempt>,
) -> Result<Json<Session>, ApiError> {
    if let Some(attempt) = attempt {
        let run = run_pipeline(state, attempt.date, attempt.point).await;
        let mut sessions = state.sessions.write().await;
        if let Some(session) = sessions.get_mut(&id) {
            if !session.finish(attempt.number, run) {
                debug!(session = %id, attempt = attempt.number, "Discarded superseded attempt");
            }
        }
    }
    snapshot(state, id).await.map(Json)
}

async fn snapshot(state: &AppState, id: Uuid) -> Result<Session, ApiError> {
    state
        .sessions
        .read()
        .await
        .get(&id)
        .cloned()
        .ok_or(ApiError::SessionNotFound(id))
}
