//! Bundle download and log handlers.

use std::sync::Arc;

use axum::extract::{Extension, Query};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use era5_common::RequestDate;
use serde::Deserialize;

use crate::bundle::build_bundle;
use crate::error::BundleError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct BundleQuery {
    pub date: String,
}

/// GET /bundle?date=YYYY-MM-DD
pub async fn bundle_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(query): Query<BundleQuery>,
) -> Result<Response, BundleError> {
    let date =
        RequestDate::parse(&query.date).map_err(|_| BundleError::InvalidDate(query.date.clone()))?;
    let retriever = state
        .retriever
        .as_ref()
        .map_err(|reason| BundleError::FetchUnavailable(reason.clone()))?;

    let artifact = build_bundle(
        retriever.as_ref(),
        &state.settings,
        &state.work_dir,
        date,
        &state.log,
    )
    .await?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", artifact.file_name),
            ),
        ],
        artifact.bytes,
    )
        .into_response())
}

/// GET /log - the download log as CSV; 404 until the first bundle.
pub async fn log_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Response, BundleError> {
    match state.log.contents().await? {
        Some(bytes) => Ok((
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "text/csv"),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"download_log.csv\"",
                ),
            ],
            bytes,
        )
            .into_response()),
        None => Ok((StatusCode::NOT_FOUND, "No downloads logged yet").into_response()),
    }
}
