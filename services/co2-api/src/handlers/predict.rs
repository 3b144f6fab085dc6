//! One-shot prediction.

use std::sync::Arc;

use axum::extract::{Extension, Query};
use axum::Json;
use era5_common::{GeoPoint, RequestDate};
use serde::Deserialize;

use crate::error::ApiError;
use crate::pipeline::{run_pipeline, PredictionTable};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PredictParams {
    /// `YYYY-MM-DD`
    pub date: String,
    pub lat: f64,
    pub lon: f64,
}

/// GET /predict?date=2020-06-15&lat=40.0&lon=-75.0
pub async fn predict_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<PredictParams>,
) -> Result<Json<PredictionTable>, ApiError> {
    let date = RequestDate::parse(&params.date).map_err(|e| ApiError::InvalidInput(e.to_string()))?;
    let point = GeoPoint::new(params.lat, params.lon);
    if !point.is_finite() {
        return Err(ApiError::InvalidInput(format!(
            "lat={} lon={} is not a finite coordinate",
            params.lat, params.lon
        )));
    }

    let run = run_pipeline(&state, date, point).await;
    Ok(Json(run.result?))
}
