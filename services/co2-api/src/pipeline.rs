//! One prediction attempt: fetch → extract → assemble → predict or skip.

use std::collections::BTreeMap;

use cds_client::CdsError;
use co2_model::FeatureRecord;
use era5_common::{ErrorKind, GeoPoint, RequestDate, VariableGroup};
use grid_processor::{extract_nearest_values, ExtractedValues, GridProcessorError};
use metrics::counter;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::session::Stage;
use crate::state::AppState;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("remote fetching is not configured: {0}")]
    FetchUnavailable(String),

    #[error("failed to fetch {group} data: {source}")]
    Fetch {
        group: &'static str,
        #[source]
        source: CdsError,
    },

    #[error("failed to read {group} data: {source}")]
    Extract {
        group: &'static str,
        #[source]
        source: GridProcessorError,
    },

    #[error("extraction task failed: {0}")]
    Task(String),
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::FetchUnavailable(_) => ErrorKind::Configuration,
            Self::Fetch { source, .. } => source.kind(),
            Self::Extract { source, .. } => source.kind(),
            Self::Task(_) => ErrorKind::DatasetAccess,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionStatus {
    Predicted,
    SkippedIncompleteFeatures,
    ModelUnavailable,
}

impl PredictionStatus {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Predicted => "predicted",
            Self::SkippedIncompleteFeatures => "skipped_incomplete_features",
            Self::ModelUnavailable => "model_unavailable",
        }
    }
}

/// One output row. `co2` is only present when a prediction was made.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionRow {
    pub date: RequestDate,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub co2: Option<f64>,
}

/// The result table of a successful attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionTable {
    pub status: PredictionStatus,
    pub rows: Vec<PredictionRow>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missing_predictors: Vec<String>,
    pub features: BTreeMap<String, Option<f64>>,
}

/// Outcome of an attempt with the stages it went through.
#[derive(Debug)]
pub struct PipelineRun {
    pub stages: Vec<Stage>,
    pub result: Result<PredictionTable, PipelineError>,
}

impl PipelineRun {
    pub fn final_stage(&self) -> Stage {
        self.stages.last().copied().unwrap_or(Stage::Error)
    }
}

/// Run one attempt for `date` and `point`.
#[instrument(skip(state, date, point), fields(date = %date, lat = point.latitude, lon = point.longitude))]
pub async fn run_pipeline(state: &AppState, date: RequestDate, point: GeoPoint) -> PipelineRun {
    let mut stages = Vec::new();
    let result = attempt(state, date, point, &mut stages).await;

    match &result {
        Ok(table) => {
            stages.push(Stage::Done);
            counter!("co2_predictions_total", "outcome" => table.status.as_str()).increment(1);
            info!(status = table.status.as_str(), co2 = ?table.rows.first().and_then(|r| r.co2), "Prediction attempt finished");
        }
        Err(e) => {
            stages.push(Stage::Error);
            counter!("co2_predictions_total", "outcome" => "error").increment(1);
            warn!(error = %e, kind = %e.kind(), "Prediction attempt failed");
        }
    }
    PipelineRun { stages, result }
}

async fn attempt(
    state: &AppState,
    date: RequestDate,
    point: GeoPoint,
    stages: &mut Vec<Stage>,
) -> Result<PredictionTable, PipelineError> {
    stages.push(Stage::Fetching);
    let fetcher = state
        .fetcher
        .get()
        .map_err(|reason| PipelineError::FetchUnavailable(reason.to_string()))?;

    let meteo_group = VariableGroup::Meteo;
    let veg_group = VariableGroup::Vegetation;
    let meteo_path = fetcher
        .ensure(date, &state.cache_dir, meteo_group.variables(), meteo_group.label())
        .await
        .map_err(|source| PipelineError::Fetch {
            group: meteo_group.label(),
            source,
        })?;
    let veg_path = fetcher
        .ensure(date, &state.cache_dir, veg_group.variables(), veg_group.label())
        .await
        .map_err(|source| PipelineError::Fetch {
            group: veg_group.label(),
            source,
        })?;

    stages.push(Stage::Extracting);
    let (meteo, veg) = tokio::task::spawn_blocking(move || {
        let extract = |group: VariableGroup, path: &std::path::Path| {
            extract_nearest_values(path, point, group.variables()).map_err(|source| {
                PipelineError::Extract {
                    group: group.label(),
                    source,
                }
            })
        };
        Ok::<(ExtractedValues, ExtractedValues), PipelineError>((
            extract(meteo_group, &meteo_path)?,
            extract(veg_group, &veg_path)?,
        ))
    })
    .await
    .map_err(|e| PipelineError::Task(e.to_string()))??;

    stages.push(Stage::Assembling);
    let record = FeatureRecord::assemble(date, point, &meteo, &veg);
    let mut table = PredictionTable {
        status: PredictionStatus::ModelUnavailable,
        rows: vec![PredictionRow {
            date,
            latitude: point.latitude,
            longitude: point.longitude,
            co2: None,
        }],
        missing_predictors: Vec::new(),
        features: record.values.clone(),
    };

    let Ok(bundle) = state.bundle.get() else {
        return Ok(table);
    };

    match record.predictor_row() {
        Ok(row) => {
            stages.push(Stage::Predicting);
            table.status = PredictionStatus::Predicted;
            table.rows[0].co2 = Some(bundle.predict(&row));
        }
        Err(missing) => {
            stages.push(Stage::SkippedIncompleteFeatures);
            info!(missing = ?missing, "Skipping prediction, predictors incomplete");
            table.status = PredictionStatus::SkippedIncompleteFeatures;
            table.missing_predictors = missing;
        }
    }
    Ok(table)
}
