//! Loading the bundle from disk and predicting the reference scenario.

use std::collections::BTreeMap;

use co2_model::{FeatureRecord, ModelError, PredictionBundle};
use era5_common::{ErrorKind, GeoPoint, RequestDate};
use tempfile::TempDir;
use test_utils::{assert_approx_eq, model, scenario};

fn to_map(fields: &[(&str, f64)]) -> BTreeMap<String, Option<f64>> {
    fields.iter().map(|(k, v)| (k.to_string(), Some(*v))).collect()
}

fn scenario_record() -> FeatureRecord {
    FeatureRecord::assemble(
        RequestDate::parse(scenario::DATE).unwrap(),
        GeoPoint::new(scenario::LATITUDE, scenario::LONGITUDE),
        &to_map(&scenario::METEO_FIELDS),
        &to_map(&scenario::VEG_FIELDS),
    )
}

#[test]
fn test_scenario_prediction() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("co2_bundle.json");
    std::fs::write(&path, model::BUNDLE_JSON).unwrap();

    let bundle = PredictionBundle::load(&path).unwrap();
    assert_eq!(bundle.model().trees.len(), 2);

    let row = scenario_record().predictor_row().unwrap();
    assert_approx_eq!(bundle.predict(&row), scenario::EXPECTED_CO2, 1e-9);
}

#[test]
fn test_colder_day_goes_left() {
    let bundle = PredictionBundle::from_json(model::BUNDLE_JSON).unwrap();
    let mut row = scenario_record().predictor_row().unwrap();
    row[6] = 280.0; // t2m
    // (0.2 + 0.4) / 2 * 5 + 410
    assert_approx_eq!(bundle.predict(&row), 411.5, 1e-9);
}

#[test]
fn test_missing_scaler_is_configuration_error() {
    let err = PredictionBundle::from_json(model::MODEL_ONLY_JSON).unwrap_err();
    assert!(matches!(err, ModelError::MissingComponent("scaler_target")));
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[test]
fn test_missing_model_is_configuration_error() {
    let err = PredictionBundle::from_json(r#"{"scaler_target":{"kind":"standard","mean":0,"scale":1}}"#)
        .unwrap_err();
    assert!(matches!(err, ModelError::MissingComponent("model")));
}

#[test]
fn test_missing_file() {
    let err = PredictionBundle::load(std::path::Path::new("/nonexistent/co2_bundle.json"))
        .unwrap_err();
    assert!(matches!(err, ModelError::NotFound(_)));
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[test]
fn test_corrupt_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("co2_bundle.json");
    std::fs::write(&path, "{ not json").unwrap();
    assert!(matches!(
        PredictionBundle::load(&path).unwrap_err(),
        ModelError::Parse(_)
    ));
}
