//! Assembly of the 13-predictor feature record.

use std::collections::BTreeMap;

use era5_common::{GeoPoint, RequestDate};
use serde::Serialize;

/// Predictor names in the order the model was trained on.
pub const PREDICTORS: [&str; 13] = [
    "latitude",
    "longitude",
    "year",
    "month",
    "day",
    "sp",
    "t2m",
    "u10",
    "v10",
    "lai_hv",
    "lai_lv",
    "cvh",
    "cvl",
];

/// One input row: the query, its date scalars and every extracted field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureRecord {
    pub date: RequestDate,
    pub point: GeoPoint,
    pub values: BTreeMap<String, Option<f64>>,
}

impl FeatureRecord {
    /// Merge meteorological and vegetation extractions with the query.
    ///
    /// The two mappings are expected to be disjoint. Query-derived keys
    /// (`latitude`, `longitude`, `year`, `month`, `day`) are always present.
    pub fn assemble(
        date: RequestDate,
        point: GeoPoint,
        meteo: &BTreeMap<String, Option<f64>>,
        vegetation: &BTreeMap<String, Option<f64>>,
    ) -> Self {
        let mut values: BTreeMap<String, Option<f64>> = meteo
            .iter()
            .chain(vegetation)
            .map(|(k, v)| (k.clone(), *v))
            .collect();

        values.insert("latitude".into(), Some(point.latitude));
        values.insert("longitude".into(), Some(point.longitude));
        values.insert("year".into(), Some(date.year() as f64));
        values.insert("month".into(), Some(date.month() as f64));
        values.insert("day".into(), Some(date.day() as f64));

        Self {
            date,
            point,
            values,
        }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied().flatten()
    }

    /// Predictors that are missing or carry the absence marker.
    pub fn missing_predictors(&self) -> Vec<String> {
        PREDICTORS
            .iter()
            .filter(|name| self.get(name).is_none())
            .map(|name| name.to_string())
            .collect()
    }

    /// The row in model order, or the names of the predictors that are
    /// absent. No imputation is done.
    pub fn predictor_row(&self) -> Result<[f64; 13], Vec<String>> {
        let mut row = [0.0; 13];
        let mut missing = Vec::new();
        for (slot, name) in row.iter_mut().zip(PREDICTORS) {
            match self.get(name) {
                Some(v) => *slot = v,
                None => missing.push(name.to_string()),
            }
        }
        if missing.is_empty() {
            Ok(row)
        } else {
            Err(missing)
        }
    }
}
