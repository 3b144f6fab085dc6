//! The prediction bundle: regressor plus target scaler, loaded from JSON.

use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::error::{ModelError, Result};
use crate::forest::ForestRegressor;
use crate::scaler::TargetScaler;

#[derive(Deserialize)]
struct BundleFile {
    #[serde(default)]
    model: Option<ForestRegressor>,
    #[serde(default)]
    scaler_target: Option<TargetScaler>,
}

/// A loaded, validated model and its target scaler. Immutable once built.
#[derive(Debug, Clone)]
pub struct PredictionBundle {
    model: ForestRegressor,
    scaler_target: TargetScaler,
}

impl PredictionBundle {
    pub fn new(model: ForestRegressor, scaler_target: TargetScaler) -> Result<Self> {
        model.validate()?;
        Ok(Self {
            model,
            scaler_target,
        })
    }

    /// Parse a bundle. Both `model` and `scaler_target` must be present.
    pub fn from_json(json: &str) -> Result<Self> {
        let file: BundleFile = serde_json::from_str(json)?;
        let model = file.model.ok_or(ModelError::MissingComponent("model"))?;
        let scaler_target = file
            .scaler_target
            .ok_or(ModelError::MissingComponent("scaler_target"))?;
        Self::new(model, scaler_target)
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ModelError::NotFound(path.to_path_buf()));
        }
        let bundle = Self::from_json(&std::fs::read_to_string(path)?)?;
        info!(
            path = %path.display(),
            trees = bundle.model.trees.len(),
            "Loaded prediction bundle"
        );
        Ok(bundle)
    }

    pub fn model(&self) -> &ForestRegressor {
        &self.model
    }

    pub fn scaler_target(&self) -> &TargetScaler {
        &self.scaler_target
    }

    /// Predict one row and map it back to concentration units.
    pub fn predict(&self, row: &[f64; 13]) -> f64 {
        self.scaler_target.inverse_transform(self.model.predict(row))
    }
}
