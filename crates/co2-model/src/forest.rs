//! Tree-ensemble regressor in the flat array layout of the training export.
//!
//! Each tree stores parallel arrays indexed by node id. A node whose
//! `children_left` is negative is a leaf; otherwise the sample goes left when
//! `x[feature] <= threshold`. The ensemble prediction is the mean of the
//! leaves reached.

use serde::Deserialize;

use crate::error::{ModelError, Result};
use crate::features::PREDICTORS;

#[derive(Debug, Clone, Deserialize)]
pub struct DecisionTree {
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    pub value: Vec<f64>,
}

impl DecisionTree {
    fn node_count(&self) -> usize {
        self.value.len()
    }

    /// Checks array lengths, feature ids and that children come after their
    /// parent, which guarantees traversal terminates.
    pub fn validate(&self, n_features: usize) -> Result<()> {
        let n = self.node_count();
        if n == 0 {
            return Err(ModelError::Invalid("tree has no nodes".into()));
        }
        if [
            self.children_left.len(),
            self.children_right.len(),
            self.feature.len(),
            self.threshold.len(),
        ]
        .iter()
        .any(|&len| len != n)
        {
            return Err(ModelError::Invalid("tree arrays differ in length".into()));
        }

        for node in 0..n {
            let (left, right) = (self.children_left[node], self.children_right[node]);
            if left < 0 {
                continue;
            }
            let in_range = |child: i64| child > node as i64 && (child as usize) < n;
            if !in_range(left) || !in_range(right) {
                return Err(ModelError::Invalid(format!(
                    "node {} has invalid children ({}, {})",
                    node, left, right
                )));
            }
            let feature = self.feature[node];
            if feature < 0 || feature as usize >= n_features {
                return Err(ModelError::Invalid(format!(
                    "node {} splits on unknown feature {}",
                    node, feature
                )));
            }
        }
        Ok(())
    }

    /// Leaf value reached by `row`. Assumes [`validate`](Self::validate) passed.
    pub fn predict(&self, row: &[f64]) -> f64 {
        let mut node = 0usize;
        loop {
            let left = self.children_left[node];
            if left < 0 {
                return self.value[node];
            }
            let x = row[self.feature[node] as usize];
            node = if x <= self.threshold[node] {
                left as usize
            } else {
                self.children_right[node] as usize
            };
        }
    }
}

/// Per-feature standardisation applied before the trees.
#[derive(Debug, Clone, Deserialize)]
pub struct InputScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForestRegressor {
    pub feature_names: Vec<String>,
    pub trees: Vec<DecisionTree>,
    #[serde(default)]
    pub input_scaler: Option<InputScaler>,
}

impl ForestRegressor {
    /// The model must have been trained on exactly the predictor order used
    /// to build rows.
    pub fn validate(&self) -> Result<()> {
        if self.feature_names.iter().map(String::as_str).ne(PREDICTORS) {
            return Err(ModelError::Invalid(format!(
                "feature order {:?} does not match {:?}",
                self.feature_names, PREDICTORS
            )));
        }
        if self.trees.is_empty() {
            return Err(ModelError::Invalid("ensemble has no trees".into()));
        }
        if let Some(scaler) = &self.input_scaler {
            if scaler.mean.len() != PREDICTORS.len() || scaler.scale.len() != PREDICTORS.len() {
                return Err(ModelError::Invalid("input scaler has wrong width".into()));
            }
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(PREDICTORS.len())
                .map_err(|e| ModelError::Invalid(format!("tree {}: {}", i, e)))?;
        }
        Ok(())
    }

    /// Mean leaf value over all trees, in the scaled target space.
    pub fn predict(&self, row: &[f64; 13]) -> f64 {
        let mut x = *row;
        if let Some(scaler) = &self.input_scaler {
            for ((v, mean), scale) in x.iter_mut().zip(&scaler.mean).zip(&scaler.scale) {
                let scale = if *scale == 0.0 { 1.0 } else { *scale };
                *v = (*v - mean) / scale;
            }
        }
        let sum: f64 = self.trees.iter().map(|t| t.predict(&x)).sum();
        sum / self.trees.len() as f64
    }
}
