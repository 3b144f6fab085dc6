//! Target rescaling applied after the regressor.

use serde::Deserialize;

/// Inverse of the transform the training target went through.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TargetScaler {
    /// `y_scaled = (y - mean) / scale`
    Standard { mean: f64, scale: f64 },

    /// `y_scaled = (y - data_min) / (data_max - data_min) * (hi - lo) + lo`
    #[serde(rename = "minmax")]
    MinMax {
        data_min: f64,
        data_max: f64,
        #[serde(default = "default_feature_range")]
        feature_range: (f64, f64),
    },
}

fn default_feature_range() -> (f64, f64) {
    (0.0, 1.0)
}

impl TargetScaler {
    pub fn inverse_transform(&self, y: f64) -> f64 {
        match *self {
            Self::Standard { mean, scale } => y * nonzero(scale) + mean,
            Self::MinMax {
                data_min,
                data_max,
                feature_range: (lo, hi),
            } => {
                let scale = (hi - lo) / nonzero(data_max - data_min);
                let min = lo - data_min * scale;
                (y - min) / scale
            }
        }
    }
}

/// A zero scale is treated as one, so constant targets invert to themselves.
fn nonzero(scale: f64) -> f64 {
    if scale == 0.0 {
        1.0
    } else {
        scale
    }
}
