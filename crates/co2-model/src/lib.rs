//! CO2 prediction from ERA5 point values.
//!
//! [`FeatureRecord`] merges extracted fields with the query into the 13
//! predictors the model expects; [`PredictionBundle`] holds the trained
//! ensemble and the scaler that maps its output back to ppm.

pub mod bundle;
pub mod error;
pub mod features;
pub mod forest;
pub mod scaler;

pub use bundle::PredictionBundle;
pub use error::{ModelError, Result};
pub use features::{FeatureRecord, PREDICTORS};
pub use forest::{DecisionTree, ForestRegressor, InputScaler};
pub use scaler::TargetScaler;
