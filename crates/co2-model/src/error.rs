//! Error types for loading and running the prediction bundle.

use std::path::PathBuf;

use era5_common::ErrorKind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("model bundle not found at {0}")]
    NotFound(PathBuf),

    #[error("failed to read model bundle: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse model bundle: {0}")]
    Parse(#[from] serde_json::Error),

    /// `model` or `scaler_target` is absent from the bundle.
    #[error("model bundle has no '{0}'")]
    MissingComponent(&'static str),

    #[error("invalid model: {0}")]
    Invalid(String),
}

impl ModelError {
    /// A bad or missing bundle disables prediction; it is never a data error.
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Configuration
    }
}

pub type Result<T> = std::result::Result<T, ModelError>;
