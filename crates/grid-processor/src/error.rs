//! Error types for grid processing.

use era5_common::ErrorKind;
use netcdf_parser::NetCdfError;
use thiserror::Error;

/// Errors that can occur while locating and extracting grid values.
#[derive(Error, Debug)]
pub enum GridProcessorError {
    /// The file could not be opened or decoded.
    #[error("failed to read dataset: {0}")]
    Dataset(#[from] NetCdfError),

    /// Neither of the accepted coordinate names exists in the file.
    #[error("missing coordinate variable: expected one of {0:?}")]
    MissingCoordinate(Vec<&'static str>),

    /// A coordinate axis has no usable values.
    #[error("coordinate axis '{0}' is empty")]
    EmptyAxis(String),

    /// The query point has a NaN or infinite coordinate.
    #[error("query {axis} {value} is not a finite number")]
    NonFiniteQuery { axis: &'static str, value: f64 },

    /// A field does not have at least (latitude, longitude) dimensions.
    #[error("field '{name}' has shape {shape:?}, expected at least 2 dimensions")]
    InvalidShape { name: String, shape: Vec<usize> },
}

impl GridProcessorError {
    /// All extraction failures are failures to read the downloaded file.
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::DatasetAccess
    }
}

/// Result type for grid processor operations.
pub type Result<T> = std::result::Result<T, GridProcessorError>;
