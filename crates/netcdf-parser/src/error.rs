//! Error types for NetCDF parsing operations.

use era5_common::ErrorKind;
use thiserror::Error;

/// Result type for NetCDF parser operations.
pub type NetCdfResult<T> = Result<T, NetCdfError>;

/// Error types for NetCDF parsing.
#[derive(Error, Debug)]
pub enum NetCdfError {
    /// File I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Missing required variable or attribute
    #[error("Missing required data: {0}")]
    MissingData(String),

    /// Invalid data format
    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    /// Index outside the variable's actual dimensions
    #[error("Index {index:?} out of bounds for '{variable}' with shape {shape:?}")]
    OutOfBounds {
        variable: String,
        index: Vec<usize>,
        shape: Vec<usize>,
    },
}

impl NetCdfError {
    /// Every parser failure is a dataset-access failure to callers.
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::DatasetAccess
    }
}
