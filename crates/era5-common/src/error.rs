//! Error classification shared by every crate in the workspace.
//!
//! Each library crate has its own `thiserror` enum; all of them map onto
//! [`ErrorKind`] so callers can classify failures without matching on
//! message text.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of failure classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Missing credentials, missing or malformed model artifact, bad settings.
    Configuration,
    /// Network or archive-service failure while fetching data.
    RemoteAccess,
    /// A fetched file could not be opened, parsed or indexed.
    DatasetAccess,
    /// Not every predictor could be filled for the current attempt.
    DataCompleteness,
}

impl ErrorKind {
    /// Stable machine-readable name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::RemoteAccess => "remote_access",
            ErrorKind::DatasetAccess => "dataset_access",
            ErrorKind::DataCompleteness => "data_completeness",
        }
    }

    /// Get the HTTP status code used when this kind reaches an API boundary.
    pub fn http_status_code(&self) -> u16 {
        match self {
            ErrorKind::Configuration => 503,
            ErrorKind::RemoteAccess => 502,
            ErrorKind::DatasetAccess => 500,
            ErrorKind::DataCompleteness => 422,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
