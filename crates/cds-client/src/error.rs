//! Error types for archive retrieval.

use era5_common::ErrorKind;
use thiserror::Error;

/// Errors raised while configuring, requesting or caching a retrieval.
#[derive(Error, Debug)]
pub enum CdsError {
    /// No usable credentials were found or synthesized.
    #[error("CDS credentials unavailable: {0}")]
    MissingCredentials(String),

    /// The credentials file exists but cannot be used.
    #[error("invalid credentials file: {0}")]
    InvalidCredentials(String),

    /// Fetch settings could not be loaded.
    #[error("invalid fetch settings: {0}")]
    Settings(String),

    /// Transport-level failure talking to the archive.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The archive answered with an error status.
    #[error("CDS returned {status}: {message}")]
    Service { status: u16, message: String },

    /// The archive accepted the request but reported it failed.
    #[error("CDS request failed: {0}")]
    RequestFailed(String),

    /// The request did not complete within the configured wait.
    #[error("CDS request {request_id} still {state} after {waited_secs}s")]
    Timeout {
        request_id: String,
        state: String,
        waited_secs: u64,
    },

    /// Local file handling in the cache directory failed.
    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A cache manifest could not be encoded.
    #[error("cache manifest error: {0}")]
    Manifest(#[from] serde_json::Error),
}

impl CdsError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingCredentials(_) | Self::InvalidCredentials(_) | Self::Settings(_) => {
                ErrorKind::Configuration
            }
            Self::Http(_) | Self::Service { .. } | Self::RequestFailed(_) | Self::Timeout { .. } => {
                ErrorKind::RemoteAccess
            }
            Self::Io(_) | Self::Manifest(_) => ErrorKind::DatasetAccess,
        }
    }
}

pub type Result<T> = std::result::Result<T, CdsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(
            CdsError::MissingCredentials("x".into()).kind(),
            ErrorKind::Configuration
        );
        assert_eq!(
            CdsError::Service {
                status: 500,
                message: "boom".into()
            }
            .kind(),
            ErrorKind::RemoteAccess
        );
        assert_eq!(
            CdsError::Timeout {
                request_id: "r".into(),
                state: "queued".into(),
                waited_secs: 10
            }
            .kind(),
            ErrorKind::RemoteAccess
        );
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        assert_eq!(CdsError::from(io).kind(), ErrorKind::DatasetAccess);
    }
}
