//! Bundle errors and their HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use cds_client::CdsError;
use era5_common::ErrorKind;
use serde_json::json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, BundleError>;

#[derive(Debug, Error)]
pub enum BundleError {
    #[error("Invalid date '{0}': expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("Remote fetching unavailable: {0}")]
    FetchUnavailable(String),

    #[error("Failed to download {file}: {source}")]
    Download {
        file: String,
        #[source]
        source: CdsError,
    },

    #[error("Failed to write archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Download log error: {0}")]
    Log(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Background task failed: {0}")]
    Task(String),
}

impl BundleError {
    /// `None` for caller errors, which carry no pipeline kind.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            BundleError::InvalidDate(_) => None,
            BundleError::FetchUnavailable(_) => Some(ErrorKind::Configuration),
            BundleError::Download { source, .. } => Some(source.kind()),
            BundleError::Archive(_)
            | BundleError::Log(_)
            | BundleError::Io(_)
            | BundleError::Task(_) => Some(ErrorKind::DatasetAccess),
        }
    }
}

impl IntoResponse for BundleError {
    fn into_response(self) -> Response {
        let (status, kind) = match self.kind() {
            Some(kind) => (
                StatusCode::from_u16(kind.http_status_code())
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                kind.as_str(),
            ),
            None => (StatusCode::BAD_REQUEST, "invalid_input"),
        };
        let body = json!({
            "error": {
                "kind": kind,
                "message": self.to_string(),
            }
        });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_error_keeps_remote_kind() {
        let err = BundleError::Download {
            file: "era5_veg_20200615.nc".into(),
            source: CdsError::RequestFailed("queue full".into()),
        };
        assert_eq!(err.kind(), Some(ErrorKind::RemoteAccess));
        assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_invalid_date_is_bad_request() {
        let err = BundleError::InvalidDate("2020-13-01".into());
        assert_eq!(err.kind(), None);
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
