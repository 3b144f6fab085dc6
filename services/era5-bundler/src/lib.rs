//! ERA5 download bundler.
//!
//! `GET /bundle?date=` downloads the single-level and vegetation files for a
//! date, returns them as one zip archive and records the download in a CSV
//! log. Intermediate files never outlive the request.

pub mod bundle;
pub mod error;
pub mod handlers;
pub mod log;
pub mod server;
pub mod state;

pub use bundle::{build_bundle, BundleArtifact};
pub use error::BundleError;
pub use log::{DownloadLog, LogEntry};
pub use server::create_router;
pub use state::{AppState, BundlerConfig};
