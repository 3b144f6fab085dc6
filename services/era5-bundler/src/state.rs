//! Application state for the bundler.

use std::path::PathBuf;
use std::sync::Arc;

use cds_client::{credentials, CdsClient, CdsError, FetchSettings, Retriever};
use metrics_exporter_prometheus::PrometheusHandle;
use tracing::{info, warn};

use crate::log::DownloadLog;

/// Startup configuration, filled from the command line.
#[derive(Debug, Clone)]
pub struct BundlerConfig {
    /// Scratch space for downloads and archives.
    pub work_dir: PathBuf,
    pub log_path: PathBuf,
    pub settings_path: PathBuf,
    pub credentials_path: Option<PathBuf>,
}

pub struct AppState {
    /// Archive access, or why it is disabled.
    pub retriever: Result<Arc<dyn Retriever>, String>,
    pub settings: FetchSettings,
    pub work_dir: PathBuf,
    pub log: DownloadLog,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(
        retriever: Result<Arc<dyn Retriever>, String>,
        settings: FetchSettings,
        work_dir: PathBuf,
        log: DownloadLog,
    ) -> Self {
        Self {
            retriever,
            settings,
            work_dir,
            log,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Missing credentials or unreadable settings disable bundling; the log
    /// stays readable.
    pub fn from_config(config: &BundlerConfig) -> Self {
        let settings = match FetchSettings::load_or_default(&config.settings_path) {
            Ok(settings) => Ok(settings),
            Err(e) => {
                warn!(error = %e, "Invalid fetch settings");
                Err(e)
            }
        };

        let retriever = match &settings {
            Ok(settings) => build_client(config, settings)
                .map(|client| Arc::new(client) as Arc<dyn Retriever>)
                .map_err(|e| {
                    warn!(error = %e, "Remote fetching disabled");
                    e.to_string()
                }),
            Err(e) => Err(e.to_string()),
        };

        info!(
            work_dir = %config.work_dir.display(),
            log = %config.log_path.display(),
            fetching = retriever.is_ok(),
            "Bundler state initialized"
        );
        Self::new(
            retriever,
            settings.unwrap_or_default(),
            config.work_dir.clone(),
            DownloadLog::new(&config.log_path),
        )
    }
}

fn build_client(config: &BundlerConfig, settings: &FetchSettings) -> Result<CdsClient, CdsError> {
    let path = config
        .credentials_path
        .clone()
        .or_else(credentials::default_path)
        .ok_or_else(|| CdsError::MissingCredentials("no home directory".into()))?;
    let creds = credentials::bootstrap(&path)?;
    CdsClient::new(creds, settings)
}
