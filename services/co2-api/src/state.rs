//! Application state for the prediction API.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use cds_client::{credentials, CdsClient, CdsError, FetchSettings, Fetcher};
use co2_model::PredictionBundle;
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ServiceConfig;
use crate::session::Session;

/// A dependency that either loaded or was disabled at startup.
pub enum Component<T> {
    Ready(T),
    Unavailable(String),
}

impl<T> Component<T> {
    pub fn get(&self) -> Result<&T, &str> {
        match self {
            Component::Ready(value) => Ok(value),
            Component::Unavailable(reason) => Err(reason.as_str()),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Component::Ready(_))
    }

    /// "ok" or the reason the component is unavailable.
    pub fn status(&self) -> String {
        match self {
            Component::Ready(_) => "ok".to_string(),
            Component::Unavailable(reason) => reason.clone(),
        }
    }
}

/// Shared application state.
pub struct AppState {
    /// Cached ERA5 retrieval; unavailable without credentials.
    pub fetcher: Component<Fetcher>,

    /// Trained model and target scaler; unavailable if the bundle is
    /// missing or incomplete.
    pub bundle: Component<PredictionBundle>,

    /// Directory for cached downloads.
    pub cache_dir: PathBuf,

    /// Interactive sessions by id.
    pub sessions: RwLock<HashMap<Uuid, Session>>,

    /// Idle time after which a session is swept.
    pub session_ttl: Duration,

    /// Prometheus recorder handle, when one is installed.
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(
        fetcher: Component<Fetcher>,
        bundle: Component<PredictionBundle>,
        cache_dir: PathBuf,
    ) -> Self {
        Self {
            fetcher,
            bundle,
            cache_dir,
            sessions: RwLock::new(HashMap::new()),
            session_ttl: ServiceConfig::default().session_ttl,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    /// Drop sessions not updated within the TTL as of `now`. Sessions with
    /// an attempt in flight are kept. Returns how many were removed.
    pub async fn sweep_sessions(&self, now: DateTime<Utc>) -> usize {
        let Some(cutoff) = chrono::Duration::from_std(self.session_ttl)
            .ok()
            .and_then(|ttl| now.checked_sub_signed(ttl))
        else {
            return 0;
        };
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| session.stage.is_running() || session.updated_at >= cutoff);
        let expired = before - sessions.len();
        if expired > 0 {
            debug!(expired, remaining = sessions.len(), "Expired idle sessions");
        }
        expired
    }

    /// Load every component. Missing credentials or a missing model are
    /// logged and leave the rest of the service working.
    pub fn from_config(config: &ServiceConfig) -> Self {
        let fetcher = match build_fetcher(config) {
            Ok(fetcher) => Component::Ready(fetcher),
            Err(e) => {
                warn!(error = %e, "Remote fetching disabled");
                Component::Unavailable(e.to_string())
            }
        };

        let bundle = match PredictionBundle::load(&config.model_path) {
            Ok(bundle) => Component::Ready(bundle),
            Err(e) => {
                warn!(error = %e, "Prediction disabled");
                Component::Unavailable(e.to_string())
            }
        };

        info!(
            cache_dir = %config.cache_dir.display(),
            fetcher = fetcher.is_ready(),
            model = bundle.is_ready(),
            "Application state initialized"
        );
        Self::new(fetcher, bundle, config.cache_dir.clone()).with_session_ttl(config.session_ttl)
    }
}

fn build_fetcher(config: &ServiceConfig) -> Result<Fetcher, CdsError> {
    let settings = FetchSettings::load_or_default(&config.settings_path)?;
    let path = config
        .credentials_path
        .clone()
        .or_else(credentials::default_path)
        .ok_or_else(|| CdsError::MissingCredentials("no home directory".into()))?;
    let creds = credentials::bootstrap(&path)?;
    let client = CdsClient::new(creds, &settings)?;
    Ok(Fetcher::new(Arc::new(client), settings))
}
