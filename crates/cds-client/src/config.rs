//! Fetch settings loaded from `config/era5.yaml`.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{CdsError, Result};

/// How retrieval requests are built and how long to wait for them.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FetchSettings {
    /// Archive dataset identifier.
    #[serde(default = "default_dataset")]
    pub dataset: String,

    #[serde(default = "default_product_type")]
    pub product_type: Vec<String>,

    /// Hours of day requested (UTC).
    #[serde(default = "default_time")]
    pub time: Vec<String>,

    #[serde(default = "default_format")]
    pub format: String,

    /// Seconds between task status polls.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Give up on a queued/running task after this many seconds.
    #[serde(default = "default_max_wait")]
    pub max_wait_secs: u64,

    /// Per-HTTP-request timeout.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Overrides the URL from the credentials file.
    #[serde(default)]
    pub api_url: Option<String>,
}

fn default_dataset() -> String {
    "reanalysis-era5-single-levels".to_string()
}

fn default_product_type() -> Vec<String> {
    vec!["reanalysis".to_string()]
}

fn default_time() -> Vec<String> {
    vec!["13:00".to_string()]
}

fn default_format() -> String {
    "netcdf".to_string()
}

fn default_poll_interval() -> u64 {
    2
}

fn default_max_wait() -> u64 {
    3600
}

fn default_request_timeout() -> u64 {
    600
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            dataset: default_dataset(),
            product_type: default_product_type(),
            time: default_time(),
            format: default_format(),
            poll_interval_secs: default_poll_interval(),
            max_wait_secs: default_max_wait(),
            request_timeout_secs: default_request_timeout(),
            api_url: None,
        }
    }
}

impl FetchSettings {
    /// Load settings from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| CdsError::Settings(format!("cannot read {}: {}", path.display(), e)))?;
        let settings: Self = serde_yaml::from_str(&contents)
            .map_err(|e| CdsError::Settings(format!("{}: {}", path.display(), e)))?;
        debug!(path = %path.display(), dataset = %settings.dataset, "Loaded fetch settings");
        Ok(settings)
    }

    /// Load settings, falling back to defaults when the file does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            info!(path = %path.display(), "No fetch settings file, using defaults");
            Ok(Self::default())
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn max_wait(&self) -> Duration {
        Duration::from_secs(self.max_wait_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_yaml() {
        let settings: FetchSettings = serde_yaml::from_str("{}").unwrap();
        assert_eq!(settings, FetchSettings::default());
        assert_eq!(settings.dataset, "reanalysis-era5-single-levels");
        assert_eq!(settings.time, vec!["13:00"]);
        assert_eq!(settings.format, "netcdf");
    }

    #[test]
    fn test_partial_override() {
        let yaml = "poll_interval_secs: 5\napi_url: http://localhost:9999/api/v2\n";
        let settings: FetchSettings = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(settings.poll_interval(), Duration::from_secs(5));
        assert_eq!(settings.api_url.as_deref(), Some("http://localhost:9999/api/v2"));
        assert_eq!(settings.product_type, vec!["reanalysis"]);
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let settings = FetchSettings::load_or_default(Path::new("/nonexistent/era5.yaml")).unwrap();
        assert_eq!(settings, FetchSettings::default());
    }

    #[test]
    fn test_load_invalid_yaml() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("bad.yaml");
        std::fs::write(&path, "poll_interval_secs: [not a number]\n").unwrap();
        assert!(matches!(FetchSettings::load(&path), Err(CdsError::Settings(_))));
    }

    #[test]
    fn test_shipped_settings_match_defaults() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../config/era5.yaml");
        let settings = FetchSettings::load(&path).unwrap();
        assert_eq!(settings, FetchSettings::default());
    }
}
