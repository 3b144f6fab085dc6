//! Service configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Where the service finds its inputs. Built from command-line arguments
/// and environment in `main`.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Directory holding cached ERA5 downloads.
    pub cache_dir: PathBuf,
    /// JSON prediction bundle.
    pub model_path: PathBuf,
    /// YAML fetch settings; defaults apply when the file is absent.
    pub settings_path: PathBuf,
    /// Credentials file; `$CDSAPI_RC` or `~/.cdsapirc` when unset.
    pub credentials_path: Option<PathBuf>,
    /// Sessions untouched for longer than this are dropped.
    pub session_ttl: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("era5_data"),
            model_path: PathBuf::from("co2_bundle.json"),
            settings_path: PathBuf::from("config/era5.yaml"),
            credentials_path: None,
            session_ttl: Duration::from_secs(3600),
        }
    }
}
