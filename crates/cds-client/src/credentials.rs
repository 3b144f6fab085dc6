//! `.cdsapirc` credentials.
//!
//! The file holds two `name: value` lines:
//!
//! ```text
//! url: https://cds.climate.copernicus.eu/api/v2
//! key: 12345:abcdef-0123
//! ```
//!
//! When the file is missing it is synthesized once from the `CDSAPI_UID`
//! and `CDSAPI_KEY` secrets so later runs find it.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::{CdsError, Result};

/// Endpoint written into synthesized credential files.
pub const DEFAULT_API_URL: &str = "https://cds.climate.copernicus.eu/api/v2";

/// Environment variable overriding the credentials file location.
pub const RC_PATH_ENV: &str = "CDSAPI_RC";
pub const UID_ENV: &str = "CDSAPI_UID";
pub const KEY_ENV: &str = "CDSAPI_KEY";

/// API endpoint and `UID:KEY` pair.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub url: String,
    uid: String,
    api_key: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("url", &self.url)
            .field("uid", &self.uid)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    pub fn new(url: impl Into<String>, uid: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            uid: uid.into(),
            api_key: api_key.into(),
        }
    }

    /// Parse the contents of a credentials file.
    pub fn parse(contents: &str) -> Result<Self> {
        let mut url = None;
        let mut key = None;
        for line in contents.lines() {
            let Some((name, value)) = line.split_once(':') else {
                continue;
            };
            match name.trim() {
                "url" => url = Some(value.trim().to_string()),
                "key" => key = Some(value.trim().to_string()),
                _ => {}
            }
        }

        let url = url.ok_or_else(|| CdsError::InvalidCredentials("missing 'url' line".into()))?;
        let key = key.ok_or_else(|| CdsError::InvalidCredentials("missing 'key' line".into()))?;
        let (uid, api_key) = key
            .split_once(':')
            .ok_or_else(|| CdsError::InvalidCredentials("'key' must be UID:KEY".into()))?;
        if url.is_empty() || uid.is_empty() || api_key.is_empty() {
            return Err(CdsError::InvalidCredentials("empty url or key".into()));
        }
        Ok(Self::new(url, uid, api_key))
    }

    /// Load and parse a credentials file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            CdsError::InvalidCredentials(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::parse(&contents)
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// File contents in `.cdsapirc` format.
    pub fn render(&self) -> String {
        format!("url: {}\nkey: {}:{}\n", self.url, self.uid, self.api_key)
    }
}

/// `$CDSAPI_RC`, or `~/.cdsapirc`.
pub fn default_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os(RC_PATH_ENV) {
        return Some(PathBuf::from(path));
    }
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".cdsapirc"))
}

/// Load credentials from `path`, synthesizing the file from the
/// `CDSAPI_UID`/`CDSAPI_KEY` environment variables if it does not exist.
pub fn bootstrap(path: &Path) -> Result<Credentials> {
    let uid = std::env::var(UID_ENV).ok();
    let key = std::env::var(KEY_ENV).ok();
    bootstrap_with(path, uid.as_deref(), key.as_deref())
}

/// [`bootstrap`] with explicit secrets.
pub fn bootstrap_with(path: &Path, uid: Option<&str>, key: Option<&str>) -> Result<Credentials> {
    if path.exists() {
        let credentials = Credentials::load(path)?;
        info!(path = %path.display(), url = %credentials.url, "Loaded CDS credentials");
        return Ok(credentials);
    }

    let (uid, key) = match (uid.map(str::trim), key.map(str::trim)) {
        (Some(uid), Some(key)) if !uid.is_empty() && !key.is_empty() => (uid, key),
        _ => {
            return Err(CdsError::MissingCredentials(format!(
                "{} not found and {}/{} are not set",
                path.display(),
                UID_ENV,
                KEY_ENV
            )))
        }
    };

    let credentials = Credentials::new(DEFAULT_API_URL, uid, key);
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    match std::fs::write(path, credentials.render()) {
        Ok(()) => info!(path = %path.display(), "Wrote CDS credentials from secrets"),
        Err(e) => warn!(path = %path.display(), error = %e, "Could not persist CDS credentials"),
    }
    Ok(credentials)
}

#[cfg(test)]
mod tests {
    use super::*;
    use era5_common::ErrorKind;

    #[test]
    fn test_parse() {
        let creds = Credentials::parse(
            "url: https://cds.climate.copernicus.eu/api/v2\nkey: 12345:abc-def\nverify: 0\n",
        )
        .unwrap();
        assert_eq!(creds.url, "https://cds.climate.copernicus.eu/api/v2");
        assert_eq!(creds.uid(), "12345");
        assert_eq!(creds.api_key(), "abc-def");
    }

    #[test]
    fn test_parse_rejects_bad_key() {
        let err = Credentials::parse("url: https://x\nkey: no-colon\n").unwrap_err();
        assert!(matches!(err, CdsError::InvalidCredentials(_)));
        assert_eq!(err.kind(), ErrorKind::Configuration);

        assert!(Credentials::parse("key: 1:2\n").is_err());
    }

    #[test]
    fn test_render_round_trip() {
        let creds = Credentials::new(DEFAULT_API_URL, "42", "secret");
        assert_eq!(Credentials::parse(&creds.render()).unwrap(), creds);
    }

    #[test]
    fn test_debug_hides_key() {
        let creds = Credentials::new(DEFAULT_API_URL, "42", "secret");
        assert!(!format!("{:?}", creds).contains("secret"));
    }
}
