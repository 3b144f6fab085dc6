//! Request-addressed local cache of retrieved files.
//!
//! Each entry is a data file plus a JSON manifest next to it:
//!
//! ```text
//! <dir>/meteo_2020-06-15_1a2b3c4d.nc
//! <dir>/meteo_2020-06-15_1a2b3c4d.nc.json
//! ```
//!
//! The hash covers the dataset and the full request body. An entry is only
//! reused if the manifest says `complete`, records the same request and the
//! data file has the recorded size. Downloads land in `*.nc.partial` and are
//! renamed into place before the manifest is marked complete.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use era5_common::RequestDate;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, info, instrument, warn};

use crate::client::Retriever;
use crate::config::FetchSettings;
use crate::error::Result;
use crate::request::RetrieveRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    Pending,
    Complete,
}

/// Sidecar describing a cached file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheManifest {
    pub dataset: String,
    pub request: RetrieveRequest,
    pub status: EntryStatus,
    pub bytes: u64,
    pub fetched_at: DateTime<Utc>,
}

/// Ensures retrieval results exist locally, fetching only on a miss.
pub struct Fetcher {
    retriever: Arc<dyn Retriever>,
    settings: FetchSettings,
    locks: KeyLocks,
}

/// Per-key mutex plus the number of callers holding or awaiting it.
type KeyLocks = Mutex<HashMap<PathBuf, (Arc<tokio::sync::Mutex<()>>, usize)>>;

impl Fetcher {
    pub fn new(retriever: Arc<dyn Retriever>, settings: FetchSettings) -> Self {
        Self {
            retriever,
            settings,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Number of cache keys currently held or awaited by a caller.
    pub fn active_keys(&self) -> usize {
        self.locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn settings(&self) -> &FetchSettings {
        &self.settings
    }

    /// Path of the cache entry for this request, whether or not it exists.
    pub fn entry_path<S: AsRef<str>>(
        &self,
        date: RequestDate,
        dir: &Path,
        variables: &[S],
        label: &str,
    ) -> PathBuf {
        let request = RetrieveRequest::new(&self.settings, date, variables);
        dir.join(entry_file_name(label, date, &request.cache_key(&self.settings.dataset)))
    }

    /// Return the local file holding `variables` for `date`, retrieving it
    /// if no valid entry exists.
    #[instrument(skip(self, date, dir, variables), fields(date = %date))]
    pub async fn ensure<S: AsRef<str>>(
        &self,
        date: RequestDate,
        dir: &Path,
        variables: &[S],
        label: &str,
    ) -> Result<PathBuf> {
        let dataset = &self.settings.dataset;
        let request = RetrieveRequest::new(&self.settings, date, variables);
        let path = dir.join(entry_file_name(label, date, &request.cache_key(dataset)));

        let _held = KeyLock::acquire(&self.locks, &path).await;

        if is_valid_entry(&path, dataset, &request).await {
            debug!(path = %path.display(), "Cache hit");
            return Ok(path);
        }

        fs::create_dir_all(dir).await?;
        let manifest_path = manifest_path(&path);
        let partial_path = partial_path(&path);
        remove_if_exists(&path).await?;

        let mut manifest = CacheManifest {
            dataset: dataset.clone(),
            request: request.clone(),
            status: EntryStatus::Pending,
            bytes: 0,
            fetched_at: Utc::now(),
        };
        write_manifest(&manifest_path, &manifest).await?;

        info!(path = %path.display(), "Cache miss, retrieving");
        let bytes = match self.retriever.retrieve(dataset, &request, &partial_path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                remove_if_exists(&partial_path).await.ok();
                return Err(e);
            }
        };

        fs::rename(&partial_path, &path).await?;
        manifest.status = EntryStatus::Complete;
        manifest.bytes = bytes;
        manifest.fetched_at = Utc::now();
        write_manifest(&manifest_path, &manifest).await?;

        Ok(path)
    }

}

/// Exclusive hold on one cache key. The map entry is removed when the last
/// holder or waiter lets go.
struct KeyLock<'a> {
    locks: &'a KeyLocks,
    path: PathBuf,
    guard: Option<tokio::sync::OwnedMutexGuard<()>>,
}

impl<'a> KeyLock<'a> {
    async fn acquire(locks: &'a KeyLocks, path: &Path) -> KeyLock<'a> {
        let lock = {
            let mut map = locks.lock().unwrap_or_else(|e| e.into_inner());
            let entry = map.entry(path.to_path_buf()).or_default();
            entry.1 += 1;
            entry.0.clone()
        };
        // Registered before waiting, so a cancelled waiter still deregisters.
        let mut held = KeyLock {
            locks,
            path: path.to_path_buf(),
            guard: None,
        };
        held.guard = Some(lock.lock_owned().await);
        held
    }
}

impl Drop for KeyLock<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut map = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(entry) = map.get_mut(&self.path) {
            entry.1 = entry.1.saturating_sub(1);
            if entry.1 == 0 {
                map.remove(&self.path);
            }
        }
    }
}

/// `<label>_<YYYY-MM-DD>_<hash>.nc`
pub fn entry_file_name(label: &str, date: RequestDate, key: &str) -> String {
    format!("{}_{}_{}.nc", label, date.iso(), key)
}

pub fn manifest_path(path: &Path) -> PathBuf {
    suffixed(path, ".json")
}

fn partial_path(path: &Path) -> PathBuf {
    suffixed(path, ".partial")
}

fn suffixed(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

/// Read a manifest; `None` if absent or unreadable.
pub async fn read_manifest(path: &Path) -> Option<CacheManifest> {
    let bytes = fs::read(manifest_path(path)).await.ok()?;
    match serde_json::from_slice(&bytes) {
        Ok(manifest) => Some(manifest),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Ignoring unreadable cache manifest");
            None
        }
    }
}

async fn is_valid_entry(path: &Path, dataset: &str, request: &RetrieveRequest) -> bool {
    let Ok(meta) = fs::metadata(path).await else {
        return false;
    };
    let Some(manifest) = read_manifest(path).await else {
        debug!(path = %path.display(), "Cached file has no manifest");
        return false;
    };
    let valid = manifest.status == EntryStatus::Complete
        && manifest.dataset == dataset
        && &manifest.request == request
        && manifest.bytes == meta.len();
    if !valid {
        debug!(path = %path.display(), status = ?manifest.status, "Stale cache entry");
    }
    valid
}

async fn write_manifest(path: &Path, manifest: &CacheManifest) -> Result<()> {
    let tmp = suffixed(path, ".tmp");
    fs::write(&tmp, serde_json::to_vec_pretty(manifest)?).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

async fn remove_if_exists(path: &Path) -> std::io::Result<()> {
    match fs::remove_file(path).await {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}
