//! CSV log of completed bundles.
//!
//! Each bundle appends one row. The file is read whole, extended and
//! rewritten, so rows written by hand or by older versions are preserved as
//! long as they carry the same four columns.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{BundleError, Result};

/// One logged bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// `YYYY-MM-DD`
    pub date: String,
    /// Every requested variable, joined with `", "`.
    pub variables: String,
    /// The two data file names, joined with `", "`.
    pub netcdf_files: String,
    pub zip_file: String,
}

/// The log file. Appends from one process are serialized; concurrent
/// writers in other processes race on the rewrite.
pub struct DownloadLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl DownloadLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `entry`, returning the number of rows now in the log.
    pub async fn append(&self, entry: LogEntry) -> Result<usize> {
        let _guard = self.lock.lock().await;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || {
            let mut entries = read_entries(&path)?;
            entries.push(entry);
            write_entries(&path, &entries)?;
            debug!(path = %path.display(), rows = entries.len(), "Appended to download log");
            Ok(entries.len())
        })
        .await
        .map_err(|e| BundleError::Task(e.to_string()))?
    }

    /// All rows; empty if the log does not exist yet.
    pub async fn entries(&self) -> Result<Vec<LogEntry>> {
        let _guard = self.lock.lock().await;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || read_entries(&path))
            .await
            .map_err(|e| BundleError::Task(e.to_string()))?
    }

    /// Raw file contents, or `None` if nothing has been logged.
    pub async fn contents(&self) -> Result<Option<Vec<u8>>> {
        let _guard = self.lock.lock().await;
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

fn read_entries(path: &Path) -> Result<Vec<LogEntry>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let mut rdr = csv::ReaderBuilder::new().has_headers(true).from_path(path)?;
    let mut entries = Vec::new();
    for record in rdr.deserialize() {
        entries.push(record?);
    }
    Ok(entries)
}

fn write_entries(path: &Path, entries: &[LogEntry]) -> Result<()> {
    let mut tmp = path.as_os_str().to_os_string();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let mut wtr = csv::Writer::from_path(&tmp)?;
    for entry in entries {
        wtr.serialize(entry)?;
    }
    wtr.flush()?;
    drop(wtr);
    std::fs::rename(&tmp, path)?;
    Ok(())
}
