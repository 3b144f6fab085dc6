//! Download both ERA5 files for a date and pack them into one zip.

use std::path::{Path, PathBuf};

use cds_client::{FetchSettings, Retriever, RetrieveRequest};
use era5_common::{RequestDate, VariableGroup};
use metrics::counter;
use tracing::{debug, info, instrument, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{BundleError, Result};
use crate::log::{DownloadLog, LogEntry};

/// Groups downloaded into every bundle, in archive order.
pub const BUNDLE_GROUPS: [VariableGroup; 2] =
    [VariableGroup::BundleSingle, VariableGroup::BundleVegetation];

/// A finished archive, already removed from disk.
#[derive(Debug)]
pub struct BundleArtifact {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub entry: LogEntry,
}

/// `era5_single_20200615.nc`
pub fn data_file_name(group: VariableGroup, date: RequestDate) -> String {
    format!("{}_{}.nc", group.label(), date.compact())
}

/// `era5_combined_20200615.zip`
pub fn archive_file_name(date: RequestDate) -> String {
    format!("era5_combined_{}.zip", date.compact())
}

/// Every variable requested for a bundle, single-level first.
pub fn combined_variables() -> Vec<&'static str> {
    BUNDLE_GROUPS
        .iter()
        .flat_map(|g| g.variables().iter().copied())
        .collect()
}

/// Fetch both groups into a scratch directory under `work_root`, zip them,
/// append a log row and return the archive bytes. Nothing is left on disk,
/// whether the bundle succeeds or not.
#[instrument(skip(retriever, settings, work_root, log), fields(date = %date))]
pub async fn build_bundle(
    retriever: &dyn Retriever,
    settings: &FetchSettings,
    work_root: &Path,
    date: RequestDate,
    log: &DownloadLog,
) -> Result<BundleArtifact> {
    let result = assemble(retriever, settings, work_root, date, log).await;
    let outcome = if result.is_ok() { "ok" } else { "error" };
    counter!("era5_bundles_total", "result" => outcome).increment(1);
    result
}

async fn assemble(
    retriever: &dyn Retriever,
    settings: &FetchSettings,
    work_root: &Path,
    date: RequestDate,
    log: &DownloadLog,
) -> Result<BundleArtifact> {
    tokio::fs::create_dir_all(work_root).await?;
    let scratch = tempfile::Builder::new()
        .prefix("bundle-")
        .tempdir_in(work_root)?;

    let [single, vegetation] = BUNDLE_GROUPS;
    let single_name = data_file_name(single, date);
    let veg_name = data_file_name(vegetation, date);
    let single_path = scratch.path().join(&single_name);
    let veg_path = scratch.path().join(&veg_name);

    tokio::try_join!(
        download(retriever, settings, date, single, &single_path),
        download(retriever, settings, date, vegetation, &veg_path),
    )?;

    let archive_name = archive_file_name(date);
    let archive_path = scratch.path().join(&archive_name);
    let members = vec![
        (single_name.clone(), single_path.clone()),
        (veg_name.clone(), veg_path.clone()),
    ];
    let target = archive_path.clone();
    tokio::task::spawn_blocking(move || write_archive(&target, &members))
        .await
        .map_err(|e| BundleError::Task(e.to_string()))??;

    let bytes = tokio::fs::read(&archive_path).await?;
    discard(&[single_path.as_path(), veg_path.as_path(), archive_path.as_path()]).await;
    if let Err(e) = scratch.close() {
        warn!(error = %e, "Failed to remove bundle scratch directory");
    }

    // Last fallible step: a logged row always means a delivered bundle.
    let entry = LogEntry {
        date: date.iso(),
        variables: combined_variables().join(", "),
        netcdf_files: format!("{}, {}", single_name, veg_name),
        zip_file: archive_name.clone(),
    };
    let rows = log.append(entry.clone()).await?;

    info!(
        archive = %archive_name,
        bytes = bytes.len(),
        log_rows = rows,
        "Bundle ready"
    );
    Ok(BundleArtifact {
        file_name: archive_name,
        bytes,
        entry,
    })
}

async fn download(
    retriever: &dyn Retriever,
    settings: &FetchSettings,
    date: RequestDate,
    group: VariableGroup,
    target: &Path,
) -> Result<u64> {
    let request = RetrieveRequest::new(settings, date, group.variables());
    let file = data_file_name(group, date);
    let bytes = retriever
        .retrieve(&settings.dataset, &request, target)
        .await
        .map_err(|source| BundleError::Download {
            file: file.clone(),
            source,
        })?;
    debug!(file = %file, bytes, "Downloaded");
    Ok(bytes)
}

/// Remove bundle files, logging any that cannot be removed. Returns the
/// number of failures.
async fn discard(paths: &[&Path]) -> usize {
    let mut failed = 0;
    for path in paths {
        if let Err(e) = tokio::fs::remove_file(path).await {
            warn!(path = %path.display(), error = %e, "Failed to remove bundle file");
            failed += 1;
        }
    }
    failed
}

fn write_archive(archive: &Path, members: &[(String, PathBuf)]) -> Result<()> {
    let file = std::fs::File::create(archive)?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for (name, path) in members {
        zip.start_file(name.as_str(), options)?;
        let mut src = std::fs::File::open(path)?;
        std::io::copy(&mut src, &mut zip)?;
    }
    zip.finish()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_names() {
        let date = RequestDate::parse("2020-06-15").unwrap();
        assert_eq!(
            data_file_name(VariableGroup::BundleSingle, date),
            "era5_single_20200615.nc"
        );
        assert_eq!(
            data_file_name(VariableGroup::BundleVegetation, date),
            "era5_veg_20200615.nc"
        );
        assert_eq!(archive_file_name(date), "era5_combined_20200615.zip");
    }

    #[tokio::test]
    async fn test_discard_reports_failures() {
        let dir = tempfile::TempDir::new().unwrap();
        let present = dir.path().join("era5_single_20200615.nc");
        std::fs::write(&present, b"data").unwrap();
        let missing = dir.path().join("era5_veg_20200615.nc");

        assert_eq!(discard(&[present.as_path(), missing.as_path()]).await, 1);
        assert!(!present.exists());
    }

    #[test]
    fn test_combined_variables_order() {
        let vars = combined_variables();
        let single = VariableGroup::BundleSingle.variables();
        assert_eq!(&vars[..single.len()], single);
        assert!(vars.contains(&"total_precipitation"));
        assert!(vars.contains(&"type_of_low_vegetation"));
        assert_eq!(
            vars.len(),
            single.len() + VariableGroup::BundleVegetation.variables().len()
        );
    }
}
