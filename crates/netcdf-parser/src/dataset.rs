//! Format-independent access to gridded fields.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use tracing::debug;

use crate::error::{NetCdfError, NetCdfResult};
use crate::native::NativeDataset;

/// Read-only view of a gridded dataset.
///
/// Implementations release their underlying file when dropped.
pub trait GriddedDataset {
    /// Whether a variable with this exact name exists.
    fn has_variable(&self, name: &str) -> bool;

    /// Actual dimension lengths of a variable.
    fn shape(&self, name: &str) -> NetCdfResult<Vec<usize>>;

    /// Unpacked value at `index`; `None` for fill/missing cells.
    fn value_at(&self, name: &str, index: &[usize]) -> NetCdfResult<Option<f64>>;

    /// All values of a one-dimensional variable. Fill cells become NaN.
    fn read_1d(&self, name: &str) -> NetCdfResult<Vec<f64>> {
        let shape = self.shape(name)?;
        if shape.len() != 1 {
            return Err(NetCdfError::InvalidFormat(format!(
                "'{}' has {} dimensions, expected 1",
                name,
                shape.len()
            )));
        }
        (0..shape[0])
            .map(|i| Ok(self.value_at(name, &[i])?.unwrap_or(f64::NAN)))
            .collect()
    }
}

/// On-disk format detected from the leading magic bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// CDF-1, CDF-2 or CDF-5.
    Classic,
    /// NetCDF-4.
    Hdf5,
}

/// Sniff the format of a file.
pub fn detect_format(path: &Path) -> NetCdfResult<FileFormat> {
    let mut magic = [0u8; 4];
    File::open(path)?.read_exact(&mut magic)?;
    match &magic {
        [b'C', b'D', b'F', _] => Ok(FileFormat::Classic),
        [0x89, b'H', b'D', b'F'] => Ok(FileFormat::Hdf5),
        _ => Err(NetCdfError::InvalidFormat(format!(
            "{} is not a NetCDF file",
            path.display()
        ))),
    }
}

/// Open a dataset. Anything that is not NetCDF (an HTML error page saved in
/// place of a download, say) is rejected before reaching libnetcdf.
pub fn open_dataset(path: &Path) -> NetCdfResult<Box<dyn GriddedDataset>> {
    let format = detect_format(path)?;
    debug!(path = %path.display(), format = ?format, "Opening dataset");
    Ok(Box::new(NativeDataset::open(path)?))
}
