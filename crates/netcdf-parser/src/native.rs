//! NetCDF reading through the native netcdf library.
//!
//! libnetcdf reads both the classic formats and NetCDF-4/HDF5, which the
//! archive's newer endpoints deliver. Packing rules are applied here so
//! callers see physical values.

use std::path::Path;
use std::sync::Once;

use tracing::debug;

use crate::dataset::GriddedDataset;
use crate::error::{NetCdfError, NetCdfResult};

/// Disable HDF5's automatic error printing to stderr.
///
/// HDF5 prints diagnostics even for errors the caller handles, such as a
/// lookup of an optional attribute or a file that is not HDF5 at all. Safe
/// to call any number of times; only the first call does anything.
pub fn silence_hdf5_errors() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        // SAFETY: null handlers are the documented way to disable output.
        unsafe {
            hdf5_metno_sys::h5e::H5Eset_auto2(
                hdf5_metno_sys::h5e::H5E_DEFAULT,
                None,
                std::ptr::null_mut(),
            );
        }
    });
}

/// An open NetCDF file. Closed when dropped.
pub struct NativeDataset {
    file: netcdf::File,
}

impl NativeDataset {
    pub fn open(path: &Path) -> NetCdfResult<Self> {
        silence_hdf5_errors();
        let file = netcdf::open(path)
            .map_err(|e| NetCdfError::InvalidFormat(format!("Failed to open NetCDF: {}", e)))?;
        debug!(path = %path.display(), "Opened NetCDF file");
        Ok(Self { file })
    }

    fn variable(&self, name: &str) -> NetCdfResult<netcdf::Variable<'_>> {
        self.file
            .variable(name)
            .ok_or_else(|| NetCdfError::MissingData(format!("{} variable", name)))
    }
}

impl GriddedDataset for NativeDataset {
    fn has_variable(&self, name: &str) -> bool {
        self.file.variable(name).is_some()
    }

    fn shape(&self, name: &str) -> NetCdfResult<Vec<usize>> {
        let var = self.variable(name)?;
        Ok(var.dimensions().iter().map(|d| d.len()).collect())
    }

    fn value_at(&self, name: &str, index: &[usize]) -> NetCdfResult<Option<f64>> {
        let var = self.variable(name)?;
        let shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();
        if index.len() != shape.len() || index.iter().zip(&shape).any(|(i, n)| i >= n) {
            return Err(NetCdfError::OutOfBounds {
                variable: name.to_string(),
                index: index.to_vec(),
                shape,
            });
        }

        let raw: f64 = var
            .get_value::<f64, _>(index)
            .map_err(|e| NetCdfError::InvalidFormat(format!("Failed to read {}: {}", name, e)))?;
        Ok(Packing::of(&var).apply(raw))
    }

    fn read_1d(&self, name: &str) -> NetCdfResult<Vec<f64>> {
        let var = self.variable(name)?;
        if var.dimensions().len() != 1 {
            return Err(NetCdfError::InvalidFormat(format!(
                "'{}' has {} dimensions, expected 1",
                name,
                var.dimensions().len()
            )));
        }
        let raw: Vec<f64> = var
            .get_values(..)
            .map_err(|e| NetCdfError::InvalidFormat(format!("Failed to read {}: {}", name, e)))?;
        let packing = Packing::of(&var);
        Ok(raw
            .into_iter()
            .map(|v| packing.apply(v).unwrap_or(f64::NAN))
            .collect())
    }
}

/// CF packing attributes of one variable.
struct Packing {
    markers: [Option<f64>; 2],
    scale: f64,
    offset: f64,
}

impl Packing {
    fn of(var: &netcdf::Variable) -> Self {
        Self {
            markers: [
                get_f64_attr(var, "_FillValue"),
                get_f64_attr(var, "missing_value"),
            ],
            scale: get_f64_attr(var, "scale_factor").unwrap_or(1.0),
            offset: get_f64_attr(var, "add_offset").unwrap_or(0.0),
        }
    }

    /// Physical value, `None` for fill and missing markers.
    fn apply(&self, raw: f64) -> Option<f64> {
        if self.markers.contains(&Some(raw)) {
            return None;
        }
        Some(raw * self.scale + self.offset)
    }
}

/// Check if a variable has an attribute with the given name.
/// This avoids HDF5 error spam when checking for optional attributes.
fn has_attr(var: &netcdf::Variable, name: &str) -> bool {
    var.attributes().any(|attr| attr.name() == name)
}

/// Helper to get f64 attribute.
fn get_f64_attr(var: &netcdf::Variable, name: &str) -> Option<f64> {
    if !has_attr(var, name) {
        return None;
    }
    let attr_value = var.attribute_value(name)?.ok()?;
    f64::try_from(attr_value).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packing_apply() {
        let packing = Packing {
            markers: [Some(-32767.0), None],
            scale: 0.5,
            offset: 100_000.0,
        };
        assert_eq!(packing.apply(-32767.0), None);
        assert_eq!(packing.apply(10.0), Some(100_005.0));
    }

    #[test]
    fn test_silence_is_idempotent() {
        silence_hdf5_errors();
        silence_hdf5_errors();
    }
}
