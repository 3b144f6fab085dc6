//! NetCDF reading for ERA5 reanalysis fields.
//!
//! Files delivered by the climate data archive are opened through libnetcdf
//! (the `netcdf` crate), which reads both the classic CDF formats and
//! NetCDF-4/HDF5. They are exposed through the [`GriddedDataset`] trait;
//! [`open_dataset`] checks the file's magic bytes before handing it to the
//! library. Values are unpacked with CF `scale_factor`/`add_offset`; cells
//! holding `_FillValue` or `missing_value` read as `None`.

pub mod dataset;
pub mod error;
pub mod native;

pub use dataset::{detect_format, open_dataset, FileFormat, GriddedDataset};
pub use error::{NetCdfError, NetCdfResult};
pub use native::{silence_hdf5_errors, NativeDataset};
