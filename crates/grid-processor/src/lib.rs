//! Nearest-grid-cell extraction of ERA5 fields.
//!
//! ```text
//! extract_nearest_values(path, point, requested)
//!      │
//!      ├─► open_dataset(path)             (netcdf-parser)
//!      ├─► read latitude/longitude axes   (falls back to lat/lon)
//!      ├─► locate(lats, lons, point)      one linear scan per axis
//!      └─► for each requested name:
//!            field_name(name) → value at [0, lat_index, lon_index]
//! ```
//!
//! No interpolation is performed. Fields the file lacks come back as `None`
//! rather than as an error.

pub mod error;
pub mod extract;
pub mod locator;

pub use error::{GridProcessorError, Result};
pub use extract::{extract_from_dataset, extract_nearest_values, ExtractedValues};
pub use locator::{locate, nearest_index, GridIndex};
