//! Point extraction from a downloaded ERA5 file.

use std::collections::BTreeMap;
use std::path::Path;

use era5_common::{field_name, GeoPoint};
use netcdf_parser::{open_dataset, GriddedDataset};
use tracing::{debug, instrument};

use crate::error::{GridProcessorError, Result};
use crate::locator::{locate, nearest_index, GridIndex};

/// Extracted values keyed by short field name. `None` marks a field the
/// file lacks or a fill cell.
pub type ExtractedValues = BTreeMap<String, Option<f64>>;

const LATITUDE_NAMES: [&str; 2] = ["latitude", "lat"];
const LONGITUDE_NAMES: [&str; 2] = ["longitude", "lon"];

/// Open `path` and read each requested variable at the grid cell nearest to
/// `point`, at time index 0.
///
/// Request names are translated to field names (`2m_temperature` → `t2m`).
/// The file is closed before returning.
#[instrument(skip(path, requested), fields(path = %path.display()))]
pub fn extract_nearest_values<S: AsRef<str>>(
    path: &Path,
    point: GeoPoint,
    requested: &[S],
) -> Result<ExtractedValues> {
    let dataset = open_dataset(path)?;
    extract_from_dataset(dataset.as_ref(), point, requested)
}

/// Same as [`extract_nearest_values`] on an already opened dataset.
pub fn extract_from_dataset<S: AsRef<str>>(
    dataset: &dyn GriddedDataset,
    point: GeoPoint,
    requested: &[S],
) -> Result<ExtractedValues> {
    let latitudes = read_axis(dataset, &LATITUDE_NAMES)?;
    let longitudes = read_axis(dataset, &LONGITUDE_NAMES)?;

    for (axis, value) in [("latitude", point.latitude), ("longitude", point.longitude)] {
        if !value.is_finite() {
            return Err(GridProcessorError::NonFiniteQuery { axis, value });
        }
    }
    let index = locate(&latitudes, &longitudes, point).ok_or_else(|| {
        let axis = if nearest_index(&latitudes, point.latitude).is_none() {
            "latitude"
        } else {
            "longitude"
        };
        GridProcessorError::EmptyAxis(axis.to_string())
    })?;
    debug!(
        lat_index = index.lat_index,
        lon_index = index.lon_index,
        grid_lat = latitudes[index.lat_index],
        grid_lon = longitudes[index.lon_index],
        "Located nearest grid cell"
    );

    let mut values = ExtractedValues::new();
    for name in requested {
        let field = field_name(name.as_ref());
        let value = read_cell(dataset, field, index)?;
        if value.is_none() {
            debug!(field, "Field absent at grid cell");
        }
        values.insert(field.to_string(), value);
    }
    Ok(values)
}

fn read_axis(dataset: &dyn GriddedDataset, names: &[&'static str]) -> Result<Vec<f64>> {
    let name = names
        .iter()
        .find(|n| dataset.has_variable(n))
        .ok_or_else(|| GridProcessorError::MissingCoordinate(names.to_vec()))?;
    Ok(dataset.read_1d(name)?)
}

/// Value at `[0, .., lat, lon]`; leading dimensions (time, and any extra
/// axis such as `expver`) are taken at index 0.
fn read_cell(dataset: &dyn GriddedDataset, field: &str, index: GridIndex) -> Result<Option<f64>> {
    if !dataset.has_variable(field) {
        return Ok(None);
    }
    let shape = dataset.shape(field)?;
    if shape.len() < 2 {
        return Err(GridProcessorError::InvalidShape {
            name: field.to_string(),
            shape,
        });
    }
    let mut cell = vec![0; shape.len() - 2];
    cell.push(index.lat_index);
    cell.push(index.lon_index);
    Ok(dataset.value_at(field, &cell)?)
}
