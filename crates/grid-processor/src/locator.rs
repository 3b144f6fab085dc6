//! Nearest-neighbor lookup on regular latitude/longitude axes.
//!
//! Each axis is searched independently. For the regular grids the archive
//! delivers this gives the same cell as a 2-D nearest-neighbor search.

use era5_common::GeoPoint;

/// Row and column of the grid cell nearest to a point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridIndex {
    pub lat_index: usize,
    pub lon_index: usize,
}

/// Index of the axis value closest to `target`.
///
/// Ties go to the earliest index. NaN entries are never selected; an axis
/// with no finite values yields `None`.
pub fn nearest_index(axis: &[f64], target: f64) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, value) in axis.iter().enumerate() {
        let distance = (value - target).abs();
        if distance.is_nan() {
            continue;
        }
        match best {
            Some((_, best_distance)) if distance >= best_distance => {}
            _ => best = Some((i, distance)),
        }
    }
    best.map(|(i, _)| i)
}

/// Locate the cell nearest to `point`, or `None` if either axis is empty.
pub fn locate(latitudes: &[f64], longitudes: &[f64], point: GeoPoint) -> Option<GridIndex> {
    Some(GridIndex {
        lat_index: nearest_index(latitudes, point.latitude)?,
        lon_index: nearest_index(longitudes, point.longitude)?,
    })
}
