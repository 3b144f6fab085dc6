//! Synthetic ERA5-like NetCDF files.
//!
//! [`Era5FileBuilder`] writes files shaped like the archive's single-level
//! downloads: `longitude`, `latitude` and `time` dimensions, 1-D coordinate
//! variables and `(time, latitude, longitude)` fields, either as plain
//! floats or as packed shorts with `scale_factor`/`add_offset`.
//!
//! ```no_run
//! use test_utils::Era5FileBuilder;
//!
//! Era5FileBuilder::new(vec![41.0, 40.0], vec![-76.0, -75.0])
//!     .uniform_field("t2m", 295.0)
//!     .write(std::path::Path::new("/tmp/t2m.nc"))
//!     .unwrap();
//! ```

use std::io;
use std::path::Path;

/// Fill value written for NaN cells.
pub const SHORT_FILL: i16 = -32767;
pub const FLOAT_FILL: f32 = -32767.0;

/// Hours since 1900-01-01 for 2020-12-31 13:00, as ERA5 stores `time`.
const TIME_VALUE: i32 = 1_060_573;

#[derive(Debug, Clone)]
enum Packing {
    Float,
    Short { scale: f64, offset: f64 },
}

#[derive(Debug, Clone)]
struct Field {
    name: String,
    values: Vec<f64>,
    packing: Packing,
}

/// Builder for a single-time ERA5-like file.
#[derive(Debug, Clone)]
pub struct Era5FileBuilder {
    lats: Vec<f64>,
    lons: Vec<f64>,
    fields: Vec<Field>,
    record_time: bool,
}

impl Era5FileBuilder {
    /// Grid with the given coordinate axes. ERA5 latitudes run north to
    /// south; pass them in whatever order the test needs.
    pub fn new(lats: Vec<f64>, lons: Vec<f64>) -> Self {
        Self {
            lats,
            lons,
            fields: Vec::new(),
            record_time: true,
        }
    }

    /// The 5x5 one-degree grid around 40N 75W used across the test suites.
    pub fn sample_grid() -> Self {
        Self::new(
            vec![42.0, 41.0, 40.0, 39.0, 38.0],
            vec![-77.0, -76.0, -75.0, -74.0, -73.0],
        )
    }

    /// Add a float field, values in row-major `(lat, lon)` order.
    pub fn field(mut self, name: &str, values: Vec<f64>) -> Self {
        self.fields.push(Field {
            name: name.to_string(),
            values,
            packing: Packing::Float,
        });
        self
    }

    /// Add a packed short field.
    pub fn packed_field(mut self, name: &str, values: Vec<f64>, scale: f64, offset: f64) -> Self {
        self.fields.push(Field {
            name: name.to_string(),
            values,
            packing: Packing::Short { scale, offset },
        });
        self
    }

    /// Add a float field holding one value everywhere.
    pub fn uniform_field(self, name: &str, value: f64) -> Self {
        let n = self.lats.len() * self.lons.len();
        self.field(name, vec![value; n])
    }

    /// Add a float field computed from `(lat_index, lon_index)`.
    pub fn field_fn(self, name: &str, f: impl Fn(usize, usize) -> f64) -> Self {
        let mut values = Vec::with_capacity(self.lats.len() * self.lons.len());
        for i in 0..self.lats.len() {
            for j in 0..self.lons.len() {
                values.push(f(i, j));
            }
        }
        self.field(name, values)
    }

    /// Store `time` as an unlimited dimension (default) or as a fixed
    /// dimension of length one.
    pub fn record_time(mut self, record: bool) -> Self {
        self.record_time = record;
        self
    }

    /// Write the file to `path`, returning its size in bytes.
    pub fn write(&self, path: &Path) -> io::Result<u64> {
        self.create(path).map_err(|e| io::Error::other(e.to_string()))?;
        Ok(std::fs::metadata(path)?.len())
    }

    fn create(&self, path: &Path) -> Result<(), netcdf::Error> {
        let cells = self.lats.len() * self.lons.len();
        for field in &self.fields {
            assert_eq!(field.values.len(), cells, "field {} has wrong size", field.name);
        }

        let mut file = netcdf::create(path)?;
        file.add_attribute("Conventions", "CF-1.6")?;

        file.add_dimension("longitude", self.lons.len())?;
        file.add_dimension("latitude", self.lats.len())?;
        if self.record_time {
            file.add_unlimited_dimension("time")?;
        } else {
            file.add_dimension("time", 1)?;
        }

        {
            let mut lon_var = file.add_variable::<f32>("longitude", &["longitude"])?;
            lon_var.put_attribute("units", "degrees_east")?;
            let lons: Vec<f32> = self.lons.iter().map(|v| *v as f32).collect();
            lon_var.put_values(&lons, ..)?;
        }

        {
            let mut lat_var = file.add_variable::<f32>("latitude", &["latitude"])?;
            lat_var.put_attribute("units", "degrees_north")?;
            let lats: Vec<f32> = self.lats.iter().map(|v| *v as f32).collect();
            lat_var.put_values(&lats, ..)?;
        }

        {
            let mut time_var = file.add_variable::<i32>("time", &["time"])?;
            time_var.put_attribute("units", "hours since 1900-01-01 00:00:00.0")?;
            time_var.put_value(TIME_VALUE, [0usize])?;
        }

        let dims = ["time", "latitude", "longitude"];
        for field in &self.fields {
            match field.packing {
                Packing::Float => {
                    let mut var = file.add_variable::<f32>(&field.name, &dims)?;
                    var.put_attribute("_FillValue", FLOAT_FILL)?;
                    let data: Vec<f32> = field
                        .values
                        .iter()
                        .map(|v| if v.is_nan() { FLOAT_FILL } else { *v as f32 })
                        .collect();
                    var.put_values(&data, (0usize, .., ..))?;
                }
                Packing::Short { scale, offset } => {
                    let mut var = file.add_variable::<i16>(&field.name, &dims)?;
                    var.put_attribute("scale_factor", scale)?;
                    var.put_attribute("add_offset", offset)?;
                    var.put_attribute("_FillValue", SHORT_FILL)?;
                    var.put_attribute("missing_value", SHORT_FILL)?;
                    let data: Vec<i16> = field
                        .values
                        .iter()
                        .map(|v| {
                            if v.is_nan() {
                                SHORT_FILL
                            } else {
                                ((v - offset) / scale).round() as i16
                            }
                        })
                        .collect();
                    var.put_values(&data, (0usize, .., ..))?;
                }
            }
        }
        Ok(())
    }
}
