//! ERA5 variable names.
//!
//! The archive is queried with long request names (`2m_temperature`) while
//! the delivered NetCDF files store short field names (`t2m`). Names absent
//! from [`VARIABLE_MAP`] are used unchanged.

/// Request name to NetCDF field name.
pub const VARIABLE_MAP: &[(&str, &str)] = &[
    ("10m_u_component_of_wind", "u10"),
    ("10m_v_component_of_wind", "v10"),
    ("2m_temperature", "t2m"),
    ("surface_pressure", "sp"),
    ("high_vegetation_cover", "cvh"),
    ("low_vegetation_cover", "cvl"),
    ("leaf_area_index_high_vegetation", "lai_hv"),
    ("leaf_area_index_low_vegetation", "lai_lv"),
    ("total_precipitation", "tp"),
    ("type_of_high_vegetation", "tvh"),
    ("type_of_low_vegetation", "tvl"),
];

/// Translate a request name to the field name stored in the dataset.
pub fn field_name(request_name: &str) -> &str {
    VARIABLE_MAP
        .iter()
        .find(|(request, _)| *request == request_name)
        .map(|(_, field)| *field)
        .unwrap_or(request_name)
}

/// Sets of variables fetched together in one archive request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariableGroup {
    /// Meteorological predictors.
    Meteo,
    /// Vegetation predictors.
    Vegetation,
    /// Single-level bundle (meteo plus precipitation).
    BundleSingle,
    /// Vegetation bundle (vegetation plus vegetation types).
    BundleVegetation,
}

impl VariableGroup {
    /// Request names in this group, in request order.
    pub fn variables(&self) -> &'static [&'static str] {
        match self {
            VariableGroup::Meteo => &[
                "10m_u_component_of_wind",
                "10m_v_component_of_wind",
                "2m_temperature",
                "surface_pressure",
            ],
            VariableGroup::Vegetation => &[
                "high_vegetation_cover",
                "leaf_area_index_high_vegetation",
                "leaf_area_index_low_vegetation",
                "low_vegetation_cover",
            ],
            VariableGroup::BundleSingle => &[
                "10m_u_component_of_wind",
                "10m_v_component_of_wind",
                "2m_temperature",
                "surface_pressure",
                "total_precipitation",
            ],
            VariableGroup::BundleVegetation => &[
                "high_vegetation_cover",
                "low_vegetation_cover",
                "leaf_area_index_high_vegetation",
                "leaf_area_index_low_vegetation",
                "type_of_high_vegetation",
                "type_of_low_vegetation",
            ],
        }
    }

    /// Label used in local file names.
    pub fn label(&self) -> &'static str {
        match self {
            VariableGroup::Meteo => "meteo",
            VariableGroup::Vegetation => "veg",
            VariableGroup::BundleSingle => "era5_single",
            VariableGroup::BundleVegetation => "era5_veg",
        }
    }
}
