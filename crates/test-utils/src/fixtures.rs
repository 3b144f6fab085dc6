//! Common test fixtures: one realistic ERA5 sample point and a tiny model
//! bundle with hand-checkable output.

/// The point and date used by the end-to-end scenarios.
pub mod scenario {
    pub const DATE: &str = "2020-06-15";
    pub const LATITUDE: f64 = 40.0;
    pub const LONGITUDE: f64 = -75.0;

    /// Field values written into the sample meteorological file.
    pub const METEO_FIELDS: [(&str, f64); 4] = [
        ("u10", 1.5),
        ("v10", -0.5),
        ("t2m", 295.0),
        ("sp", 101_325.0),
    ];

    /// Field values written into the sample vegetation file.
    pub const VEG_FIELDS: [(&str, f64); 4] = [
        ("cvh", 0.6),
        ("lai_hv", 3.2),
        ("lai_lv", 2.1),
        ("cvl", 0.3),
    ];

    /// What [`super::model::BUNDLE_JSON`] predicts for this scenario:
    /// tree 1 goes right on t2m (0.8), tree 2 goes left on latitude (0.4),
    /// mean 0.6, then 0.6 * 5 + 410.
    pub const EXPECTED_CO2: f64 = 413.0;
}

/// Serialized prediction bundles.
pub mod model {
    /// Two-tree forest over the 13 predictors with a standard target scaler.
    pub const BUNDLE_JSON: &str = r#"{
  "model": {
    "feature_names": ["latitude", "longitude", "year", "month", "day", "sp", "t2m",
                      "u10", "v10", "lai_hv", "lai_lv", "cvh", "cvl"],
    "trees": [
      {
        "children_left":  [1, -1, -1],
        "children_right": [2, -1, -1],
        "feature":        [6, -2, -2],
        "threshold":      [290.0, -2.0, -2.0],
        "value":          [0.5, 0.2, 0.8]
      },
      {
        "children_left":  [1, -1, -1],
        "children_right": [2, -1, -1],
        "feature":        [0, -2, -2],
        "threshold":      [45.0, -2.0, -2.0],
        "value":          [0.5, 0.4, 0.6]
      }
    ]
  },
  "scaler_target": { "kind": "standard", "mean": 410.0, "scale": 5.0 }
}"#;

    /// A bundle whose target scaler was never exported.
    pub const MODEL_ONLY_JSON: &str = r#"{
  "model": {
    "feature_names": ["latitude", "longitude", "year", "month", "day", "sp", "t2m",
                      "u10", "v10", "lai_hv", "lai_lv", "cvh", "cvl"],
    "trees": [
      { "children_left": [-1], "children_right": [-1], "feature": [-2],
        "threshold": [-2.0], "value": [0.5] }
    ]
  }
}"#;
}
