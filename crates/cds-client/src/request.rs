//! Retrieval request bodies.

use era5_common::RequestDate;
use serde::{Deserialize, Serialize};

use crate::config::FetchSettings;

/// JSON body posted to `/resources/{dataset}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrieveRequest {
    pub product_type: Vec<String>,
    pub variable: Vec<String>,
    pub year: String,
    pub month: String,
    pub day: String,
    pub time: Vec<String>,
    pub format: String,
}

impl RetrieveRequest {
    /// Request `variables` for one day using the configured product type,
    /// time of day and format.
    pub fn new<S: AsRef<str>>(settings: &FetchSettings, date: RequestDate, variables: &[S]) -> Self {
        Self {
            product_type: settings.product_type.clone(),
            variable: variables.iter().map(|v| v.as_ref().to_string()).collect(),
            year: date.year_str(),
            month: date.month_str(),
            day: date.day_str(),
            time: settings.time.clone(),
            format: settings.format.clone(),
        }
    }

    /// Stable 8-hex-digit CRC32 of the dataset and serialized request.
    ///
    /// Field order is fixed by the struct, so equal requests hash equally.
    pub fn cache_key(&self, dataset: &str) -> String {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(dataset.as_bytes());
        hasher.update(&[0]);
        // Serializing a plain struct of strings cannot fail.
        let body = serde_json::to_vec(self).unwrap_or_default();
        hasher.update(&body);
        format!("{:08x}", hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> RequestDate {
        RequestDate::parse("2020-06-05").unwrap()
    }

    #[test]
    fn test_body_shape() {
        let req = RetrieveRequest::new(&FetchSettings::default(), date(), &["2m_temperature"]);
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["product_type"], serde_json::json!(["reanalysis"]));
        assert_eq!(json["variable"], serde_json::json!(["2m_temperature"]));
        assert_eq!(json["year"], "2020");
        assert_eq!(json["month"], "06");
        assert_eq!(json["day"], "05");
        assert_eq!(json["time"], serde_json::json!(["13:00"]));
        assert_eq!(json["format"], "netcdf");
    }

    #[test]
    fn test_cache_key_stable_and_discriminating() {
        let settings = FetchSettings::default();
        let a = RetrieveRequest::new(&settings, date(), &["2m_temperature", "surface_pressure"]);
        let b = RetrieveRequest::new(&settings, date(), &["2m_temperature", "surface_pressure"]);
        let c = RetrieveRequest::new(&settings, date(), &["2m_temperature"]);
        let dataset = &settings.dataset;

        assert_eq!(a.cache_key(dataset), b.cache_key(dataset));
        assert_eq!(a.cache_key(dataset).len(), 8);
        assert_ne!(a.cache_key(dataset), c.cache_key(dataset));
        assert_ne!(a.cache_key(dataset), a.cache_key("reanalysis-era5-land"));
    }
}
