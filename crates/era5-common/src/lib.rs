//! Common types shared across the ERA5 CO2 crates and services.

pub mod error;
pub mod point;
pub mod time;
pub mod variables;

pub use error::ErrorKind;
pub use point::GeoPoint;
pub use time::{DateParseError, RequestDate};
pub use variables::{field_name, VariableGroup};
