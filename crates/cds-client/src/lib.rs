//! Retrieval of ERA5 files from the Copernicus Climate Data Store.
//!
//! - [`credentials`]: `.cdsapirc` loading and synthesis from secrets
//! - [`config`]: YAML fetch settings
//! - [`client`]: the [`Retriever`] seam and its HTTP implementation
//! - [`cache`]: [`Fetcher`], a request-hash-addressed file cache on top of a
//!   retriever, safe for concurrent callers

pub mod cache;
pub mod client;
pub mod config;
pub mod credentials;
pub mod error;
pub mod request;

pub use cache::{CacheManifest, EntryStatus, Fetcher};
pub use client::{CdsClient, Retriever};
pub use config::FetchSettings;
pub use credentials::Credentials;
pub use error::{CdsError, Result};
pub use request::RetrieveRequest;
