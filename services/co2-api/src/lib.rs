//! CO2 prediction API.
//!
//! Serves one-shot predictions (`GET /predict`) and interactive sessions
//! where a client selects a date and a point in either order. Both paths run
//! the same pipeline: fetch the meteorological and vegetation files for the
//! date, read the nearest grid cell, assemble predictors and predict.

pub mod config;
pub mod error;
pub mod handlers;
pub mod pipeline;
pub mod server;
pub mod session;
pub mod state;

pub use server::create_router;
pub use state::{AppState, Component};
