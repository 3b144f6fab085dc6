//! HTTP handlers.

pub mod bundle;
pub mod health;
