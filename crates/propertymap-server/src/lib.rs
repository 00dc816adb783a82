//! HTTP server for the property map.
//!
//! Serves the cached CRM listings at `GET /api/properties`, plus filter
//! facets, place-name geocoding and a health check.

pub mod config;
pub mod error;
pub mod routes;
pub mod server;

pub use config::Config;
pub use error::ApiError;
pub use server::{router, serve, AppState};
