//! Core library for propertymap.
//!
//! Fetches property listings from the upstream CRM, normalizes them into the
//! [`Property`] model and keeps them in an in-memory [`PropertyStore`] that
//! serves cached snapshots and de-duplicates concurrent refreshes.

pub mod api;
pub mod cache;
pub mod models;

pub use api::{
    ApiError, CrmClient, CrmClientConfig, GeocodeClient, GeocodeMatch, ListingPage, ListingSource,
};
pub use cache::{CachedData, FetchError, PropertyStore};
pub use models::{FilterFacets, PropertiesResponse, Property, PropertyFilter};
