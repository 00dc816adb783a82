//! REST API clients for the upstream services.
//!
//! - `CrmClient` talks to the CRM's paginated listing endpoint, authenticated
//!   with an optional `X-Api-Key` header.
//! - `GeocodeClient` resolves free-text place names to coordinates for the
//!   map's "fly to location" search.
//!
//! The store only depends on the `ListingSource` trait so it can be driven by
//! scripted sources in tests.

pub mod client;
pub mod error;
pub mod geocode;

pub use client::{CrmClient, CrmClientConfig, ListingPage, ListingSource};
pub use error::ApiError;
pub use geocode::{GeocodeClient, GeocodeMatch};
