//! Data models for property listings.
//!
//! - `Property`: the canonical listing record, normalized from raw CRM data
//! - `PropertiesResponse`: a snapshot of all listings with its fetch time
//! - `PropertyFilter`, `FilterFacets`: the map's filter criteria and the
//!   values available to filter on

pub mod filter;
pub mod property;

pub use filter::{FilterFacets, PropertyFilter, ROOM_FILTER_CEILING};
pub use property::{PropertiesResponse, Property};
