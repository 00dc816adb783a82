//! In-memory property cache.
//!
//! `PropertyStore` owns the current snapshot of all listings. It answers from
//! the snapshot when it can, and otherwise runs a full paginated refresh
//! against the CRM. Only one refresh runs at a time; callers arriving while
//! one is in progress wait for its result.
//!
//! A successful refresh replaces the snapshot wholesale. Nothing is persisted.

pub mod error;
pub mod snapshot;
pub mod store;

pub use error::FetchError;
pub use snapshot::CachedData;
pub use store::PropertyStore;
