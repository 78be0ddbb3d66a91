//! Local caching module for degraded operation.
//!
//! The `CacheManager` keeps the most recent successful response of each
//! review endpoint as JSON. When the backend fails and the data policy
//! allows degrading, these copies are served before the built-in mock data.

pub mod manager;

pub use manager::{CacheManager, CachedData};
