//! Reviewdesk core - session handling and review data for the property
//! review dashboard.
//!
//! This crate holds everything a front end needs that is not drawing: the
//! persisted token store, the session state machine, an API client that
//! refreshes expired tokens once for any number of concurrent requests, and
//! the review board (filters, sorting, pagination, aggregates).

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod context;
pub mod logging;
pub mod models;
pub mod reviews;

#[cfg(test)]
mod testing;

pub use config::{Config, DataPolicy, StorageBackend};
pub use context::Reviewdesk;
