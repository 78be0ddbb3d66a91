//! Data models for the review API.
//!
//! - `Review` and its enums: one guest review with per-category scores
//! - `ReviewPage`, `Pagination`, `ReviewQuery`: paged listing
//! - `ReviewStats`: dashboard counters
//! - Catalog types: `FormDropdowns`, `Channel`, `Property`
//! - `GoogleReview`: third-party reviews shown on the public pages
//! - Envelopes wrapping every API payload

pub mod catalog;
pub mod envelope;
pub mod google;
pub mod review;

pub use catalog::{Channel, FormDropdowns, Property, PropertyOption};
pub use envelope::{ApiEnvelope, StatusEnvelope};
pub use google::GoogleReview;
pub use review::{
    BookingChannel, Pagination, Review, ReviewCategory, ReviewPage, ReviewQuery, ReviewStats,
    ReviewStatus, ReviewType,
};
