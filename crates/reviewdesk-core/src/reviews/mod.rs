//! Review data: the remote service and the client-side board built on it.
//!
//! - `ReviewService`: typed endpoints with the strict / degrade policy
//! - `ReviewBoard`: filter, sort and paginate the loaded set
//! - `insights`: public display sets, similar reviews and aggregates
//! - `mock`: built-in data for degraded operation

pub mod board;
pub mod filters;
pub mod insights;
pub mod mock;
pub mod service;

pub use board::{BoardPage, ReviewBoard};
pub use filters::{DateRange, RatingRange, ReviewFilters, ReviewSortColumn, SortOrder};
pub use insights::{DisplayFilter, PropertyPerformance, Trend, TrendPoint};
pub use service::{Dashboard, ReviewAction, ReviewService};
