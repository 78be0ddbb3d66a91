//! Review API access.
//!
//! [`Transport`] is the seam to the network; [`ApiClient`] is its reqwest
//! implementation. Data requests go through [`RequestAuthenticator`], which
//! attaches the bearer token and refreshes it on 401. The auth endpoints are
//! reached through [`HttpAuthBackend`] directly.

pub mod authenticator;
pub mod client;
pub mod error;
pub mod request;

pub use authenticator::RequestAuthenticator;
pub use client::{ApiClient, HttpAuthBackend};
pub use error::ApiError;
pub use request::{ApiRequest, ApiResponse, Transport};
