//! REST API client module for the price-action review backend.
//!
//! This module provides the `ApiClient` for fetching instruments, K-lines,
//! indicators, reviews and trades, and for logging in.
//!
//! The backend issues JWT access/refresh token pairs. Every call carries the
//! access token as a bearer credential; an expired token is renewed once and
//! the call replayed, transparently to the caller.

pub mod client;
pub mod error;
pub mod request;
pub mod resources;
pub mod transport;

pub use client::{normalize_base_url, ApiClient, AuthEvent, DEFAULT_BASE_URL, LOGIN_ROUTE};
pub use error::ApiError;
pub use request::{ApiRequest, ApiResponse};
pub use resources::DEFAULT_KLINE_PAGE_SIZE;
pub use transport::{HttpTransport, Transport};
