//! Client core for the price-action trading review backend.
//!
//! - `api`: authenticated REST client with one-shot token renewal
//! - `auth`: persisted session and keychain credentials
//! - `models`: backend records and form validation
//! - `chart`: K-line chart option assembly
//! - `cache`: offline copies of backend lists
//! - `config`: settings file and base URL resolution

pub mod api;
pub mod auth;
pub mod cache;
pub mod chart;
pub mod config;
pub mod models;
pub mod utils;

pub use api::{ApiClient, ApiError, AuthEvent};
pub use auth::{CredentialStore, Session};
pub use config::Config;
