//! Command handlers.

pub mod auth;
pub mod instruments;
pub mod market;
pub mod reviews;
pub mod trades;
