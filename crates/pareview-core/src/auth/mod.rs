//! Authentication state: the session and remembered credentials.
//!
//! This module provides:
//! - `Session`: the user and token pair, persisted under `auth-storage`
//! - `CredentialStore`: optional password storage in the OS keychain
//!
//! Only login, token renewal and logout mutate the session.

pub mod credentials;
pub mod session;

pub use credentials::CredentialStore;
pub use session::{Session, SessionData, TokenPair, STORAGE_KEY};
