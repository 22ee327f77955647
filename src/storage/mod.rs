//! Credential storage.
//!
//! Provider secrets are kept in the OS keychain, keyed by account.

mod keychain;

pub use keychain::{KeychainAccess, KeychainError};
