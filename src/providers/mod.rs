//! Mailbox provider implementations.
//!
//! - [`email`] - Email providers (Gmail API, in-memory)

pub mod email;
