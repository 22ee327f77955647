//! Mailbox provider implementations.
//!
//! This module contains the [`EmailProvider`] trait and its implementations:
//!
//! - [`GmailProvider`] - Gmail REST API with OAuth 2.0
//! - [`MemoryProvider`] - In-memory mailbox for tests and snapshot dry runs
//!
//! # Example
//!
//! ```ignore
//! use mailreap::providers::email::{EmailProvider, MemoryProvider};
//!
//! let provider = MemoryProvider::load("mailbox.json")?;
//! for label in provider.fetch_labels().await? {
//!     println!("{}", label.name);
//! }
//! ```

mod gmail;
mod memory;
mod traits;

pub use gmail::{GmailCredentials, GmailProvider};
pub use memory::{AppliedChange, LabelSnapshot, MailboxSnapshot, MemoryProvider};
pub use traits::{EmailProvider, ProviderError, Result};

#[cfg(test)]
pub use traits::MockEmailProvider;
