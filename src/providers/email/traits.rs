//! Email provider trait definition.
//!
//! This module defines the [`EmailProvider`] trait which abstracts over the
//! mailbox backends the sweep runs against. Providers return complete lists;
//! any paging against the backend happens inside the implementation.

use async_trait::async_trait;

use crate::domain::{Label, ProviderType, ThreadId, ThreadSummary};

/// Result type alias for email provider operations.
pub type Result<T> = std::result::Result<T, ProviderError>;

/// Errors that can occur during email provider operations.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Authentication failed or credentials expired.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Network or connection error.
    #[error("connection error: {0}")]
    Connection(String),

    /// Rate limit exceeded.
    #[error("rate limit exceeded, retry after {retry_after_secs:?} seconds")]
    RateLimited {
        /// Seconds to wait before retrying, if known.
        retry_after_secs: Option<u64>,
    },

    /// Requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Invalid request or parameters.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Provider-specific error.
    #[error("provider error: {0}")]
    Provider(String),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Trait for mailbox provider implementations.
///
/// The sweep reads labels and threads through this trait and applies its
/// mutations through it. Calls are awaited one at a time.
///
/// # Example
///
/// ```ignore
/// use mailreap::providers::email::EmailProvider;
///
/// async fn count_threads(provider: &dyn EmailProvider) -> Result<usize> {
///     let mut total = 0;
///     for label in provider.fetch_labels().await? {
///         total += provider.fetch_threads(&label).await?.len();
///     }
///     Ok(total)
/// }
/// ```
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmailProvider: Send + Sync {
    /// Returns the type of this provider.
    fn provider_type(&self) -> ProviderType;

    /// Authenticates with the provider.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Authentication`] if credentials are missing,
    /// invalid or expired.
    async fn authenticate(&mut self) -> Result<()>;

    /// Fetches every user label of the account.
    async fn fetch_labels(&self) -> Result<Vec<Label>>;

    /// Fetches every thread carrying `label`, in provider order.
    async fn fetch_threads(&self, label: &Label) -> Result<Vec<ThreadSummary>>;

    /// Archives a thread (removes it from the inbox without deleting it).
    async fn archive(&self, thread_id: &ThreadId) -> Result<()>;

    /// Moves a thread to trash.
    async fn trash(&self, thread_id: &ThreadId) -> Result<()>;

    /// Marks every message of a thread as read.
    async fn mark_read(&self, thread_id: &ThreadId) -> Result<()>;
}
