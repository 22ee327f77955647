//! Thread domain types.
//!
//! Represents email threads (conversations) as far as expiry needs them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ThreadId;

/// A lightweight summary of a thread.
///
/// Only `last_message_date` takes part in expiry decisions; the subject is
/// carried for log output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadSummary {
    /// Unique identifier for this thread.
    pub id: ThreadId,
    /// Thread subject, if the provider returned one.
    pub subject: Option<String>,
    /// Date of the most recent message.
    pub last_message_date: DateTime<Utc>,
}

impl ThreadSummary {
    /// Creates a summary without a subject.
    pub fn new(id: impl Into<ThreadId>, last_message_date: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            subject: None,
            last_message_date,
        }
    }

    /// Returns true if the last activity happened strictly before `cutoff`.
    pub fn is_older_than(&self, cutoff: DateTime<Utc>) -> bool {
        self.last_message_date < cutoff
    }
}
