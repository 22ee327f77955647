//! Label domain types.
//!
//! Labels carry the retention rules in their names, e.g. `TTL: 30 days`.

use serde::{Deserialize, Serialize};

use super::LabelId;

/// A user label as enumerated by the mailbox provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    /// Provider handle used to fetch the label's threads.
    pub id: LabelId,
    /// Display name of the label.
    pub name: String,
}

impl Label {
    /// Creates a label with the given handle and name.
    pub fn new(id: impl Into<LabelId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    /// Returns the trimmed remainder of the name after `prefix`, or `None`
    /// when the name does not start with it.
    ///
    /// Matching is exact and case-sensitive.
    pub fn suffix_after(&self, prefix: &str) -> Option<&str> {
        self.name.strip_prefix(prefix).map(str::trim)
    }
}
