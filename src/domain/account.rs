//! Account domain types.

use serde::{Deserialize, Serialize};

/// Type of mailbox provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    /// Gmail REST API.
    #[default]
    Gmail,
    /// In-memory mailbox loaded from a snapshot file.
    Memory,
}
