//! Label rule engine.
//!
//! Finds the labels whose names start with a rule prefix, reads the age each
//! one encodes after the prefix and collects the threads whose last activity
//! is older than the resulting cutoff. The engine never mutates the mailbox.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::{Age, Label, ThreadSummary};
use crate::providers::email::{EmailProvider, ProviderError};

/// Errors that can occur while resolving and applying label rules.
#[derive(Debug, Error)]
pub enum SweepError {
    /// A label under a rule prefix does not encode a usable age.
    #[error("Age \"{suffix}\" of label \"{label}\" cannot be parsed")]
    UnparseableAge {
        /// Full label name.
        label: String,
        /// Raw suffix after the prefix, trimmed.
        suffix: String,
    },

    /// The mailbox provider failed.
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Result type for rule engine and sweep operations.
pub type Result<T> = std::result::Result<T, SweepError>;

/// A label resolved into a concrete cutoff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelRule {
    /// The matching label.
    pub label: Label,
    /// Age parsed from the label name.
    pub age: Age,
    /// Threads last active strictly before this instant are expired.
    pub cutoff: DateTime<Utc>,
}

/// Applies prefix rules to the labels of a mailbox.
pub struct RuleEngine<'a, P: EmailProvider + ?Sized> {
    provider: &'a P,
}

impl<'a, P: EmailProvider + ?Sized> RuleEngine<'a, P> {
    /// Creates an engine reading from `provider`.
    pub fn new(provider: &'a P) -> Self {
        Self { provider }
    }

    /// Returns the labels whose names start with `prefix`, in provider order.
    pub async fn matching_labels(&self, prefix: &str) -> Result<Vec<Label>> {
        let labels = self.provider.fetch_labels().await?;
        Ok(labels
            .into_iter()
            .filter(|label| label.name.starts_with(prefix))
            .collect())
    }

    /// Resolves every label under `prefix` into a [`LabelRule`].
    ///
    /// # Errors
    ///
    /// Fails with [`SweepError::UnparseableAge`] on the first label whose
    /// suffix holds no age. No rule is returned in that case.
    pub async fn resolve_rules(&self, prefix: &str, now: DateTime<Utc>) -> Result<Vec<LabelRule>> {
        self.matching_labels(prefix)
            .await?
            .into_iter()
            .map(|label| -> Result<LabelRule> {
                let suffix = label.suffix_after(prefix).unwrap_or_default();
                let age = Age::parse(suffix).ok_or_else(|| SweepError::UnparseableAge {
                    label: label.name.clone(),
                    suffix: suffix.to_string(),
                })?;
                let cutoff = age.cutoff(now);
                tracing::debug!(label = %label.name, %age, %cutoff, "Resolved label rule");
                Ok(LabelRule { label, age, cutoff })
            })
            .collect()
    }

    /// Returns the expired threads of every label under `prefix`.
    ///
    /// Threads are grouped by label in label order and keep the provider's
    /// fetch order within a label. A thread last active exactly at the cutoff
    /// is not expired.
    pub async fn apply(&self, prefix: &str, now: DateTime<Utc>) -> Result<Vec<ThreadSummary>> {
        let rules = self.resolve_rules(prefix, now).await?;

        let mut expired = Vec::new();
        for rule in rules {
            let threads = self.provider.fetch_threads(&rule.label).await?;
            expired.extend(
                threads
                    .into_iter()
                    .filter(|thread| thread.is_older_than(rule.cutoff)),
            );
        }

        Ok(expired)
    }

    /// Same as [`apply`](Self::apply), using the current time.
    pub async fn apply_now(&self, prefix: &str) -> Result<Vec<ThreadSummary>> {
        self.apply(prefix, Utc::now()).await
    }
}
