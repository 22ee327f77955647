//! In-memory mailbox provider.
//!
//! Holds labels and their threads in memory and records every mutation
//! instead of applying it. Used for tests and for dry runs against a JSON
//! snapshot of a mailbox.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{EmailProvider, ProviderError, Result};
use crate::domain::{Label, LabelId, ProviderType, ThreadId, ThreadSummary};

/// A mutation requested through the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "thread_id", rename_all = "snake_case")]
pub enum AppliedChange {
    /// Thread was archived.
    Archive(ThreadId),
    /// Thread was moved to trash.
    Trash(ThreadId),
    /// Thread was marked read.
    MarkRead(ThreadId),
}

/// A label together with its threads, as stored in a snapshot file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelSnapshot {
    /// The label.
    #[serde(flatten)]
    pub label: Label,
    /// Threads carrying the label, in fetch order.
    #[serde(default)]
    pub threads: Vec<ThreadSummary>,
}

/// Serialized form of a whole mailbox.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MailboxSnapshot {
    /// Labels in enumeration order.
    pub labels: Vec<LabelSnapshot>,
}

/// Mailbox provider backed by memory.
#[derive(Debug, Default)]
pub struct MemoryProvider {
    labels: Vec<Label>,
    threads: HashMap<LabelId, Vec<ThreadSummary>>,
    changes: Mutex<Vec<AppliedChange>>,
}

impl MemoryProvider {
    /// Creates an empty mailbox.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a label with its threads. Labels are enumerated in insertion order.
    ///
    /// Adding a label ID that is already present appends the threads to the
    /// existing label instead of listing the label twice.
    pub fn with_label(mut self, label: Label, threads: Vec<ThreadSummary>) -> Self {
        match self.threads.get_mut(&label.id) {
            Some(existing) => existing.extend(threads),
            None => {
                self.threads.insert(label.id.clone(), threads);
                self.labels.push(label);
            }
        }
        self
    }

    /// Builds a mailbox from a snapshot.
    ///
    /// # Errors
    ///
    /// Fails with [`ProviderError::InvalidRequest`] when two entries share a
    /// label ID.
    pub fn from_snapshot(snapshot: MailboxSnapshot) -> Result<Self> {
        snapshot
            .labels
            .into_iter()
            .try_fold(Self::new(), |provider, entry| {
                if provider.threads.contains_key(&entry.label.id) {
                    return Err(ProviderError::InvalidRequest(format!(
                        "duplicate label {} in snapshot",
                        entry.label.id
                    )));
                }
                Ok(provider.with_label(entry.label, entry.threads))
            })
    }

    /// Loads a mailbox snapshot from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| ProviderError::NotFound(format!("{}: {}", path.display(), e)))?;
        let snapshot: MailboxSnapshot = serde_json::from_str(&json)
            .map_err(|e| ProviderError::InvalidRequest(format!("invalid snapshot: {}", e)))?;
        Self::from_snapshot(snapshot)
    }

    /// Returns the mutations recorded so far, in call order.
    ///
    /// # Errors
    ///
    /// Fails with [`ProviderError::Internal`] if the change log was poisoned.
    pub fn changes(&self) -> Result<Vec<AppliedChange>> {
        Ok(self.lock_changes()?.to_vec())
    }

    fn lock_changes(&self) -> Result<std::sync::MutexGuard<'_, Vec<AppliedChange>>> {
        self.changes
            .lock()
            .map_err(|e| ProviderError::Internal(format!("change log poisoned: {}", e)))
    }

    fn record(&self, change: AppliedChange) -> Result<()> {
        tracing::debug!(?change, "Recorded mailbox change");
        self.lock_changes()?.push(change);
        Ok(())
    }
}

#[async_trait]
impl EmailProvider for MemoryProvider {
    fn provider_type(&self) -> ProviderType {
        ProviderType::Memory
    }

    async fn authenticate(&mut self) -> Result<()> {
        Ok(())
    }

    async fn fetch_labels(&self) -> Result<Vec<Label>> {
        Ok(self.labels.clone())
    }

    async fn fetch_threads(&self, label: &Label) -> Result<Vec<ThreadSummary>> {
        self.threads
            .get(&label.id)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(format!("label {}", label.id)))
    }

    async fn archive(&self, thread_id: &ThreadId) -> Result<()> {
        self.record(AppliedChange::Archive(thread_id.clone()))
    }

    async fn trash(&self, thread_id: &ThreadId) -> Result<()> {
        self.record(AppliedChange::Trash(thread_id.clone()))
    }

    async fn mark_read(&self, thread_id: &ThreadId) -> Result<()> {
        self.record(AppliedChange::MarkRead(thread_id.clone()))
    }
}
