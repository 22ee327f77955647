//! Sweep service binding label prefixes to thread actions.
//!
//! A sweep runs every [`RuleBinding`] in declaration order: the rule engine
//! collects the expired threads under the binding's prefix and the bound
//! [`ThreadAction`] is applied to each of them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::rule_engine::{Result, RuleEngine};
use crate::domain::ThreadId;
use crate::providers::email::{self, EmailProvider};

/// Placeholder replaced by the thread count in report templates.
pub const COUNT_PLACEHOLDER: &str = "{count}";

/// Action applied to an expired thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreadAction {
    /// Remove the thread from the inbox.
    Archive,
    /// Move the thread to trash.
    Trash,
    /// Mark every message of the thread as read.
    MarkRead,
}

impl ThreadAction {
    /// Applies this action to a thread through `provider`.
    pub async fn apply<P: EmailProvider + ?Sized>(
        &self,
        provider: &P,
        thread_id: &ThreadId,
    ) -> email::Result<()> {
        match self {
            ThreadAction::Archive => provider.archive(thread_id).await,
            ThreadAction::Trash => provider.trash(thread_id).await,
            ThreadAction::MarkRead => provider.mark_read(thread_id).await,
        }
    }

    /// Returns a short description for log output.
    pub fn description(&self) -> &'static str {
        match self {
            ThreadAction::Archive => "archive",
            ThreadAction::Trash => "trash",
            ThreadAction::MarkRead => "mark read",
        }
    }
}

/// Binds a label prefix to the action applied to its expired threads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleBinding {
    /// Label name prefix, matched case-sensitively.
    pub prefix: String,
    /// Action applied to every expired thread.
    pub action: ThreadAction,
    /// Report line logged after the binding ran; `{count}` is replaced by
    /// the number of expired threads.
    pub report_template: String,
}

impl RuleBinding {
    /// Creates a binding.
    pub fn new(
        prefix: impl Into<String>,
        action: ThreadAction,
        report_template: impl Into<String>,
    ) -> Self {
        Self {
            prefix: prefix.into(),
            action,
            report_template: report_template.into(),
        }
    }

    /// Renders the report line for `count` threads.
    pub fn report(&self, count: usize) -> String {
        self.report_template
            .replace(COUNT_PLACEHOLDER, &count.to_string())
    }
}

/// The bindings run by a default sweep: `TTL:` trashes, `TTR:` marks read.
pub fn default_bindings() -> Vec<RuleBinding> {
    vec![
        RuleBinding::new(
            "TTL:",
            ThreadAction::Trash,
            "{count} threads have been deleted",
        ),
        RuleBinding::new(
            "TTR:",
            ThreadAction::MarkRead,
            "{count} threads have been marked read",
        ),
    ]
}

/// Outcome of one binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingReport {
    /// Prefix of the binding.
    pub prefix: String,
    /// Action of the binding.
    pub action: ThreadAction,
    /// Number of expired threads the action was applied to.
    pub matched: usize,
}

/// Outcome of a whole sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Per-binding outcomes in declaration order.
    pub bindings: Vec<BindingReport>,
    /// Sum of `matched` over all bindings.
    pub total_processed: usize,
}

/// Service running the rule bindings against a mailbox.
pub struct SweepService<P: EmailProvider> {
    provider: P,
    bindings: Vec<RuleBinding>,
    total_processed: usize,
}

impl<P: EmailProvider> SweepService<P> {
    /// Creates a sweep over `provider` with the given bindings.
    pub fn new(provider: P, bindings: Vec<RuleBinding>) -> Self {
        Self {
            provider,
            bindings,
            total_processed: 0,
        }
    }

    /// Creates a sweep with [`default_bindings`].
    pub fn with_default_bindings(provider: P) -> Self {
        Self::new(provider, default_bindings())
    }

    /// Returns the provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Returns the bindings in run order.
    pub fn bindings(&self) -> &[RuleBinding] {
        &self.bindings
    }

    /// Number of threads processed by the bindings that completed in the
    /// current or last run.
    ///
    /// After a failed run this counts only the bindings that finished
    /// before the failure.
    pub fn total_processed(&self) -> usize {
        self.total_processed
    }

    /// Runs every binding using the current time.
    pub async fn run(&mut self) -> Result<SweepReport> {
        self.run_at(Utc::now()).await
    }

    /// Runs every binding with `now` as the reference instant.
    ///
    /// # Errors
    ///
    /// An unparseable label or any provider failure stops the run and is
    /// returned unchanged. Actions already applied are not rolled back, and
    /// the binding that failed is not counted.
    pub async fn run_at(&mut self, now: DateTime<Utc>) -> Result<SweepReport> {
        self.total_processed = 0;
        let mut report = SweepReport::default();

        for binding in &self.bindings {
            let engine = RuleEngine::new(&self.provider);
            let threads = engine.apply(&binding.prefix, now).await?;

            for thread in &threads {
                if let Err(e) = binding.action.apply(&self.provider, &thread.id).await {
                    tracing::error!(
                        prefix = %binding.prefix,
                        thread_id = %thread.id,
                        action = binding.action.description(),
                        error = %e,
                        "Thread action failed"
                    );
                    return Err(e.into());
                }
            }

            let count = threads.len();
            self.total_processed += count;
            tracing::info!(prefix = %binding.prefix, count, "{}", binding.report(count));

            report.bindings.push(BindingReport {
                prefix: binding.prefix.clone(),
                action: binding.action,
                matched: count,
            });
        }

        report.total_processed = self.total_processed;
        tracing::info!(
            total = self.total_processed,
            "{} threads have been processed in total",
            self.total_processed
        );
        Ok(report)
    }
}
