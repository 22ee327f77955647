//! Business services layer.
//!
//! Services sit between the entry point and the mailbox providers:
//!
//! ```text
//!      Entry point (main)
//!          |
//!          v
//!    Services Layer  <-- You are here
//!          |
//!          v
//!  Providers (Gmail, memory)
//! ```
//!
//! # Services Overview
//!
//! - [`RuleEngine`]: Resolves prefixed labels into cutoffs and collects expired threads
//! - [`SweepService`]: Runs the prefix bindings and applies their actions

mod rule_engine;
mod sweep_service;

pub use rule_engine::{LabelRule, Result, RuleEngine, SweepError};
pub use sweep_service::{
    default_bindings, BindingReport, RuleBinding, SweepReport, SweepService, ThreadAction,
    COUNT_PLACEHOLDER,
};
