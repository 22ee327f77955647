//! Domain layer types for mailreap.
//!
//! This module contains the labels and threads enumerated from the mailbox,
//! the identifiers that tie them to the provider, and the [`Age`] value that
//! label names encode.

mod account;
mod age;
mod label;
mod thread;
mod types;

pub use account::ProviderType;
pub use age::{Age, AgeUnit, ParseAgeUnitError};
pub use label::Label;
pub use thread::ThreadSummary;
pub use types::{AccountId, LabelId, ThreadId};
