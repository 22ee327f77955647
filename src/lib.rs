//! mailreap - Expire labeled mail threads by the age in their label names
//!
//! Labels such as `TTL: 30 days` or `TTR: 1 week` carry a retention age after
//! a rule prefix. A sweep resolves each age into a cutoff, collects the
//! threads last active before it and trashes, archives or marks them read.

pub mod config;
pub mod domain;
pub mod providers;
pub mod services;
pub mod storage;

pub use services::{SweepReport, SweepService};
