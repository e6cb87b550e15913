//! Asynchronous job tracking.

pub mod ledger;

pub use ledger::{JobLedger, JobStats, MAX_PROGRESS};
