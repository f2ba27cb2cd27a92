//! Post-mortem failure capture.
//!
//! This module provides:
//! - [`FailureRecord`]: accumulating description of one failure episode
//! - [`FailureTracker`]: append-only, synchronized list of records
//! - [`NewError`] / [`CurrentError`]: builder and read handles to a record

pub mod handle;
pub mod record;
pub mod tracker;

pub use handle::{CurrentError, NewError};
pub use record::FailureRecord;
pub use tracker::FailureTracker;
