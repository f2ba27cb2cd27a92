//! Chronological list of failure records.

use super::handle::{CurrentError, NewError, SharedRecord};
use super::record::FailureRecord;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Follows failures of supervised tasks and gathers everything they want
/// to report about them.
///
/// The tracker is an explicitly constructed component: create one per server
/// and share it behind an `Arc`. Records are appended and never removed or
/// replaced for the lifetime of the tracker.
#[derive(Debug, Default)]
pub struct FailureTracker {
    records: Mutex<Vec<SharedRecord>>,
}

impl FailureTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn records(&self) -> MutexGuard<'_, Vec<SharedRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// `true` if no record was ever created.
    pub fn is_empty(&self) -> bool {
        self.records().is_empty()
    }

    pub fn len(&self) -> usize {
        self.records().len()
    }

    /// Append a fresh, empty record and return it for editing.
    pub fn new_error(&self) -> NewError {
        let record = Arc::new(Mutex::new(FailureRecord::new()));
        self.records().push(Arc::clone(&record));
        NewError::new(record)
    }

    /// The record currently being edited, created if none exists.
    pub fn edit_error(&self) -> NewError {
        NewError::new(self.last_or_create())
    }

    /// Read view of the record currently being edited, created if none
    /// exists. Same underlying record as [`Self::edit_error`].
    pub fn current_error(&self) -> CurrentError {
        CurrentError::new(self.last_or_create())
    }

    /// Read view of the very first record, created if none exists.
    pub fn first_error(&self) -> CurrentError {
        let mut records = self.records();
        if records.is_empty() {
            records.push(Arc::new(Mutex::new(FailureRecord::new())));
        }
        CurrentError::new(Arc::clone(&records[0]))
    }

    /// Copies of every record, oldest first.
    pub fn snapshot(&self) -> Vec<FailureRecord> {
        let records: Vec<SharedRecord> = self.records().iter().map(Arc::clone).collect();
        records
            .iter()
            .map(|r| r.lock().unwrap_or_else(PoisonError::into_inner).clone())
            .collect()
    }

    fn last_or_create(&self) -> SharedRecord {
        let mut records = self.records();
        match records.last() {
            Some(last) => Arc::clone(last),
            None => {
                let record = Arc::new(Mutex::new(FailureRecord::new()));
                records.push(Arc::clone(&record));
                record
            }
        }
    }
}
