//! Capability-scoped handles over a shared [`FailureRecord`].
//!
//! A record lives inside the [`super::FailureTracker`]; components only ever
//! hold handles to it:
//! - [`NewError`]: builder view, for the component diagnosing a failure.
//! - [`CurrentError`]: read view, for consumers. It may still append
//!   diagnostics, which are contributions rather than state.

use super::record::FailureRecord;
use std::error::Error as StdError;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub(crate) type SharedRecord = Arc<Mutex<FailureRecord>>;

fn lock(record: &SharedRecord) -> MutexGuard<'_, FailureRecord> {
    record.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Builder view of a failure record.
///
/// Setters take `&self` and return `&Self` so calls chain:
///
/// ```
/// use nb_core::postmortem::FailureTracker;
///
/// let tracker = FailureTracker::new();
/// tracker
///     .new_error()
///     .original_exit_code(1)
///     .error_message("interpreter crashed")
///     .add_diagnostic_from("Example", "see interpreter log");
///
/// assert_eq!(tracker.current_error().interpreted_exit_code(), Some(1));
/// ```
#[derive(Clone, Debug)]
pub struct NewError {
    record: SharedRecord,
}

impl NewError {
    pub(crate) fn new(record: SharedRecord) -> Self {
        Self { record }
    }

    fn edit(&self, f: impl FnOnce(&mut FailureRecord)) -> &Self {
        f(&mut lock(&self.record));
        self
    }

    pub fn original_exit_code(&self, code: i32) -> &Self {
        self.edit(|r| r.set_original_exit_code(Some(code)))
    }

    pub fn interpreted_exit_code(&self, code: i32) -> &Self {
        self.edit(|r| r.set_interpreted_exit_code(Some(code)))
    }

    pub fn error_code(&self, code: impl Into<String>) -> &Self {
        self.edit(|r| r.set_error_code(code))
    }

    pub fn sql_state(&self, state: impl Into<String>) -> &Self {
        self.edit(|r| r.set_sql_state(state))
    }

    pub fn error_message(&self, message: impl Into<String>) -> &Self {
        self.edit(|r| r.set_error_message(message))
    }

    pub fn stack_trace_content(&self, content: impl Into<String>) -> &Self {
        self.edit(|r| r.set_stack_trace_content(content))
    }

    pub fn output_stream_message(&self, message: impl Into<String>) -> &Self {
        self.edit(|r| r.set_output_stream_message(message))
    }

    pub fn exception_type_name(&self, name: impl Into<String>) -> &Self {
        self.edit(|r| r.set_exception_type_name(name))
    }

    /// Record the error's type, and its source's message and type.
    pub fn exception<E>(&self, error: &E) -> &Self
    where
        E: StdError + ?Sized,
    {
        self.edit(|r| r.set_exception(error))
    }

    /// Refresh the record timestamps.
    pub fn now(&self) -> &Self {
        self.edit(FailureRecord::touch)
    }

    pub fn add_diagnostic(&self, message: impl Into<String>) -> &Self {
        self.edit(|r| r.add_diagnostic(message))
    }

    pub fn add_diagnostic_from(&self, contributor: &str, message: impl AsRef<str>) -> &Self {
        self.edit(|r| r.add_diagnostic_from(contributor, message))
    }

    pub fn mark_diagnostic_step_failed(
        &self,
        contributor: &str,
        error: Option<&dyn StdError>,
    ) -> &Self {
        self.edit(|r| r.mark_diagnostic_step_failed(contributor, error))
    }

    /// Downgrade to a read view of the same record.
    pub fn view(&self) -> CurrentError {
        CurrentError::new(Arc::clone(&self.record))
    }

    /// Copy of the record as it is now.
    pub fn snapshot(&self) -> FailureRecord {
        lock(&self.record).clone()
    }
}

/// Read view of a failure record.
#[derive(Clone, Debug)]
pub struct CurrentError {
    record: SharedRecord,
}

impl CurrentError {
    pub(crate) fn new(record: SharedRecord) -> Self {
        Self { record }
    }

    fn read<T>(&self, f: impl FnOnce(&FailureRecord) -> T) -> T {
        f(&lock(&self.record))
    }

    pub fn original_exit_code(&self) -> Option<i32> {
        self.read(FailureRecord::original_exit_code)
    }

    pub fn interpreted_exit_code(&self) -> Option<i32> {
        self.read(FailureRecord::interpreted_exit_code)
    }

    pub fn error_code(&self) -> Option<String> {
        self.read(|r| r.error_code().map(str::to_owned))
    }

    pub fn sql_state(&self) -> Option<String> {
        self.read(|r| r.sql_state().map(str::to_owned))
    }

    pub fn error_message(&self) -> Option<String> {
        self.read(|r| r.error_message().map(str::to_owned))
    }

    pub fn error_cause_message(&self) -> Option<String> {
        self.read(|r| r.error_cause_message().map(str::to_owned))
    }

    pub fn stack_trace_content(&self) -> Option<String> {
        self.read(|r| r.stack_trace_content().map(str::to_owned))
    }

    pub fn output_stream_message(&self) -> Option<String> {
        self.read(|r| r.output_stream_message().map(str::to_owned))
    }

    pub fn exception_type_name(&self) -> Option<String> {
        self.read(|r| r.exception_type_name().map(str::to_owned))
    }

    pub fn exception_cause_type_name(&self) -> Option<String> {
        self.read(|r| r.exception_cause_type_name().map(str::to_owned))
    }

    pub fn milliseconds(&self) -> i64 {
        self.read(FailureRecord::milliseconds)
    }

    pub fn nano_seconds(&self) -> u64 {
        self.read(FailureRecord::nano_seconds)
    }

    pub fn diagnostics(&self) -> String {
        self.read(FailureRecord::diagnostics)
    }

    pub fn has_diagnostics(&self) -> bool {
        self.read(FailureRecord::has_diagnostics)
    }

    pub fn is_empty(&self) -> bool {
        self.read(FailureRecord::is_empty)
    }

    pub fn add_diagnostic(&self, message: impl Into<String>) -> &Self {
        lock(&self.record).add_diagnostic(message);
        self
    }

    pub fn add_diagnostic_from(&self, contributor: &str, message: impl AsRef<str>) -> &Self {
        lock(&self.record).add_diagnostic_from(contributor, message);
        self
    }

    pub fn mark_diagnostic_step_failed(
        &self,
        contributor: &str,
        error: Option<&dyn StdError>,
    ) -> &Self {
        lock(&self.record).mark_diagnostic_step_failed(contributor, error);
        self
    }

    pub fn snapshot(&self) -> FailureRecord {
        lock(&self.record).clone()
    }

    /// `true` if both handles point at the same record.
    pub fn same_record(&self, other: &CurrentError) -> bool {
        Arc::ptr_eq(&self.record, &other.record)
    }
}
