//! The failure record value type.

use chrono::Utc;
use serde::Serialize;
use std::error::Error as StdError;
use std::fmt;
use std::sync::OnceLock;
use std::time::Instant;

/// Nanoseconds elapsed since the first record of this process was created.
fn monotonic_nanos() -> u64 {
    static ORIGIN: OnceLock<Instant> = OnceLock::new();
    let origin = ORIGIN.get_or_init(Instant::now);
    u64::try_from(origin.elapsed().as_nanos()).unwrap_or(u64::MAX)
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |s| s.trim().is_empty())
}

/// Best-effort type name of a `dyn Error`: the leading identifier of its
/// `Debug` output (`Os { code: 2, .. }` gives `Os`).
fn dyn_error_type_name(error: &(dyn StdError + 'static)) -> String {
    if error.downcast_ref::<std::io::Error>().is_some() {
        return std::any::type_name::<std::io::Error>().to_string();
    }
    let debug = format!("{error:?}");
    let name: String = debug
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_' || *c == ':')
        .collect();
    if name.is_empty() {
        "dyn std::error::Error".to_string()
    } else {
        name
    }
}

/// Everything known about one failure or timeout episode.
///
/// Fields accumulate: every component examining the failure sets what it
/// knows and appends diagnostics. Nothing is ever cleared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureRecord {
    milliseconds: i64,
    nano_seconds: u64,
    original_exit_code: Option<i32>,
    interpreted_exit_code: Option<i32>,
    error_code: Option<String>,
    sql_state: Option<String>,
    error_message: Option<String>,
    error_cause_message: Option<String>,
    stack_trace_content: Option<String>,
    output_stream_message: Option<String>,
    exception_type_name: Option<String>,
    exception_cause_type_name: Option<String>,
    diagnostics: Vec<String>,
}

impl Default for FailureRecord {
    fn default() -> Self {
        Self::new()
    }
}

impl FailureRecord {
    /// Create an empty record stamped with the current time.
    pub fn new() -> Self {
        Self {
            milliseconds: Utc::now().timestamp_millis(),
            nano_seconds: monotonic_nanos(),
            original_exit_code: None,
            interpreted_exit_code: None,
            error_code: None,
            sql_state: None,
            error_message: None,
            error_cause_message: None,
            stack_trace_content: None,
            output_stream_message: None,
            exception_type_name: None,
            exception_cause_type_name: None,
            diagnostics: Vec::new(),
        }
    }

    /// Wall-clock milliseconds since the Unix epoch.
    pub fn milliseconds(&self) -> i64 {
        self.milliseconds
    }

    /// Monotonic nanoseconds, comparable between records of this process.
    pub fn nano_seconds(&self) -> u64 {
        self.nano_seconds
    }

    /// Exit code returned by the process, `None` if it never returned one.
    pub fn original_exit_code(&self) -> Option<i32> {
        self.original_exit_code
    }

    /// Interpreted exit code, falling back to the original one when no
    /// interpretation was set.
    pub fn interpreted_exit_code(&self) -> Option<i32> {
        self.interpreted_exit_code.or(self.original_exit_code)
    }

    pub fn error_code(&self) -> Option<&str> {
        self.error_code.as_deref()
    }

    pub fn sql_state(&self) -> Option<&str> {
        self.sql_state.as_deref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn error_cause_message(&self) -> Option<&str> {
        self.error_cause_message.as_deref()
    }

    pub fn stack_trace_content(&self) -> Option<&str> {
        self.stack_trace_content.as_deref()
    }

    /// Output the process printed before failing.
    pub fn output_stream_message(&self) -> Option<&str> {
        self.output_stream_message.as_deref()
    }

    pub fn exception_type_name(&self) -> Option<&str> {
        self.exception_type_name.as_deref()
    }

    pub fn exception_cause_type_name(&self) -> Option<&str> {
        self.exception_cause_type_name.as_deref()
    }

    pub fn set_original_exit_code(&mut self, code: Option<i32>) {
        self.original_exit_code = code;
    }

    pub fn set_interpreted_exit_code(&mut self, code: Option<i32>) {
        self.interpreted_exit_code = code;
    }

    pub fn set_error_code(&mut self, code: impl Into<String>) {
        self.error_code = Some(code.into());
    }

    pub fn set_sql_state(&mut self, state: impl Into<String>) {
        self.sql_state = Some(state.into());
    }

    pub fn set_error_message(&mut self, message: impl Into<String>) {
        self.error_message = Some(message.into());
    }

    pub fn set_stack_trace_content(&mut self, content: impl Into<String>) {
        self.stack_trace_content = Some(content.into());
    }

    pub fn set_output_stream_message(&mut self, message: impl Into<String>) {
        self.output_stream_message = Some(message.into());
    }

    pub fn set_exception_type_name(&mut self, name: impl Into<String>) {
        self.exception_type_name = Some(name.into());
    }

    /// Record the type of `error`, plus the message and type of its direct
    /// source when it has one.
    pub fn set_exception<E>(&mut self, error: &E)
    where
        E: StdError + ?Sized,
    {
        self.exception_type_name = Some(std::any::type_name::<E>().to_string());

        if let Some(source) = error.source() {
            self.error_cause_message = Some(source.to_string());
            self.exception_cause_type_name = Some(dyn_error_type_name(source));
        }
    }

    /// Refresh both timestamps.
    pub fn touch(&mut self) {
        self.milliseconds = Utc::now().timestamp_millis();
        self.nano_seconds = monotonic_nanos();
    }

    pub fn add_diagnostic(&mut self, message: impl Into<String>) {
        self.diagnostics.push(message.into());
    }

    /// Append a diagnostic prefixed with the name of its contributor.
    pub fn add_diagnostic_from(&mut self, contributor: &str, message: impl AsRef<str>) {
        self.diagnostics
            .push(format!("{contributor}: {}", message.as_ref()));
    }

    /// Record that `contributor` failed while building a diagnostic.
    pub fn mark_diagnostic_step_failed(
        &mut self,
        contributor: &str,
        error: Option<&dyn StdError>,
    ) {
        let diagnostic = match error {
            Some(e) => format!("Failed to diagnose. {e}"),
            None => "Failed to diagnose. Unknown reason.".to_string(),
        };
        self.add_diagnostic_from(contributor, diagnostic);
    }

    pub fn has_diagnostics(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    /// Diagnostics in insertion order.
    pub fn diagnostic_entries(&self) -> &[String] {
        &self.diagnostics
    }

    /// Diagnostics joined with newlines.
    pub fn diagnostics(&self) -> String {
        self.diagnostics.join("\n")
    }

    /// `true` when the record carries no information besides its timestamps.
    pub fn is_empty(&self) -> bool {
        self.original_exit_code.is_none()
            && self.interpreted_exit_code.is_none()
            && is_blank(&self.error_code)
            && is_blank(&self.sql_state)
            && is_blank(&self.error_message)
            && is_blank(&self.error_cause_message)
            && is_blank(&self.stack_trace_content)
            && is_blank(&self.output_stream_message)
            && is_blank(&self.exception_type_name)
            && is_blank(&self.exception_cause_type_name)
            && self.diagnostics.is_empty()
    }
}

struct OrNone<'a, T>(&'a Option<T>);

impl<T: fmt::Display> fmt::Display for OrNone<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(value) => value.fmt(f),
            None => f.write_str("null"),
        }
    }
}

impl fmt::Display for FailureRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "At {} ms, {} ns:", self.milliseconds, self.nano_seconds)?;
        writeln!(
            f,
            "Exit/Error (Original: {}, Interpreted: {}, Code: {}, SQL: {}):",
            OrNone(&self.original_exit_code),
            OrNone(&self.interpreted_exit_code),
            OrNone(&self.error_code),
            OrNone(&self.sql_state)
        )?;
        writeln!(f, "Error message: {}", OrNone(&self.error_message))?;
        writeln!(
            f,
            "thrown by error of type: {}",
            OrNone(&self.exception_type_name)
        )?;
        writeln!(
            f,
            "Error message (cause): {}",
            OrNone(&self.error_cause_message)
        )?;
        writeln!(
            f,
            "caused by error of type: {}",
            OrNone(&self.exception_cause_type_name)
        )?;
        writeln!(
            f,
            "OutputStream error message (log): {}",
            OrNone(&self.output_stream_message)
        )?;
        writeln!(f, "Stack trace: {}", OrNone(&self.stack_trace_content))?;
        if self.has_diagnostics() {
            write!(f, "Diagnostics: {}", self.diagnostics())
        } else {
            write!(f, "Diagnostics: None")
        }
    }
}
