//! Error types for interpreter process launching.

use nb_protocol::process_models::LaunchState;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while launching or supervising a process.
#[derive(Error, Debug)]
pub enum LaunchError {
    /// The OS refused to start the process.
    #[error("Failed to start command '{command}': {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    /// Waiting on the child process failed.
    #[error("Failed to wait for command '{command}': {source}")]
    Wait {
        command: String,
        source: std::io::Error,
    },

    /// The process was terminated by a signal.
    #[error("Command '{command}' was terminated by signal {signal}")]
    Signaled { command: String, signal: i32 },

    /// The process did not report readiness in time.
    #[error("Command '{command}' did not become ready within {timeout:?}")]
    Timeout { command: String, timeout: Duration },

    /// The process ended before reporting readiness.
    #[error("Command '{command}' ended in state {state} before becoming ready: {message}")]
    ExitedBeforeReady {
        command: String,
        state: LaunchState,
        message: String,
    },
}

/// Type alias for Result with LaunchError.
pub type LaunchResult<T> = Result<T, LaunchError>;
