//! External process launching and supervision.
//!
//! This module provides:
//! - [`ProcessLauncher`]: spawn, state machine, output capture and failure
//!   records for one external process
//! - [`Launcher`]: the readiness contract concrete launchers implement
//! - [`InterpreterLauncher`]: interpreter processes with a ready-marker
//!   handshake

pub mod error;
pub mod interpreter;
pub mod output;
pub mod process;

pub use error::{LaunchError, LaunchResult};
pub use interpreter::InterpreterLauncher;
pub use output::{classify_line, LineLevel, OutputSink, ProcessOutputLog};
pub use process::{LaunchCommand, ProcessLauncher};

use async_trait::async_trait;
use std::time::Duration;

/// A launcher that knows when its process is ready to serve.
#[async_trait]
pub trait Launcher: Send + Sync {
    /// The supervised process.
    fn process(&self) -> &ProcessLauncher;

    /// Wait until the process is ready, it ended, or `timeout` elapsed.
    ///
    /// On timeout the process is destroyed and a timeout failure record is
    /// written before the error is returned.
    async fn wait_for_ready(&self, timeout: Duration) -> LaunchResult<()>;

    /// Launch the process and wait for it to become ready.
    async fn launch_and_wait(&self, timeout: Duration) -> LaunchResult<()> {
        self.process().launch();
        self.wait_for_ready(timeout).await
    }
}
