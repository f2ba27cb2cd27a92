//! Configuration models for the `.notebook/` directory.
//!
//! - `config.toml`: server-wide settings ([`ServerConfig`])
//! - `interpreters/*.yaml`: one [`InterpreterSetting`] per file

use serde::Deserialize;
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use ts_rs::TS;

/// Marker an interpreter prints once it accepts remote calls.
pub const DEFAULT_READY_MARKER: &str = "INTERPRETER_READY";

/// Represents server settings from `.notebook/config.toml`.
///
/// # Example
///
/// ```toml
/// # .notebook/config.toml
/// application_pool_size = 10
/// ready_timeout_secs = 60
/// capture_launch_output = true
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
pub struct ServerConfig {
    /// Number of workers running application load/run/unload tasks.
    #[serde(default = "default_pool_size")]
    pub application_pool_size: usize,

    /// Default readiness timeout for interpreters that don't set their own.
    #[serde(default = "default_ready_timeout_secs")]
    pub ready_timeout_secs: u64,

    /// Keep interpreter output in memory for failure reports.
    #[serde(default = "default_true")]
    pub capture_launch_output: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            application_pool_size: default_pool_size(),
            ready_timeout_secs: default_ready_timeout_secs(),
            capture_launch_output: true,
        }
    }
}

fn default_pool_size() -> usize {
    10
}

fn default_ready_timeout_secs() -> u64 {
    60
}

fn default_true() -> bool {
    true
}

/// How to launch one interpreter process.
///
/// # Example
///
/// ```yaml
/// # .notebook/interpreters/python.yaml
/// name: python
/// command: python3
/// args: ["-u", "interpreter.py"]
/// env:
///   PYTHONUNBUFFERED: "1"
/// working-dir: /opt/interpreters/python
/// ready-marker: INTERPRETER_READY
/// ready-timeout-secs: 30
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
#[serde(rename_all = "kebab-case")]
pub struct InterpreterSetting {
    /// Unique interpreter name, referenced by paragraphs.
    pub name: String,

    /// Program to execute.
    pub command: String,

    #[serde(default)]
    pub args: Vec<String>,

    /// Extra environment variables, added on top of the server's environment.
    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Working directory; the server's current directory when unset.
    #[serde(default)]
    pub working_dir: Option<PathBuf>,

    /// Line content signalling the interpreter is ready.
    #[serde(default = "default_ready_marker")]
    pub ready_marker: String,

    /// Overrides [`ServerConfig::ready_timeout_secs`].
    #[serde(default)]
    pub ready_timeout_secs: Option<u64>,
}

impl InterpreterSetting {
    /// Create a setting for `command` with default marker and no arguments.
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            args: Vec::new(),
            env: HashMap::new(),
            working_dir: None,
            ready_marker: default_ready_marker(),
            ready_timeout_secs: None,
        }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_ready_marker(mut self, marker: impl Into<String>) -> Self {
        self.ready_marker = marker.into();
        self
    }

    pub fn with_ready_timeout_secs(mut self, secs: u64) -> Self {
        self.ready_timeout_secs = Some(secs);
        self
    }
}

fn default_ready_marker() -> String {
    DEFAULT_READY_MARKER.to_string()
}
