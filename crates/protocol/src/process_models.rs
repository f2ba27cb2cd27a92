//! Interpreter process launch state models.
//!
//! This module defines the lifecycle states of a supervised interpreter
//! process and the reserved exit codes used when reporting failures.

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

/// Bash/Linux status for a time out.
pub const EXIT_STATUS_TIMEOUT: i32 = 124;

/// Bash/Linux status for "command not found".
pub const EXIT_STATUS_COMMAND_NOT_FOUND: i32 = 127;

/// Out-of-band exit code meaning "no real exit code available".
///
/// Set when the process could not be run at all, most likely because the
/// executable or the working directory could not be found. It is reported
/// externally as [`EXIT_STATUS_COMMAND_NOT_FOUND`].
pub const NEVER_STARTED_SENTINEL: i32 = -559_038_737;

/// Represents the launch state of a supervised process.
///
/// The state progresses through these values during normal execution:
/// New -> Launched -> Running -> Completed
///
/// Terminal states:
/// - Terminated: non-zero exit, launch failure, timeout or kill
/// - Completed: exit code zero
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LaunchState {
    /// Launcher created, nothing spawned yet.
    New,

    /// Process spawned, readiness not confirmed.
    Launched,

    /// Process confirmed it is alive and ready.
    Running,

    /// Process terminated on a non-zero exit value or never started.
    Terminated,

    /// Process completed with exit value zero.
    Completed,
}

impl LaunchState {
    /// Returns `true` for `Terminated` and `Completed`.
    pub fn is_terminal(self) -> bool {
        matches!(self, LaunchState::Terminated | LaunchState::Completed)
    }

    /// Returns `true` if moving from `self` to `next` goes strictly forward.
    ///
    /// Terminal states are final: no transition leaves them.
    pub fn can_transition_to(self, next: LaunchState) -> bool {
        !self.is_terminal() && next.rank() > self.rank()
    }

    fn rank(self) -> u8 {
        match self {
            LaunchState::New => 0,
            LaunchState::Launched => 1,
            LaunchState::Running => 2,
            LaunchState::Terminated | LaunchState::Completed => 3,
        }
    }
}

impl fmt::Display for LaunchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LaunchState::New => "NEW",
            LaunchState::Launched => "LAUNCHED",
            LaunchState::Running => "RUNNING",
            LaunchState::Terminated => "TERMINATED",
            LaunchState::Completed => "COMPLETED",
        };
        f.write_str(name)
    }
}
