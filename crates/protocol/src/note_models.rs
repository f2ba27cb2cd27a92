//! Notebook paragraph models.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Execution status of a paragraph job.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Ready,
    Pending,
    Running,
    Finished,
    Error,
    Aborted,
}

impl JobStatus {
    /// Returns `true` once the job is no longer pending or running.
    pub fn is_completed(self) -> bool {
        matches!(self, JobStatus::Finished | JobStatus::Error | JobStatus::Aborted)
    }
}
