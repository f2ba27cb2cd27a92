//! Error types for application coordination.

use crate::remote::RemoteCallError;
use nb_protocol::application_models::ApplicationStatus;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApplicationError {
    /// The paragraph's interpreter group has no live process.
    #[error("Target interpreter process is not running")]
    NotRunning,

    /// The paragraph is not bound to any interpreter.
    #[error("No interpreter found for paragraph {0}")]
    NoInterpreter(String),

    /// The interpreter answered the call with a failure.
    #[error("{0}")]
    RemoteCallFailed(String),

    /// The operation is not allowed in the application's current status.
    #[error("Can't {action} application status {status}")]
    IllegalState {
        action: &'static str,
        status: ApplicationStatus,
    },

    #[error(transparent)]
    Remote(#[from] RemoteCallError),

    #[error("Failed to serialize application package: {0}")]
    Serialization(#[from] serde_json::Error),
}
