//! Remote call models.
//!
//! A remote call is a synchronous request/response exchanged with a live
//! interpreter process. The interpreter answers every call with an
//! [`ApplicationResult`].

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Calls the core issues against an interpreter process.
///
/// Uses tagged enum serialization:
/// ```json
/// {
///   "type": "loadApplication",
///   "payload": {
///     "app_id": "app_2f1c...",
///     "package_json": "{...}",
///     "note_id": "2ABCDEF",
///     "paragraph_id": "20240101-000000_1"
///   }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum RemoteCall {
    /// Load an application package into the interpreter.
    LoadApplication {
        app_id: String,
        /// JSON-serialized [`crate::ApplicationPackage`].
        package_json: String,
        note_id: String,
        paragraph_id: String,
    },

    /// Run a loaded application.
    RunApplication { app_id: String },

    /// Unload a loaded application.
    UnloadApplication { app_id: String },
}

impl RemoteCall {
    /// Name of the remote function, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            RemoteCall::LoadApplication { .. } => "loadApplication",
            RemoteCall::RunApplication { .. } => "runApplication",
            RemoteCall::UnloadApplication { .. } => "unloadApplication",
        }
    }

    /// Id of the application the call targets.
    pub fn app_id(&self) -> &str {
        match self {
            RemoteCall::LoadApplication { app_id, .. }
            | RemoteCall::RunApplication { app_id }
            | RemoteCall::UnloadApplication { app_id } => app_id,
        }
    }
}

/// Result of a remote application call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
pub struct ApplicationResult {
    pub success: bool,

    /// Failure message reported by the interpreter; empty on success.
    #[serde(default)]
    pub msg: String,
}

impl ApplicationResult {
    pub fn success() -> Self {
        Self {
            success: true,
            msg: String::new(),
        }
    }

    pub fn failure(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            msg: msg.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn msg(&self) -> &str {
        &self.msg
    }
}
