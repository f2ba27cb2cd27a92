//! Events emitted by the core.
//!
//! The core reports interpreter lifecycle changes and application activity
//! as `Event`s over a channel. Downstream consumers (a web-socket broadcaster,
//! a CLI printer, tests) read them asynchronously so the supervisor never
//! blocks on its listeners.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::application_models::{ApplicationPackage, ApplicationStatus, OutputType};
use crate::process_models::LaunchState;

/// Events sent from the core to downstream listeners.
///
/// Uses tagged enum serialization for TypeScript compatibility:
/// ```json
/// {
///   "type": "applicationStatusChange",
///   "payload": {
///     "note_id": "2ABCDEF",
///     "paragraph_id": "p1",
///     "app_id": "app_2f1c...",
///     "status": "LOADED"
///   }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum Event {
    /// A supervised interpreter process changed launch state.
    InterpreterStateChanged {
        #[ts(type = "string")]
        launcher_id: Uuid,
        state: LaunchState,
        #[ts(type = "string")]
        at: DateTime<Utc>,
    },

    /// An application is about to be loaded into a paragraph.
    ApplicationLoad {
        note_id: String,
        paragraph_id: String,
        app_id: String,
        package: ApplicationPackage,
    },

    /// An application appended output.
    ApplicationOutputAppend {
        note_id: String,
        paragraph_id: String,
        index: usize,
        app_id: String,
        output: String,
    },

    /// An application replaced its output.
    ApplicationOutputUpdated {
        note_id: String,
        paragraph_id: String,
        index: usize,
        app_id: String,
        output_type: OutputType,
        output: String,
    },

    /// An application changed status.
    ApplicationStatusChange {
        note_id: String,
        paragraph_id: String,
        app_id: String,
        status: ApplicationStatus,
    },
}
