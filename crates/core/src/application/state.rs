//! State of one application bound to a paragraph.

use nb_protocol::application_models::{ApplicationPackage, ApplicationStatus};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::Mutex as AsyncMutex;
use uuid::Uuid;

#[derive(Debug, Default)]
struct Snapshot {
    status: ApplicationStatus,
    output: String,
}

/// An application instance: id, package, status and output.
///
/// Status transitions are made while holding the operation lock
/// ([`ApplicationState::lock_operation`]), which serializes load, run and
/// unload of one application. Reads never take that lock.
#[derive(Debug)]
pub struct ApplicationState {
    id: String,
    package: ApplicationPackage,
    snapshot: Mutex<Snapshot>,
    operation: AsyncMutex<()>,
}

impl ApplicationState {
    pub fn new(package: ApplicationPackage) -> Self {
        Self {
            id: format!("app_{}", Uuid::new_v4().simple()),
            package,
            snapshot: Mutex::new(Snapshot::default()),
            operation: AsyncMutex::new(()),
        }
    }

    fn snapshot(&self) -> MutexGuard<'_, Snapshot> {
        self.snapshot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn package(&self) -> &ApplicationPackage {
        &self.package
    }

    pub fn status(&self) -> ApplicationStatus {
        self.snapshot().status
    }

    pub fn set_status(&self, status: ApplicationStatus) {
        self.snapshot().status = status;
    }

    pub fn output(&self) -> String {
        self.snapshot().output.clone()
    }

    pub fn set_output(&self, output: impl Into<String>) {
        self.snapshot().output = output.into();
    }

    pub fn append_output(&self, output: &str) {
        self.snapshot().output.push_str(output);
    }

    /// Serialize operations on this application.
    pub async fn lock_operation(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.operation.lock().await
    }
}
