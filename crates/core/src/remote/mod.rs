//! Remote calls against a live interpreter process.
//!
//! The transport itself (a pooled RPC client in a full server) lives outside
//! this crate; this module defines its contract:
//! - [`RemoteInterpreterProcess`]: the process handle remote calls go through
//! - [`RemoteCallError`]: transport-level failures
//! - [`InterpreterGroup`]: shared slot holding the group's bound process

pub mod mock;

pub use mock::MockInterpreterProcess;

use async_trait::async_trait;
use nb_protocol::remote_models::{ApplicationResult, RemoteCall};
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteCallError {
    /// The remote function was invoked but failed to complete.
    #[error("Remote function call failed: {0}")]
    FunctionCallFailed(String),
    /// No client could be borrowed from or returned to the connection pool.
    #[error("Client pool error: {0}")]
    Pool(String),
    /// The connection to the interpreter broke.
    #[error("Transport error: {0}")]
    Transport(String),
}

#[async_trait]
pub trait RemoteInterpreterProcess: Send + Sync {
    /// `true` while the process accepts remote calls.
    async fn is_available(&self) -> bool;

    async fn call_remote_function(
        &self,
        call: RemoteCall,
    ) -> Result<ApplicationResult, RemoteCallError>;
}

/// Group of interpreters sharing one remote process.
///
/// Cloning yields another handle to the same group.
#[derive(Clone)]
pub struct InterpreterGroup {
    id: String,
    process: Arc<RwLock<Option<Arc<dyn RemoteInterpreterProcess>>>>,
}

impl std::fmt::Debug for InterpreterGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterpreterGroup")
            .field("id", &self.id)
            .field("bound", &self.remote_process().is_some())
            .finish()
    }
}

impl InterpreterGroup {
    /// A group with no process bound yet.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            process: Arc::new(RwLock::new(None)),
        }
    }

    pub fn with_process(self, process: Arc<dyn RemoteInterpreterProcess>) -> Self {
        self.bind(process);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn bind(&self, process: Arc<dyn RemoteInterpreterProcess>) {
        *self.process.write().unwrap_or_else(PoisonError::into_inner) = Some(process);
    }

    /// Drop the bound process, e.g. once it exited.
    pub fn unbind(&self) {
        *self.process.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// The bound process, if any.
    pub fn remote_process(&self) -> Option<Arc<dyn RemoteInterpreterProcess>> {
        self.process
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
