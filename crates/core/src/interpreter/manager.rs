//! Registry of launched interpreter processes.
//!
//! The InterpreterManager is the entry point for starting interpreters. It
//! keeps every launcher it created, including the ones that failed to
//! start, so their failure records stay reachable.

use crate::launcher::{InterpreterLauncher, Launcher};
use crate::postmortem::FailureTracker;
use anyhow::{Context, Result};
use nb_protocol::config_models::{InterpreterSetting, ServerConfig};
use nb_protocol::ipc::Event;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tracing::{info, warn};
use uuid::Uuid;

/// How long `stop` waits for a killed interpreter to exit.
const STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Manages all launched interpreters.
pub struct InterpreterManager {
    /// Launchers indexed by their id.
    interpreters: Arc<Mutex<HashMap<Uuid, Arc<InterpreterLauncher>>>>,

    tracker: Arc<FailureTracker>,

    config: ServerConfig,

    /// Channel for state change events, handed to every launcher.
    events_tx: Option<mpsc::Sender<Event>>,
}

impl InterpreterManager {
    /// Create a new InterpreterManager.
    ///
    /// # Arguments
    ///
    /// * `tracker` - Failure tracker shared with every launcher
    /// * `config` - Server settings (readiness timeout, output capture)
    pub fn new(tracker: Arc<FailureTracker>, config: ServerConfig) -> Self {
        Self {
            interpreters: Arc::new(Mutex::new(HashMap::new())),
            tracker,
            config,
            events_tx: None,
        }
    }

    pub fn with_events(mut self, events_tx: mpsc::Sender<Event>) -> Self {
        self.events_tx = Some(events_tx);
        self
    }

    pub fn tracker(&self) -> &Arc<FailureTracker> {
        &self.tracker
    }

    /// Launch an interpreter and wait until it is ready.
    ///
    /// The launcher is registered before it is launched and stays registered
    /// when it fails.
    ///
    /// # Errors
    ///
    /// Returns an error if the interpreter fails to start, exits early, or
    /// does not become ready within its timeout.
    pub async fn start(&self, setting: InterpreterSetting) -> Result<Uuid> {
        let timeout = Duration::from_secs(
            setting
                .ready_timeout_secs
                .unwrap_or(self.config.ready_timeout_secs),
        );
        let name = setting.name.clone();

        let mut launcher = InterpreterLauncher::new(setting, Arc::clone(&self.tracker));
        if let Some(events_tx) = &self.events_tx {
            launcher = launcher.with_events(events_tx.clone());
        }
        if !self.config.capture_launch_output {
            launcher.process().stop_catch_launch_output();
        }

        let launcher = Arc::new(launcher);
        let id = launcher.process().id();
        self.interpreters
            .lock()
            .await
            .insert(id, Arc::clone(&launcher));

        info!("Starting interpreter '{name}' ({id})");
        launcher
            .launch_and_wait(timeout)
            .await
            .with_context(|| format!("Interpreter '{name}' ({id}) failed to start"))?;

        Ok(id)
    }

    pub async fn get(&self, id: Uuid) -> Option<Arc<InterpreterLauncher>> {
        self.interpreters.lock().await.get(&id).cloned()
    }

    /// A launcher with the given interpreter name, preferring a live one.
    pub async fn get_by_name(&self, name: &str) -> Option<Arc<InterpreterLauncher>> {
        let interpreters = self.interpreters.lock().await;
        let mut named = interpreters.values().filter(|l| l.name() == name);
        let first = named.clone().next().cloned();
        named
            .find(|launcher| launcher.process().is_alive())
            .cloned()
            .or(first)
    }

    /// All registered launchers.
    pub async fn list(&self) -> Vec<Arc<InterpreterLauncher>> {
        self.interpreters.lock().await.values().cloned().collect()
    }

    /// Stop an interpreter and remove it from the registry.
    ///
    /// # Errors
    ///
    /// Returns an error if the interpreter is not found.
    pub async fn stop(&self, id: Uuid) -> Result<()> {
        let launcher = self
            .interpreters
            .lock()
            .await
            .remove(&id)
            .ok_or_else(|| anyhow::anyhow!("Interpreter {id} not found"))?;

        stop_launcher(&launcher).await;
        Ok(())
    }

    /// Stop every interpreter and clear the registry.
    pub async fn stop_all(&self) {
        let launchers: Vec<_> = self.interpreters.lock().await.drain().collect();
        for (_, launcher) in launchers {
            stop_launcher(&launcher).await;
        }
    }

    /// Get the number of registered interpreters.
    pub async fn count(&self) -> usize {
        self.interpreters.lock().await.len()
    }
}

/// Kill the launcher's process, including one still waiting for readiness.
async fn stop_launcher(launcher: &InterpreterLauncher) {
    let process = launcher.process();
    if !process.is_alive() {
        return;
    }
    if process.is_running() {
        process.stop();
    } else {
        process.abort();
    }
    if tokio::time::timeout(STOP_TIMEOUT, process.wait_for_exit())
        .await
        .is_err()
    {
        warn!(
            "Interpreter '{}' did not exit within {STOP_TIMEOUT:?}",
            launcher.name()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> InterpreterManager {
        InterpreterManager::new(Arc::new(FailureTracker::new()), ServerConfig::default())
    }

    #[tokio::test]
    async fn test_interpreter_manager_new() {
        let manager = manager();
        assert_eq!(manager.count().await, 0);
        assert!(manager.list().await.is_empty());
    }

    #[tokio::test]
    async fn test_interpreter_manager_stop_unknown() {
        let manager = manager();
        let result = manager.stop(Uuid::new_v4()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_failed_start_stays_registered() {
        let manager = manager();
        let setting = InterpreterSetting::new("ghost", "nb-nonexistent-interpreter-xyz")
            .with_ready_timeout_secs(5);

        let result = manager.start(setting).await;

        assert!(result.is_err());
        assert_eq!(manager.count().await, 1);
        let launcher = manager
            .get_by_name("ghost")
            .await
            .expect("failed launcher should stay registered");
        assert!(!launcher.process().is_alive());
        assert_eq!(
            manager.tracker().current_error().interpreted_exit_code(),
            Some(127)
        );
    }
}
