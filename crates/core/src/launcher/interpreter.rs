//! Launcher for interpreter processes.

use super::error::{LaunchError, LaunchResult};
use super::process::{LaunchCommand, ProcessLauncher};
use super::Launcher;
use crate::postmortem::FailureTracker;
use async_trait::async_trait;
use nb_protocol::config_models::InterpreterSetting;
use nb_protocol::ipc::Event;
use nb_protocol::process_models::LaunchState;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::info;

/// Launches an interpreter described by an [`InterpreterSetting`].
///
/// The interpreter is ready once it prints a line containing its ready
/// marker.
#[derive(Debug)]
pub struct InterpreterLauncher {
    setting: InterpreterSetting,
    process: ProcessLauncher,
    ready: watch::Receiver<bool>,
}

impl InterpreterLauncher {
    pub fn new(setting: InterpreterSetting, tracker: Arc<FailureTracker>) -> Self {
        let mut command = LaunchCommand::new(&setting.command)
            .with_args(setting.args.iter().cloned())
            .with_envs(setting.env.clone());
        if let Some(dir) = &setting.working_dir {
            command = command.with_working_dir(dir);
        }
        let process = ProcessLauncher::new(command, tracker);

        let (ready_tx, ready) = watch::channel(false);
        let marker = setting.ready_marker.clone();
        process.output().add_observer(move |line| {
            if line.contains(&marker) {
                ready_tx.send_replace(true);
            }
        });

        Self {
            setting,
            process,
            ready,
        }
    }

    pub fn with_events(mut self, events_tx: mpsc::Sender<Event>) -> Self {
        self.process = self.process.with_events(events_tx);
        self
    }

    pub fn name(&self) -> &str {
        &self.setting.name
    }

    pub fn setting(&self) -> &InterpreterSetting {
        &self.setting
    }

    /// `true` once the ready marker was seen.
    pub fn is_ready(&self) -> bool {
        *self.ready.borrow()
    }
}

enum ReadyOutcome {
    Ready,
    Ended(LaunchState),
}

#[async_trait]
impl Launcher for InterpreterLauncher {
    fn process(&self) -> &ProcessLauncher {
        &self.process
    }

    async fn wait_for_ready(&self, timeout: Duration) -> LaunchResult<()> {
        let mut ready = self.ready.clone();
        let mut state = self.process.subscribe();

        let wait = async {
            tokio::select! {
                biased;
                true = async { ready.wait_for(|seen| *seen).await.is_ok() } => ReadyOutcome::Ready,
                ended = async {
                    state.wait_for(|s| s.is_terminal()).await.map(|s| *s).ok()
                } => ReadyOutcome::Ended(ended.unwrap_or(LaunchState::Terminated)),
            }
        };

        match tokio::time::timeout(timeout, wait).await {
            Ok(ReadyOutcome::Ready) => {
                self.process.on_process_running();
                if self.process.is_running() {
                    info!("Interpreter '{}' is ready", self.name());
                    Ok(())
                } else {
                    Err(self.ended_before_ready(self.process.state()))
                }
            }
            Ok(ReadyOutcome::Ended(state)) => Err(self.ended_before_ready(state)),
            Err(_) => {
                self.process.on_timeout();
                Err(LaunchError::Timeout {
                    command: self.process.command(),
                    timeout,
                })
            }
        }
    }
}

impl InterpreterLauncher {
    fn ended_before_ready(&self, state: LaunchState) -> LaunchError {
        LaunchError::ExitedBeforeReady {
            command: self.process.command(),
            state,
            message: self.process.error_message().unwrap_or_default(),
        }
    }
}
