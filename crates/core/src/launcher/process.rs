//! Supervised external process.
//!
//! A [`ProcessLauncher`] owns one external process from spawn to exit. It
//! keeps the [`LaunchState`] machine, captures the process output, and writes
//! a failure record to the shared [`FailureTracker`] whenever the process
//! fails to start, times out, or exits.

use super::error::LaunchError;
use super::output::{OutputSink, ProcessOutputLog};
use crate::postmortem::{FailureTracker, NewError};
use chrono::Utc;
use nb_protocol::ipc::Event;
use nb_protocol::process_models::{
    LaunchState, EXIT_STATUS_COMMAND_NOT_FOUND, EXIT_STATUS_TIMEOUT, NEVER_STARTED_SENTINEL,
};
use std::collections::HashMap;
use std::error::Error as StdError;
use std::io;
use std::path::PathBuf;
use std::pin::Pin;
use std::process::{ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot, watch};
use tokio_stream::wrappers::SplitStream;
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

const CONTRIBUTOR: &str = "ProcessLauncher";

/// How long output is still drained after the process exited.
const OUTPUT_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Command line and environment of a process to launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchCommand {
    pub program: String,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
    pub working_dir: Option<PathBuf>,
}

impl LaunchCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: HashMap::new(),
            working_dir: None,
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_envs(mut self, env: HashMap<String, String>) -> Self {
        self.env.extend(env);
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Program and arguments joined by spaces.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Absolute directory the process runs in.
    pub fn absolute_working_dir(&self) -> io::Result<PathBuf> {
        match &self.working_dir {
            Some(dir) if dir.is_absolute() => Ok(dir.clone()),
            Some(dir) => Ok(std::env::current_dir()?.join(dir)),
            None => std::env::current_dir(),
        }
    }
}

struct Inner {
    id: Uuid,
    command: LaunchCommand,
    tracker: Arc<FailureTracker>,
    state: watch::Sender<LaunchState>,
    output: ProcessOutputLog,
    error_message: Mutex<Option<String>>,
    launch_timeout: AtomicBool,
    last_failure: Mutex<Option<NewError>>,
    kill_tx: Mutex<Option<oneshot::Sender<()>>>,
    events_tx: Mutex<Option<mpsc::Sender<Event>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Launches and supervises one external process.
///
/// Cloning yields another handle to the same process.
#[derive(Clone)]
pub struct ProcessLauncher {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for ProcessLauncher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessLauncher")
            .field("id", &self.inner.id)
            .field("command", &self.command())
            .field("state", &self.state())
            .finish()
    }
}

impl ProcessLauncher {
    /// Create a launcher in state `NEW`. Nothing is started until
    /// [`ProcessLauncher::launch`].
    pub fn new(command: LaunchCommand, tracker: Arc<FailureTracker>) -> Self {
        let (state, _) = watch::channel(LaunchState::New);
        Self {
            inner: Arc::new(Inner {
                id: Uuid::new_v4(),
                command,
                tracker,
                state,
                output: ProcessOutputLog::new(),
                error_message: Mutex::new(None),
                launch_timeout: AtomicBool::new(false),
                last_failure: Mutex::new(None),
                kill_tx: Mutex::new(None),
                events_tx: Mutex::new(None),
            }),
        }
    }

    /// Report state changes as [`Event::InterpreterStateChanged`].
    pub fn with_events(self, events_tx: mpsc::Sender<Event>) -> Self {
        *lock(&self.inner.events_tx) = Some(events_tx);
        self
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    /// The full command line.
    pub fn command(&self) -> String {
        self.inner.command.command_line()
    }

    pub fn launch_command(&self) -> &LaunchCommand {
        &self.inner.command
    }

    pub fn state(&self) -> LaunchState {
        *self.inner.state.borrow()
    }

    /// Watch state changes.
    pub fn subscribe(&self) -> watch::Receiver<LaunchState> {
        self.inner.state.subscribe()
    }

    pub fn output(&self) -> &ProcessOutputLog {
        &self.inner.output
    }

    /// Start the process.
    ///
    /// Returns as soon as the process is spawned; a supervisor task pumps its
    /// output and waits for it to exit. Spawn failures are not returned but
    /// recorded: the launcher goes `TERMINATED` and a failure record is
    /// created. Must be called from within a Tokio runtime.
    pub fn launch(&self) {
        if self.state() != LaunchState::New {
            warn!(
                "Command '{}' already launched, current state: {}",
                self.command(),
                self.state()
            );
            return;
        }

        let launch_command = &self.inner.command;
        let mut cmd = Command::new(&launch_command.program);
        cmd.args(&launch_command.args)
            .envs(&launch_command.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &launch_command.working_dir {
            cmd.current_dir(dir);
        }

        info!("Launching command '{}'", self.command());
        match cmd.spawn() {
            Ok(child) => {
                let (kill_tx, kill_rx) = oneshot::channel();
                *lock(&self.inner.kill_tx) = Some(kill_tx);
                let launched = self.transition(LaunchState::Launched);
                tokio::spawn(self.clone().supervise(child, kill_rx));
                if !launched {
                    // Aborted while spawning.
                    self.destroy();
                }
            }
            Err(source) => self.on_launch_failed(LaunchError::Spawn {
                command: self.command(),
                source,
            }),
        }
    }

    async fn supervise(self, mut child: Child, mut kill_rx: oneshot::Receiver<()>) {
        let mut pump = tokio::spawn(pump_output(
            self.clone(),
            child.stdout.take(),
            child.stderr.take(),
        ));

        let status = tokio::select! {
            status = child.wait() => status,
            Ok(()) = &mut kill_rx => {
                info!("Destroying process of command '{}'", self.command());
                if let Err(e) = child.start_kill() {
                    warn!("Failed to kill command '{}': {e}", self.command());
                }
                child.wait().await
            }
        };

        if tokio::time::timeout(OUTPUT_DRAIN_TIMEOUT, &mut pump)
            .await
            .is_err()
        {
            debug!("Output of '{}' still open after exit", self.command());
            pump.abort();
        }

        match status {
            Ok(status) => match status.code() {
                Some(code) => self.on_process_complete(code),
                None => {
                    let signal = termination_signal(&status);
                    let error = LaunchError::Signaled {
                        command: self.command(),
                        signal: signal.unwrap_or_default(),
                    };
                    let exit_value = signal.map_or(NEVER_STARTED_SENTINEL, |s| 128 + s);
                    self.on_process_failed(exit_value, &error);
                }
            },
            Err(source) => {
                let error = LaunchError::Wait {
                    command: self.command(),
                    source,
                };
                self.on_process_failed(NEVER_STARTED_SENTINEL, &error);
            }
        }
    }

    fn on_launch_failed(&self, error: LaunchError) {
        self.stop_catch_launch_output();
        let report = error.to_string();
        error!("Error while running command '{}': {report}", self.command());
        self.transition(LaunchState::Terminated);
        *lock(&self.inner.error_message) = Some(report.clone());

        let record = self.inner.tracker.new_error();
        record
            .original_exit_code(NEVER_STARTED_SENTINEL)
            .interpreted_exit_code(EXIT_STATUS_COMMAND_NOT_FOUND)
            .exception(&error)
            .output_stream_message(self.inner.output.contents())
            .error_message(report)
            .stack_trace_content(error_chain(&error));

        match self.inner.command.absolute_working_dir() {
            Ok(dir) => {
                record.add_diagnostic_from(
                    CONTRIBUTOR,
                    format!(
                        "Attempting to start command '{}' in '{}' directory, that wasn't found.",
                        self.command(),
                        dir.display()
                    ),
                );
            }
            Err(err) => {
                record.mark_diagnostic_step_failed(CONTRIBUTOR, Some(&err));
            }
        }
        if let Err(err) = which::which(&self.inner.command.program) {
            record.add_diagnostic_from(
                CONTRIBUTOR,
                format!(
                    "Program '{}' could not be resolved: {err}",
                    self.inner.command.program
                ),
            );
        }

        *lock(&self.inner.last_failure) = Some(record);
    }

    /// The process reported readiness.
    pub fn on_process_running(&self) {
        self.transition(LaunchState::Running);
    }

    /// Readiness timeout reached: destroy the process whatever its state.
    pub fn on_timeout(&self) {
        warn!("Timeout reached for command '{}'", self.command());
        self.inner.launch_timeout.store(true, Ordering::SeqCst);

        let record = self.inner.tracker.new_error();
        record
            .original_exit_code(NEVER_STARTED_SENTINEL)
            .interpreted_exit_code(EXIT_STATUS_TIMEOUT)
            .output_stream_message(self.inner.output.contents())
            .add_diagnostic_from(
                CONTRIBUTOR,
                format!("Command '{}' gone on timeout.", self.command()),
            );
        *lock(&self.inner.last_failure) = Some(record);

        self.transition(LaunchState::Terminated);
        self.destroy();
    }

    /// The process exited with `exit_value`.
    pub fn on_process_complete(&self, exit_value: i32) {
        info!(
            "Process of command '{}' completed with exit value {exit_value}",
            self.command()
        );
        if exit_value == 0 {
            self.transition(LaunchState::Completed);
        } else {
            self.transition(LaunchState::Terminated);
        }

        if self.note_exit_after_timeout(&format!("Process exited with value {exit_value}")) {
            return;
        }

        let record = self.inner.tracker.new_error();
        record
            .original_exit_code(exit_value)
            .interpreted_exit_code(exit_value)
            .output_stream_message(self.inner.output.contents());
        *lock(&self.inner.last_failure) = Some(record);
    }

    /// The process ended abnormally.
    pub fn on_process_failed(&self, exit_value: i32, error: &LaunchError) {
        let report = error.to_string();
        warn!("Process with command '{}' failed: {report}", self.command());
        *lock(&self.inner.error_message) = Some(report.clone());
        self.transition(LaunchState::Terminated);

        if self.note_exit_after_timeout(&report) {
            return;
        }

        let record = self.inner.tracker.new_error();
        record
            .original_exit_code(exit_value)
            .exception(error)
            .error_message(report)
            .output_stream_message(self.inner.output.contents())
            .stack_trace_content(error_chain(error));
        if exit_value == NEVER_STARTED_SENTINEL {
            record.interpreted_exit_code(EXIT_STATUS_COMMAND_NOT_FOUND);
        }
        *lock(&self.inner.last_failure) = Some(record);
    }

    fn note_exit_after_timeout(&self, what: &str) -> bool {
        if !self.is_launch_timeout() {
            return false;
        }
        match lock(&self.inner.last_failure).as_ref() {
            Some(record) => {
                record.add_diagnostic_from(CONTRIBUTOR, format!("{what} after timeout kill."));
                true
            }
            None => false,
        }
    }

    /// Captured output when there is any, otherwise the last error.
    pub fn error_message(&self) -> Option<String> {
        let output = self.inner.output.contents();
        if !output.trim().is_empty() {
            return Some(output);
        }
        lock(&self.inner.error_message).clone()
    }

    pub fn process_launch_output(&self) -> String {
        self.inner.output.contents()
    }

    pub fn is_launch_timeout(&self) -> bool {
        self.inner.launch_timeout.load(Ordering::SeqCst)
    }

    /// The last failure record this launcher produced.
    pub fn failure(&self) -> Option<NewError> {
        lock(&self.inner.last_failure).clone()
    }

    /// Kill the process if it is running. Safe to call repeatedly.
    pub fn stop(&self) {
        if self.is_running() {
            info!("Stopping command '{}'", self.command());
            self.destroy();
        }
    }

    /// Kill the process whatever state it is in. A launcher that was never
    /// launched goes `TERMINATED` and will not start.
    pub fn abort(&self) {
        if self.state() == LaunchState::New && self.transition(LaunchState::Terminated) {
            info!("Command '{}' aborted before launch", self.command());
            return;
        }
        if self.is_alive() {
            info!("Aborting command '{}'", self.command());
            self.destroy();
        }
    }

    fn destroy(&self) {
        if let Some(kill_tx) = lock(&self.inner.kill_tx).take() {
            let _ = kill_tx.send(());
        }
    }

    pub fn is_alive(&self) -> bool {
        !self.state().is_terminal()
    }

    pub fn is_running(&self) -> bool {
        self.state() == LaunchState::Running
    }

    /// Mirror output lines to `sink`, or stop mirroring with `None`.
    pub fn set_redirected_sink(&self, sink: Option<Arc<dyn OutputSink>>) {
        let starting = sink.is_some();
        let had_sink = self.inner.output.set_sink(sink);
        if starting {
            info!("Start redirecting process output of '{}'", self.command());
        } else if had_sink {
            info!("Stop redirecting process output of '{}'", self.command());
        }
    }

    pub fn stop_catch_launch_output(&self) {
        self.inner.output.stop_catching();
    }

    /// Wait until the process reaches `TERMINATED` or `COMPLETED`.
    ///
    /// Never returns for a launcher that is never launched.
    pub async fn wait_for_exit(&self) -> LaunchState {
        let mut rx = self.subscribe();
        let reached = rx.wait_for(|state| state.is_terminal()).await.is_ok();
        if !reached {
            debug!("State channel of '{}' closed", self.command());
        }
        self.state()
    }

    fn transition(&self, next: LaunchState) -> bool {
        let mut previous = None;
        let applied = self.inner.state.send_if_modified(|current| {
            if current.can_transition_to(next) {
                previous = Some(*current);
                *current = next;
                true
            } else {
                false
            }
        });

        match previous {
            Some(previous) if applied => {
                info!(
                    "Command '{}' state change: {previous} -> {next}",
                    self.command()
                );
                self.emit_state_changed(next);
            }
            _ => debug!(
                "Ignoring state change of '{}' to {next}, current state {}",
                self.command(),
                self.state()
            ),
        }
        applied
    }

    fn emit_state_changed(&self, state: LaunchState) {
        let events_tx = lock(&self.inner.events_tx).clone();
        if let Some(tx) = events_tx {
            let event = Event::InterpreterStateChanged {
                launcher_id: self.inner.id,
                state,
                at: Utc::now(),
            };
            if let Err(e) = tx.try_send(event) {
                debug!("Dropping state change event: {e}");
            }
        }
    }
}

type LineStream = Pin<Box<dyn Stream<Item = io::Result<Vec<u8>>> + Send>>;

fn raw_lines<R>(reader: R) -> SplitStream<BufReader<R>>
where
    R: AsyncRead + Unpin,
{
    SplitStream::new(BufReader::new(reader).split(b'\n'))
}

/// Decode one raw output line. Invalid UTF-8 is replaced, never rejected.
fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}

async fn pump_output<O, E>(launcher: ProcessLauncher, stdout: Option<O>, stderr: Option<E>)
where
    O: AsyncRead + Unpin + Send + 'static,
    E: AsyncRead + Unpin + Send + 'static,
{
    let stdout = stdout.map(raw_lines);
    let stderr = stderr.map(raw_lines);

    let mut lines: LineStream = match (stdout, stderr) {
        (Some(out), Some(err)) => Box::pin(out.merge(err)),
        (Some(out), None) => Box::pin(out),
        (None, Some(err)) => Box::pin(err),
        (None, None) => return,
    };

    while let Some(line) = lines.next().await {
        match line {
            Ok(raw) => launcher.output().process_line(&decode_line(&raw)),
            Err(e) => {
                warn!("Failed to read output of '{}': {e}", launcher.command());
                break;
            }
        }
    }
}

fn error_chain(error: &dyn StdError) -> String {
    let mut chain = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        chain.push_str("\nCaused by: ");
        chain.push_str(&cause.to_string());
        source = cause.source();
    }
    chain
}

#[cfg(unix)]
fn termination_signal(status: &ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn termination_signal(_status: &ExitStatus) -> Option<i32> {
    None
}
