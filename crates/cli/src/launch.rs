//! `nbsup launch`: run one command under supervision.

use crate::report;
use color_eyre::eyre::{eyre, Result};
use colored::Colorize;
use nb_core::launcher::{InterpreterLauncher, Launcher};
use nb_core::postmortem::FailureTracker;
use nb_protocol::config_models::InterpreterSetting;
use nb_protocol::process_models::LaunchState;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// How long a stopped process gets to exit.
const STOP_TIMEOUT: Duration = Duration::from_secs(5);

pub struct LaunchOptions {
    pub timeout_secs: u64,
    pub ready_marker: String,
    pub cwd: Option<PathBuf>,
    pub env: Vec<(String, String)>,
    pub json: bool,
}

/// Parse a `KEY=VALUE` pair.
pub fn parse_env(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{s}'")),
    }
}

/// Launch `command`, wait for readiness, then supervise it until it exits
/// or Ctrl-C stops it. Returns the exit code for the shell.
pub async fn execute(command: Vec<String>, options: LaunchOptions) -> Result<i32> {
    let mut parts = command.into_iter();
    let program = parts.next().ok_or_else(|| eyre!("No command given"))?;

    let mut setting = InterpreterSetting::new("launch", program)
        .with_args(parts.collect())
        .with_ready_marker(options.ready_marker);
    for (key, value) in options.env {
        setting = setting.with_env(key, value);
    }
    if let Some(cwd) = options.cwd {
        setting = setting.with_working_dir(cwd);
    }

    let tracker = Arc::new(FailureTracker::new());
    let launcher = InterpreterLauncher::new(setting, Arc::clone(&tracker));
    let process = launcher.process();

    let ready = launcher
        .launch_and_wait(Duration::from_secs(options.timeout_secs))
        .await;

    let state = match &ready {
        Ok(()) => {
            if !options.json {
                println!("{} {}", "Ready:".bold(), process.command().green());
            }
            process.stop_catch_launch_output();
            if !options.json {
                process.set_redirected_sink(Some(Arc::new(Mutex::new(std::io::stdout()))));
            }
            tokio::select! {
                state = process.wait_for_exit() => state,
                _ = tokio::signal::ctrl_c() => {
                    process.stop();
                    tokio::time::timeout(STOP_TIMEOUT, process.wait_for_exit())
                        .await
                        .unwrap_or_else(|_| process.state())
                }
            }
        }
        Err(_) => process.state(),
    };

    let code = match (&ready, state) {
        (Ok(()), LaunchState::Completed) => 0,
        _ => report::exit_code(process.failure().map(|f| f.snapshot()).as_ref()),
    };

    if options.json {
        let outcome = serde_json::json!({
            "command": process.command(),
            "ready": ready.is_ok(),
            "state": state,
            "error": ready.as_ref().err().map(ToString::to_string),
            "errorMessage": process.error_message(),
            "launchTimeout": process.is_launch_timeout(),
            "exitCode": code,
            "failures": tracker.snapshot(),
        });
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(code);
    }

    if let Err(e) = &ready {
        eprintln!("{} {e}", "Error:".red().bold());
        if let Some(message) = process.error_message() {
            eprintln!("{}", message.trim_end());
        }
    }
    report::print_state(state);
    report::print_failures(&tracker);
    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_env() {
        assert_eq!(
            parse_env("PYTHONUNBUFFERED=1"),
            Ok(("PYTHONUNBUFFERED".to_string(), "1".to_string()))
        );
        assert_eq!(
            parse_env("OPTS=a=b"),
            Ok(("OPTS".to_string(), "a=b".to_string()))
        );
        assert_eq!(parse_env("EMPTY="), Ok(("EMPTY".to_string(), String::new())));
        assert!(parse_env("NOVALUE").is_err());
        assert!(parse_env("=1").is_err());
    }
}
