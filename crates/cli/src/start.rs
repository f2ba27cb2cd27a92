//! `nbsup start`: bring up a configured interpreter through the manager.

use crate::report;
use color_eyre::eyre::{eyre, Result};
use colored::Colorize;
use nb_core::config::load_config;
use nb_core::interpreter::InterpreterManager;
use nb_core::postmortem::FailureTracker;
use std::path::Path;
use std::sync::Arc;

/// Start interpreter `name` from the configuration under `root`, report the
/// outcome, and stop it again. Returns the exit code for the shell.
pub async fn execute(name: &str, root: &Path) -> Result<i32> {
    let config = load_config(root).await?;
    let setting = config
        .interpreter(name)
        .cloned()
        .ok_or_else(|| eyre!("Interpreter '{name}' is not configured"))?;

    let tracker = Arc::new(FailureTracker::new());
    let manager = InterpreterManager::new(Arc::clone(&tracker), config.server);

    let code = match manager.start(setting).await {
        Ok(id) => {
            println!(
                "{} Interpreter '{}' is ready ({id})",
                "✓".green().bold(),
                name.cyan()
            );
            0
        }
        Err(e) => {
            eprintln!("{} {e:#}", "✗".red().bold());
            report::print_failures(&tracker);
            report::exit_code(Some(&tracker.current_error().snapshot()))
        }
    };

    manager.stop_all().await;
    Ok(code)
}
