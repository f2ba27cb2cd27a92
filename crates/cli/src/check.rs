//! `nbsup check`: validate the `.notebook/` configuration.

use color_eyre::eyre::Result;
use colored::Colorize;
use nb_core::config::load_config;
use std::path::Path;

/// Print the loaded configuration. Returns 1 when an interpreter command
/// cannot be found on `PATH`.
pub async fn execute(root: &Path) -> Result<i32> {
    let config = load_config(root).await?;

    println!("{}", "Server".bold());
    println!("  application pool size: {}", config.server.application_pool_size);
    println!("  ready timeout: {}s", config.server.ready_timeout_secs);
    println!("  capture launch output: {}", config.server.capture_launch_output);

    println!();
    println!("{} ({})", "Interpreters".bold(), config.interpreters.len());
    let mut unresolved = 0;
    for setting in &config.interpreters {
        match which::which(&setting.command) {
            Ok(path) => println!(
                "  {} {} -> {}",
                "✓".green(),
                setting.name.cyan(),
                path.display()
            ),
            Err(e) => {
                unresolved += 1;
                println!(
                    "  {} {} -> '{}' {}",
                    "✗".red(),
                    setting.name.cyan(),
                    setting.command,
                    e.to_string().red()
                );
            }
        }
    }

    println!();
    println!("{} ({})", "Packages".bold(), config.packages.len());
    for package in &config.packages {
        println!(
            "  {} {:?} {}",
            package.name.cyan(),
            package.package_type,
            package.artifact
        );
    }

    Ok(if unresolved == 0 { 0 } else { 1 })
}
