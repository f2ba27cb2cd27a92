//! Configuration models that aggregate all settings.
//!
//! This module provides the unified `NotebookConfig` structure that combines
//! server settings, interpreter settings, and application packages into a
//! single configuration object.

use nb_protocol::application_models::ApplicationPackage;
use nb_protocol::config_models::{InterpreterSetting, ServerConfig};

/// Unified configuration loaded from the `.notebook/` directory.
///
/// This structure aggregates all configuration sources:
/// - `config.toml`: Server settings
/// - `interpreters/*.yaml`: Interpreter settings
/// - `packages/*.json`: Application packages
///
/// # Example
///
/// ```rust,no_run
/// use nb_core::config::loader::load_config;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new(".")).await?;
/// println!("Loaded {} interpreters and {} packages",
///          config.interpreters.len(),
///          config.packages.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct NotebookConfig {
    /// Server settings from `config.toml`.
    pub server: ServerConfig,

    /// All interpreter settings loaded from `interpreters/*.yaml`.
    pub interpreters: Vec<InterpreterSetting>,

    /// All application packages loaded from `packages/*.json`.
    pub packages: Vec<ApplicationPackage>,
}

impl NotebookConfig {
    /// Look up an interpreter setting by name.
    pub fn interpreter(&self, name: &str) -> Option<&InterpreterSetting> {
        self.interpreters.iter().find(|setting| setting.name == name)
    }

    /// Look up an application package by name.
    pub fn package(&self, name: &str) -> Option<&ApplicationPackage> {
        self.packages.iter().find(|package| package.name == name)
    }
}
