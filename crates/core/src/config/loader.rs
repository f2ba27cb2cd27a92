//! Configuration file loader for the `.notebook/` directory structure.
//!
//! This module loads and validates all configuration files from the
//! `.notebook/` directory:
//! - `config.toml`: Server settings
//! - `interpreters/*.yaml` (or `.yml`): Interpreter settings
//! - `packages/*.json`: Application packages

use crate::config::error::ConfigError;
use crate::config::error::ConfigResult;
use crate::config::models::NotebookConfig;
use nb_protocol::application_models::ApplicationPackage;
use nb_protocol::config_models::{InterpreterSetting, ServerConfig};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Name of the configuration directory under the project root.
pub const CONFIG_DIR: &str = ".notebook";

/// Loads all configuration from the `.notebook/` directory.
///
/// # Arguments
///
/// * `root` - Root directory containing the `.notebook/` folder
///
/// # Returns
///
/// A `NotebookConfig` containing all loaded configuration. Missing
/// directories or files yield defaults rather than an error.
///
/// # Errors
///
/// Returns `ConfigError` if:
/// - Files exist but cannot be read
/// - Files have invalid syntax (TOML, YAML, or JSON)
/// - An interpreter has an empty command or a duplicate name
///
/// # Example
///
/// ```rust,no_run
/// use nb_core::config::loader::load_config;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new(".")).await?;
/// println!("Loaded {} interpreters", config.interpreters.len());
/// # Ok(())
/// # }
/// ```
pub async fn load_config(root: &Path) -> ConfigResult<NotebookConfig> {
    let config_dir = root.join(CONFIG_DIR);

    if !config_dir.exists() {
        debug!("No {CONFIG_DIR} directory under {}", root.display());
        return Ok(NotebookConfig::default());
    }

    let server = load_server_config(&config_dir)?;
    let interpreters = load_interpreters(&config_dir)?;
    let packages = load_packages(&config_dir)?;

    Ok(NotebookConfig {
        server,
        interpreters,
        packages,
    })
}

/// Loads server settings from `config.toml`.
fn load_server_config(config_dir: &Path) -> ConfigResult<ServerConfig> {
    let config_path = config_dir.join("config.toml");

    if !config_path.exists() {
        return Ok(ServerConfig::default());
    }

    let content = read_file(&config_path)?;
    toml::from_str(&content).map_err(|source| ConfigError::TomlParse {
        path: config_path,
        source,
    })
}

/// Loads and validates interpreter settings from `interpreters/*.yaml`.
fn load_interpreters(config_dir: &Path) -> ConfigResult<Vec<InterpreterSetting>> {
    let files = config_files(&config_dir.join("interpreters"), &["yaml", "yml"])?;

    let mut names = HashSet::new();
    let mut settings = Vec::with_capacity(files.len());
    for path in files {
        let content = read_file(&path)?;
        let setting: InterpreterSetting =
            serde_yaml::from_str(&content).map_err(|source| ConfigError::YamlParse {
                path: path.clone(),
                source,
            })?;

        if setting.command.trim().is_empty() {
            return Err(ConfigError::InvalidConfig {
                path,
                reason: format!("Interpreter '{}' has an empty command", setting.name),
            });
        }
        if !names.insert(setting.name.clone()) {
            return Err(ConfigError::InvalidConfig {
                path,
                reason: format!("Duplicate interpreter name '{}'", setting.name),
            });
        }

        settings.push(setting);
    }

    Ok(settings)
}

/// Loads application packages from `packages/*.json`.
fn load_packages(config_dir: &Path) -> ConfigResult<Vec<ApplicationPackage>> {
    config_files(&config_dir.join("packages"), &["json"])?
        .into_iter()
        .map(|path| {
            let content = read_file(&path)?;
            serde_json::from_str(&content).map_err(|source| ConfigError::JsonParse { path, source })
        })
        .collect()
}

/// Files directly inside `dir` with one of `extensions`, sorted by path.
/// A missing directory yields no files.
fn config_files(dir: &Path, extensions: &[&str]) -> ConfigResult<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|source| ConfigError::DirectoryWalk {
            path: dir.to_path_buf(),
            source,
        })?;

        let path = entry.path();
        let matches = path
            .extension()
            .and_then(|s| s.to_str())
            .is_some_and(|ext| extensions.contains(&ext));
        if matches && entry.file_type().is_file() {
            files.push(path.to_path_buf());
        }
    }

    Ok(files)
}

fn read_file(path: &Path) -> ConfigResult<String> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
        path: path.to_path_buf(),
        source,
    })
}
