//! Test fixtures for interpreter settings, paragraphs and config projects.

use super::mock_listener::RecordingListener;
use nb_core::application::{ApplicationCoordinator, DEFAULT_POOL_SIZE};
use nb_core::executor::ExecutorRegistry;
use nb_core::notebook::{Notebook, Paragraph};
use nb_core::remote::{InterpreterGroup, MockInterpreterProcess};
use nb_protocol::application_models::{ApplicationPackage, PackageType};
use nb_protocol::config_models::InterpreterSetting;
use std::sync::Arc;
use tempfile::TempDir;

/// An interpreter running `script` through `sh -c`.
#[allow(dead_code)]
pub fn shell_interpreter(name: &str, script: &str) -> InterpreterSetting {
    InterpreterSetting::new(name, "sh").with_args(vec!["-c".to_string(), script.to_string()])
}

/// An interpreter that prints the default ready marker and then sleeps.
///
/// `exec` replaces the shell so a kill reaches the sleeping process itself.
#[allow(dead_code)]
pub fn ready_interpreter(name: &str) -> InterpreterSetting {
    shell_interpreter(name, "echo booting; echo INTERPRETER_READY; exec sleep 30")
}

/// An interpreter that never prints its ready marker.
#[allow(dead_code)]
pub fn silent_interpreter(name: &str) -> InterpreterSetting {
    shell_interpreter(name, "exec sleep 30")
}

#[allow(dead_code)]
pub fn clock_package() -> ApplicationPackage {
    ApplicationPackage::new(PackageType::Application, "clock", "clock-app@1.0.0")
        .with_class_name("org.example.ClockApp")
}

#[allow(dead_code)]
pub fn chart_package() -> ApplicationPackage {
    ApplicationPackage::new(PackageType::Visualization, "chart", "chart-app@2.1.0")
}

/// Notebook, coordinator and the mock process every paragraph is bound to.
/// The coordinator reports to `listener`.
#[allow(dead_code)]
pub struct TestNotebook {
    pub notebook: Arc<Notebook>,
    pub coordinator: Arc<ApplicationCoordinator>,
    pub listener: Arc<RecordingListener>,
    pub process: Arc<MockInterpreterProcess>,
    pub group: InterpreterGroup,
}

impl TestNotebook {
    /// A notebook with an attached coordinator backed by `process`.
    #[allow(dead_code)]
    pub fn new(process: MockInterpreterProcess, pool_size: usize) -> Self {
        Self::with_registry(process, &ExecutorRegistry::new(), pool_size)
    }

    #[allow(dead_code)]
    pub fn with_registry(
        process: MockInterpreterProcess,
        registry: &ExecutorRegistry,
        pool_size: usize,
    ) -> Self {
        let process = Arc::new(process);
        let group = InterpreterGroup::new("shared-group").with_process(process.clone());
        let notebook = Arc::new(Notebook::new());
        let listener = Arc::new(RecordingListener::new());
        let coordinator = Arc::new(
            ApplicationCoordinator::new(Arc::clone(&notebook), registry, pool_size)
                .with_listener(listener.clone()),
        );
        coordinator.attach();
        Self {
            notebook,
            coordinator,
            listener,
            process,
            group,
        }
    }

    #[allow(dead_code)]
    pub fn with_default_pool(process: MockInterpreterProcess) -> Self {
        Self::new(process, DEFAULT_POOL_SIZE)
    }

    /// Add a paragraph bound to the shared interpreter group, creating the
    /// note on first use.
    #[allow(dead_code)]
    pub async fn add_paragraph(&self, note_id: &str, paragraph_id: &str) -> Arc<Paragraph> {
        if self.notebook.get_note(note_id).is_none() {
            self.notebook.create_note(note_id).await;
        }
        self.notebook
            .add_paragraph(Paragraph::new(note_id, paragraph_id).with_interpreter(self.group.clone()))
            .await
            .expect("note exists")
    }
}

/// Create a temporary project directory with `.notebook` configuration.
///
/// Returns a TempDir that must be kept alive for the test duration.
#[allow(dead_code)]
pub fn create_test_project() -> std::io::Result<TempDir> {
    let temp_dir = tempfile::tempdir()?;
    let root = temp_dir.path().join(".notebook");

    std::fs::create_dir_all(root.join("interpreters"))?;
    std::fs::create_dir_all(root.join("packages"))?;

    std::fs::write(
        root.join("config.toml"),
        "application_pool_size = 2\nready_timeout_secs = 5\n",
    )?;

    let shell = r#"name: shell
command: sh
args: ["-c", "echo INTERPRETER_READY; exec sleep 30"]
"#;
    std::fs::write(root.join("interpreters/shell.yaml"), shell)?;

    let clock = r#"{
  "type": "APPLICATION",
  "name": "clock",
  "artifact": "clock-app@1.0.0",
  "className": "org.example.ClockApp"
}"#;
    std::fs::write(root.join("packages/clock.json"), clock)?;

    Ok(temp_dir)
}
