//! Load, run and unload applications in interpreter processes.
//!
//! Each operation is queued on a bounded worker pool shared by every
//! coordinator, so the caller never waits on a remote call. Operations on one
//! application are serialized by its operation lock; different applications
//! proceed in parallel.

use super::error::ApplicationError;
use super::listener::ApplicationEventListener;
use super::state::ApplicationState;
use crate::executor::{ExecutorRegistry, WorkerPool};
use crate::notebook::{NoteEventListener, Notebook, Paragraph};
use async_trait::async_trait;
use nb_protocol::application_models::{ApplicationPackage, ApplicationStatus, OutputType};
use nb_protocol::config_models::ServerConfig;
use nb_protocol::note_models::JobStatus;
use nb_protocol::remote_models::{ApplicationResult, RemoteCall};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// Default number of workers of the application pool.
pub const DEFAULT_POOL_SIZE: usize = 10;

/// Coordinates application lifecycles against interpreter processes.
///
/// Cloning yields another handle sharing the same pool and listener.
#[derive(Clone)]
pub struct ApplicationCoordinator {
    notebook: Arc<Notebook>,
    pool: Arc<WorkerPool>,
    listener: Option<Arc<dyn ApplicationEventListener>>,
}

impl ApplicationCoordinator {
    /// Create a coordinator working on `notebook`.
    ///
    /// The worker pool is looked up in `registry` under the coordinator type
    /// name, so every coordinator of a server shares it; `pool_size` only
    /// applies when the pool is created.
    pub fn new(notebook: Arc<Notebook>, registry: &ExecutorRegistry, pool_size: usize) -> Self {
        let pool = registry.create_or_get(std::any::type_name::<Self>(), pool_size);
        Self {
            notebook,
            pool,
            listener: None,
        }
    }

    /// Create a coordinator whose pool size comes from the server settings.
    pub fn from_config(
        notebook: Arc<Notebook>,
        registry: &ExecutorRegistry,
        config: &ServerConfig,
    ) -> Self {
        Self::new(notebook, registry, config.application_pool_size)
    }

    /// Relay application activity to `listener`.
    pub fn with_listener(mut self, listener: Arc<dyn ApplicationEventListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Register this coordinator for note events of its notebook.
    pub fn attach(self: &Arc<Self>) {
        self.notebook.add_listener(self);
    }

    pub fn pool(&self) -> &Arc<WorkerPool> {
        &self.pool
    }

    /// Load `package` into the paragraph's interpreter and run it.
    ///
    /// Returns the application id as soon as the work is queued. Failures
    /// put the application in `ERROR` with the failure message as output.
    pub async fn load_and_run(
        &self,
        package: ApplicationPackage,
        paragraph: &Arc<Paragraph>,
    ) -> String {
        let app = paragraph.create_or_get_application_state(package);
        if let Some(listener) = &self.listener {
            listener
                .on_load(paragraph.note_id(), paragraph.id(), app.id(), app.package())
                .await;
        }

        let app_id = app.id().to_string();
        let this = self.clone();
        let paragraph = Arc::clone(paragraph);
        self.pool.spawn(async move {
            let result = async {
                this.load(&paragraph, &app).await?;
                this.run_loaded(&paragraph, &app).await
            };
            if let Err(e) = result.await {
                this.fail(&paragraph, &app, &e).await;
            }
        });
        app_id
    }

    /// Queue a run of a loaded application.
    pub fn run(&self, paragraph: &Arc<Paragraph>, app_id: &str) -> JoinHandle<()> {
        let this = self.clone();
        let paragraph = Arc::clone(paragraph);
        let app_id = app_id.to_string();
        self.pool.spawn(async move {
            let Some(app) = paragraph.application_state(&app_id) else {
                warn!("Can not find {app_id} to run in {}", paragraph.id());
                return;
            };
            if let Err(e) = this.run_loaded(&paragraph, &app).await {
                this.fail(&paragraph, &app, &e).await;
            }
        })
    }

    /// Queue an unload. The application state stays in the paragraph.
    pub fn unload(&self, paragraph: &Arc<Paragraph>, app_id: &str) -> JoinHandle<()> {
        let this = self.clone();
        let paragraph = Arc::clone(paragraph);
        let app_id = app_id.to_string();
        self.pool
            .spawn(async move { this.unload_task(&paragraph, &app_id).await })
    }

    async fn unload_task(&self, paragraph: &Paragraph, app_id: &str) {
        let Some(app) = paragraph.application_state(app_id) else {
            warn!("Can not find {app_id} to unload from {}", paragraph.id());
            return;
        };
        if let Err(e) = self.unload_loaded(paragraph, &app).await {
            self.fail(paragraph, &app, &e).await;
        }
    }

    pub fn get(&self, paragraph: &Paragraph, app_id: &str) -> Option<Arc<ApplicationState>> {
        paragraph.application_state(app_id)
    }

    /// Load step. A no-op when the application is already `LOADED`.
    pub async fn load(
        &self,
        paragraph: &Paragraph,
        app: &ApplicationState,
    ) -> Result<(), ApplicationError> {
        let _guard = app.lock_operation().await;
        if app.status() == ApplicationStatus::Loaded {
            return Ok(());
        }

        self.status_change(paragraph, app, ApplicationStatus::Loading)
            .await;
        let call = RemoteCall::LoadApplication {
            app_id: app.id().to_string(),
            package_json: app.package().to_json()?,
            note_id: paragraph.note_id().to_string(),
            paragraph_id: paragraph.id().to_string(),
        };
        expect_success(self.call(paragraph, call).await?)?;
        self.status_change(paragraph, app, ApplicationStatus::Loaded)
            .await;
        Ok(())
    }

    /// Run step. The application must be `LOADED`; its status is unchanged.
    pub async fn run_loaded(
        &self,
        paragraph: &Paragraph,
        app: &ApplicationState,
    ) -> Result<(), ApplicationError> {
        let _guard = app.lock_operation().await;
        let status = app.status();
        if status != ApplicationStatus::Loaded {
            return Err(ApplicationError::IllegalState {
                action: "run",
                status,
            });
        }

        let call = RemoteCall::RunApplication {
            app_id: app.id().to_string(),
        };
        expect_success(self.call(paragraph, call).await?)
    }

    /// Unload step. A no-op when the application is `UNLOADED`, otherwise
    /// it must be `LOADED`.
    pub async fn unload_loaded(
        &self,
        paragraph: &Paragraph,
        app: &ApplicationState,
    ) -> Result<(), ApplicationError> {
        if app.status() == ApplicationStatus::Unloaded {
            return Ok(());
        }

        let _guard = app.lock_operation().await;
        let status = app.status();
        if status != ApplicationStatus::Loaded {
            return Err(ApplicationError::IllegalState {
                action: "unload",
                status,
            });
        }

        self.status_change(paragraph, app, ApplicationStatus::Unloading)
            .await;
        let call = RemoteCall::UnloadApplication {
            app_id: app.id().to_string(),
        };
        expect_success(self.call(paragraph, call).await?)?;
        self.status_change(paragraph, app, ApplicationStatus::Unloaded)
            .await;
        Ok(())
    }

    async fn call(
        &self,
        paragraph: &Paragraph,
        call: RemoteCall,
    ) -> Result<ApplicationResult, ApplicationError> {
        let group = paragraph
            .binded_interpreter()
            .ok_or_else(|| ApplicationError::NoInterpreter(paragraph.id().to_string()))?;
        let process = group.remote_process().ok_or(ApplicationError::NotRunning)?;
        if !process.is_available().await {
            return Err(ApplicationError::NotRunning);
        }

        debug!(
            "Calling {} for {} in interpreter group {}",
            call.name(),
            call.app_id(),
            group.id()
        );
        Ok(process.call_remote_function(call).await?)
    }

    async fn status_change(
        &self,
        paragraph: &Paragraph,
        app: &ApplicationState,
        status: ApplicationStatus,
    ) {
        app.set_status(status);
        if let Some(listener) = &self.listener {
            listener
                .on_status_change(paragraph.note_id(), paragraph.id(), app.id(), status)
                .await;
        }
    }

    async fn fail(&self, paragraph: &Paragraph, app: &ApplicationState, e: &ApplicationError) {
        error!("Application {} in paragraph {} failed: {e}", app.id(), paragraph.id());
        self.status_change(paragraph, app, ApplicationStatus::Error)
            .await;
        app.set_output(e.to_string());
    }

    fn find_app(
        &self,
        note_id: &str,
        paragraph_id: &str,
        app_id: &str,
    ) -> Option<Arc<ApplicationState>> {
        let app = self
            .notebook
            .paragraph(note_id, paragraph_id)
            .and_then(|p| p.application_state(app_id));
        if app.is_none() {
            error!("Can't find app {app_id}");
        }
        app
    }
}

fn expect_success(result: ApplicationResult) -> Result<(), ApplicationError> {
    if result.is_success() {
        Ok(())
    } else {
        Err(ApplicationError::RemoteCallFailed(result.msg))
    }
}

/// Events reported by interpreter processes about their applications.
#[async_trait]
impl ApplicationEventListener for ApplicationCoordinator {
    async fn on_output_append(
        &self,
        note_id: &str,
        paragraph_id: &str,
        index: usize,
        app_id: &str,
        output: &str,
    ) {
        if let Some(app) = self.find_app(note_id, paragraph_id, app_id) {
            app.append_output(output);
        }
        if let Some(listener) = &self.listener {
            listener
                .on_output_append(note_id, paragraph_id, index, app_id, output)
                .await;
        }
    }

    async fn on_output_updated(
        &self,
        note_id: &str,
        paragraph_id: &str,
        index: usize,
        app_id: &str,
        output_type: OutputType,
        output: &str,
    ) {
        if let Some(app) = self.find_app(note_id, paragraph_id, app_id) {
            app.set_output(output);
        }
        if let Some(listener) = &self.listener {
            listener
                .on_output_updated(note_id, paragraph_id, index, app_id, output_type, output)
                .await;
        }
    }

    async fn on_load(
        &self,
        note_id: &str,
        paragraph_id: &str,
        app_id: &str,
        package: &ApplicationPackage,
    ) {
        if let Some(listener) = &self.listener {
            listener
                .on_load(note_id, paragraph_id, app_id, package)
                .await;
        }
    }

    async fn on_status_change(
        &self,
        note_id: &str,
        paragraph_id: &str,
        app_id: &str,
        status: ApplicationStatus,
    ) {
        if let Some(app) = self.find_app(note_id, paragraph_id, app_id) {
            app.set_status(status);
        }
        if let Some(listener) = &self.listener {
            listener
                .on_status_change(note_id, paragraph_id, app_id, status)
                .await;
        }
    }
}

#[async_trait]
impl NoteEventListener for ApplicationCoordinator {
    /// Unload every application of the removed paragraph before returning.
    async fn on_paragraph_remove(&self, paragraph: &Arc<Paragraph>) {
        for app in paragraph.all_application_states() {
            self.unload_task(paragraph, app.id()).await;
        }
    }

    /// Refresh applications once their paragraph finished running.
    async fn on_paragraph_status_change(&self, paragraph: &Arc<Paragraph>, status: JobStatus) {
        if status != JobStatus::Finished {
            return;
        }
        for app in paragraph.all_application_states() {
            self.load_and_run(app.package().clone(), paragraph).await;
        }
    }
}
