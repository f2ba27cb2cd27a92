//! Application event callbacks.

use async_trait::async_trait;
use nb_protocol::application_models::{ApplicationPackage, ApplicationStatus, OutputType};
use nb_protocol::ipc::Event;
use tokio::sync::mpsc;

/// Receives application activity: output, loads and status changes.
#[async_trait]
pub trait ApplicationEventListener: Send + Sync {
    async fn on_output_append(
        &self,
        note_id: &str,
        paragraph_id: &str,
        index: usize,
        app_id: &str,
        output: &str,
    );

    async fn on_output_updated(
        &self,
        note_id: &str,
        paragraph_id: &str,
        index: usize,
        app_id: &str,
        output_type: OutputType,
        output: &str,
    );

    async fn on_load(
        &self,
        note_id: &str,
        paragraph_id: &str,
        app_id: &str,
        package: &ApplicationPackage,
    );

    async fn on_status_change(
        &self,
        note_id: &str,
        paragraph_id: &str,
        app_id: &str,
        status: ApplicationStatus,
    );
}

/// Forwards application activity as [`Event`]s over a channel.
#[derive(Debug, Clone)]
pub struct EventChannelListener {
    events_tx: mpsc::Sender<Event>,
}

impl EventChannelListener {
    pub fn new(events_tx: mpsc::Sender<Event>) -> Self {
        Self { events_tx }
    }
}

#[async_trait]
impl ApplicationEventListener for EventChannelListener {
    async fn on_output_append(
        &self,
        note_id: &str,
        paragraph_id: &str,
        index: usize,
        app_id: &str,
        output: &str,
    ) {
        let _ = self
            .events_tx
            .send(Event::ApplicationOutputAppend {
                note_id: note_id.to_string(),
                paragraph_id: paragraph_id.to_string(),
                index,
                app_id: app_id.to_string(),
                output: output.to_string(),
            })
            .await;
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
        let _ = self
            .events_tx
            .send(Event::ApplicationOutputUpdated {
                note_id: note_id.to_string(),
                paragraph_id: paragraph_id.to_string(),
                index,
                app_id: app_id.to_string(),
                output_type,
                output: output.to_string(),
            })
            .await;
    }

    async fn on_load(
        &self,
        note_id: &str,
        paragraph_id: &str,
        app_id: &str,
        package: &ApplicationPackage,
    ) {
        let _ = self
            .events_tx
            .send(Event::ApplicationLoad {
                note_id: note_id.to_string(),
                paragraph_id: paragraph_id.to_string(),
                app_id: app_id.to_string(),
                package: package.clone(),
            })
            .await;
    }

    async fn on_status_change(
        &self,
        note_id: &str,
        paragraph_id: &str,
        app_id: &str,
        status: ApplicationStatus,
    ) {
        let _ = self
            .events_tx
            .send(Event::ApplicationStatusChange {
                note_id: note_id.to_string(),
                paragraph_id: paragraph_id.to_string(),
                app_id: app_id.to_string(),
                status,
            })
            .await;
    }
}
