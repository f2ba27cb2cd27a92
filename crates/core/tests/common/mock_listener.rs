//! Application event listener that records everything it receives.

use async_trait::async_trait;
use nb_core::application::ApplicationEventListener;
use nb_protocol::application_models::{ApplicationPackage, ApplicationStatus, OutputType};
use nb_protocol::ipc::Event;
use std::sync::Mutex;

/// Keeps every callback as an [`Event`], in arrival order.
#[allow(dead_code)]
#[derive(Default)]
pub struct RecordingListener {
    events: Mutex<Vec<Event>>,
}

impl RecordingListener {
    #[allow(dead_code)]
    pub fn new() -> Self {
        Self::default()
    }

    #[allow(dead_code)]
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().expect("listener lock").clone()
    }

    /// Statuses reported for `app_id`, in order.
    #[allow(dead_code)]
    pub fn statuses(&self, app_id: &str) -> Vec<ApplicationStatus> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::ApplicationStatusChange {
                    app_id: id, status, ..
                } if id == app_id => Some(status),
                _ => None,
            })
            .collect()
    }

    /// Number of load notifications for `app_id`.
    #[allow(dead_code)]
    pub fn loads(&self, app_id: &str) -> usize {
        self.events()
            .iter()
            .filter(|event| matches!(event, Event::ApplicationLoad { app_id: id, .. } if id == app_id))
            .count()
    }

    fn push(&self, event: Event) {
        self.events.lock().expect("listener lock").push(event);
    }
}

#[async_trait]
impl ApplicationEventListener for RecordingListener {
    async fn on_output_append(
        &self,
        note_id: &str,
        paragraph_id: &str,
        index: usize,
        app_id: &str,
        output: &str,
    ) {
        self.push(Event::ApplicationOutputAppend {
            note_id: note_id.to_string(),
            paragraph_id: paragraph_id.to_string(),
            index,
            app_id: app_id.to_string(),
            output: output.to_string(),
        });
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
        self.push(Event::ApplicationOutputUpdated {
            note_id: note_id.to_string(),
            paragraph_id: paragraph_id.to_string(),
            index,
            app_id: app_id.to_string(),
            output_type,
            output: output.to_string(),
        });
    }

    async fn on_load(
        &self,
        note_id: &str,
        paragraph_id: &str,
        app_id: &str,
        package: &ApplicationPackage,
    ) {
        self.push(Event::ApplicationLoad {
            note_id: note_id.to_string(),
            paragraph_id: paragraph_id.to_string(),
            app_id: app_id.to_string(),
            package: package.clone(),
        });
    }

    async fn on_status_change(
        &self,
        note_id: &str,
        paragraph_id: &str,
        app_id: &str,
        status: ApplicationStatus,
    ) {
        self.push(Event::ApplicationStatusChange {
            note_id: note_id.to_string(),
            paragraph_id: paragraph_id.to_string(),
            app_id: app_id.to_string(),
            status,
        });
    }
}
