//! In-memory notebook: notes, paragraphs, and note event listeners.
//!
//! Persistence and the REST layer live elsewhere; this is the part of the
//! notebook that application coordination needs.

use crate::application::ApplicationState;
use crate::remote::InterpreterGroup;
use async_trait::async_trait;
use nb_protocol::application_models::ApplicationPackage;
use nb_protocol::note_models::JobStatus;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tracing::debug;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A paragraph of a note.
#[derive(Debug)]
pub struct Paragraph {
    id: String,
    note_id: String,
    interpreter: Option<InterpreterGroup>,
    status: Mutex<JobStatus>,
    applications: Mutex<Vec<Arc<ApplicationState>>>,
}

impl Paragraph {
    pub fn new(note_id: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            note_id: note_id.into(),
            interpreter: None,
            status: Mutex::new(JobStatus::Ready),
            applications: Mutex::new(Vec::new()),
        }
    }

    /// Bind the paragraph to an interpreter group.
    pub fn with_interpreter(mut self, group: InterpreterGroup) -> Self {
        self.interpreter = Some(group);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn note_id(&self) -> &str {
        &self.note_id
    }

    pub fn binded_interpreter(&self) -> Option<&InterpreterGroup> {
        self.interpreter.as_ref()
    }

    pub fn status(&self) -> JobStatus {
        *lock(&self.status)
    }

    pub fn application_state(&self, app_id: &str) -> Option<Arc<ApplicationState>> {
        lock(&self.applications)
            .iter()
            .find(|app| app.id() == app_id)
            .cloned()
    }

    /// The state of `package` in this paragraph, created on first use.
    pub fn create_or_get_application_state(
        &self,
        package: ApplicationPackage,
    ) -> Arc<ApplicationState> {
        let mut applications = lock(&self.applications);
        if let Some(existing) = applications.iter().find(|app| *app.package() == package) {
            return Arc::clone(existing);
        }
        let state = Arc::new(ApplicationState::new(package));
        applications.push(Arc::clone(&state));
        state
    }

    pub fn all_application_states(&self) -> Vec<Arc<ApplicationState>> {
        lock(&self.applications).clone()
    }
}

/// A note: an ordered list of paragraphs.
#[derive(Debug)]
pub struct Note {
    id: String,
    paragraphs: Mutex<Vec<Arc<Paragraph>>>,
}

impl Note {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            paragraphs: Mutex::new(Vec::new()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn paragraph(&self, paragraph_id: &str) -> Option<Arc<Paragraph>> {
        lock(&self.paragraphs)
            .iter()
            .find(|p| p.id() == paragraph_id)
            .cloned()
    }

    pub fn paragraphs(&self) -> Vec<Arc<Paragraph>> {
        lock(&self.paragraphs).clone()
    }

    fn push_paragraph(&self, paragraph: Arc<Paragraph>) {
        lock(&self.paragraphs).push(paragraph);
    }

    fn take_paragraph(&self, paragraph_id: &str) -> Option<Arc<Paragraph>> {
        let mut paragraphs = lock(&self.paragraphs);
        let index = paragraphs.iter().position(|p| p.id() == paragraph_id)?;
        Some(paragraphs.remove(index))
    }
}

/// Callbacks for note and paragraph lifecycle events. Every method defaults
/// to doing nothing.
#[async_trait]
pub trait NoteEventListener: Send + Sync {
    async fn on_note_create(&self, _note: &Arc<Note>) {}

    async fn on_note_remove(&self, _note: &Arc<Note>) {}

    async fn on_paragraph_create(&self, _paragraph: &Arc<Paragraph>) {}

    async fn on_paragraph_remove(&self, _paragraph: &Arc<Paragraph>) {}

    async fn on_paragraph_status_change(&self, _paragraph: &Arc<Paragraph>, _status: JobStatus) {}
}

/// Registry of notes.
///
/// Listeners are held weakly: a listener that was dropped simply stops
/// receiving events.
#[derive(Default)]
pub struct Notebook {
    notes: Mutex<HashMap<String, Arc<Note>>>,
    listeners: Mutex<Vec<Weak<dyn NoteEventListener>>>,
}

impl Notebook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener<L>(&self, listener: &Arc<L>)
    where
        L: NoteEventListener + 'static,
    {
        let weak: Weak<L> = Arc::downgrade(listener);
        lock(&self.listeners).push(weak);
    }

    fn listeners(&self) -> Vec<Arc<dyn NoteEventListener>> {
        let mut listeners = lock(&self.listeners);
        listeners.retain(|l| l.strong_count() > 0);
        listeners.iter().filter_map(Weak::upgrade).collect()
    }

    pub fn get_note(&self, note_id: &str) -> Option<Arc<Note>> {
        lock(&self.notes).get(note_id).cloned()
    }

    /// Look up a paragraph by note and paragraph id.
    pub fn paragraph(&self, note_id: &str, paragraph_id: &str) -> Option<Arc<Paragraph>> {
        self.get_note(note_id)?.paragraph(paragraph_id)
    }

    pub async fn create_note(&self, note_id: &str) -> Arc<Note> {
        let note = Arc::new(Note::new(note_id));
        lock(&self.notes).insert(note_id.to_string(), Arc::clone(&note));
        for listener in self.listeners() {
            listener.on_note_create(&note).await;
        }
        note
    }

    pub async fn remove_note(&self, note_id: &str) -> Option<Arc<Note>> {
        let note = lock(&self.notes).remove(note_id)?;
        for listener in self.listeners() {
            listener.on_note_remove(&note).await;
        }
        Some(note)
    }

    /// Append `paragraph` to its note. Returns `None` if the note is unknown.
    pub async fn add_paragraph(&self, paragraph: Paragraph) -> Option<Arc<Paragraph>> {
        let note = self.get_note(paragraph.note_id())?;
        let paragraph = Arc::new(paragraph);
        note.push_paragraph(Arc::clone(&paragraph));
        for listener in self.listeners() {
            listener.on_paragraph_create(&paragraph).await;
        }
        Some(paragraph)
    }

    /// Remove a paragraph and notify listeners once it is gone.
    pub async fn remove_paragraph(
        &self,
        note_id: &str,
        paragraph_id: &str,
    ) -> Option<Arc<Paragraph>> {
        let paragraph = self.get_note(note_id)?.take_paragraph(paragraph_id)?;
        for listener in self.listeners() {
            listener.on_paragraph_remove(&paragraph).await;
        }
        Some(paragraph)
    }

    /// Record a new job status for a paragraph and notify listeners.
    /// Returns `false` if the paragraph is unknown.
    pub async fn set_paragraph_status(
        &self,
        note_id: &str,
        paragraph_id: &str,
        status: JobStatus,
    ) -> bool {
        let Some(paragraph) = self.paragraph(note_id, paragraph_id) else {
            debug!("Status change for unknown paragraph {note_id}/{paragraph_id}");
            return false;
        };
        *lock(&paragraph.status) = status;
        for listener in self.listeners() {
            listener.on_paragraph_status_change(&paragraph, status).await;
        }
        true
    }
}
