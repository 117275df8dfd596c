//! EditorSession: the draft being edited, its saved snapshot and its identity.
//!
//! The session is plain state with no timers. The scheduler owns one and is
//! the only writer, which makes every transition below atomic with respect to
//! change detection.

use serde::Serialize;

use crate::error::{SaveError, SkipReason};
use crate::note::{Note, NoteId};

/// Title and content of the document being edited.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Draft {
    pub title: String,
    pub content: String,
}

impl Draft {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }
}

/// Everything a single save attempt needs, captured when it is issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveRequest {
    /// Session generation the request was issued under
    pub generation: u64,
    /// Identity to update, or `None` to create
    pub identity: Option<NoteId>,
    pub title: String,
    pub content: String,
}

/// Read-only view of the session for callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub title: String,
    pub content: String,
    pub identity: Option<NoteId>,
    pub saved_content: Option<String>,
    /// Content differs from the last save
    pub dirty: bool,
    /// Title differs from the last save
    pub title_dirty: bool,
    pub generation: u64,
}

#[derive(Debug, Clone)]
pub struct EditorSession {
    draft: Draft,
    identity: Option<NoteId>,
    /// Content as of the last successful save. `None` means never saved.
    saved: Option<String>,
    saved_title: Option<String>,
    generation: u64,
}

impl EditorSession {
    /// Start a session. The initial content counts as already saved.
    pub fn new(draft: Draft) -> Self {
        let saved = Some(draft.content.clone());
        let saved_title = Some(draft.title.clone());
        Self {
            draft,
            identity: None,
            saved,
            saved_title,
            generation: 0,
        }
    }

    pub fn title(&self) -> &str {
        &self.draft.title
    }

    pub fn content(&self) -> &str {
        &self.draft.content
    }

    pub fn identity(&self) -> Option<NoteId> {
        self.identity
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Replace the content. Returns false if it was already equal.
    pub fn set_content(&mut self, content: String) -> bool {
        if self.draft.content == content {
            return false;
        }
        self.draft.content = content;
        true
    }

    /// Replace the title. Returns false if it was already equal.
    pub fn set_title(&mut self, title: String) -> bool {
        if self.draft.title == title {
            return false;
        }
        self.draft.title = title;
        true
    }

    /// Enablement predicate: a non-blank title and some content.
    pub fn check_enabled(&self) -> Result<(), SkipReason> {
        if self.draft.title.trim().is_empty() {
            return Err(SkipReason::MissingTitle);
        }
        if self.draft.content.is_empty() {
            return Err(SkipReason::EmptyContent);
        }
        Ok(())
    }

    pub fn is_enabled(&self) -> bool {
        self.check_enabled().is_ok()
    }

    /// True when the content differs from the saved snapshot. Autosave
    /// triggers only look at this.
    pub fn is_dirty(&self) -> bool {
        self.saved.as_deref() != Some(self.draft.content.as_str())
    }

    /// True when the title was changed since the last save.
    pub fn is_title_dirty(&self) -> bool {
        self.saved_title.as_deref() != Some(self.draft.title.as_str())
    }

    /// Capture a save request, or explain why none should be issued.
    ///
    /// `force` skips redundancy suppression but never the enablement check.
    pub fn prepare(&self, force: bool) -> Result<SaveRequest, SaveError> {
        self.check_enabled().map_err(SaveError::ValidationSkip)?;
        if !force && !self.is_dirty() {
            return Err(SaveError::ValidationSkip(SkipReason::Unchanged));
        }

        Ok(SaveRequest {
            generation: self.generation,
            identity: self.identity,
            title: self.draft.title.clone(),
            content: self.draft.content.clone(),
        })
    }

    /// Whether a request was issued under the current generation.
    pub fn is_current(&self, request: &SaveRequest) -> bool {
        request.generation == self.generation
    }

    /// Record a successful save of `request`.
    ///
    /// The snapshot becomes the content that was sent, so edits made while the
    /// save was in flight stay dirty. The identity is adopted only if the
    /// session has none yet. Returns true when the identity was adopted.
    /// Stale requests are ignored and return false.
    pub fn record_saved(&mut self, request: &SaveRequest, note: &Note) -> bool {
        if !self.is_current(request) {
            return false;
        }

        self.saved = Some(request.content.clone());
        self.saved_title = Some(request.title.clone());
        if self.identity.is_none() {
            self.identity = Some(note.id);
            return true;
        }
        false
    }

    /// Start over with an unsaved document. The next save is a create.
    pub fn new_document(&mut self, title: &str) {
        self.draft = Draft::new(title, "");
        self.identity = None;
        self.saved = None;
        self.saved_title = None;
        self.generation += 1;
    }

    /// Replace the session with a stored note in one step.
    pub fn load(&mut self, note: &Note) {
        self.draft = Draft::new(note.title.clone(), note.content.clone());
        self.identity = Some(note.id);
        self.saved = Some(note.content.clone());
        self.saved_title = Some(note.title.clone());
        self.generation += 1;
    }

    pub fn state(&self) -> SessionState {
        SessionState {
            title: self.draft.title.clone(),
            content: self.draft.content.clone(),
            identity: self.identity,
            saved_content: self.saved.clone(),
            dirty: self.is_dirty(),
            title_dirty: self.is_title_dirty(),
            generation: self.generation,
        }
    }
}
