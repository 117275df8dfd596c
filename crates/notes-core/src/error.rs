//! Save attempt errors.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

use crate::note::NoteId;
use crate::store::StoreError;

/// Why a save attempt was not issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SkipReason {
    /// Title is empty or whitespace
    MissingTitle,
    /// Document has no content
    EmptyContent,
    /// Content equals the last saved snapshot
    Unchanged,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingTitle => write!(f, "no title set"),
            SkipReason::EmptyContent => write!(f, "document is empty"),
            SkipReason::Unchanged => write!(f, "nothing changed since last save"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "camelCase")]
pub enum SaveError {
    /// Saving is disabled or there is nothing to save. Not a failure.
    #[error("Save skipped: {0}")]
    ValidationSkip(SkipReason),

    /// The note was deleted from the store behind our back.
    #[error("Note not found: {0}")]
    NotFound(NoteId),

    #[error("Save failed: {0}")]
    Storage(String),

    /// The scheduler task is gone.
    #[error("Save scheduler is not running")]
    Closed,
}

impl SaveError {
    /// True for suppressed attempts that never reached the store.
    pub fn is_skip(&self) -> bool {
        matches!(self, SaveError::ValidationSkip(_))
    }
}

impl From<StoreError> for SaveError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => SaveError::NotFound(id),
            StoreError::Storage(message) => SaveError::Storage(message),
        }
    }
}
