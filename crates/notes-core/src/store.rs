//! NoteStore trait abstraction for the persistence backend.
//!
//! Implementations:
//! - `InMemoryStore` - For testing and embedding
//! - `JsonFileStore` (in notes-cli) - Single JSON file on disk
//!
//! The editor only ever talks to the store through this trait; create-vs-update
//! dispatch lives in `IdentityResolver`.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicI64, Ordering};
use thiserror::Error;

use crate::note::{Note, NoteId, NoteSummary};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Note not found: {0}")]
    NotFound(NoteId),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Storage(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Backend that persists notes and assigns their identities.
#[async_trait]
pub trait NoteStore: Send + Sync {
    /// Create a new note and assign it an identity
    async fn create(&self, title: &str, content: &str) -> Result<Note>;

    /// Replace title and content of an existing note
    async fn update(&self, id: NoteId, title: &str, content: &str) -> Result<Note>;

    /// Fetch a single note
    async fn get(&self, id: NoteId) -> Result<Note>;

    /// Delete a note
    async fn delete(&self, id: NoteId) -> Result<()>;

    /// List all notes, newest first by creation time
    async fn list(&self) -> Result<Vec<NoteSummary>>;
}

/// Sort summaries newest first. Ties on `created_at` fall back to the id so
/// notes created within the same clock tick still list deterministically.
pub fn sort_newest_first(summaries: &mut [NoteSummary]) {
    summaries.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    });
}

/// In-memory store for testing
pub struct InMemoryStore {
    notes: RwLock<HashMap<NoteId, Note>>,
    next_id: AtomicI64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            notes: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    /// Number of stored notes
    pub fn len(&self) -> usize {
        self.notes.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NoteStore for InMemoryStore {
    async fn create(&self, title: &str, content: &str) -> Result<Note> {
        let id = NoteId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let now = Utc::now();
        let note = Note {
            id,
            title: title.to_string(),
            content: content.to_string(),
            created_at: now,
            updated_at: now,
        };

        self.notes
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, note.clone());
        Ok(note)
    }

    async fn update(&self, id: NoteId, title: &str, content: &str) -> Result<Note> {
        let mut notes = self.notes.write().unwrap_or_else(|e| e.into_inner());
        let note = notes.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        note.title = title.to_string();
        note.content = content.to_string();
        note.updated_at = Utc::now();
        Ok(note.clone())
    }

    async fn get(&self, id: NoteId) -> Result<Note> {
        self.notes
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    async fn delete(&self, id: NoteId) -> Result<()> {
        self.notes
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound(id))
    }

    async fn list(&self) -> Result<Vec<NoteSummary>> {
        let mut summaries: Vec<NoteSummary> = self
            .notes
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .map(NoteSummary::from)
            .collect();
        sort_newest_first(&mut summaries);
        Ok(summaries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_assigns_increasing_ids() {
        let store = InMemoryStore::new();

        let a = store.create("a", "first").await.unwrap();
        let b = store.create("b", "second").await.unwrap();

        assert_eq!(a.id, NoteId(1));
        assert_eq!(b.id, NoteId(2));
        assert_eq!(a.created_at, a.updated_at);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_update_replaces_content() {
        let store = InMemoryStore::new();
        let created = store.create("draft", "v1").await.unwrap();

        let updated = store.update(created.id, "final", "v2").await.unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.title, "final");
        assert_eq!(updated.content, "v2");
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at >= created.updated_at);
    }

    #[tokio::test]
    async fn test_update_missing_note_is_not_found() {
        let store = InMemoryStore::new();

        let err = store.update(NoteId(99), "t", "c").await.unwrap_err();

        assert_eq!(err, StoreError::NotFound(NoteId(99)));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_delete_then_get() {
        let store = InMemoryStore::new();
        let note = store.create("t", "c").await.unwrap();

        store.delete(note.id).await.unwrap();

        assert_eq!(store.get(note.id).await, Err(StoreError::NotFound(note.id)));
        assert_eq!(store.delete(note.id).await, Err(StoreError::NotFound(note.id)));
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let store = InMemoryStore::new();
        for title in ["one", "two", "three"] {
            store.create(title, "body").await.unwrap();
        }

        let titles: Vec<_> = store
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.title)
            .collect();

        assert_eq!(titles, vec!["three", "two", "one"]);
    }
}
