//! JSON file backend for `NoteStore`.
//!
//! All notes live in one JSON document together with the next identity to
//! hand out. The file is created on the first write and every write replaces
//! it atomically, so a crash leaves either the old or the new document.

use async_trait::async_trait;
use chrono::Utc;
use notes_core::store::{Result, sort_newest_first};
use notes_core::{Note, NoteId, NoteStore, NoteSummary, StoreError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

/// On-disk layout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct StoreFile {
    next_id: i64,
    notes: Vec<Note>,
}

impl Default for StoreFile {
    fn default() -> Self {
        Self {
            next_id: 1,
            notes: Vec::new(),
        }
    }
}

impl StoreFile {
    fn find(&self, id: NoteId) -> Result<&Note> {
        self.notes
            .iter()
            .find(|n| n.id == id)
            .ok_or(StoreError::NotFound(id))
    }
}

/// Note store backed by a single JSON file.
pub struct JsonFileStore {
    path: PathBuf,
    /// In-memory copy of the file. Held across writes so they never interleave.
    state: Mutex<StoreFile>,
}

impl JsonFileStore {
    /// Open the store at `path`. A missing file is an empty store.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let state = match fs::read_to_string(&path).await {
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StoreFile::default(),
            Err(e) => return Err(e.into()),
        };
        debug!("Opened note store {:?} ({} notes)", path, state.notes.len());

        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    /// Write `file` to disk, then make it the current state.
    async fn commit(&self, current: &mut StoreFile, file: StoreFile) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        let json = serde_json::to_string_pretty(&file)?;
        atomic_write(&self.path, &json).await?;
        *current = file;
        Ok(())
    }
}

/// Atomic write using temp file + rename.
async fn atomic_write(path: &Path, content: &str) -> std::io::Result<()> {
    let temp_path = path.with_extension("json.tmp");

    if let Err(e) = fs::write(&temp_path, content).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(e);
    }

    if let Err(e) = fs::rename(&temp_path, path).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(e);
    }

    Ok(())
}

#[async_trait]
impl NoteStore for JsonFileStore {
    async fn create(&self, title: &str, content: &str) -> Result<Note> {
        let mut state = self.state.lock().await;
        let now = Utc::now();
        let note = Note {
            id: NoteId(state.next_id),
            title: title.to_string(),
            content: content.to_string(),
            created_at: now,
            updated_at: now,
        };

        let mut next = state.clone();
        next.next_id += 1;
        next.notes.push(note.clone());
        self.commit(&mut state, next).await?;

        debug!("Stored new note {}", note.id);
        Ok(note)
    }

    async fn update(&self, id: NoteId, title: &str, content: &str) -> Result<Note> {
        let mut state = self.state.lock().await;
        state.find(id)?;

        let mut next = state.clone();
        let note = next
            .notes
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or(StoreError::NotFound(id))?;
        note.title = title.to_string();
        note.content = content.to_string();
        note.updated_at = Utc::now();
        let note = note.clone();

        self.commit(&mut state, next).await?;
        Ok(note)
    }

    async fn get(&self, id: NoteId) -> Result<Note> {
        self.state.lock().await.find(id).cloned()
    }

    async fn delete(&self, id: NoteId) -> Result<()> {
        let mut state = self.state.lock().await;
        state.find(id)?;

        let mut next = state.clone();
        next.notes.retain(|n| n.id != id);
        self.commit(&mut state, next).await?;

        debug!("Deleted note {}", id);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<NoteSummary>> {
        let mut summaries: Vec<NoteSummary> = self
            .state
            .lock()
            .await
            .notes
            .iter()
            .map(NoteSummary::from)
            .collect();
        sort_newest_first(&mut summaries);
        Ok(summaries)
    }
}
