//! notes-core: Autosave engine for a single-writer markdown note editor.
//!
//! This crate provides:
//! - The `NoteStore` trait the editor persists through, plus an in-memory store
//! - An editor session that tracks the draft, its saved snapshot and its identity
//! - Identity resolution (create on first save, update afterwards)
//! - A save scheduler with debounce and periodic triggers and a single in-flight save

pub mod config;
pub mod error;
pub mod events;
pub mod note;
pub mod resolver;
pub mod scheduler;
pub mod session;
pub mod store;

pub use config::AutosaveConfig;
pub use error::{SaveError, SkipReason};
pub use events::{EventBus, SaveEvent, SaveStatus, SaveTrigger, Subscription};
pub use note::{Note, NoteId, NoteSummary};
pub use resolver::IdentityResolver;
pub use scheduler::{SaveOutcome, SaveScheduler};
pub use session::{Draft, EditorSession, SaveRequest, SessionState};
pub use store::{InMemoryStore, NoteStore, StoreError};
