//! notes-cli library: exposes the CLI building blocks for testing.
//!
//! The `notes` binary is a thin layer over these modules.

pub mod config;
pub mod editor;
pub mod export;
pub mod file_store;

pub use config::{Config, ConfigError};
pub use editor::{Editor, Input, InputError};
pub use export::export_note;
pub use file_store::JsonFileStore;
