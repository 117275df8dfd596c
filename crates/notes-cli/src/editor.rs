//! Line-oriented interactive editor driven by the save scheduler.
//!
//! Every plain input line is appended to the document and handed to the
//! scheduler, which decides when to persist it. Lines starting with `:` are
//! commands:
//!
//! - `:title T`  rename the document
//! - `:new`      start a fresh document
//! - `:open ID`  switch to a stored note
//! - `:save`     save right away
//! - `:status`   show save status and document state
//! - `:quit`     save pending edits and exit

use anyhow::Result;
use notes_core::{
    AutosaveConfig, Draft, Note, NoteId, NoteStore, SaveError, SaveOutcome, SaveScheduler,
};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

/// One line of editor input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Append(String),
    Title(String),
    New,
    Open(NoteId),
    Save,
    Status,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    #[error("unknown command ':{0}'")]
    UnknownCommand(String),

    #[error(":{0} needs an argument")]
    MissingArgument(&'static str),

    #[error("'{0}' is not a note id")]
    InvalidId(String),
}

impl Input {
    pub fn parse(line: &str) -> Result<Self, InputError> {
        let Some(command) = line.strip_prefix(':') else {
            return Ok(Input::Append(line.to_string()));
        };

        let (name, arg) = match command.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (command.trim(), ""),
        };

        match name {
            "title" if arg.is_empty() => Err(InputError::MissingArgument("title")),
            "title" => Ok(Input::Title(arg.to_string())),
            "new" => Ok(Input::New),
            "open" if arg.is_empty() => Err(InputError::MissingArgument("open")),
            "open" => arg
                .parse()
                .map(Input::Open)
                .map_err(|_| InputError::InvalidId(arg.to_string())),
            "save" => Ok(Input::Save),
            "status" => Ok(Input::Status),
            "quit" | "q" => Ok(Input::Quit),
            other => Err(InputError::UnknownCommand(other.to_string())),
        }
    }
}

/// Interactive session over one store.
pub struct Editor<S: NoteStore + ?Sized + 'static> {
    store: Arc<S>,
    scheduler: SaveScheduler,
    /// Full document text as last sent to the scheduler
    content: String,
}

impl<S: NoteStore + ?Sized + 'static> Editor<S> {
    /// Start editing `note`, or a new document when `None`.
    ///
    /// `title` renames the document. Autosave is running when this returns.
    pub fn open(
        store: Arc<S>,
        config: AutosaveConfig,
        note: Option<Note>,
        title: Option<String>,
    ) -> Self {
        let default_title = config.default_title.clone();
        let content = note.as_ref().map(|n| n.content.clone()).unwrap_or_default();
        let scheduler = SaveScheduler::spawn(
            Arc::clone(&store),
            config,
            Draft::new(default_title, content.clone()),
        );

        if let Some(note) = note {
            scheduler.load(note);
        }
        if let Some(title) = title {
            scheduler.set_title(title);
        }
        scheduler.start();

        Self {
            store,
            scheduler,
            content,
        }
    }

    /// Process `input` line by line until `:quit` or end of input, then flush
    /// pending edits and stop the scheduler.
    pub async fn run<R, W>(mut self, input: R, mut output: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = input.lines();
        while let Some(line) = lines.next_line().await? {
            match Input::parse(&line) {
                Ok(Input::Quit) => break,
                Ok(input) => {
                    if let Some(message) = self.apply(input).await {
                        output.write_all(message.as_bytes()).await?;
                        output.write_all(b"\n").await?;
                        output.flush().await?;
                    }
                }
                Err(e) => {
                    output.write_all(format!("error: {}\n", e).as_bytes()).await?;
                    output.flush().await?;
                }
            }
        }

        if let Some(message) = self.flush().await {
            output.write_all(message.as_bytes()).await?;
            output.write_all(b"\n").await?;
            output.flush().await?;
        }
        self.scheduler.shutdown().await;
        Ok(())
    }

    /// Apply one input line, returning a message for the user if there is one.
    pub async fn apply(&mut self, input: Input) -> Option<String> {
        match input {
            Input::Append(line) => {
                self.content.push_str(&line);
                self.content.push('\n');
                self.scheduler.on_value_changed(self.content.clone());
                None
            }
            Input::Title(title) => {
                self.scheduler.set_title(title.clone());
                Some(format!("title set to '{}'", title))
            }
            Input::New => {
                let flushed = self.flush().await;
                self.scheduler.new_document();
                self.content.clear();
                Some(join(flushed, "new document".to_string()))
            }
            Input::Open(id) => match self.store.get(id).await {
                Ok(note) => {
                    let flushed = self.flush().await;
                    let message = format!("opened note {} ('{}')", note.id, note.title);
                    self.content = note.content.clone();
                    self.scheduler.load(note);
                    Some(join(flushed, message))
                }
                Err(e) => Some(format!("error: {}", e)),
            },
            Input::Save => Some(describe(self.scheduler.save_now().await)),
            Input::Status => Some(self.status().await),
            Input::Quit => None,
        }
    }

    async fn status(&self) -> String {
        let Some(state) = self.scheduler.session().await else {
            return "save scheduler is not running".to_string();
        };
        let identity = match state.identity {
            Some(id) => format!("note {}", id),
            None => "not saved yet".to_string(),
        };
        let dirty = if state.dirty || state.title_dirty {
            ", unsaved changes"
        } else {
            ""
        };
        format!(
            "{} | '{}' | {} | {} bytes{}",
            self.scheduler.status(),
            state.title,
            identity,
            state.content.len(),
            dirty
        )
    }

    /// Save unsaved edits, including a rename, before the document goes away.
    async fn flush(&self) -> Option<String> {
        let state = self.scheduler.session().await?;
        if !state.dirty && !state.title_dirty {
            return None;
        }
        match self.scheduler.save_now().await {
            Err(e) if e.is_skip() => {
                debug!("Nothing flushed: {}", e);
                None
            }
            result => {
                if let Err(e) = &result {
                    warn!("Failed to save pending edits: {}", e);
                }
                Some(describe(result))
            }
        }
    }
}

fn describe(result: Result<SaveOutcome, SaveError>) -> String {
    match result {
        Ok(SaveOutcome::Saved { note, created: true }) => {
            format!("created note {} ('{}')", note.id, note.title)
        }
        Ok(SaveOutcome::Saved { note, .. }) => format!("saved note {}", note.id),
        Ok(SaveOutcome::Discarded) => "save superseded by a document switch".to_string(),
        Err(e) => format!("error: {}", e),
    }
}

fn join(first: Option<String>, second: String) -> String {
    match first {
        Some(first) => format!("{}\n{}", first, second),
        None => second,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_lines_append() {
        assert_eq!(Input::parse("hello"), Ok(Input::Append("hello".into())));
        assert_eq!(Input::parse(""), Ok(Input::Append(String::new())));
        assert_eq!(
            Input::parse("  :not a command"),
            Ok(Input::Append("  :not a command".into()))
        );
    }

    #[test]
    fn test_commands() {
        assert_eq!(
            Input::parse(":title Weekly plan "),
            Ok(Input::Title("Weekly plan".into()))
        );
        assert_eq!(Input::parse(":new"), Ok(Input::New));
        assert_eq!(Input::parse(":open 12"), Ok(Input::Open(NoteId(12))));
        assert_eq!(Input::parse(":save"), Ok(Input::Save));
        assert_eq!(Input::parse(":status"), Ok(Input::Status));
        assert_eq!(Input::parse(":q"), Ok(Input::Quit));
    }

    #[test]
    fn test_bad_commands() {
        assert_eq!(
            Input::parse(":title"),
            Err(InputError::MissingArgument("title"))
        );
        assert_eq!(
            Input::parse(":open twelve"),
            Err(InputError::InvalidId("twelve".into()))
        );
        assert_eq!(
            Input::parse(":frobnicate"),
            Err(InputError::UnknownCommand("frobnicate".into()))
        );
    }
}
