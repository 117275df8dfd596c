//! notes: markdown notes on the command line, with autosave while editing.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use notes_core::{NoteId, NoteStore};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::BufReader;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use notes_cli::{Config, Editor, JsonFileStore, export_note};

#[derive(Parser, Debug)]
#[command(name = "notes")]
#[command(about = "Minimal markdown notes with autosave")]
struct Args {
    /// Path to the notes file (overrides NOTES_STORE_PATH)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List notes, newest first
    List {
        #[arg(long)]
        json: bool,
    },
    /// Print a note
    Show {
        id: NoteId,
        #[arg(long)]
        json: bool,
    },
    /// Delete a note
    Delete { id: NoteId },
    /// Write a note to <title>.md
    Export {
        id: NoteId,
        /// Directory to write into
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },
    /// Edit a note interactively; autosaves as you type
    Edit {
        /// Note to open (a new document if omitted)
        #[arg(long)]
        id: Option<NoteId>,
        /// Title for the document
        #[arg(long)]
        title: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Respects RUST_LOG, defaults to info (or debug with --verbose)
    let default_filter = if args.verbose {
        "debug"
    } else {
        "info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let mut config = Config::from_env()?;
    if let Some(store) = args.store {
        config.store_path = store;
    }
    info!("Store path: {}", config.store_path.display());

    let store = Arc::new(
        JsonFileStore::open(&config.store_path)
            .await
            .with_context(|| format!("opening {}", config.store_path.display()))?,
    );

    match args.command {
        Command::List { json } => {
            let notes = store.list().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&notes)?);
            } else if notes.is_empty() {
                println!("No notes yet");
            } else {
                for note in notes {
                    println!(
                        "{:>4}  {}  {}  {}",
                        note.id,
                        note.updated_at.format("%Y-%m-%d %H:%M"),
                        note.title,
                        note.excerpt
                    );
                }
            }
        }
        Command::Show { id, json } => {
            let note = store.get(id).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&note)?);
            } else {
                println!("# {}\n", note.title);
                print!("{}", note.content);
            }
        }
        Command::Delete { id } => {
            store.delete(id).await?;
            println!("Deleted note {}", id);
        }
        Command::Export { id, dir } => {
            let note = store.get(id).await?;
            let path = export_note(&note, &dir)
                .await
                .with_context(|| format!("exporting note {}", id))?;
            println!("{}", path.display());
        }
        Command::Edit { id, title } => {
            let note = match id {
                Some(id) => Some(store.get(id).await?),
                None => None,
            };
            eprintln!("Editing. Type to append, :save, :status, :quit");
            let editor = Editor::open(Arc::clone(&store), config.autosave, note, title);
            editor
                .run(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
                .await?;
        }
    }

    Ok(())
}
