//! Export a note as a standalone markdown file.

use notes_core::Note;
use notes_core::config::DEFAULT_TITLE;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

/// File name for a note: its title with path separators and other
/// characters most filesystems reject replaced by `-`, plus `.md`.
pub fn file_name(title: &str) -> String {
    let stem: String = title
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '-',
            c if c.is_control() => '-',
            c => c,
        })
        .collect();
    let stem = stem.trim_matches('.');

    if stem.is_empty() {
        format!("{}.md", DEFAULT_TITLE)
    } else {
        format!("{}.md", stem)
    }
}

/// Write the note's content to `<dir>/<title>.md`, replacing any existing file.
pub async fn export_note(note: &Note, dir: &Path) -> std::io::Result<PathBuf> {
    fs::create_dir_all(dir).await?;
    let path = dir.join(file_name(&note.title));
    fs::write(&path, &note.content).await?;
    info!("Exported note {} to {:?}", note.id, path);
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use notes_core::NoteId;
    use tempfile::TempDir;

    #[test]
    fn test_plain_title() {
        assert_eq!(file_name("Shopping list"), "Shopping list.md");
    }

    #[test]
    fn test_separators_replaced() {
        assert_eq!(file_name("a/b\\c: d?"), "a-b-c- d-.md");
        assert_eq!(file_name("../../etc/passwd"), "-..-etc-passwd.md");
    }

    #[test]
    fn test_blank_title_falls_back() {
        assert_eq!(file_name("   "), "untitled.md");
        assert_eq!(file_name(".."), "untitled.md");
    }

    #[tokio::test]
    async fn test_export_writes_content() {
        let temp = TempDir::new().unwrap();
        let now = Utc::now();
        let note = Note {
            id: NoteId(7),
            title: "Ideas".into(),
            content: "# Ideas\n\n- one\n".into(),
            created_at: now,
            updated_at: now,
        };

        let path = export_note(&note, &temp.path().join("out")).await.unwrap();

        assert_eq!(path, temp.path().join("out/Ideas.md"));
        assert_eq!(std::fs::read_to_string(path).unwrap(), note.content);
    }
}
