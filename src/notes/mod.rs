//! NM-030: Note workflow — dated note paths, creation, prompting, focus.
//!
//! A note lives at `<workspace>/<directory|notes>/<date>-<name><ext|.md>`.
//! Existing notes are never overwritten; they are only opened.

pub mod template;

use crate::core::dateformat;
use crate::core::error::{MacroError, Result};
use crate::core::types::NoteDescriptor;
use crate::host::{Cursor, Editor, PromptRequest, Prompter};
use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};

pub const DEFAULT_DIRECTORY: &str = "notes";
pub const DEFAULT_EXTENSION: &str = ".md";
/// Name used when the name prompt is cancelled.
pub const UNTITLED: &str = "Untitled";
/// Directory segment used when the directory prompt is cancelled.
pub const GENERAL: &str = "General";
/// Marks a name or directory segment the user is asked for.
pub const PROMPT_MARKER: &str = "?";

/// Name and directory resolved once per macro run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteTarget {
    pub name: String,
    pub directory: Option<String>,
}

impl NoteTarget {
    /// Overwrite a descriptor's name and directory with the resolved ones.
    pub fn apply_to(&self, note: &mut NoteDescriptor) {
        note.name = Some(self.name.clone());
        note.directory = self.directory.clone();
    }
}

/// Resolve a descriptor's name and directory, prompting where asked.
pub async fn resolve_target(prompter: &dyn Prompter, note: &NoteDescriptor) -> NoteTarget {
    let name = match note.name.as_deref() {
        None | Some("") | Some(PROMPT_MARKER) => prompt_for_name(prompter).await,
        Some(name) => name.to_string(),
    };
    let directory = match note.directory.as_deref() {
        Some(dir) if dir.contains(PROMPT_MARKER) => Some(prompt_for_directory(prompter, dir).await),
        other => other.map(String::from),
    };
    NoteTarget { name, directory }
}

/// Ask for a note name. Cancel or empty input yields `Untitled`.
pub async fn prompt_for_name(prompter: &dyn Prompter) -> String {
    let request = PromptRequest::new("Enter the file name for the new note")
        .with_placeholder("e.g., Meeting Notes")
        .require_text();
    prompter
        .input(&request)
        .await
        .filter(|answer| !answer.is_empty())
        .unwrap_or_else(|| UNTITLED.to_string())
}

/// Ask for a directory segment and put it in place of the first `?`.
pub async fn prompt_for_directory(prompter: &dyn Prompter, template: &str) -> String {
    let request = PromptRequest::new("Enter the subdirectory name for the note")
        .with_placeholder("e.g., Project Alpha")
        .require_text();
    let answer = prompter
        .input(&request)
        .await
        .filter(|answer| !answer.is_empty())
        .unwrap_or_else(|| GENERAL.to_string());
    template.replacen(PROMPT_MARKER, &answer, 1)
}

/// The note's date rendered with its mask.
pub fn formatted_date(note: &NoteDescriptor, now: &NaiveDateTime) -> String {
    let pattern = note.date.as_deref().unwrap_or(dateformat::DEFAULT_PATTERN);
    dateformat::format(now, pattern)
}

/// Directory holding the note.
pub fn note_dir(workspace: &Path, note: &NoteDescriptor) -> PathBuf {
    workspace.join(note.directory.as_deref().unwrap_or(DEFAULT_DIRECTORY))
}

/// `<date>-<name>`, used as the file stem and the default heading.
pub fn title(note: &NoteDescriptor, now: &NaiveDateTime) -> String {
    format!(
        "{}-{}",
        formatted_date(note, now),
        note.name.as_deref().unwrap_or(UNTITLED)
    )
}

/// File name of the note.
pub fn file_name(note: &NoteDescriptor, now: &NaiveDateTime) -> String {
    format!(
        "{}{}",
        title(note, now),
        note.extension.as_deref().unwrap_or(DEFAULT_EXTENSION)
    )
}

/// Full path of the note.
pub fn note_path(workspace: &Path, note: &NoteDescriptor, now: &NaiveDateTime) -> PathBuf {
    note_dir(workspace, note).join(file_name(note, now))
}

/// Initial content: the rendered template, or a `# <title>` heading.
pub fn render_content(workspace: &Path, note: &NoteDescriptor, now: &NaiveDateTime) -> String {
    match note.template.as_deref() {
        Some(name) => {
            let raw = template::load_or_empty(workspace, name);
            template::render(
                &raw,
                &template::Placeholders {
                    title: title(note, now),
                    date: formatted_date(note, now),
                },
            )
        }
        None => format!("# {}", title(note, now)),
    }
}

/// Create the note unless it exists. Returns whether a file was written.
pub fn create_if_not_exists(
    workspace: &Path,
    note: &NoteDescriptor,
    now: &NaiveDateTime,
) -> Result<bool> {
    let path = note_path(workspace, note, now);
    if path.exists() {
        tracing::debug!(path = %path.display(), "note exists");
        return Ok(false);
    }

    let dir = note_dir(workspace, note);
    std::fs::create_dir_all(&dir).map_err(|source| MacroError::FileWrite {
        path: dir.clone(),
        source,
    })?;

    let content = render_content(workspace, note, now);
    std::fs::write(&path, content).map_err(|source| MacroError::FileWrite {
        path: path.clone(),
        source,
    })?;
    tracing::info!(path = %path.display(), "created note");
    Ok(true)
}

/// Position just past the last character of the last line.
///
/// A trailing newline starts an empty final line.
pub fn end_of_document(content: &str) -> Cursor {
    let line = content.matches('\n').count();
    let last = content.rsplit('\n').next().unwrap_or("");
    Cursor {
        line,
        column: last.chars().count(),
    }
}

/// Open the note and put the cursor at its end.
pub async fn focus(editor: &dyn Editor, path: &Path) -> Result<Cursor> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| MacroError::Editor(format!("cannot read {}: {}", path.display(), e)))?;
    let cursor = end_of_document(&content);
    editor
        .show(path, cursor)
        .await
        .map_err(MacroError::Editor)?;
    Ok(cursor)
}
