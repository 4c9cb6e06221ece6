//! NM-008: Error kinds raised while loading and running macros.

use std::path::PathBuf;
use thiserror::Error;

/// Every failure a macro run can surface.
///
/// All variants except `TemplateRead` abort the current run. Side effects
/// already applied (created files, executed commands) are kept.
#[derive(Error, Debug)]
pub enum MacroError {
    /// Malformed macro entry in the configuration.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A host command failed.
    #[error("command '{command}' failed: {message}")]
    CommandInvocation { command: String, message: String },

    /// An inline script or injection expression failed.
    #[error("script error: {0}")]
    ScriptEvaluation(String),

    /// The shell step could not spawn or exited non-zero.
    #[error("shell error: {0}")]
    ShellExecution(String),

    /// A note template could not be read. Recovered by the note workflow.
    #[error("cannot read template {}: {message}", path.display())]
    TemplateRead { path: PathBuf, message: String },

    /// A note or its directory could not be written.
    #[error("cannot write {}: {source}", path.display())]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The editor could not show a note.
    #[error("editor error: {0}")]
    Editor(String),
}

/// Result alias for macro operations.
pub type Result<T> = std::result::Result<T, MacroError>;
