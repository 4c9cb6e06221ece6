//! NM-020: Host capabilities — command execution, prompting, editor, shell.
//!
//! The engine never talks to a terminal or editor directly. Everything
//! outside the macro loop goes through these traits; `local` implements
//! them for the command line.

pub mod local;
pub mod shell;

#[cfg(test)]
pub(crate) mod testing;

use crate::core::types::Args;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Output from a shell invocation.
#[derive(Debug, Clone)]
pub struct ExecOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Zero-based cursor position inside a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor {
    pub line: usize,
    pub column: usize,
}

/// A free-text input request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptRequest {
    pub prompt: String,
    pub placeholder: Option<String>,
    /// Reject blank answers at the prompt; the prompter keeps asking.
    pub require_text: bool,
}

impl PromptRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            placeholder: None,
            require_text: false,
        }
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    pub fn require_text(mut self) -> Self {
        self.require_text = true;
        self
    }

    /// Validation message for a candidate answer, if it is rejected.
    pub fn validate(&self, answer: &str) -> Option<&'static str> {
        if self.require_text && answer.trim().is_empty() {
            Some("value cannot be empty")
        } else {
            None
        }
    }
}

/// The host's command registry.
#[async_trait]
pub trait CommandHost: Send + Sync {
    /// Execute a command by name.
    async fn execute(&self, command: &str, args: Option<&Args>) -> Result<(), String>;

    /// Names of every command the host provides.
    async fn commands(&self) -> Result<Vec<String>, String>;

    /// Drain work the host queued as a side effect of earlier actions.
    async fn flush(&self) {}
}

/// User input. `None` means the user cancelled.
#[async_trait]
pub trait Prompter: Send + Sync {
    async fn input(&self, request: &PromptRequest) -> Option<String>;

    async fn pick(&self, title: &str, items: &[String]) -> Option<String>;
}

/// Document display and the editor state scripts may read.
#[async_trait]
pub trait Editor: Send + Sync {
    /// Open `path` and place the cursor.
    async fn show(&self, path: &Path, cursor: Cursor) -> Result<(), String>;

    fn selection(&self) -> Option<String> {
        None
    }

    fn clipboard(&self) -> Option<String> {
        None
    }

    fn active_file(&self) -> Option<PathBuf> {
        None
    }
}

/// The capability set a macro run works against.
#[derive(Clone, Copy)]
pub struct Capabilities<'a> {
    pub host: &'a dyn CommandHost,
    pub prompter: &'a dyn Prompter,
    pub editor: &'a dyn Editor,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nm020_exec_output_success() {
        let ok = ExecOutput { exit_code: 0, stdout: "ok".into(), stderr: "".into() };
        assert!(ok.success());
        let fail = ExecOutput { exit_code: 1, stdout: "".into(), stderr: "err".into() };
        assert!(!fail.success());
        let sig = ExecOutput { exit_code: -1, stdout: "".into(), stderr: "".into() };
        assert!(!sig.success());
    }

    #[test]
    fn test_nm020_prompt_validation() {
        let open = PromptRequest::new("Name");
        assert!(open.validate("  ").is_none());
        let strict = PromptRequest::new("Name").require_text();
        assert_eq!(strict.validate(" \t"), Some("value cannot be empty"));
        assert!(strict.validate("Meeting").is_none());
    }

    #[test]
    fn test_nm020_prompt_builder() {
        let request = PromptRequest::new("Dir").with_placeholder("e.g., Project Alpha");
        assert_eq!(request.placeholder.as_deref(), Some("e.g., Project Alpha"));
        assert!(!request.require_text);
    }
}
