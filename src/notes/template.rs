//! NM-031: Note templates — loading and `{{placeholder}}` rendering.

use crate::core::error::MacroError;
use regex::{Captures, Regex};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Template directory relative to the workspace root.
pub const TEMPLATE_DIR: &str = ".foam/templates";

/// Values available to `{{identifier}}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholders {
    pub title: String,
    pub date: String,
}

impl Placeholders {
    fn get(&self, key: &str) -> &str {
        match key {
            "title" => &self.title,
            "date" => &self.date,
            _ => "",
        }
    }
}

/// Path of a template file inside the workspace.
pub fn template_path(workspace: &Path, template: &str) -> PathBuf {
    workspace.join(TEMPLATE_DIR).join(template)
}

/// Read a template as UTF-8 text.
pub fn load(workspace: &Path, template: &str) -> Result<String, MacroError> {
    let path = template_path(workspace, template);
    std::fs::read_to_string(&path).map_err(|e| MacroError::TemplateRead {
        path,
        message: e.to_string(),
    })
}

/// Read a template, falling back to empty content when it is unreadable.
pub fn load_or_empty(workspace: &Path, template: &str) -> String {
    load(workspace, template).unwrap_or_else(|e| {
        tracing::warn!("{}; using empty content", e);
        String::new()
    })
}

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| {
        Regex::new(r"\{\{([A-Za-z0-9_]+)\}\}").expect("placeholder pattern is valid")
    })
}

/// Replace `{{identifier}}` tokens (ASCII word characters). Unknown identifiers render empty.
pub fn render(template: &str, values: &Placeholders) -> String {
    placeholder_regex()
        .replace_all(template, |caps: &Captures| values.get(&caps[1]).to_string())
        .into_owned()
}
