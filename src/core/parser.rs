//! NM-002: YAML parsing, macro decoding, and validation.
//!
//! Parses notemacros.yaml and checks:
//! - Macro entries are lists (other values are ignored, not errors)
//! - Macro names avoid the reserved accessor names
//! - Every action decodes
//! - Scripts and injection expressions parse

use super::types::*;
use crate::script;
use indexmap::IndexMap;
use std::path::{Path, PathBuf};

/// Validation error.
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Parse a notemacros.yaml file from disk.
pub fn parse_config_file(path: &Path) -> Result<NoteMacroConfig, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
    parse_config(&content)
}

/// Parse a notemacros.yaml from a string.
pub fn parse_config(yaml: &str) -> Result<NoteMacroConfig, String> {
    serde_yaml_ng::from_str(yaml).map_err(|e| format!("YAML parse error: {}", e))
}

/// Workspace root: the configured one (relative to the config file's
/// directory), or that directory itself.
pub fn workspace_root(config: &NoteMacroConfig, config_path: &Path) -> PathBuf {
    let base = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    match config.workspace.as_deref() {
        Some(ws) => base.join(ws),
        None => base.to_path_buf(),
    }
}

/// Decode the list-valued macro entries.
///
/// Returns the accepted macros plus the problems found on the way: reserved
/// names drop the whole macro, undecodable actions drop only themselves.
pub fn decode_macros(config: &NoteMacroConfig) -> (IndexMap<String, Macro>, Vec<ValidationError>) {
    let mut macros = IndexMap::new();
    let mut errors = Vec::new();

    for (name, value) in &config.macros {
        let Some(items) = value.as_sequence() else {
            continue;
        };
        if RESERVED_NAMES.contains(&name.as_str()) {
            errors.push(ValidationError {
                message: format!("macro '{}' uses a reserved name", name),
            });
            continue;
        }

        let mut actions = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            match serde_yaml_ng::from_value::<Action>(item.clone()) {
                Ok(action) => actions.push(action),
                Err(e) => errors.push(ValidationError {
                    message: format!("macro '{}' action {}: {}", name, index, e),
                }),
            }
        }
        macros.insert(
            name.clone(),
            Macro {
                name: name.clone(),
                actions,
            },
        );
    }

    (macros, errors)
}

/// Validate a parsed config. Returns a list of errors (empty = valid).
pub fn validate_config(config: &NoteMacroConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if config.namespace.trim().is_empty() {
        errors.push(ValidationError {
            message: "namespace must not be empty".to_string(),
        });
    }

    let (macros, decode_errors) = decode_macros(config);
    errors.extend(decode_errors);

    for (name, m) in &macros {
        for (index, action) in m.actions.iter().enumerate() {
            let Action::Structured(action) = action else {
                continue;
            };
            if let Some(ref body) = action.script {
                if let Err(e) = script::check_program(&body.joined()) {
                    errors.push(ValidationError {
                        message: format!("macro '{}' action {}: script: {}", name, index, e),
                    });
                }
            }
            for injection in &action.injections {
                if let Err(e) = script::check_expression(&injection.with_result_of) {
                    errors.push(ValidationError {
                        message: format!(
                            "macro '{}' action {}: injection '{}': {}",
                            name, index, injection.replace, e
                        ),
                    });
                }
                if injection.replace.is_empty() {
                    errors.push(ValidationError {
                        message: format!(
                            "macro '{}' action {}: injection has an empty replace token",
                            name, index
                        ),
                    });
                }
            }
            if action.is_note() {
                if let Some(ref ext) = action.note.extension {
                    if !ext.is_empty() && !ext.starts_with('.') {
                        errors.push(ValidationError {
                            message: format!(
                                "macro '{}' action {}: extension '{}' should start with '.'",
                                name, index, ext
                            ),
                        });
                    }
                }
            }
        }
    }

    errors
}
