//! NM-001: Configuration schema and the macro action model.
//!
//! Defines the YAML schema for `notemacros.yaml`, the per-step `Action`
//! variants, injections, note descriptors, and the run report.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Command prefix used when the config does not name one.
pub const DEFAULT_NAMESPACE: &str = "note-macros";

/// Names that collide with the settings accessors of editor hosts.
pub const RESERVED_NAMES: [&str; 4] = ["has", "get", "update", "inspect"];

/// Arguments handed to a host command.
pub type Args = IndexMap<String, serde_yaml_ng::Value>;

// ============================================================================
// Top-level notemacros.yaml
// ============================================================================

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteMacroConfig {
    /// Prefix of every registered macro command
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Workspace root (relative paths resolve against the config file)
    #[serde(default)]
    pub workspace: Option<String>,

    /// Editor program used to focus notes
    #[serde(default)]
    pub editor: Option<String>,

    /// Host commands of the terminal host: name -> shell template
    #[serde(default)]
    pub commands: IndexMap<String, String>,

    /// Raw macro mapping. Only sequence values are macros.
    #[serde(default)]
    pub macros: IndexMap<String, serde_yaml_ng::Value>,
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

impl Default for NoteMacroConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            workspace: None,
            editor: None,
            commands: IndexMap::new(),
            macros: IndexMap::new(),
        }
    }
}

// ============================================================================
// Macros and actions
// ============================================================================

/// A named, ordered list of actions.
#[derive(Debug, Clone, PartialEq)]
pub struct Macro {
    pub name: String,
    pub actions: Vec<Action>,
}

/// One step of a macro.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Action {
    /// Bare string: a host command invoked without arguments.
    Command(String),
    /// Mapping: any combination of script, shell, command, and note.
    Structured(Box<StructuredAction>),
}

/// A mapping-shaped action. Every part is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredAction {
    /// Action kind marker; `note` requests the note workflow
    #[serde(rename = "type", default)]
    pub action_type: Option<String>,

    /// Host command name
    #[serde(default)]
    pub command: Option<String>,

    /// Host command arguments
    #[serde(default)]
    pub args: Option<Args>,

    /// Inline script; short-circuits the rest of the action
    #[serde(default)]
    pub script: Option<TextBlock>,

    /// Shell text run synchronously, output discarded
    #[serde(default)]
    pub hidden_console: Option<TextBlock>,

    /// Computed substitutions applied to `args` and `hiddenConsole`
    #[serde(default)]
    pub injections: Vec<Injection>,

    /// Note fields live at the top level of the action
    #[serde(flatten)]
    pub note: NoteDescriptor,
}

impl StructuredAction {
    /// True when the action requests the note workflow.
    pub fn is_note(&self) -> bool {
        self.action_type.as_deref() == Some("note")
    }
}

/// A string or a list of lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TextBlock {
    Line(String),
    Lines(Vec<String>),
}

impl TextBlock {
    /// Join into a single newline-separated text.
    pub fn joined(&self) -> String {
        match self {
            Self::Line(s) => s.clone(),
            Self::Lines(lines) => lines.join("\n"),
        }
    }
}

/// Compute a value with `with_result_of`, substitute it for `replace`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Injection {
    #[serde(deserialize_with = "scalar_string")]
    pub with_result_of: String,
    #[serde(deserialize_with = "scalar_string")]
    pub replace: String,
}

/// Note-creation fields of an action.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NoteDescriptor {
    /// Note name; `?`, empty, or absent prompts the user
    #[serde(default, deserialize_with = "optional_scalar_string")]
    pub name: Option<String>,

    /// Directory under the workspace; a `?` inside prompts the user
    #[serde(default, deserialize_with = "optional_scalar_string")]
    pub directory: Option<String>,

    /// File extension including the dot (default `.md`)
    #[serde(default, deserialize_with = "optional_scalar_string")]
    pub extension: Option<String>,

    /// Date pattern (default `yyyy-mm-dd`)
    #[serde(default, deserialize_with = "optional_scalar_string")]
    pub date: Option<String>,

    /// Template file under `.foam/templates`
    #[serde(default, deserialize_with = "optional_scalar_string")]
    pub template: Option<String>,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Command(name) => write!(f, "command {}", name),
            Self::Structured(action) => {
                let mut parts = Vec::new();
                if action.script.is_some() {
                    parts.push("script".to_string());
                }
                if action.hidden_console.is_some() {
                    parts.push("shell".to_string());
                }
                if let Some(ref command) = action.command {
                    parts.push(format!("command {}", command));
                }
                if action.is_note() {
                    parts.push("note".to_string());
                }
                if parts.is_empty() {
                    write!(f, "empty")
                } else {
                    write!(f, "{}", parts.join(" + "))
                }
            }
        }
    }
}

// ============================================================================
// Run result
// ============================================================================

/// Result of executing one macro.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub macro_name: String,
    pub actions_run: u32,
    pub notes_created: Vec<PathBuf>,
    pub notes_opened: Vec<PathBuf>,
    pub total_duration: std::time::Duration,
}

// ============================================================================
// Value helper
// ============================================================================

/// Convert a serde_yaml_ng::Value to a string for template rendering.
pub fn yaml_value_to_string(val: &serde_yaml_ng::Value) -> String {
    match val {
        serde_yaml_ng::Value::String(s) => s.clone(),
        serde_yaml_ng::Value::Number(n) => n.to_string(),
        serde_yaml_ng::Value::Bool(b) => b.to_string(),
        serde_yaml_ng::Value::Null => String::new(),
        other => serde_yaml_ng::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

/// Accept any YAML scalar where a string is expected (`directory: 2024`).
fn scalar_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_yaml_ng::Value::deserialize(deserializer)?;
    match value {
        serde_yaml_ng::Value::Sequence(_) | serde_yaml_ng::Value::Mapping(_) => Err(
            serde::de::Error::custom("expected a string, number, or boolean"),
        ),
        other => Ok(yaml_value_to_string(&other)),
    }
}

fn optional_scalar_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<serde_yaml_ng::Value>::deserialize(deserializer)? {
        None | Some(serde_yaml_ng::Value::Null) => Ok(None),
        Some(value) => scalar_string(value).map(Some).map_err(serde::de::Error::custom),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn action(yaml: &str) -> Action {
        serde_yaml_ng::from_str(yaml).unwrap()
    }

    #[test]
    fn test_nm001_config_parse() {
        let yaml = r#"
namespace: my-macros
workspace: /ws
commands:
  save: "echo saved"
macros:
  daily: [save]
  bogus: 3
"#;
        let config: NoteMacroConfig = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(config.namespace, "my-macros");
        assert_eq!(config.workspace.as_deref(), Some("/ws"));
        assert_eq!(config.commands["save"], "echo saved");
        assert_eq!(config.macros.len(), 2);
        assert!(config.macros["daily"].is_sequence());
    }

    #[test]
    fn test_nm001_config_defaults() {
        let config: NoteMacroConfig = serde_yaml_ng::from_str("{}").unwrap();
        assert_eq!(config.namespace, DEFAULT_NAMESPACE);
        assert!(config.editor.is_none());
        assert!(config.macros.is_empty());
    }

    #[test]
    fn test_nm001_bare_string_is_command() {
        assert_eq!(
            action("workbench.action.files.save"),
            Action::Command("workbench.action.files.save".to_string())
        );
    }

    #[test]
    fn test_nm001_structured_command_with_args() {
        let a = action(
            r#"
command: type
args:
  text: hello
  count: 2
"#,
        );
        let Action::Structured(s) = a else {
            panic!("expected structured action");
        };
        assert_eq!(s.command.as_deref(), Some("type"));
        let args = s.args.unwrap();
        assert_eq!(yaml_value_to_string(&args["text"]), "hello");
        assert_eq!(yaml_value_to_string(&args["count"]), "2");
    }

    #[test]
    fn test_nm001_note_fields_flattened() {
        let a = action(
            r#"
type: note
name: log
directory: journal
template: daily.md
"#,
        );
        let Action::Structured(s) = a else {
            panic!("expected structured action");
        };
        assert!(s.is_note());
        assert_eq!(s.note.name.as_deref(), Some("log"));
        assert_eq!(s.note.directory.as_deref(), Some("journal"));
        assert_eq!(s.note.template.as_deref(), Some("daily.md"));
        assert!(s.note.extension.is_none());
    }

    #[test]
    fn test_nm001_text_block_lines() {
        let a = action(
            r#"
hiddenConsole:
  - echo one
  - echo two
injections:
  - withResultOf: "1+1"
    replace: X
"#,
        );
        let Action::Structured(s) = a else {
            panic!("expected structured action");
        };
        assert_eq!(s.hidden_console.unwrap().joined(), "echo one\necho two");
        assert_eq!(s.injections[0].with_result_of, "1+1");
        assert_eq!(s.injections[0].replace, "X");
    }

    #[test]
    fn test_nm001_numeric_scalars_become_strings() {
        let Action::Structured(s) = action(
            r#"
type: note
name: 42
directory: 2024
extension: .md
injections:
  - withResultOf: 42
    replace: true
"#,
        ) else {
            panic!("expected structured action");
        };
        assert_eq!(s.note.name.as_deref(), Some("42"));
        assert_eq!(s.note.directory.as_deref(), Some("2024"));
        assert_eq!(s.injections[0].with_result_of, "42");
        assert_eq!(s.injections[0].replace, "true");
    }

    #[test]
    fn test_nm001_null_and_nested_note_fields() {
        let Action::Structured(s) = action("type: note\nname: ~\ndirectory: journal") else {
            panic!("expected structured action");
        };
        assert!(s.note.name.is_none());
        let nested: Result<Action, _> = serde_yaml_ng::from_str("type: note\ndirectory: [a, b]");
        assert!(!matches!(nested, Ok(Action::Structured(_))));
    }

    #[test]
    fn test_nm001_non_note_type() {
        let Action::Structured(s) = action("type: other\ncommand: x") else {
            panic!("expected structured action");
        };
        assert!(!s.is_note());
    }

    #[test]
    fn test_nm001_scalar_number_is_not_an_action() {
        let result: Result<Action, _> = serde_yaml_ng::from_str("42");
        assert!(result.is_err());
    }

    #[test]
    fn test_nm001_action_display() {
        assert_eq!(Action::Command("save".into()).to_string(), "command save");
        assert_eq!(action("script: log(1)").to_string(), "script");
        assert_eq!(
            action("hiddenConsole: ls\ncommand: save").to_string(),
            "shell + command save"
        );
        assert_eq!(action("type: note\nname: x").to_string(), "note");
        assert_eq!(action("{}").to_string(), "empty");
    }

    #[test]
    fn test_nm001_yaml_value_to_string() {
        assert_eq!(
            yaml_value_to_string(&serde_yaml_ng::Value::String("hello".into())),
            "hello"
        );
        assert_eq!(yaml_value_to_string(&serde_yaml_ng::Value::Bool(true)), "true");
        assert_eq!(yaml_value_to_string(&serde_yaml_ng::Value::Null), "");
    }
}
