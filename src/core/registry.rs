//! NM-004: Macro registry — command registration and hot reload.
//!
//! Holds the current macro set and one registered command per macro,
//! addressed as `<namespace>.<macro>`. A reload builds the complete new set
//! before swapping it in, then releases the old registrations, so no stale
//! or duplicate command survives and a failed reload changes nothing.

use super::error::{self, MacroError};
use super::parser::{self, ValidationError};
use super::types::{Macro, NoteMacroConfig};
use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

/// Utility command: pick a macro by name and run it.
pub const RUN_COMMAND: &str = "note-macro.run";

/// Utility command: list host commands, optionally run the chosen one.
pub const LIST_BUILTIN_COMMAND: &str = "note-macro.list-builtin-commands";

/// Where macro configuration comes from.
pub trait ConfigSource {
    fn load(&self) -> Result<NoteMacroConfig, String>;
}

impl ConfigSource for NoteMacroConfig {
    fn load(&self) -> Result<NoteMacroConfig, String> {
        Ok(self.clone())
    }
}

/// A notemacros.yaml on disk. Change detection compares modification times.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    last_seen: Option<SystemTime>,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            last_seen: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True when the file changed since the last call (or on the first call).
    pub fn poll_changed(&mut self) -> bool {
        let modified = std::fs::metadata(&self.path)
            .and_then(|m| m.modified())
            .ok();
        if modified != self.last_seen {
            self.last_seen = modified;
            true
        } else {
            false
        }
    }
}

impl ConfigSource for FileSource {
    fn load(&self) -> Result<NoteMacroConfig, String> {
        parser::parse_config_file(&self.path)
    }
}

/// One registered command bound to a macro.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub command_id: String,
    pub macro_name: String,
}

/// Owner of the current macro mapping and its command registrations.
#[derive(Debug, Default)]
pub struct MacroRegistry {
    namespace: String,
    macros: IndexMap<String, Arc<Macro>>,
    registrations: Vec<Registration>,
    generation: u64,
}

impl MacroRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a config.
    pub fn from_config(config: &NoteMacroConfig) -> (Self, Vec<ValidationError>) {
        let mut registry = Self::new();
        let problems = registry.load(config);
        (registry, problems)
    }

    /// Replace the macro set with the list-valued entries of `config`.
    ///
    /// Malformed entries are skipped; the problems are returned and logged.
    pub fn load(&mut self, config: &NoteMacroConfig) -> Vec<ValidationError> {
        let (decoded, problems) = parser::decode_macros(config);
        for problem in &problems {
            tracing::warn!("skipping configuration entry: {}", problem);
        }

        let namespace = config.namespace.clone();
        let macros: IndexMap<String, Arc<Macro>> = decoded
            .into_iter()
            .map(|(name, m)| (name, Arc::new(m)))
            .collect();
        let registrations: Vec<Registration> = macros
            .keys()
            .map(|name| Registration {
                command_id: format!("{}.{}", namespace, name),
                macro_name: name.clone(),
            })
            .collect();

        self.release();
        self.namespace = namespace;
        self.macros = macros;
        self.registrations = registrations;
        self.generation += 1;
        tracing::info!(
            generation = self.generation,
            macros = self.registrations.len(),
            "registered macros"
        );
        problems
    }

    /// Reload after a configuration change. A source that fails to load
    /// leaves the current registrations untouched.
    pub fn reload(&mut self, source: &dyn ConfigSource) -> error::Result<Vec<ValidationError>> {
        let config = source.load().map_err(MacroError::Configuration)?;
        Ok(self.load(&config))
    }

    /// Release every registration.
    pub fn release(&mut self) {
        for registration in self.registrations.drain(..) {
            tracing::debug!(command = %registration.command_id, "released");
        }
        self.macros.clear();
    }

    /// Snapshot of a macro. Runs keep their snapshot across reloads.
    pub fn get(&self, name: &str) -> Option<Arc<Macro>> {
        self.macros.get(name).cloned()
    }

    /// Macro bound to a registered command id.
    pub fn resolve_command(&self, command_id: &str) -> Option<&str> {
        self.registrations
            .iter()
            .find(|r| r.command_id == command_id)
            .map(|r| r.macro_name.as_str())
    }

    pub fn registrations(&self) -> &[Registration] {
        &self.registrations
    }

    pub fn macro_names(&self) -> Vec<String> {
        self.macros.keys().cloned().collect()
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// How many loads have happened.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::parser::parse_config;
    use crate::core::types::Action;
    use proptest::prelude::*;

    #[test]
    fn test_nm004_registers_namespaced_commands() {
        let config = parse_config("macros:\n  daily: [\"workbench.action.files.save\"]\n").unwrap();
        let (registry, problems) = MacroRegistry::from_config(&config);
        assert!(problems.is_empty());
        assert_eq!(
            registry.registrations(),
            &[Registration {
                command_id: "note-macros.daily".into(),
                macro_name: "daily".into(),
            }]
        );
        assert_eq!(registry.resolve_command("note-macros.daily"), Some("daily"));
        assert_eq!(registry.resolve_command("note-macros.other"), None);
    }

    #[test]
    fn test_nm004_custom_namespace() {
        let config = parse_config("namespace: mine\nmacros:\n  a: [x]\n").unwrap();
        let (registry, _) = MacroRegistry::from_config(&config);
        assert_eq!(registry.namespace(), "mine");
        assert_eq!(registry.resolve_command("mine.a"), Some("a"));
    }

    #[test]
    fn test_nm004_reload_replaces_everything() {
        let first = parse_config("macros:\n  a: [x]\n  b: [y]\n").unwrap();
        let second = parse_config("macros:\n  b: [z]\n  c: [w]\n").unwrap();
        let (mut registry, _) = MacroRegistry::from_config(&first);
        let held = registry.get("b").unwrap();

        registry.reload(&second).unwrap();
        let ids: Vec<_> = registry.registrations().iter().map(|r| r.command_id.as_str()).collect();
        assert_eq!(ids, vec!["note-macros.b", "note-macros.c"]);
        assert!(registry.get("a").is_none());
        assert_eq!(registry.generation(), 2);
        // snapshot taken before the reload is unchanged
        assert_eq!(held.actions, vec![Action::Command("y".into())]);
        assert_eq!(registry.get("b").unwrap().actions, vec![Action::Command("z".into())]);
    }

    #[test]
    fn test_nm004_failed_reload_keeps_registrations() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notemacros.yaml");
        std::fs::write(&path, "macros:\n  a: [x]\n").unwrap();
        let mut source = FileSource::new(&path);
        let mut registry = MacroRegistry::new();
        assert!(source.poll_changed());
        registry.reload(&source).unwrap();

        std::fs::write(&path, "macros: [broken: {{").unwrap();
        assert!(matches!(
            registry.reload(&source),
            Err(MacroError::Configuration(_))
        ));
        assert_eq!(registry.registrations().len(), 1);
        assert_eq!(registry.generation(), 1);
    }

    #[test]
    fn test_nm004_poll_changed_once_per_change() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notemacros.yaml");
        std::fs::write(&path, "macros: {}\n").unwrap();
        let mut source = FileSource::new(&path);
        assert!(source.poll_changed());
        assert!(!source.poll_changed());
    }

    #[test]
    fn test_nm004_release() {
        let config = parse_config("macros:\n  a: [x]\n").unwrap();
        let (mut registry, _) = MacroRegistry::from_config(&config);
        registry.release();
        assert!(registry.registrations().is_empty());
        assert!(registry.get("a").is_none());
    }

    proptest! {
        /// Registered-command count equals the count of list-valued entries.
        #[test]
        fn prop_nm004_count_matches_list_entries(
            entries in proptest::collection::btree_map("mac_[a-z]{2,6}", any::<Option<u8>>(), 0..12)
        ) {
            let mut config = NoteMacroConfig::default();
            let mut lists = 0;
            for (name, value) in &entries {
                let yaml = match value {
                    Some(n) if n % 2 == 0 => {
                        lists += 1;
                        serde_yaml_ng::Value::Sequence(vec![serde_yaml_ng::Value::String("cmd".into())])
                    }
                    Some(n) => serde_yaml_ng::Value::Number((*n as u64).into()),
                    None => serde_yaml_ng::Value::Null,
                };
                config.macros.insert(name.clone(), yaml);
            }
            let (registry, _) = MacroRegistry::from_config(&config);
            prop_assert_eq!(registry.registrations().len(), lists);
        }
    }
}
