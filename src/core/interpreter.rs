//! NM-006: Action interpreter — the macro execution loop.
//!
//! Walks a macro's actions in order:
//! bare command → host, script → evaluator, otherwise
//! copy → injections → shell → host command → note.
//! After every action with host-visible effects the loop yields once so work
//! the host queued drains before the next action starts.
//!
//! The first failure aborts the run. Nothing is rolled back.

use super::error::{MacroError, Result};
use super::injection;
use super::registry::MacroRegistry;
use super::types::{Action, Args, NoteDescriptor, RunReport, StructuredAction};
use crate::host::{shell, Capabilities};
use crate::notes::{self, NoteTarget};
use crate::script::{self, Scope};
use chrono::{Local, NaiveDateTime};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Executes macros against a set of host capabilities.
pub struct Interpreter<'a> {
    caps: Capabilities<'a>,
    workspace: PathBuf,
    vars: HashMap<String, String>,
    clock: Option<NaiveDateTime>,
}

/// Per-run state shared by the actions of one macro execution.
struct RunState {
    now: NaiveDateTime,
    note_target: Option<NoteTarget>,
    report: RunReport,
}

impl<'a> Interpreter<'a> {
    pub fn new(caps: Capabilities<'a>, workspace: impl Into<PathBuf>) -> Self {
        Self {
            caps,
            workspace: workspace.into(),
            vars: HashMap::new(),
            clock: None,
        }
    }

    /// Values scripts can read with `var(name)` or as bare identifiers.
    pub fn with_vars(mut self, vars: HashMap<String, String>) -> Self {
        self.vars = vars;
        self
    }

    /// Pin the time used for dates instead of reading the local clock.
    pub fn with_clock(mut self, now: NaiveDateTime) -> Self {
        self.clock = Some(now);
        self
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    /// Execute a macro by name. An unknown name runs nothing.
    pub async fn execute(&self, registry: &MacroRegistry, name: &str) -> Result<RunReport> {
        match registry.get(name) {
            Some(m) => self.run_actions(&m.name, &m.actions).await,
            None => {
                tracing::debug!(macro_name = name, "no such macro; nothing to run");
                Ok(RunReport {
                    macro_name: name.to_string(),
                    ..RunReport::default()
                })
            }
        }
    }

    /// Execute an action list.
    pub async fn run_actions(&self, name: &str, actions: &[Action]) -> Result<RunReport> {
        let start = Instant::now();
        tracing::info!(macro_name = name, actions = actions.len(), "macro started");

        let mut state = RunState {
            now: self.clock.unwrap_or_else(|| Local::now().naive_local()),
            note_target: None,
            report: RunReport {
                macro_name: name.to_string(),
                ..RunReport::default()
            },
        };

        if let Some(note) = first_note(actions) {
            state.note_target = Some(notes::resolve_target(self.caps.prompter, note).await);
        }

        for (index, action) in actions.iter().enumerate() {
            tracing::debug!(macro_name = name, index, action = %action, "running action");
            if let Err(e) = self.run_action(action, &mut state).await {
                tracing::error!(macro_name = name, index, error = %e, "macro aborted");
                return Err(e);
            }
            state.report.actions_run += 1;
        }

        state.report.total_duration = start.elapsed();
        tracing::info!(
            macro_name = name,
            actions_run = state.report.actions_run,
            "macro finished"
        );
        Ok(state.report)
    }

    async fn run_action(&self, action: &Action, state: &mut RunState) -> Result<()> {
        match action {
            Action::Command(command) => {
                self.invoke(command, None).await?;
                self.settle().await;
            }
            Action::Structured(structured) => {
                if let Some(ref body) = structured.script {
                    let scope = self.scope(state.now);
                    script::run(&body.joined(), &scope)
                        .await
                        .map_err(MacroError::ScriptEvaluation)?;
                    self.settle().await;
                    return Ok(());
                }
                self.run_structured(structured, state).await?;
            }
        }
        Ok(())
    }

    async fn run_structured(&self, action: &StructuredAction, state: &mut RunState) -> Result<()> {
        let mut copy = action.clone();
        {
            let scope = self.scope(state.now);
            injection::apply_injections(&mut copy, &scope).await?;
        }

        if let Some(ref console) = copy.hidden_console {
            let text = console.joined();
            if !text.is_empty() {
                self.run_shell(&text)?;
            }
        }

        if let Some(ref command) = copy.command {
            self.invoke(command, copy.args.as_ref()).await?;
        }

        if action.is_note() {
            let mut note: NoteDescriptor = action.note.clone();
            if let Some(ref target) = state.note_target {
                target.apply_to(&mut note);
            }
            let path = notes::note_path(&self.workspace, &note, &state.now);
            if notes::create_if_not_exists(&self.workspace, &note, &state.now)? {
                state.report.notes_created.push(path.clone());
            }
            notes::focus(self.caps.editor, &path).await?;
            state.report.notes_opened.push(path);
            self.settle().await;
        }

        Ok(())
    }

    async fn invoke(&self, command: &str, args: Option<&Args>) -> Result<()> {
        self.caps
            .host
            .execute(command, args)
            .await
            .map_err(|message| MacroError::CommandInvocation {
                command: command.to_string(),
                message,
            })
    }

    fn run_shell(&self, text: &str) -> Result<()> {
        let cwd = Some(self.workspace.as_path()).filter(|dir| dir.is_dir());
        let out = shell::exec_checked(text, cwd).map_err(MacroError::ShellExecution)?;
        tracing::debug!(stdout = %out.stdout.trim_end(), stderr = %out.stderr.trim_end(), "shell finished");
        Ok(())
    }

    /// Yield to the runtime, then let the host drain its own queue.
    async fn settle(&self) {
        tokio::task::yield_now().await;
        self.caps.host.flush().await;
    }

    fn scope(&self, now: NaiveDateTime) -> Scope<'_> {
        Scope {
            caps: self.caps,
            workspace: &self.workspace,
            vars: &self.vars,
            now,
        }
    }
}

/// The first note action's descriptor; it decides prompts for the whole run.
fn first_note(actions: &[Action]) -> Option<&NoteDescriptor> {
    actions.iter().find_map(|action| match action {
        Action::Structured(s) if s.is_note() => Some(&s.note),
        _ => None,
    })
}
