//! In-memory capabilities that record what a macro run did.

use super::{CommandHost, Cursor, Editor, PromptRequest, Prompter};
use crate::core::types::Args;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Default)]
pub struct RecordingHost {
    pub calls: Mutex<Vec<(String, Option<Args>)>>,
    pub fail_on: Option<String>,
    pub flushes: AtomicUsize,
}

impl RecordingHost {
    pub fn failing_on(command: &str) -> Self {
        Self {
            fail_on: Some(command.to_string()),
            ..Self::default()
        }
    }

    pub fn names(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn args_of(&self, index: usize) -> Option<Args> {
        self.calls.lock().unwrap()[index].1.clone()
    }

    pub fn flush_count(&self) -> usize {
        self.flushes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CommandHost for RecordingHost {
    async fn execute(&self, command: &str, args: Option<&Args>) -> Result<(), String> {
        self.calls
            .lock()
            .unwrap()
            .push((command.to_string(), args.cloned()));
        if self.fail_on.as_deref() == Some(command) {
            return Err(format!("{} exploded", command));
        }
        Ok(())
    }

    async fn commands(&self) -> Result<Vec<String>, String> {
        Ok(vec!["editor.save".to_string(), "editor.close".to_string()])
    }

    async fn flush(&self) {
        self.flushes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Answers prompts from a queue; an exhausted queue cancels.
#[derive(Default)]
pub struct ScriptedPrompter {
    pub answers: Mutex<VecDeque<Option<String>>>,
    pub asked: Mutex<Vec<PromptRequest>>,
}

impl ScriptedPrompter {
    pub fn answering(answers: &[Option<&str>]) -> Self {
        Self {
            answers: Mutex::new(answers.iter().map(|a| a.map(String::from)).collect()),
            asked: Mutex::new(Vec::new()),
        }
    }

    pub fn asked_count(&self) -> usize {
        self.asked.lock().unwrap().len()
    }
}

#[async_trait]
impl Prompter for ScriptedPrompter {
    async fn input(&self, request: &PromptRequest) -> Option<String> {
        self.asked.lock().unwrap().push(request.clone());
        self.answers.lock().unwrap().pop_front().flatten()
    }

    async fn pick(&self, _title: &str, items: &[String]) -> Option<String> {
        let answer = self.answers.lock().unwrap().pop_front().flatten()?;
        items.iter().find(|item| **item == answer).cloned()
    }
}

#[derive(Default)]
pub struct RecordingEditor {
    pub shown: Mutex<Vec<(PathBuf, Cursor)>>,
    pub selection: Option<String>,
    pub clipboard: Option<String>,
}

impl RecordingEditor {
    pub fn shown(&self) -> Vec<(PathBuf, Cursor)> {
        self.shown.lock().unwrap().clone()
    }
}

#[async_trait]
impl Editor for RecordingEditor {
    async fn show(&self, path: &Path, cursor: Cursor) -> Result<(), String> {
        self.shown.lock().unwrap().push((path.to_path_buf(), cursor));
        Ok(())
    }

    fn selection(&self) -> Option<String> {
        self.selection.clone()
    }

    fn clipboard(&self) -> Option<String> {
        self.clipboard.clone()
    }
}
