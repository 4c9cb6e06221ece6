//! NM-003: Injection resolution — computed values substituted into actions.
//!
//! Each injection evaluates `withResultOf`, then replaces every literal
//! occurrence of `replace` in the action's string args and shell text.

use super::error::{MacroError, Result};
use super::types::{StructuredAction, TextBlock};
use crate::script::{self, Scope};
use regex::{NoExpand, Regex};

/// Global literal substring replacement.
///
/// The token is escaped before it becomes a pattern, so `a.b` only matches
/// a literal dot. The value is inserted verbatim (no `$1` expansion).
#[derive(Debug, Clone)]
pub struct LiteralReplacer {
    pattern: Option<Regex>,
    value: String,
}

impl LiteralReplacer {
    pub fn new(token: &str, value: impl Into<String>) -> Self {
        let pattern = if token.is_empty() {
            None
        } else {
            Regex::new(&regex::escape(token)).ok()
        };
        Self {
            pattern,
            value: value.into(),
        }
    }

    /// Replace every occurrence of the token in `text`.
    pub fn apply(&self, text: &str) -> String {
        match self.pattern {
            Some(ref re) => re.replace_all(text, NoExpand(&self.value)).into_owned(),
            None => text.to_string(),
        }
    }
}

/// `replace(target, token, value)` in one call.
pub fn replace_literal(target: &str, token: &str, value: &str) -> String {
    LiteralReplacer::new(token, value).apply(target)
}

/// Evaluate an injection expression to its string form.
pub async fn resolve(expression: &str, scope: &Scope<'_>) -> Result<String> {
    script::evaluate(expression, scope)
        .await
        .map_err(|e| MacroError::ScriptEvaluation(format!("in '{}': {}", expression, e)))
}

/// Apply every injection of `action` in order, mutating it in place.
///
/// Callers pass a copy; the configured action is never touched. When any
/// injection exists, list-shaped shell text is joined and newline-terminated.
pub async fn apply_injections(action: &mut StructuredAction, scope: &Scope<'_>) -> Result<()> {
    if action.injections.is_empty() {
        return Ok(());
    }

    if let Some(joined) = action.hidden_console.as_ref().map(TextBlock::joined) {
        action.hidden_console = Some(TextBlock::Line(format!("{}\n", joined)));
    }

    let injections = action.injections.clone();
    for injection in &injections {
        let value = resolve(&injection.with_result_of, scope).await?;
        tracing::debug!(token = %injection.replace, value = %value, "injecting");
        let replacer = LiteralReplacer::new(&injection.replace, value);

        if let Some(ref mut args) = action.args {
            for arg in args.values_mut() {
                if let serde_yaml_ng::Value::String(text) = arg {
                    *text = replacer.apply(text);
                }
            }
        }
        if let Some(TextBlock::Line(ref mut text)) = action.hidden_console {
            *text = replacer.apply(text);
        }
    }

    Ok(())
}
