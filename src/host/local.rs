//! NM-022: Terminal host — shell-template commands, stdin prompts, editor launch.

use super::{shell, CommandHost, Cursor, Editor, PromptRequest, Prompter};
use crate::core::types::{yaml_value_to_string, Args};
use async_trait::async_trait;
use indexmap::IndexMap;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Resolve `{{key}}` placeholders in a command template from the call's args.
///
/// Unknown keys render empty; an unclosed `{{` is an error.
pub fn render_command(template: &str, args: Option<&Args>) -> Result<String, String> {
    let mut result = template.to_string();
    let mut start = 0;

    while let Some(open) = result[start..].find("{{") {
        let open = start + open;
        let close = result[open..]
            .find("}}")
            .ok_or_else(|| format!("unclosed template at position {}", open))?;
        let close = open + close + 2;
        let key = result[open + 2..close - 2].trim();

        let value = args
            .and_then(|a| a.get(key))
            .map(yaml_value_to_string)
            .unwrap_or_default();

        result.replace_range(open..close, &value);
        start = open + value.len();
    }

    Ok(result)
}

/// Host commands backed by the config's `commands` shell templates.
pub struct LocalHost {
    commands: IndexMap<String, String>,
    workspace: PathBuf,
}

impl LocalHost {
    pub fn new(commands: IndexMap<String, String>, workspace: impl Into<PathBuf>) -> Self {
        Self {
            commands,
            workspace: workspace.into(),
        }
    }
}

#[async_trait]
impl CommandHost for LocalHost {
    async fn execute(&self, command: &str, args: Option<&Args>) -> Result<(), String> {
        let template = self
            .commands
            .get(command)
            .ok_or_else(|| format!("unknown command: {}", command))?;
        let script = render_command(template, args)?;
        tracing::debug!(command, script = %script, "host command");

        let cwd = Some(self.workspace.as_path()).filter(|dir| dir.is_dir());
        let out = shell::exec_checked(&script, cwd)?;
        if !out.stdout.is_empty() {
            print!("{}", out.stdout);
        }
        Ok(())
    }

    async fn commands(&self) -> Result<Vec<String>, String> {
        Ok(self.commands.keys().cloned().collect())
    }
}

/// Line-oriented prompts. EOF cancels.
pub struct TerminalPrompter {
    input: Mutex<Box<dyn BufRead + Send>>,
    output: Mutex<Box<dyn Write + Send>>,
}

impl TerminalPrompter {
    pub fn new(input: Box<dyn BufRead + Send>, output: Box<dyn Write + Send>) -> Self {
        Self {
            input: Mutex::new(input),
            output: Mutex::new(output),
        }
    }

    /// Read from stdin, write prompts to stderr.
    pub fn stdio() -> Self {
        Self::new(
            Box::new(BufReader::new(std::io::stdin())),
            Box::new(std::io::stderr()),
        )
    }

    /// Next input line without its line ending. `None` at EOF.
    pub fn read_line(&self) -> Option<String> {
        let mut input = self.input.lock().ok()?;
        let mut line = String::new();
        match input.read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim_end_matches(['\n', '\r']).to_string()),
        }
    }

    fn say(&self, text: &str) {
        if let Ok(mut out) = self.output.lock() {
            let _ = write!(out, "{}", text);
            let _ = out.flush();
        }
    }
}

#[async_trait]
impl Prompter for TerminalPrompter {
    async fn input(&self, request: &PromptRequest) -> Option<String> {
        let label = match request.placeholder {
            Some(ref hint) => format!("{} ({}): ", request.prompt, hint),
            None => format!("{}: ", request.prompt),
        };
        loop {
            self.say(&label);
            let answer = self.read_line()?;
            match request.validate(&answer) {
                Some(message) => self.say(&format!("  {}\n", message)),
                None => return Some(answer),
            }
        }
    }

    async fn pick(&self, title: &str, items: &[String]) -> Option<String> {
        if items.is_empty() {
            return None;
        }
        let mut listing = format!("{}\n", title);
        for (i, item) in items.iter().enumerate() {
            listing.push_str(&format!("  {:>3}) {}\n", i + 1, item));
        }
        listing.push_str("> ");
        self.say(&listing);

        let answer = self.read_line()?;
        let answer = answer.trim();
        if let Ok(n) = answer.parse::<usize>() {
            return n.checked_sub(1).and_then(|i| items.get(i)).cloned();
        }
        items.iter().find(|item| item.as_str() == answer).cloned()
    }
}

/// Opens notes in an external editor, or prints their location.
#[derive(Debug, Default, Clone)]
pub struct TerminalEditor {
    pub program: Option<String>,
    pub selection: Option<String>,
    pub clipboard: Option<String>,
    pub active_file: Option<PathBuf>,
}

impl TerminalEditor {
    /// Command line for `program +<line> <path>`; the program may carry flags.
    pub fn command_line(program: &str, path: &Path, cursor: Cursor) -> Vec<String> {
        let mut argv: Vec<String> = program.split_whitespace().map(String::from).collect();
        argv.push(format!("+{}", cursor.line + 1));
        argv.push(path.display().to_string());
        argv
    }
}

#[async_trait]
impl Editor for TerminalEditor {
    async fn show(&self, path: &Path, cursor: Cursor) -> Result<(), String> {
        let Some(program) = self.program.as_deref().filter(|p| !p.trim().is_empty()) else {
            println!("{}:{}:{}", path.display(), cursor.line + 1, cursor.column + 1);
            return Ok(());
        };

        let argv = Self::command_line(program, path, cursor);
        let status = std::process::Command::new(&argv[0])
            .args(&argv[1..])
            .status()
            .map_err(|e| format!("failed to launch {}: {}", argv[0], e))?;
        if status.success() {
            Ok(())
        } else {
            Err(format!("{} exited with {}", argv[0], status))
        }
    }

    fn selection(&self) -> Option<String> {
        self.selection.clone()
    }

    fn clipboard(&self) -> Option<String> {
        self.clipboard.clone()
    }

    fn active_file(&self) -> Option<PathBuf> {
        self.active_file.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(pairs: &[(&str, &str)]) -> Args {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), serde_yaml_ng::Value::String(v.to_string())))
            .collect()
    }

    fn prompter(input: &str) -> TerminalPrompter {
        TerminalPrompter::new(
            Box::new(std::io::Cursor::new(input.as_bytes().to_vec())),
            Box::new(std::io::sink()),
        )
    }

    #[test]
    fn test_nm022_render_command() {
        let a = args(&[("file", "a.md"), ("n", "2")]);
        assert_eq!(
            render_command("echo {{file}} {{ n }} [{{missing}}]", Some(&a)).unwrap(),
            "echo a.md 2 []"
        );
        assert_eq!(render_command("echo {{file}}", None).unwrap(), "echo ");
        assert!(render_command("echo {{oops", None).is_err());
    }

    #[test]
    fn test_nm022_render_value_containing_braces() {
        let a = args(&[("x", "{{x}}")]);
        assert_eq!(render_command("{{x}}-{{x}}", Some(&a)).unwrap(), "{{x}}-{{x}}");
    }

    #[tokio::test]
    async fn test_nm022_local_host_runs_template() {
        let ws = tempfile::tempdir().unwrap();
        let mut commands = IndexMap::new();
        commands.insert("touch".to_string(), "touch {{name}}".to_string());
        commands.insert("fail".to_string(), "exit 9".to_string());
        let host = LocalHost::new(commands, ws.path());

        host.execute("touch", Some(&args(&[("name", "made.txt")])))
            .await
            .unwrap();
        assert!(ws.path().join("made.txt").exists());

        let err = host.execute("fail", None).await.unwrap_err();
        assert!(err.contains("exit code 9"));
        let err = host.execute("nope", None).await.unwrap_err();
        assert!(err.contains("unknown command"));
        assert_eq!(host.commands().await.unwrap(), vec!["touch", "fail"]);
    }

    #[tokio::test]
    async fn test_nm022_input_reprompts_on_blank() {
        let p = prompter("\n   \nMeeting Notes\n");
        let request = PromptRequest::new("Name").require_text();
        assert_eq!(p.input(&request).await.as_deref(), Some("Meeting Notes"));
    }

    #[tokio::test]
    async fn test_nm022_input_eof_cancels() {
        let p = prompter("");
        assert_eq!(p.input(&PromptRequest::new("Name")).await, None);
        let open = prompter("\n");
        assert_eq!(open.input(&PromptRequest::new("Name")).await.as_deref(), Some(""));
    }

    #[tokio::test]
    async fn test_nm022_pick_by_number_or_name() {
        let items = vec!["daily".to_string(), "journal".to_string()];
        assert_eq!(prompter("2\n").pick("Macro", &items).await.as_deref(), Some("journal"));
        assert_eq!(prompter("daily\n").pick("Macro", &items).await.as_deref(), Some("daily"));
        assert_eq!(prompter("9\n").pick("Macro", &items).await, None);
        assert_eq!(prompter("0\n").pick("Macro", &items).await, None);
        assert_eq!(prompter("").pick("Macro", &items).await, None);
        assert_eq!(prompter("1\n").pick("Macro", &[]).await, None);
    }

    #[test]
    fn test_nm022_read_line_sequence() {
        let p = prompter("a\r\nb\n");
        assert_eq!(p.read_line().as_deref(), Some("a"));
        assert_eq!(p.read_line().as_deref(), Some("b"));
        assert_eq!(p.read_line(), None);
    }

    #[test]
    fn test_nm022_editor_command_line() {
        let argv = TerminalEditor::command_line(
            "code --wait",
            Path::new("/ws/n.md"),
            Cursor { line: 4, column: 2 },
        );
        assert_eq!(argv, vec!["code", "--wait", "+5", "/ws/n.md"]);
    }

    #[tokio::test]
    async fn test_nm022_editor_without_program_prints() {
        let editor = TerminalEditor::default();
        editor
            .show(Path::new("/ws/n.md"), Cursor::default())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_nm022_editor_program_failure() {
        let editor = TerminalEditor {
            program: Some("false".into()),
            ..TerminalEditor::default()
        };
        assert!(editor.show(Path::new("x.md"), Cursor::default()).await.is_err());
    }
}
