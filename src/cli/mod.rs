//! NM-040: CLI subcommands — init, validate, list, run, invoke, pick, commands, watch.

use crate::core::registry::{self, ConfigSource, FileSource, MacroRegistry};
use crate::core::types::{NoteMacroConfig, RunReport};
use crate::core::error::MacroError;
use crate::core::{interpreter::Interpreter, parser};
use crate::host::local::{LocalHost, TerminalEditor, TerminalPrompter};
use crate::host::{Capabilities, CommandHost, Prompter};
use clap::{Args, Subcommand};
use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a notemacros.yaml with starter macros
    Init {
        /// Directory to initialize (default: current)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Validate notemacros.yaml without running anything
    Validate {
        /// Path to notemacros.yaml
        #[arg(short, long, default_value = "notemacros.yaml")]
        file: PathBuf,
    },

    /// List registered macro commands
    List {
        /// Path to notemacros.yaml
        #[arg(short, long, default_value = "notemacros.yaml")]
        file: PathBuf,
    },

    /// Run a macro by name
    Run {
        /// Macro name (without namespace)
        name: String,

        #[command(flatten)]
        opts: RunOpts,
    },

    /// Invoke a registered command id (e.g. note-macros.daily)
    Invoke {
        /// Command id
        command_id: String,

        #[command(flatten)]
        opts: RunOpts,
    },

    /// Pick a macro from the list and run it
    Pick {
        #[command(flatten)]
        opts: RunOpts,
    },

    /// List host commands
    #[command(name = "commands")]
    HostCommands {
        /// Pick one of the listed commands and execute it
        #[arg(long)]
        execute: bool,

        #[command(flatten)]
        opts: RunOpts,
    },

    /// Read macro names from stdin and run each, reloading on config change
    Watch {
        #[command(flatten)]
        opts: RunOpts,
    },
}

/// Options shared by every command that runs macros.
#[derive(Args, Debug, Clone)]
pub struct RunOpts {
    /// Path to notemacros.yaml
    #[arg(short, long, default_value = "notemacros.yaml")]
    pub file: PathBuf,

    /// Script variable (repeatable)
    #[arg(long = "var", value_name = "KEY=VALUE")]
    pub vars: Vec<String>,

    /// Text returned by selection()
    #[arg(long)]
    pub selection: Option<String>,

    /// Text returned by clipboard()
    #[arg(long)]
    pub clipboard: Option<String>,

    /// Path returned by file()
    #[arg(long)]
    pub active_file: Option<PathBuf>,
}

/// Dispatch a CLI command.
pub fn dispatch(cmd: Commands) -> Result<(), String> {
    match cmd {
        Commands::Init { path } => cmd_init(&path),
        Commands::Validate { file } => cmd_validate(&file),
        Commands::List { file } => cmd_list(&file),
        Commands::Run { name, opts } => block_on(async {
            let session = Session::open(&opts, TerminalPrompter::stdio())?;
            session.run_macro(&name).await
        }),
        Commands::Invoke { command_id, opts } => block_on(async {
            let session = Session::open(&opts, TerminalPrompter::stdio())?;
            session.invoke(&command_id).await
        }),
        Commands::Pick { opts } => block_on(async {
            let session = Session::open(&opts, TerminalPrompter::stdio())?;
            session.pick_and_run().await
        }),
        Commands::HostCommands { execute, opts } => block_on(async {
            let session = Session::open(&opts, TerminalPrompter::stdio())?;
            session.host_commands(execute).await
        }),
        Commands::Watch { opts } => block_on(async {
            let mut session = Session::open(&opts, TerminalPrompter::stdio())?;
            session.watch().await
        }),
    }
}

fn block_on<F: Future<Output = Result<(), String>>>(fut: F) -> Result<(), String> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("cannot start runtime: {}", e))?
        .block_on(fut)
}

const STARTER_CONFIG: &str = r#"namespace: note-macros

# Host commands: name -> shell template. {{key}} is filled from action args.
commands:
  notify: "echo {{message}}"

macros:
  daily:
    - type: note
      directory: journal
      name: daily
      template: daily.md
  meeting:
    - type: note
      directory: "meetings/?"
      name: "?"
    - command: notify
      args:
        message: "meeting note for TODAY"
      injections:
        - withResultOf: "date('dddd, mmmm dS')"
          replace: TODAY
"#;

const STARTER_TEMPLATE: &str = "# {{title}}\n\n## Notes\n\n## Tasks\n";

fn cmd_init(path: &Path) -> Result<(), String> {
    let config_path = path.join("notemacros.yaml");
    if config_path.exists() {
        return Err(format!("{} already exists", config_path.display()));
    }

    let template_dir = path.join(crate::notes::template::TEMPLATE_DIR);
    std::fs::create_dir_all(&template_dir)
        .map_err(|e| format!("cannot create template dir: {}", e))?;
    let template_path = template_dir.join("daily.md");
    if !template_path.exists() {
        std::fs::write(&template_path, STARTER_TEMPLATE)
            .map_err(|e| format!("cannot write {}: {}", template_path.display(), e))?;
    }

    std::fs::write(&config_path, STARTER_CONFIG)
        .map_err(|e| format!("cannot write {}: {}", config_path.display(), e))?;

    println!("Initialized note macros at {}", path.display());
    println!("  Created: {}", config_path.display());
    println!("  Created: {}", template_path.display());
    Ok(())
}

fn cmd_validate(file: &Path) -> Result<(), String> {
    let config = parser::parse_config_file(file)?;
    let errors = parser::validate_config(&config);

    if errors.is_empty() {
        let (macros, _) = parser::decode_macros(&config);
        println!(
            "OK: {} ({} macros, {} host commands)",
            config.namespace,
            macros.len(),
            config.commands.len()
        );
        Ok(())
    } else {
        for e in &errors {
            eprintln!("  ERROR: {}", e);
        }
        Err(format!("{} validation error(s)", errors.len()))
    }
}

fn cmd_list(file: &Path) -> Result<(), String> {
    let config = parser::parse_config_file(file)?;
    let (loaded, _) = MacroRegistry::from_config(&config);

    println!("{} ({} macros)", loaded.namespace(), loaded.registrations().len());
    for registration in loaded.registrations() {
        let summary = loaded
            .get(&registration.macro_name)
            .map(|m| {
                m.actions
                    .iter()
                    .map(|a| a.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .unwrap_or_default();
        println!("  {}  [{}]", registration.command_id, summary);
    }
    println!("  {}", registry::RUN_COMMAND);
    println!("  {}", registry::LIST_BUILTIN_COMMAND);
    Ok(())
}

/// Parse `KEY=VALUE` pairs.
fn parse_vars(pairs: &[String]) -> Result<HashMap<String, String>, String> {
    pairs
        .iter()
        .map(|pair| {
            pair.split_once('=')
                .filter(|(key, _)| !key.is_empty())
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .ok_or_else(|| format!("invalid --var '{}': expected KEY=VALUE", pair))
        })
        .collect()
}

fn print_report(report: &RunReport) {
    for path in &report.notes_created {
        println!("  Created: {}", path.display());
    }
    println!(
        "OK: {} ({} actions, {} notes created) in {:.1}s",
        report.macro_name,
        report.actions_run,
        report.notes_created.len(),
        report.total_duration.as_secs_f64()
    );
}

/// Loaded configuration plus the terminal capabilities a run works against.
struct Session {
    source: FileSource,
    registry: MacroRegistry,
    host: LocalHost,
    prompter: TerminalPrompter,
    editor: TerminalEditor,
    workspace: PathBuf,
    vars: HashMap<String, String>,
}

impl Session {
    fn open(opts: &RunOpts, prompter: TerminalPrompter) -> Result<Self, String> {
        let vars = parse_vars(&opts.vars)?;
        let mut source = FileSource::new(&opts.file);
        source.poll_changed();
        let config = source.load()?;

        let editor = TerminalEditor {
            program: None,
            selection: opts.selection.clone(),
            clipboard: opts.clipboard.clone(),
            active_file: opts.active_file.clone(),
        };
        let mut session = Self {
            host: LocalHost::new(Default::default(), "."),
            registry: MacroRegistry::new(),
            workspace: PathBuf::from("."),
            source,
            prompter,
            editor,
            vars,
        };
        session.apply(&config);
        Ok(session)
    }

    /// Swap in a freshly loaded config.
    fn apply(&mut self, config: &NoteMacroConfig) {
        self.workspace = parser::workspace_root(config, self.source.path());
        self.host = LocalHost::new(config.commands.clone(), &self.workspace);
        self.editor.program = config
            .editor
            .clone()
            .or_else(|| std::env::var("EDITOR").ok().filter(|e| !e.trim().is_empty()));
        self.registry.load(config);
    }

    /// Reload when the config file changed. A broken file keeps the old set.
    fn reload_if_changed(&mut self) {
        if !self.source.poll_changed() {
            return;
        }
        match self.source.load() {
            Ok(config) => {
                self.apply(&config);
                eprintln!(
                    "Reloaded {} ({} macros)",
                    self.source.path().display(),
                    self.registry.registrations().len()
                );
            }
            Err(e) => {
                let e = MacroError::Configuration(e);
                tracing::warn!("reload failed, keeping current macros: {}", e);
                eprintln!("error: {}", e);
            }
        }
    }

    fn interpreter(&self) -> Interpreter<'_> {
        Interpreter::new(
            Capabilities {
                host: &self.host,
                prompter: &self.prompter,
                editor: &self.editor,
            },
            &self.workspace,
        )
        .with_vars(self.vars.clone())
    }

    async fn run_macro(&self, name: &str) -> Result<(), String> {
        if self.registry.get(name).is_none() {
            eprintln!("No macro named '{}'; nothing to run.", name);
            return Ok(());
        }
        let report = self
            .interpreter()
            .execute(&self.registry, name)
            .await
            .map_err(|e| e.to_string())?;
        print_report(&report);
        Ok(())
    }

    /// Execute a registered command id or one of the utility commands.
    async fn invoke(&self, command_id: &str) -> Result<(), String> {
        match command_id {
            registry::RUN_COMMAND => self.pick_and_run().await,
            registry::LIST_BUILTIN_COMMAND => self.host_commands(true).await,
            _ => {
                let name = self
                    .registry
                    .resolve_command(command_id)
                    .ok_or_else(|| format!("unknown command: {}", command_id))?;
                self.run_macro(name).await
            }
        }
    }

    async fn pick_and_run(&self) -> Result<(), String> {
        let names = self.registry.macro_names();
        match self.prompter.pick("Select a macro to run", &names).await {
            Some(name) => self.run_macro(&name).await,
            None => Ok(()),
        }
    }

    async fn host_commands(&self, execute: bool) -> Result<(), String> {
        let commands = self.host.commands().await?;
        if !execute {
            for command in &commands {
                println!("{}", command);
            }
            return Ok(());
        }
        match self.prompter.pick("Select a command to run", &commands).await {
            Some(command) => self.host.execute(&command, None).await,
            None => Ok(()),
        }
    }

    /// One macro name or command id per stdin line until EOF.
    async fn watch(&mut self) -> Result<(), String> {
        eprintln!(
            "Watching {} ({} macros). Enter a macro name per line.",
            self.source.path().display(),
            self.registry.registrations().len()
        );
        while let Some(line) = self.prompter.read_line() {
            self.reload_if_changed();
            let entry = line.trim();
            if entry.is_empty() {
                continue;
            }
            let result = if self.registry.resolve_command(entry).is_some()
                || entry == registry::RUN_COMMAND
                || entry == registry::LIST_BUILTIN_COMMAND
            {
                self.invoke(entry).await
            } else {
                self.run_macro(entry).await
            };
            if let Err(e) = result {
                eprintln!("error: {}", e);
            }
        }
        Ok(())
    }
}
