//! Main CLI application structure

use std::path::PathBuf;
use std::process::Command;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use super::output::{Output, OutputFormat};
use crate::domain::Task;
use crate::service::ListService;
use crate::storage::{ChangeLog, Config, ListStore};
use crate::sync::{self, SyncCoordinator, SyncReport};

#[derive(Parser)]
#[command(name = "td")]
#[command(author, version, about = "Local-first todo lists with git and GitHub replication")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format
    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Enable verbose output for debugging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Directory holding the list files (overrides configuration)
    #[arg(long, global = true, env = "TD_ROOT")]
    pub root: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Add a task
    Add {
        /// Task text
        text: String,

        /// Priority (lower is more urgent)
        #[arg(long, short = 'p', default_value_t = 4)]
        priority: u32,

        /// List name
        #[arg(long = "list", short = 'f')]
        list: Option<String>,
    },

    /// Show tasks in priority order
    #[command(alias = "ls")]
    List {
        /// List name
        #[arg(long = "list", short = 'f')]
        list: Option<String>,
    },

    /// Show the single most urgent task
    Next {
        /// List name
        #[arg(long = "list", short = 'f')]
        list: Option<String>,
    },

    /// Mark the task at the given position as done
    Mark {
        /// 1-based position in the listed order
        index: usize,

        /// List name
        #[arg(long = "list", short = 'f')]
        list: Option<String>,
    },

    /// Give the task at the given position a new priority
    Tag {
        /// 1-based position in the listed order
        index: usize,

        /// New priority (lower is more urgent)
        #[arg(long, short = 'p', default_value_t = 4)]
        priority: u32,

        /// List name
        #[arg(long = "list", short = 'f')]
        list: Option<String>,
    },

    /// Move a task to another list
    #[command(alias = "mv")]
    Move {
        /// 1-based position in the source list's order
        index: usize,

        /// Source list
        #[arg(long, short = 's')]
        source: Option<String>,

        /// Destination list
        #[arg(long, short = 'd')]
        dest: Option<String>,
    },

    /// Open the list file in the configured editor
    Edit {
        /// List name
        #[arg(long = "list", short = 'f')]
        list: Option<String>,
    },

    /// Show every known list
    ListAll,
}

/// Main entry point for the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(cli.format, cli.verbose);

    let config = Config::load(cli.root)?;
    output.verbose(&format!("root: {}", config.root.display()));

    let remote = sync::backend_for(&config)?;
    output.verbose(&format!("remote backend: {}", remote.name()));

    let store = ListStore::new(&config.root);
    let log = ChangeLog::new(&config.root, config.log_file.clone());
    let service = ListService::new(store, SyncCoordinator::new(remote, log), config.max_tasks);

    let default_list = config.default_list.clone();
    let pick = |list: Option<String>| list.unwrap_or_else(|| default_list.clone());

    match cli.command {
        Commands::Add {
            text,
            priority,
            list,
        } => {
            let list = pick(list);
            let outcome = service.add(&list, &text, priority)?;
            warn_sync(&output, &outcome.sync);

            if output.is_json() {
                output.data(&serde_json::json!({
                    "list": list,
                    "task": outcome.value,
                }));
            } else {
                output.success(&format!(
                    "Task added with priority {}: {}",
                    outcome.value.priority, outcome.value.text
                ));
            }
        }

        Commands::List { list } => {
            let list = pick(list);
            let outcome = service.list(&list)?;
            note_sync(&output, &outcome.sync);
            print_tasks(&output, &outcome.value);
        }

        Commands::Next { list } => {
            let list = pick(list);
            let outcome = service.next(&list)?;
            note_sync(&output, &outcome.sync);

            if output.is_json() {
                output.data(&serde_json::json!({
                    "list": list,
                    "task": outcome.value,
                }));
            } else {
                match outcome.value {
                    Some(task) => println!("{task}"),
                    None => println!("No tasks in To Do."),
                }
            }
        }

        Commands::Mark { index, list } => {
            let list = pick(list);
            let outcome = service.mark_done(&list, index)?;
            warn_sync(&output, &outcome.sync);

            if output.is_json() {
                output.data(&serde_json::json!({
                    "list": list,
                    "done": outcome.value,
                }));
            } else {
                output.success(&format!("Task marked as done: {}", outcome.value));
            }
        }

        Commands::Tag {
            index,
            priority,
            list,
        } => {
            let list = pick(list);
            let outcome = service.tag(&list, index, priority)?;
            warn_sync(&output, &outcome.sync);

            if output.is_json() {
                output.data(&serde_json::json!({
                    "list": list,
                    "task": outcome.value,
                }));
            } else {
                output.success(&format!(
                    "Task tagged with priority {}: {}",
                    outcome.value.priority, outcome.value.text
                ));
            }
        }

        Commands::Move {
            index,
            source,
            dest,
        } => {
            let source = pick(source);
            let dest = pick(dest);
            let outcome = service.move_task(&source, index, &dest)?;
            warn_sync(&output, &outcome.sync);

            if output.is_json() {
                output.data(&serde_json::json!({
                    "task": outcome.value,
                    "from": source,
                    "to": dest,
                }));
            } else {
                output.success(&format!(
                    "Task moved: {} from {} to {}",
                    outcome.value, source, dest
                ));
            }
        }

        Commands::Edit { list } => {
            let list = pick(list);
            let outcome = service.prepare_edit(&list)?;
            note_sync(&output, &outcome.sync);
            open_editor(&config, &outcome.value)?;
        }

        Commands::ListAll => {
            let outcome = service.list_all()?;
            note_sync(&output, &outcome.sync);

            if output.is_json() {
                let lists: Vec<_> = outcome
                    .value
                    .iter()
                    .map(|(name, tasks)| {
                        serde_json::json!({
                            "list": name,
                            "tasks": tasks,
                        })
                    })
                    .collect();
                output.data(&lists);
            } else if outcome.value.is_empty() {
                println!("No todo lists found.");
            } else {
                for (name, tasks) in &outcome.value {
                    println!("{name}:");
                    print_tasks(&output, tasks);
                    output.blank();
                }
            }
        }
    }

    Ok(())
}

/// Lists tasks one per line, numbered by their position in the ordered
/// view. The number is what `mark`, `tag`, and `move` take as index.
fn print_tasks(output: &Output, tasks: &[Task]) {
    if output.is_json() {
        output.data(&tasks);
        return;
    }

    if tasks.is_empty() {
        println!("No tasks in To Do.");
        return;
    }

    for (i, task) in tasks.iter().enumerate() {
        println!("{}: {}", i + 1, task);
    }
}

/// Reports write-path sync degradation as warnings.
fn warn_sync(output: &Output, report: &SyncReport) {
    for warning in &report.warnings {
        output.warn(warning);
    }
}

/// Reports read-path sync degradation in verbose mode only; the read
/// has already proceeded with local state.
fn note_sync(output: &Output, report: &SyncReport) {
    for warning in &report.warnings {
        output.verbose(warning);
    }
}

fn open_editor(config: &Config, path: &std::path::Path) -> Result<()> {
    let editor = config.editor_command();
    let mut parts = editor.split_whitespace();
    let program = parts.next().context("editor command is empty")?;

    let status = Command::new(program)
        .args(parts)
        .arg(path)
        .status()
        .with_context(|| format!("Failed to run editor: {editor}"))?;

    if !status.success() {
        anyhow::bail!("editor exited with {status}");
    }
    Ok(())
}
