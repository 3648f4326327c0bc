//! Configuration handling
//!
//! Settings live in a TOML file at the platform config directory, with
//! `TD_*` environment overrides resolved once at startup. The rest of the
//! crate receives the resolved [`Config`] and never reads ambient state.

use std::env;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const DEFAULT_LIST: &str = "todo";
const DEFAULT_LOG_FILE: &str = "todo.log";
const DEFAULT_MAX_TASKS: usize = 100;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

/// Which replication backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteKind {
    /// Use git when the root directory is a git work tree, else none.
    #[default]
    Auto,
    None,
    Git,
    Github,
}

impl std::str::FromStr for RemoteKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, ConfigError> {
        match s {
            "auto" => Ok(RemoteKind::Auto),
            "none" => Ok(RemoteKind::None),
            "git" => Ok(RemoteKind::Git),
            "github" => Ok(RemoteKind::Github),
            other => Err(ConfigError::Invalid(format!(
                "unknown remote kind {other:?} (expected auto, none, git, or github)"
            ))),
        }
    }
}

/// Replication settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub kind: RemoteKind,

    /// `owner/name` of the GitHub repository (github kind only).
    pub repo: Option<String>,

    /// Branch the hosted API reads and writes.
    pub branch: String,

    /// Access token. Usually supplied via `TD_GITHUB_TOKEN`/`GITHUB_TOKEN`
    /// rather than stored in the file.
    pub token: Option<String>,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            kind: RemoteKind::Auto,
            repo: None,
            branch: "main".to_string(),
            token: None,
        }
    }
}

/// On-disk form of the config file. Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct FileConfig {
    root: Option<PathBuf>,
    default_list: Option<String>,
    editor: Option<String>,
    log_file: Option<String>,
    max_tasks: Option<usize>,
    remote: RemoteConfig,
}

/// Fully resolved configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the list files and the change log.
    pub root: PathBuf,

    /// List used when a command is given no `-f` flag.
    pub default_list: String,

    /// Editor command for `td edit`.
    pub editor: Option<String>,

    /// Change log file name, relative to `root`.
    pub log_file: String,

    /// Hard cap on tasks per list.
    pub max_tasks: usize,

    pub remote: RemoteConfig,
}

impl Config {
    /// Loads the config file (if any) and applies environment overrides.
    /// `root_override` comes from the CLI flag and wins over everything.
    pub fn load(root_override: Option<PathBuf>) -> Result<Self> {
        let file = Self::read_file()?;
        Self::resolve(file, root_override, |key| {
            env::var(key).ok().filter(|v| !v.is_empty())
        })
    }

    /// Returns the config directory for this tool.
    pub fn config_dir() -> Option<PathBuf> {
        ProjectDirs::from("dev", "td", "td-cli").map(|dirs| dirs.config_dir().to_path_buf())
    }

    fn default_root() -> PathBuf {
        ProjectDirs::from("dev", "td", "td-cli")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    fn read_file() -> Result<FileConfig> {
        let Some(dir) = Self::config_dir() else {
            return Ok(FileConfig::default());
        };

        let path = dir.join("config.toml");
        if !path.exists() {
            return Ok(FileConfig::default());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;

        toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .context("Failed to parse config")
    }

    fn resolve(
        file: FileConfig,
        root_override: Option<PathBuf>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let root = root_override
            .or(file.root)
            .unwrap_or_else(Self::default_root);

        let default_list = env("TD_DEFAULT_LIST")
            .or(file.default_list)
            .unwrap_or_else(|| DEFAULT_LIST.to_string());

        let editor = env("TD_EDITOR").or(file.editor);

        let log_file = env("TD_LOG_FILE")
            .or(file.log_file)
            .unwrap_or_else(|| DEFAULT_LOG_FILE.to_string());

        let max_tasks = match env("TD_MAX_TASKS") {
            Some(raw) => raw.parse().map_err(|_| {
                ConfigError::Invalid(format!("TD_MAX_TASKS is not a number: {raw}"))
            })?,
            None => file.max_tasks.unwrap_or(DEFAULT_MAX_TASKS),
        };

        let mut remote = file.remote;
        if let Some(raw) = env("TD_REMOTE") {
            remote.kind = raw.parse()?;
        }
        if let Some(repo) = env("TD_GITHUB_REPO") {
            remote.repo = Some(repo);
        }
        remote.token = env("TD_GITHUB_TOKEN")
            .or_else(|| env("GITHUB_TOKEN"))
            .or(remote.token);

        Ok(Self {
            root,
            default_list,
            editor,
            log_file,
            max_tasks,
            remote,
        })
    }

    /// Resolves the editor command for `td edit`, falling back to `EDITOR`
    /// and finally `vi`.
    pub fn editor_command(&self) -> String {
        self.editor
            .clone()
            .or_else(|| env::var("EDITOR").ok().filter(|v| !v.is_empty()))
            .unwrap_or_else(|| "vi".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn parse_file_config() {
        let toml = r#"
root = "/tmp/lists"
default_list = "inbox"
max_tasks = 25

[remote]
kind = "github"
repo = "alice/todo"
"#;

        let file: FileConfig = toml::from_str(toml).unwrap();
        let config = Config::resolve(file, None, no_env).unwrap();

        assert_eq!(config.root, PathBuf::from("/tmp/lists"));
        assert_eq!(config.default_list, "inbox");
        assert_eq!(config.max_tasks, 25);
        assert_eq!(config.remote.kind, RemoteKind::Github);
        assert_eq!(config.remote.repo.as_deref(), Some("alice/todo"));
        assert_eq!(config.remote.branch, "main");
    }

    #[test]
    fn defaults_when_nothing_is_configured() {
        let config = Config::resolve(FileConfig::default(), None, no_env).unwrap();

        assert_eq!(config.default_list, "todo");
        assert_eq!(config.log_file, "todo.log");
        assert_eq!(config.max_tasks, 100);
        assert_eq!(config.remote.kind, RemoteKind::Auto);
    }

    #[test]
    fn environment_overrides_file() {
        let file: FileConfig = toml::from_str("default_list = \"inbox\"").unwrap();

        let vars: HashMap<&str, &str> = [
            ("TD_DEFAULT_LIST", "work"),
            ("TD_MAX_TASKS", "3"),
            ("TD_REMOTE", "github"),
            ("TD_GITHUB_REPO", "bob/lists"),
            ("TD_GITHUB_TOKEN", "secret"),
        ]
        .into_iter()
        .collect();

        let config =
            Config::resolve(file, None, |key| vars.get(key).map(|v| v.to_string())).unwrap();

        assert_eq!(config.default_list, "work");
        assert_eq!(config.max_tasks, 3);
        assert_eq!(config.remote.kind, RemoteKind::Github);
        assert_eq!(config.remote.repo.as_deref(), Some("bob/lists"));
        assert_eq!(config.remote.token.as_deref(), Some("secret"));
    }

    #[test]
    fn root_override_wins() {
        let file: FileConfig = toml::from_str("root = \"/tmp/from-file\"").unwrap();
        let config =
            Config::resolve(file, Some(PathBuf::from("/tmp/from-flag")), no_env).unwrap();

        assert_eq!(config.root, PathBuf::from("/tmp/from-flag"));
    }

    #[test]
    fn bad_max_tasks_is_rejected() {
        let result = Config::resolve(FileConfig::default(), None, |key| {
            (key == "TD_MAX_TASKS").then(|| "lots".to_string())
        });
        assert!(result.is_err());
    }

    #[test]
    fn bad_remote_kind_is_rejected() {
        let result = Config::resolve(FileConfig::default(), None, |key| {
            (key == "TD_REMOTE").then(|| "ftp".to_string())
        });
        assert!(result.is_err());
    }
}
