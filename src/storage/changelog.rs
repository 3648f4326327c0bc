//! Append-only change log
//!
//! One `"<timestamp> - <message>"` line per mutating operation, shared by
//! every list under the root directory. Entries are never rewritten or
//! reordered.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use fs2::FileExt;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// The change log file for a root directory.
pub struct ChangeLog {
    path: PathBuf,
    name: String,
}

impl ChangeLog {
    /// Creates a change log at `<root>/<file_name>`.
    pub fn new(root: impl AsRef<Path>, file_name: impl Into<String>) -> Self {
        let name = file_name.into();
        Self {
            path: root.as_ref().join(&name),
            name,
        }
    }

    /// Returns the log's base file name (its remote blob name).
    pub fn file_name(&self) -> &str {
        &self.name
    }

    /// Returns the log's full path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one timestamped entry.
    pub fn append(&self, message: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open change log: {}", self.path.display()))?;

        file.lock_exclusive()
            .context("Failed to acquire write lock on change log")?;

        let timestamp = Local::now().format(TIMESTAMP_FORMAT);
        writeln!(&file, "{timestamp} - {message}").context("Failed to write change log entry")?;

        Ok(())
    }

    /// Reads the raw log content, for publishing. An absent log reads as
    /// empty.
    pub fn read_raw(&self) -> Result<String> {
        if !self.path.exists() {
            return Ok(String::new());
        }
        std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read change log: {}", self.path.display()))
    }

    /// Returns the log's entries in order.
    pub fn entries(&self) -> Result<Vec<String>> {
        Ok(self
            .read_raw()?
            .lines()
            .map(|line| line.to_string())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn absent_log_reads_empty() {
        let dir = TempDir::new().unwrap();
        let log = ChangeLog::new(dir.path(), "todo.log");

        assert_eq!(log.read_raw().unwrap(), "");
        assert!(log.entries().unwrap().is_empty());
    }

    #[test]
    fn append_is_ordered_and_timestamped() {
        let dir = TempDir::new().unwrap();
        let log = ChangeLog::new(dir.path(), "todo.log");

        log.append("Task added: buy milk").unwrap();
        log.append("Task completed: 2:buy milk").unwrap();

        let entries = log.entries().unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].ends_with("- Task added: buy milk"));
        assert!(entries[1].ends_with("- Task completed: 2:buy milk"));

        // "YYYY-MM-DD HH:MM:SS - " prefix
        let (timestamp, _) = entries[0].split_once(" - ").unwrap();
        assert_eq!(timestamp.len(), 19);
    }

    #[test]
    fn append_creates_parent_directory() {
        let dir = TempDir::new().unwrap();
        let log = ChangeLog::new(dir.path().join("nested"), "todo.log");

        log.append("Created new todo list: 'todo_inbox.md'").unwrap();

        assert!(log.path().is_file());
    }
}
