//! Flat-file storage for todo lists
//!
//! Each list lives in `todo_<name>.md` under the root directory, one task
//! per line in insertion order. Full rewrites go through a temp file and
//! an atomic rename; appends are true appends. File locking (`fs2`) keeps
//! concurrent processes from observing torn writes.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fs2::FileExt;

use crate::domain::Task;

/// Store for the list files under one root directory.
pub struct ListStore {
    root: PathBuf,
}

impl ListStore {
    /// Creates a store rooted at the given directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the base file name for a list.
    pub fn file_name(name: &str) -> String {
        format!("todo_{name}.md")
    }

    /// Returns the full path of a list's file.
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(Self::file_name(name))
    }

    /// Creates the list file if absent. Returns `true` when this call
    /// created it, which triggers the initial publish upstream.
    pub fn ensure_exists(&self, name: &str) -> Result<bool> {
        let path = self.path_for(name);
        if path.exists() {
            return Ok(false);
        }

        fs::create_dir_all(&self.root)
            .with_context(|| format!("Failed to create root directory: {}", self.root.display()))?;

        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(_) => Ok(true),
            // Another process won the race; the file exists either way.
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(anyhow::Error::new(e)
                .context(format!("Failed to create list file: {}", path.display()))),
        }
    }

    /// Reads all tasks in file (insertion) order. A missing or empty file
    /// yields an empty list, not an error.
    pub fn read_all(&self, name: &str) -> Result<Vec<Task>> {
        let path = self.path_for(name);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&path)
            .with_context(|| format!("Failed to open list file: {}", path.display()))?;

        file.lock_shared()
            .context("Failed to acquire read lock on list file")?;

        let reader = BufReader::new(&file);
        let mut tasks = Vec::new();

        for (line_num, line) in reader.lines().enumerate() {
            let line = line.with_context(|| format!("Failed to read line {}", line_num + 1))?;

            if line.trim().is_empty() {
                continue;
            }

            let task = Task::parse(&line).with_context(|| {
                format!("{} line {}", path.display(), line_num + 1)
            })?;

            tasks.push(task);
        }

        // Lock is released when file is dropped
        Ok(tasks)
    }

    /// Rewrites the whole list file. This is the only mutation primitive
    /// besides [`ListStore::append`]; there are no line-level edits.
    pub fn write_all(&self, name: &str, tasks: &[Task]) -> Result<()> {
        let mut content = String::new();
        for task in tasks {
            content.push_str(&task.to_string());
            content.push('\n');
        }
        self.write_raw(name, &content)
    }

    /// Appends a single task without rewriting the file.
    pub fn append(&self, name: &str, task: &Task) -> Result<()> {
        let path = self.path_for(name);
        fs::create_dir_all(&self.root)
            .with_context(|| format!("Failed to create root directory: {}", self.root.display()))?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open list file: {}", path.display()))?;

        file.lock_exclusive()
            .context("Failed to acquire write lock on list file")?;

        let mut writer = BufWriter::new(&file);
        writeln!(writer, "{task}").context("Failed to write task")?;
        writer.flush().context("Failed to flush list file")?;

        Ok(())
    }

    /// Reads the file's raw bytes, for publishing to a remote.
    pub fn read_raw(&self, name: &str) -> Result<String> {
        let path = self.path_for(name);
        fs::read_to_string(&path)
            .with_context(|| format!("Failed to read list file: {}", path.display()))
    }

    /// Installs remote content verbatim, replacing whatever is local.
    pub fn write_raw(&self, name: &str, content: &str) -> Result<()> {
        let path = self.path_for(name);
        fs::create_dir_all(&self.root)
            .with_context(|| format!("Failed to create root directory: {}", self.root.display()))?;

        // Write to temp file first
        let temp_path = path.with_extension("md.tmp");

        {
            let file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&temp_path)
                .with_context(|| format!("Failed to create temp file: {}", temp_path.display()))?;

            file.lock_exclusive()
                .context("Failed to acquire write lock on list file")?;

            let mut writer = BufWriter::new(&file);
            writer
                .write_all(content.as_bytes())
                .context("Failed to write list file")?;
            writer.flush().context("Failed to flush list file")?;
        }

        // Atomic rename
        fs::rename(&temp_path, &path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                temp_path.display(),
                path.display()
            )
        })?;

        Ok(())
    }

    /// Enumerates the names of every list under the root, sorted.
    pub fn list_names(&self) -> Result<Vec<String>> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&self.root)
            .with_context(|| format!("Failed to read root directory: {}", self.root.display()))?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.context("Failed to read directory entry")?;
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            if let Some(name) = file_name
                .strip_prefix("todo_")
                .and_then(|n| n.strip_suffix(".md"))
            {
                names.push(name.to_string());
            }
        }

        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn task(priority: u32, text: &str) -> Task {
        Task::new(priority, text).unwrap()
    }

    #[test]
    fn read_missing_list_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = ListStore::new(dir.path());

        assert!(store.read_all("inbox").unwrap().is_empty());
    }

    #[test]
    fn ensure_exists_reports_creation_once() {
        let dir = TempDir::new().unwrap();
        let store = ListStore::new(dir.path());

        assert!(store.ensure_exists("inbox").unwrap());
        assert!(!store.ensure_exists("inbox").unwrap());
        assert!(store.path_for("inbox").is_file());
    }

    #[test]
    fn append_then_read_preserves_file_order() {
        let dir = TempDir::new().unwrap();
        let store = ListStore::new(dir.path());

        store.append("inbox", &task(2, "buy milk")).unwrap();
        store.append("inbox", &task(1, "call bank")).unwrap();

        let tasks = store.read_all("inbox").unwrap();
        assert_eq!(tasks, vec![task(2, "buy milk"), task(1, "call bank")]);
    }

    #[test]
    fn write_all_replaces_content() {
        let dir = TempDir::new().unwrap();
        let store = ListStore::new(dir.path());

        store.append("inbox", &task(2, "stale")).unwrap();
        store.write_all("inbox", &[task(1, "fresh")]).unwrap();

        assert_eq!(store.read_all("inbox").unwrap(), vec![task(1, "fresh")]);
        assert_eq!(store.read_raw("inbox").unwrap(), "1:fresh\n");
    }

    #[test]
    fn write_all_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let store = ListStore::new(dir.path());

        store.write_all("inbox", &[task(1, "a")]).unwrap();

        assert!(!store.path_for("inbox").with_extension("md.tmp").exists());
    }

    #[test]
    fn read_tolerates_blank_lines() {
        let dir = TempDir::new().unwrap();
        let store = ListStore::new(dir.path());

        store.write_raw("inbox", "1:a\n\n2:b\n").unwrap();

        assert_eq!(store.read_all("inbox").unwrap().len(), 2);
    }

    #[test]
    fn read_reports_malformed_line_with_position() {
        let dir = TempDir::new().unwrap();
        let store = ListStore::new(dir.path());

        store.write_raw("inbox", "1:a\nnot a task\n").unwrap();

        let err = store.read_all("inbox").unwrap_err();
        let message = format!("{err:#}");
        assert!(message.contains("line 2"), "unexpected error: {message}");
        assert!(message.contains("missing ':'"), "unexpected error: {message}");
    }

    #[test]
    fn write_raw_installs_remote_content() {
        let dir = TempDir::new().unwrap();
        let store = ListStore::new(dir.path());

        store.append("inbox", &task(9, "local")).unwrap();
        store.write_raw("inbox", "1:remote\n").unwrap();

        assert_eq!(store.read_all("inbox").unwrap(), vec![task(1, "remote")]);
    }

    #[test]
    fn list_names_filters_and_sorts() {
        let dir = TempDir::new().unwrap();
        let store = ListStore::new(dir.path());

        store.ensure_exists("work").unwrap();
        store.ensure_exists("home").unwrap();
        fs::write(dir.path().join("todo.log"), "x\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "x\n").unwrap();

        assert_eq!(store.list_names().unwrap(), vec!["home", "work"]);
    }

    #[test]
    fn list_names_without_root_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = ListStore::new(dir.path().join("missing"));

        assert!(store.list_names().unwrap().is_empty());
    }
}
