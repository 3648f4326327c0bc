//! Git-backed replication
//!
//! The root directory doubles as a git working tree: fetch is a pull, and
//! publish stages every todo file, commits with the change message, pulls
//! to pick up remote history, then pushes. Git runs as a subprocess behind
//! the [`GitOps`] trait so the sequencing can be tested with a mock.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use thiserror::Error;

#[cfg(test)]
use mockall::automock;

use super::backend::{Remote, RemoteError};

/// Errors from the git subprocess.
#[derive(Debug, Error)]
pub enum GitError {
    #[error("git command failed: {0}")]
    CommandFailed(String),

    #[error("git exited with code {code}: {output}")]
    NonZeroExit { code: i32, output: String },

    #[error("git not installed or not in PATH")]
    GitNotFound,
}

/// Git operations used by [`GitRemote`]. Mocked in tests.
#[cfg_attr(test, automock)]
pub trait GitOps {
    /// Returns true when `path` is inside a git working tree.
    fn is_work_tree(&self, path: &Path) -> bool;

    /// `git status --porcelain`; empty output means a clean tree.
    fn status_porcelain(&self, path: &Path) -> Result<String, GitError>;

    /// Stages the given paths (relative to `path`).
    fn add_files(&self, path: &Path, files: &[String]) -> Result<(), GitError>;

    /// Commits staged changes with the given message.
    fn commit(&self, path: &Path, message: &str) -> Result<(), GitError>;

    fn pull(&self, path: &Path) -> Result<(), GitError>;

    fn push(&self, path: &Path) -> Result<(), GitError>;
}

/// Real implementation shelling out to the git binary.
#[derive(Clone, Copy, Default)]
pub struct RealGit;

impl RealGit {
    pub fn new() -> Self {
        Self
    }

    fn run(&self, path: &Path, args: &[&str]) -> Result<Output, GitError> {
        Command::new("git")
            .args(args)
            .current_dir(path)
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    GitError::GitNotFound
                } else {
                    GitError::CommandFailed(e.to_string())
                }
            })
    }

    fn check(&self, output: Output) -> Result<Output, GitError> {
        if output.status.success() {
            Ok(output)
        } else {
            let code = output.status.code().unwrap_or(-1);
            let stdout = String::from_utf8_lossy(&output.stdout);
            let stderr = String::from_utf8_lossy(&output.stderr);
            let combined = match (stdout.trim().is_empty(), stderr.trim().is_empty()) {
                (false, false) => format!("{}\n{}", stdout.trim(), stderr.trim()),
                (false, true) => stdout.trim().to_string(),
                _ => stderr.trim().to_string(),
            };
            Err(GitError::NonZeroExit {
                code,
                output: combined,
            })
        }
    }
}

impl GitOps for RealGit {
    fn is_work_tree(&self, path: &Path) -> bool {
        self.run(path, &["rev-parse", "--is-inside-work-tree"])
            .map(|output| output.status.success())
            .unwrap_or(false)
    }

    fn status_porcelain(&self, path: &Path) -> Result<String, GitError> {
        let output = self.check(self.run(path, &["status", "--porcelain"])?)?;
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    fn add_files(&self, path: &Path, files: &[String]) -> Result<(), GitError> {
        let mut args = vec!["add", "--"];
        args.extend(files.iter().map(|f| f.as_str()));
        self.check(self.run(path, &args)?)?;
        Ok(())
    }

    fn commit(&self, path: &Path, message: &str) -> Result<(), GitError> {
        self.check(self.run(path, &["commit", "--quiet", "-m", message])?)?;
        Ok(())
    }

    fn pull(&self, path: &Path) -> Result<(), GitError> {
        self.check(self.run(path, &["pull", "--quiet"])?)?;
        Ok(())
    }

    fn push(&self, path: &Path) -> Result<(), GitError> {
        self.check(self.run(path, &["push", "--quiet"])?)?;
        Ok(())
    }
}

/// Replication into the git repository containing the root directory.
pub struct GitRemote<G = RealGit> {
    worktree: PathBuf,
    log_file: String,
    git: G,
}

impl GitRemote<RealGit> {
    pub fn new(worktree: impl Into<PathBuf>, log_file: impl Into<String>) -> Self {
        Self::with_git(worktree, log_file, RealGit::new())
    }
}

impl<G: GitOps> GitRemote<G> {
    pub fn with_git(worktree: impl Into<PathBuf>, log_file: impl Into<String>, git: G) -> Self {
        Self {
            worktree: worktree.into(),
            log_file: log_file.into(),
            git,
        }
    }

    /// Every list and log file under the work tree, by relative name.
    fn tracked_files(&self) -> Result<Vec<String>, RemoteError> {
        let entries = fs::read_dir(&self.worktree)
            .map_err(|e| RemoteError::Staging(format!("{}: {e}", self.worktree.display())))?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| RemoteError::Staging(e.to_string()))?;
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if name.starts_with("todo") || name == self.log_file {
                files.push(name);
            }
        }

        files.sort();
        Ok(files)
    }
}

impl<G: GitOps> Remote for GitRemote<G> {
    fn name(&self) -> &'static str {
        "git"
    }

    /// A pull refreshes the whole working tree in place, so there is
    /// never blob content to hand back.
    fn fetch(&self, _name: &str) -> Result<Option<String>, RemoteError> {
        self.git.pull(&self.worktree)?;
        Ok(None)
    }

    fn publish(&self, _name: &str, _content: &str, message: &str) -> Result<(), RemoteError> {
        let files = self.tracked_files()?;
        if !files.is_empty() {
            self.git.add_files(&self.worktree, &files)?;
        }

        // A clean tree means an earlier publish in this invocation already
        // committed these files; still pull and push so the commit drains.
        let dirty = !self.git.status_porcelain(&self.worktree)?.trim().is_empty();
        if dirty {
            self.git.commit(&self.worktree, message)?;
        }

        self.git.pull(&self.worktree)?;
        self.git.push(&self.worktree)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;
    use mockall::Sequence;
    use tempfile::TempDir;

    fn worktree_with_files(files: &[&str]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for file in files {
            fs::write(dir.path().join(file), "1:x\n").unwrap();
        }
        dir
    }

    #[test]
    fn fetch_pulls_the_worktree() {
        let dir = worktree_with_files(&[]);
        let mut git = MockGitOps::new();
        git.expect_pull().times(1).returning(|_| Ok(()));

        let remote = GitRemote::with_git(dir.path(), "todo.log", git);
        assert!(remote.fetch("todo_work.md").unwrap().is_none());
    }

    #[test]
    fn fetch_failure_is_a_remote_error() {
        let dir = worktree_with_files(&[]);
        let mut git = MockGitOps::new();
        git.expect_pull().returning(|_| {
            Err(GitError::NonZeroExit {
                code: 1,
                output: "no network".to_string(),
            })
        });

        let remote = GitRemote::with_git(dir.path(), "todo.log", git);
        assert!(remote.fetch("todo_work.md").is_err());
    }

    #[test]
    fn publish_stages_commits_pulls_and_pushes_in_order() {
        let dir = worktree_with_files(&["todo_work.md", "todo.log", "README.md"]);
        let mut git = MockGitOps::new();
        let mut seq = Sequence::new();

        git.expect_add_files()
            .withf(|_, files| files.iter().map(String::as_str).eq(["todo.log", "todo_work.md"]))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        git.expect_status_porcelain()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok("M  todo_work.md\n".to_string()));
        git.expect_commit()
            .with(mockall::predicate::always(), eq("Add task: buy milk"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        git.expect_pull()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        git.expect_push()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));

        let remote = GitRemote::with_git(dir.path(), "todo.log", git);
        remote
            .publish("todo_work.md", "1:buy milk\n", "Add task: buy milk")
            .unwrap();
    }

    #[test]
    fn publish_on_clean_tree_skips_the_commit() {
        let dir = worktree_with_files(&["todo_work.md"]);
        let mut git = MockGitOps::new();

        git.expect_add_files().returning(|_, _| Ok(()));
        git.expect_status_porcelain().returning(|_| Ok(String::new()));
        git.expect_commit().times(0);
        git.expect_pull().times(1).returning(|_| Ok(()));
        git.expect_push().times(1).returning(|_| Ok(()));

        let remote = GitRemote::with_git(dir.path(), "todo.log", git);
        remote
            .publish("todo_work.md", "1:buy milk\n", "Add task: buy milk")
            .unwrap();
    }

    #[test]
    fn publish_surfaces_push_failure() {
        let dir = worktree_with_files(&["todo_work.md"]);
        let mut git = MockGitOps::new();

        git.expect_add_files().returning(|_, _| Ok(()));
        git.expect_status_porcelain()
            .returning(|_| Ok("M  todo_work.md\n".to_string()));
        git.expect_commit().returning(|_, _| Ok(()));
        git.expect_pull().returning(|_| Ok(()));
        git.expect_push().returning(|_| {
            Err(GitError::NonZeroExit {
                code: 1,
                output: "rejected".to_string(),
            })
        });

        let remote = GitRemote::with_git(dir.path(), "todo.log", git);
        let err = remote
            .publish("todo_work.md", "1:buy milk\n", "Add task: buy milk")
            .unwrap_err();
        assert!(matches!(err, RemoteError::Git(_)));
    }
}
