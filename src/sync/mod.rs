//! # Remote Replication
//!
//! Keeps list state shared across machines. Three backends implement one
//! capability contract (fetch/publish of named blobs):
//!
//! | Backend | Fetch | Publish |
//! |---------|-------|---------|
//! | [`NoRemote`] | nothing | no-op |
//! | [`GitRemote`] | `git pull` of the work tree | stage, commit, pull, push |
//! | [`GithubRemote`] | contents API read | SHA-guarded contents API write |
//!
//! The [`SyncCoordinator`] sequences fetch-before-read and
//! publish-after-write, and owns the append-only change log. Replication
//! is local-first: a failed publish is reported as degraded sync and the
//! local mutation stands.

mod backend;
mod coordinator;
mod git;
mod github;

use std::path::Path;

use anyhow::{bail, Result};

use crate::storage::{Config, RemoteKind};

pub use backend::{NoRemote, Remote, RemoteError};
pub use coordinator::{SyncCoordinator, SyncReport};
pub use git::{GitError, GitOps, GitRemote, RealGit};
pub use github::GithubRemote;

/// Selects the replication backend for this invocation. Called once at
/// startup; everything downstream goes through the trait object.
pub fn backend_for(config: &Config) -> Result<Box<dyn Remote>> {
    match config.remote.kind {
        RemoteKind::None => Ok(Box::new(NoRemote)),
        RemoteKind::Git => {
            if !is_git_work_tree(&config.root) {
                bail!(
                    "remote kind is 'git' but {} is not inside a git work tree",
                    config.root.display()
                );
            }
            Ok(Box::new(GitRemote::new(
                config.root.clone(),
                config.log_file.clone(),
            )))
        }
        RemoteKind::Github => {
            let Some(repo) = config.remote.repo.clone() else {
                bail!("remote kind is 'github' but remote.repo (owner/name) is not set");
            };
            let Some(token) = config.remote.token.clone() else {
                bail!("remote kind is 'github' but no access token is configured (set TD_GITHUB_TOKEN)");
            };
            Ok(Box::new(GithubRemote::new(
                repo,
                token,
                config.remote.branch.clone(),
            )))
        }
        RemoteKind::Auto => {
            if is_git_work_tree(&config.root) {
                Ok(Box::new(GitRemote::new(
                    config.root.clone(),
                    config.log_file.clone(),
                )))
            } else {
                Ok(Box::new(NoRemote))
            }
        }
    }
}

fn is_git_work_tree(path: &Path) -> bool {
    path.is_dir() && RealGit::new().is_work_tree(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::RemoteConfig;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn config(root: PathBuf, remote: RemoteConfig) -> Config {
        Config {
            root,
            default_list: "todo".to_string(),
            editor: None,
            log_file: "todo.log".to_string(),
            max_tasks: 100,
            remote,
        }
    }

    #[test]
    fn none_kind_selects_no_remote() {
        let dir = TempDir::new().unwrap();
        let remote = RemoteConfig {
            kind: RemoteKind::None,
            ..RemoteConfig::default()
        };
        let backend = backend_for(&config(dir.path().to_path_buf(), remote)).unwrap();
        assert_eq!(backend.name(), "none");
    }

    #[test]
    fn github_kind_requires_repo_and_token() {
        let dir = TempDir::new().unwrap();

        let missing_repo = RemoteConfig {
            kind: RemoteKind::Github,
            ..RemoteConfig::default()
        };
        assert!(backend_for(&config(dir.path().to_path_buf(), missing_repo)).is_err());

        let missing_token = RemoteConfig {
            kind: RemoteKind::Github,
            repo: Some("alice/todo".to_string()),
            ..RemoteConfig::default()
        };
        assert!(backend_for(&config(dir.path().to_path_buf(), missing_token)).is_err());

        let complete = RemoteConfig {
            kind: RemoteKind::Github,
            repo: Some("alice/todo".to_string()),
            token: Some("secret".to_string()),
            ..RemoteConfig::default()
        };
        let backend = backend_for(&config(dir.path().to_path_buf(), complete)).unwrap();
        assert_eq!(backend.name(), "github");
    }
}
