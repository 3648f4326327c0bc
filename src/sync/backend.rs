//! Remote replication backends
//!
//! Three backends share one capability contract: fetch a named blob and
//! publish new content with a human-readable change message. Which one is
//! active is decided once at startup; the coordinator never branches on
//! the concrete backend.

use thiserror::Error;

use super::git::GitError;

/// Failure talking to a remote. Always recoverable: local state is
/// authoritative and the operation that triggered the call has either not
/// started (reads) or already completed (writes).
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error(transparent)]
    Git(#[from] GitError),

    #[error("failed to enumerate files for staging: {0}")]
    Staging(String),

    #[error("request to {url} failed")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("api returned {status} for {url}: {body}")]
    Api {
        status: u16,
        url: String,
        body: String,
    },

    #[error("unexpected response from {url}: {detail}")]
    Protocol { url: String, detail: String },

    #[error("version conflict publishing {name}: remote content changed")]
    Conflict { name: String },
}

/// A replication target for list and log blobs, keyed by base file name.
pub trait Remote {
    /// Backend name for diagnostics.
    fn name(&self) -> &'static str;

    /// Returns `false` for the no-op backend, letting the coordinator
    /// skip publish bookkeeping entirely.
    fn is_active(&self) -> bool {
        true
    }

    /// Retrieves the blob's content. `Ok(None)` means the remote holds no
    /// copy yet (a normal first-use condition) or, for backends that sync
    /// the whole working tree in place, that the local file is already
    /// current.
    fn fetch(&self, name: &str) -> Result<Option<String>, RemoteError>;

    /// Replicates the blob. `message` is the human-readable change
    /// description recorded remotely (commit subject or API message).
    fn publish(&self, name: &str, content: &str, message: &str) -> Result<(), RemoteError>;
}

/// Backend used when no remote is configured.
pub struct NoRemote;

impl Remote for NoRemote {
    fn name(&self) -> &'static str {
        "none"
    }

    fn is_active(&self) -> bool {
        false
    }

    fn fetch(&self, _name: &str) -> Result<Option<String>, RemoteError> {
        Ok(None)
    }

    fn publish(&self, _name: &str, _content: &str, _message: &str) -> Result<(), RemoteError> {
        Ok(())
    }
}
