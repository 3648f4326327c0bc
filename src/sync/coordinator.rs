//! Read/write sequencing between the local store and the remote
//!
//! Reads pull the remote copy first when one is configured; writes apply
//! locally first, append the change log, then publish best-effort.
//! Publication failures degrade the operation instead of rolling it back:
//! local state is authoritative.

use crate::storage::{ChangeLog, ListStore};

use super::backend::Remote;

/// What happened on the remote side of one operation. Warnings mean the
/// operation completed locally but its replication is behind ("degraded
/// sync"); they are reported, never fatal.
#[derive(Debug, Default)]
pub struct SyncReport {
    /// The remote was consulted successfully before a read.
    pub refreshed: bool,

    /// Number of blobs replicated.
    pub published: usize,

    /// Human-readable descriptions of everything that went wrong.
    pub warnings: Vec<String>,
}

impl SyncReport {
    pub fn is_degraded(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Folds another report into this one (operations touching several
    /// lists produce one combined report).
    pub fn merge(&mut self, other: SyncReport) {
        self.refreshed |= other.refreshed;
        self.published += other.published;
        self.warnings.extend(other.warnings);
    }
}

/// Sequences local reads/writes against the remote backend and owns the
/// append-only change log.
pub struct SyncCoordinator {
    remote: Box<dyn Remote>,
    log: ChangeLog,
}

impl SyncCoordinator {
    pub fn new(remote: Box<dyn Remote>, log: ChangeLog) -> Self {
        Self { remote, log }
    }

    /// Backend name for diagnostics.
    pub fn remote_name(&self) -> &'static str {
        self.remote.name()
    }

    /// Read-path sync: make the local copy of `list` current before the
    /// caller reads it. The remote is authoritative for reads; any
    /// failure falls back to whatever local content exists.
    pub fn refresh(&self, store: &ListStore, list: &str) -> SyncReport {
        let mut report = SyncReport::default();
        if !self.remote.is_active() {
            return report;
        }

        let name = ListStore::file_name(list);
        match self.remote.fetch(&name) {
            Ok(Some(content)) => match store.write_raw(list, &content) {
                Ok(()) => report.refreshed = true,
                Err(e) => report
                    .warnings
                    .push(format!("could not install fetched copy of {name}: {e:#}")),
            },
            // Absent remote blob, or a backend that refreshed the file in
            // place. Either way the local copy is what we work with.
            Ok(None) => report.refreshed = true,
            Err(e) => report
                .warnings
                .push(format!("remote fetch failed for {name}: {e}")),
        }

        report
    }

    /// Write-path sync for an already-applied local mutation: append the
    /// change log entry, then publish each touched list and finally the
    /// log itself, each best-effort.
    pub fn record(
        &self,
        store: &ListStore,
        lists: &[&str],
        log_message: &str,
        commit_message: &str,
    ) -> SyncReport {
        let mut report = SyncReport::default();

        if let Err(e) = self.log.append(log_message) {
            report
                .warnings
                .push(format!("change log append failed: {e:#}"));
        }

        if !self.remote.is_active() {
            return report;
        }

        for list in lists {
            let name = ListStore::file_name(list);
            match store.read_raw(list) {
                Ok(content) => match self.remote.publish(&name, &content, commit_message) {
                    Ok(()) => report.published += 1,
                    Err(e) => report
                        .warnings
                        .push(format!("remote publish failed for {name}: {e}")),
                },
                Err(e) => report
                    .warnings
                    .push(format!("could not read {name} for publish: {e:#}")),
            }
        }

        match self.log.read_raw() {
            Ok(content) => {
                match self
                    .remote
                    .publish(self.log.file_name(), &content, commit_message)
                {
                    Ok(()) => report.published += 1,
                    Err(e) => report.warnings.push(format!(
                        "remote publish failed for {}: {e}",
                        self.log.file_name()
                    )),
                }
            }
            Err(e) => report.warnings.push(format!(
                "could not read {} for publish: {e:#}",
                self.log.file_name()
            )),
        }

        report
    }
}
