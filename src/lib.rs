//! td - local-first todo lists with optional git/GitHub replication
//!
//! Tasks are single `"<priority>:<text>"` lines in flat files, one file
//! per list (`todo_<name>.md`). Every read may pull the configured remote
//! first; every write lands locally and then replicates best-effort.

pub mod domain;
pub mod storage;
pub mod sync;
pub mod service;
pub mod cli;

pub use domain::{ParseError, Task};
pub use service::{ListService, Outcome, ServiceError};
