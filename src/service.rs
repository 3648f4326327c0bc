//! Task-level operations over lists
//!
//! Implements add / list / next / mark / tag / move / list-all on top of
//! the local store and the sync coordinator. Indexes are 1-based positions
//! in the priority-ordered view and resolve through original file
//! positions, so duplicate lines are unambiguous.

use std::path::PathBuf;

use thiserror::Error;

use crate::domain::{ordered_indices, ParseError, Task};
use crate::storage::ListStore;
use crate::sync::{SyncCoordinator, SyncReport};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Invalid task number.")]
    InvalidIndex { index: usize, count: usize },

    #[error("Maximum number of tasks ({max}) reached. Please edit your todo list to add more tasks.")]
    CapacityExceeded { max: usize },

    #[error(transparent)]
    Task(#[from] ParseError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// An operation result plus what happened on the remote side.
#[derive(Debug)]
pub struct Outcome<T> {
    pub value: T,
    pub sync: SyncReport,
}

/// The task-level API the CLI talks to.
pub struct ListService {
    store: ListStore,
    sync: SyncCoordinator,
    max_tasks: usize,
}

impl ListService {
    pub fn new(store: ListStore, sync: SyncCoordinator, max_tasks: usize) -> Self {
        Self {
            store,
            sync,
            max_tasks,
        }
    }

    /// Appends a task. Rejects the write entirely when the list already
    /// holds `max_tasks`; the file is left untouched in that case.
    pub fn add(
        &self,
        list: &str,
        text: &str,
        priority: u32,
    ) -> Result<Outcome<Task>, ServiceError> {
        let task = Task::new(priority, text)?;

        let mut report = SyncReport::default();
        if self.store.ensure_exists(list)? {
            report.merge(self.record_created(list));
        }

        let tasks = self.store.read_all(list)?;
        if tasks.len() >= self.max_tasks {
            return Err(ServiceError::CapacityExceeded {
                max: self.max_tasks,
            });
        }

        self.store.append(list, &task)?;
        report.merge(self.sync.record(
            &self.store,
            &[list],
            &format!("Task added: {}", task.text),
            &format!("Add task: {}", task.text),
        ));

        Ok(Outcome {
            value: task,
            sync: report,
        })
    }

    /// Returns the list in priority order, capped to `max_tasks` entries.
    pub fn list(&self, list: &str) -> Result<Outcome<Vec<Task>>, ServiceError> {
        let (tasks, report) = self.load_for_read(list)?;
        let order = ordered_indices(&tasks);

        let mut view: Vec<Task> = order.into_iter().map(|i| tasks[i].clone()).collect();
        view.truncate(self.max_tasks);

        Ok(Outcome {
            value: view,
            sync: report,
        })
    }

    /// Returns the single most urgent task, or `None` for an empty list.
    pub fn next(&self, list: &str) -> Result<Outcome<Option<Task>>, ServiceError> {
        let (tasks, report) = self.load_for_read(list)?;
        let order = ordered_indices(&tasks);

        Ok(Outcome {
            value: order.first().map(|&i| tasks[i].clone()),
            sync: report,
        })
    }

    /// Removes the task at the given position in the priority-ordered
    /// view and returns it.
    pub fn mark_done(&self, list: &str, index: usize) -> Result<Outcome<Task>, ServiceError> {
        let (mut tasks, mut report) = self.load_for_read(list)?;
        let position = resolve_index(&tasks, index)?;

        let done = tasks.remove(position);
        self.store.write_all(list, &tasks)?;

        report.merge(self.sync.record(
            &self.store,
            &[list],
            &format!("Task completed: {done}"),
            &format!("Task completed: {done}"),
        ));

        Ok(Outcome {
            value: done,
            sync: report,
        })
    }

    /// Rewrites the priority of the task at the given position, keeping
    /// its text and file position.
    pub fn tag(
        &self,
        list: &str,
        index: usize,
        priority: u32,
    ) -> Result<Outcome<Task>, ServiceError> {
        let (mut tasks, mut report) = self.load_for_read(list)?;
        let position = resolve_index(&tasks, index)?;

        tasks[position].priority = priority;
        let tagged = tasks[position].clone();
        self.store.write_all(list, &tasks)?;

        report.merge(self.sync.record(
            &self.store,
            &[list],
            &format!("Task tagged with new priority {priority}: {}", tagged.text),
            &format!("Tag task with new priority {priority}: {}", tagged.text),
        ));

        Ok(Outcome {
            value: tagged,
            sync: report,
        })
    }

    /// Moves the task at the given position of `src` to the end of `dst`,
    /// preserving its priority and text verbatim. The two list writes are
    /// independent; there is no cross-list transaction.
    pub fn move_task(
        &self,
        src: &str,
        index: usize,
        dst: &str,
    ) -> Result<Outcome<Task>, ServiceError> {
        let (mut src_tasks, mut report) = self.load_for_read(src)?;
        let (_, dst_report) = self.load_for_read(dst)?;
        report.merge(dst_report);

        let position = resolve_index(&src_tasks, index)?;
        let task = src_tasks.remove(position);

        self.store.write_all(src, &src_tasks)?;
        self.store.append(dst, &task)?;

        report.merge(self.sync.record(
            &self.store,
            &[src, dst],
            &format!("Task moved: '{task}' from '{src}' to '{dst}'"),
            &format!("Move task: '{task}' from '{src}' to '{dst}'"),
        ));

        Ok(Outcome {
            value: task,
            sync: report,
        })
    }

    /// Enumerates every known list and its tasks, each through the normal
    /// read path.
    pub fn list_all(&self) -> Result<Outcome<Vec<(String, Vec<Task>)>>, ServiceError> {
        let names = self.store.list_names()?;

        let mut report = SyncReport::default();
        let mut lists = Vec::with_capacity(names.len());
        for name in names {
            let outcome = self.list(&name)?;
            report.merge(outcome.sync);
            lists.push((name, outcome.value));
        }

        Ok(Outcome {
            value: lists,
            sync: report,
        })
    }

    /// Read-path sync plus lazy creation, then the list file's path, for
    /// handing to an external editor.
    pub fn prepare_edit(&self, list: &str) -> Result<Outcome<PathBuf>, ServiceError> {
        let mut report = self.sync.refresh(&self.store, list);
        if self.store.ensure_exists(list)? {
            report.merge(self.record_created(list));
        }

        Ok(Outcome {
            value: self.store.path_for(list),
            sync: report,
        })
    }

    /// Pulls the remote copy, creates the file when it is new (publishing
    /// the creation), and reads it.
    fn load_for_read(&self, list: &str) -> Result<(Vec<Task>, SyncReport), ServiceError> {
        let mut report = self.sync.refresh(&self.store, list);
        if self.store.ensure_exists(list)? {
            report.merge(self.record_created(list));
        }

        let tasks = self.store.read_all(list)?;
        Ok((tasks, report))
    }

    fn record_created(&self, list: &str) -> SyncReport {
        let file = ListStore::file_name(list);
        self.sync.record(
            &self.store,
            &[list],
            &format!("Created new todo list: '{file}'"),
            &format!("Add new todo list: {file}"),
        )
    }
}

/// Maps a 1-based position in the priority-ordered view to the task's
/// original file position.
fn resolve_index(tasks: &[Task], index: usize) -> Result<usize, ServiceError> {
    let order = ordered_indices(tasks);
    if index == 0 || index > order.len() {
        return Err(ServiceError::InvalidIndex {
            index,
            count: order.len(),
        });
    }
    Ok(order[index - 1])
}
