//! Task domain model and line codec
//!
//! A task is a priority plus free text, stored as one `<priority>:<text>`
//! line. Lower priority means more urgent. File order is insertion order;
//! every read path presents tasks through a stable ascending-priority sort.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Failure to interpret a stored line, or to accept new task text.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("malformed task line {line:?}: missing ':' separator")]
    MissingSeparator { line: String },

    #[error("malformed task line {line:?}: invalid priority {value:?}")]
    InvalidPriority { line: String, value: String },

    #[error("malformed task line {line:?}: empty task text")]
    EmptyText { line: String },

    #[error("task text {text:?} contains a line break")]
    EmbeddedNewline { text: String },
}

/// A single unit of work: a priority and free-form text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Task {
    /// Lower is more urgent. Not unique within a list.
    pub priority: u32,

    /// Free text. Never empty, never spans lines. Colons are allowed:
    /// parsing splits on the first separator, so the text round-trips.
    pub text: String,
}

impl Task {
    /// Creates a task from user-supplied text, trimming surrounding
    /// whitespace and rejecting text that cannot live on one line.
    pub fn new(priority: u32, text: impl Into<String>) -> Result<Self, ParseError> {
        let text = text.into();
        if text.contains('\n') || text.contains('\r') {
            return Err(ParseError::EmbeddedNewline { text });
        }
        let text = text.trim().to_string();
        if text.is_empty() {
            return Err(ParseError::EmptyText { line: text });
        }
        Ok(Self { priority, text })
    }

    /// Parses a stored `<priority>:<text>` line.
    ///
    /// Splits on the first `:`. A single space after the separator is
    /// tolerated (older writers emitted it) and surrounding whitespace is
    /// trimmed from both fields.
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let trimmed = line.trim();
        let Some((prefix, rest)) = trimmed.split_once(':') else {
            return Err(ParseError::MissingSeparator {
                line: trimmed.to_string(),
            });
        };

        let priority: u32 = prefix.trim().parse().map_err(|_| ParseError::InvalidPriority {
            line: trimmed.to_string(),
            value: prefix.trim().to_string(),
        })?;

        let text = rest.trim().to_string();
        if text.is_empty() {
            return Err(ParseError::EmptyText {
                line: trimmed.to_string(),
            });
        }

        Ok(Self { priority, text })
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.priority, self.text)
    }
}

/// Returns the original file positions of `tasks` in presentation order:
/// ascending priority, ties keeping insertion order (stable sort).
///
/// Index-based operations resolve through these positions, so two tasks
/// with identical serialized lines are still distinguishable.
pub fn ordered_indices(tasks: &[Task]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..tasks.len()).collect();
    order.sort_by_key(|&i| tasks[i].priority);
    order
}
