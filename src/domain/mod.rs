//! Core task model and line codec

mod task;

pub use task::{ordered_indices, ParseError, Task};
