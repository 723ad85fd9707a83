//! Error types for in-memory store operations.

use taskdeck_core::{CategoryId, TaskId, TitleError};
use thiserror::Error;

/// Errors that can occur during `MemoryStore` operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoryStoreError {
    /// Task was not found in the store.
    #[error("Task not found: {0}")]
    TaskNotFound(TaskId),

    /// Category was not found in the store.
    #[error("Category not found: {0}")]
    CategoryNotFound(CategoryId),

    /// Referenced parent task does not exist.
    #[error("Parent task not found: {0}")]
    ParentNotFound(TaskId),

    /// Re-parenting would make a task its own ancestor.
    #[error("Task {task} cannot be moved under {parent}")]
    ParentCycle {
        /// Task being moved.
        task: TaskId,
        /// Requested parent.
        parent: TaskId,
    },

    /// Title failed validation.
    #[error("Invalid title: {0}")]
    InvalidTitle(#[from] TitleError),

    /// Category name already in use.
    #[error("Category name already exists: {0}")]
    DuplicateCategory(String),
}
