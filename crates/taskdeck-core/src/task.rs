use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::id::{CategoryId, TaskId};
use crate::priority::Priority;

/// Maximum title length, in characters, after trimming.
pub const MAX_TITLE_CHARS: usize = 500;

/// Task record as returned by the repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Repository-assigned identifier.
    pub id: TaskId,
    /// Non-empty title.
    pub title: String,
    /// Optional free-form description.
    pub description: Option<String>,
    /// Owning category; `None` means uncategorized.
    pub category_id: Option<CategoryId>,
    /// Urgency bucket.
    pub priority: Priority,
    /// Parent task; `None` for top-level tasks.
    pub parent_id: Option<TaskId>,
    /// Completion flag.
    pub is_done: bool,
    /// Sibling order, repository-assigned.
    pub position: i32,
    /// Due date as epoch seconds.
    pub due_date: Option<i64>,
    /// Creation time as epoch seconds.
    pub created_at: i64,
    /// Last modification time as epoch seconds.
    pub updated_at: i64,
    /// Completion time as epoch seconds, set while `is_done` holds.
    pub completed_at: Option<i64>,
}

impl Task {
    /// Returns true when the task has no parent.
    #[must_use]
    pub const fn is_top_level(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Node of the materialized task forest.
///
/// Task fields are flattened next to `subtasks` when serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskTree {
    /// Task stored at this node.
    #[serde(flatten)]
    pub task: Task,
    /// Direct children, i.e. tasks whose `parent_id` is this node's id.
    #[serde(default)]
    pub subtasks: Vec<Self>,
}

impl TaskTree {
    /// Wrap a task as a node without children.
    #[must_use]
    pub const fn leaf(task: Task) -> Self {
        Self {
            task,
            subtasks: Vec::new(),
        }
    }

    /// Identifier of the task at this node.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.task.id
    }

    /// Visit this node and every descendant in pre-order.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Self)) {
        visit(self);
        for child in &self.subtasks {
            child.walk(visit);
        }
    }

    /// Find a node by id within this subtree.
    #[must_use]
    pub fn find(&self, id: TaskId) -> Option<&Self> {
        if self.task.id == id {
            return Some(self);
        }
        self.subtasks.iter().find_map(|child| child.find(id))
    }
}

/// Collect every task id of a forest in pre-order.
#[must_use]
pub fn forest_ids(forest: &[TaskTree]) -> Vec<TaskId> {
    let mut ids = Vec::new();
    for root in forest {
        root.walk(&mut |node| ids.push(node.id()));
    }
    ids
}

/// Title validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TitleError {
    /// Title was empty or whitespace only.
    #[error("Title cannot be empty")]
    Empty,
    /// Title exceeded [`MAX_TITLE_CHARS`].
    #[error("Title is too long (max 500 characters)")]
    TooLong,
}

/// Validate a task title, returning the trimmed text.
///
/// # Errors
/// Returns [`TitleError`] when the trimmed title is empty or too long.
pub fn validate_title(title: &str) -> Result<&str, TitleError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(TitleError::Empty);
    }
    if trimmed.chars().count() > MAX_TITLE_CHARS {
        return Err(TitleError::TooLong);
    }
    Ok(trimmed)
}
