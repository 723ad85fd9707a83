//! Bounded undo/redo history of task mutations.

use std::collections::VecDeque;

use taskdeck_core::{CreateTaskInput, Task, TaskId, UpdateTaskInput};

/// Upper bound on retained past actions.
pub const MAX_HISTORY: usize = 50;

/// A user-initiated task mutation, with enough state to reverse it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UndoableAction {
    /// A task was created.
    CreateTask {
        /// Task as returned by the repository.
        task: Task,
    },
    /// Task fields were edited.
    UpdateTask {
        /// Edited task.
        task_id: TaskId,
        /// Snapshot taken from the cache before the edit.
        before: Task,
        /// Task as returned by the repository.
        after: Task,
    },
    /// A task and its descendants were removed.
    DeleteTask {
        /// Snapshot of the deleted task.
        task: Task,
        /// Direct children known to the cache at deletion time.
        subtasks: Vec<Task>,
    },
    /// The completion flag was flipped.
    ToggleTask {
        /// Toggled task.
        task_id: TaskId,
        /// Completion state before the toggle.
        before: bool,
        /// Completion state after the toggle.
        after: bool,
    },
}

/// Repository request that replays or reverses an [`UndoableAction`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskIntent {
    /// Create a task from the given input.
    Create(CreateTaskInput),
    /// Apply a partial update.
    Update {
        /// Target task.
        id: TaskId,
        /// Fields to set.
        input: UpdateTaskInput,
    },
    /// Delete a task.
    Delete(TaskId),
    /// Set the completion flag.
    Toggle {
        /// Target task.
        id: TaskId,
        /// Desired completion state.
        is_done: bool,
    },
}

impl UndoableAction {
    /// Task the action was recorded for.
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        match self {
            Self::CreateTask { task } | Self::DeleteTask { task, .. } => task.id,
            Self::UpdateTask { task_id, .. } | Self::ToggleTask { task_id, .. } => *task_id,
        }
    }

    /// Request that reverses the action.
    ///
    /// Undoing a delete recreates only the task itself; the repository
    /// assigns a fresh id and the cascaded subtasks stay gone. Creation
    /// carries no completion flag, so a completed task comes back open.
    #[must_use]
    pub fn inverse(&self) -> TaskIntent {
        match self {
            Self::CreateTask { task } => TaskIntent::Delete(task.id),
            Self::UpdateTask {
                task_id, before, ..
            } => TaskIntent::Update {
                id: *task_id,
                input: UpdateTaskInput::restore(before),
            },
            Self::DeleteTask { task, .. } => TaskIntent::Create(CreateTaskInput::from(task)),
            Self::ToggleTask {
                task_id, before, ..
            } => TaskIntent::Toggle {
                id: *task_id,
                is_done: *before,
            },
        }
    }

    /// Request that re-applies the action.
    #[must_use]
    pub fn forward(&self) -> TaskIntent {
        match self {
            Self::CreateTask { task } => TaskIntent::Create(CreateTaskInput::from(task)),
            Self::UpdateTask { task_id, after, .. } => TaskIntent::Update {
                id: *task_id,
                input: UpdateTaskInput::restore(after),
            },
            Self::DeleteTask { task, .. } => TaskIntent::Delete(task.id),
            Self::ToggleTask { task_id, after, .. } => TaskIntent::Toggle {
                id: *task_id,
                is_done: *after,
            },
        }
    }

    /// Short human-readable label, e.g. `create "Buy groceries"`.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::CreateTask { task } => format!("create \"{}\"", task.title),
            Self::UpdateTask { after, .. } => format!("edit \"{}\"", after.title),
            Self::DeleteTask { task, .. } => format!("delete \"{}\"", task.title),
            Self::ToggleTask { after: true, .. } => "complete task".to_owned(),
            Self::ToggleTask { after: false, .. } => "reopen task".to_owned(),
        }
    }
}

/// Linear undo/redo stacks.
///
/// `past` holds the oldest action at the front; `future` holds the most
/// recently undone action at the front.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndoHistory {
    past: VecDeque<UndoableAction>,
    future: VecDeque<UndoableAction>,
    limit: usize,
}

impl Default for UndoHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl UndoHistory {
    /// Empty history retaining up to [`MAX_HISTORY`] actions.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            past: VecDeque::new(),
            future: VecDeque::new(),
            limit: MAX_HISTORY,
        }
    }

    /// Empty history with a custom cap, clamped to `1..=MAX_HISTORY`.
    #[must_use]
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: limit.clamp(1, MAX_HISTORY),
            ..Self::new()
        }
    }

    /// Maximum number of retained past actions.
    #[must_use]
    pub const fn limit(&self) -> usize {
        self.limit
    }

    /// Record a new action. Clears the redo stack and evicts the oldest
    /// entries beyond the cap.
    pub fn add_action(&mut self, action: UndoableAction) {
        self.past.push_back(action);
        while self.past.len() > self.limit {
            self.past.pop_front();
        }
        self.future.clear();
    }

    /// Move the latest action to the redo stack and return it.
    ///
    /// The caller applies [`UndoableAction::inverse`].
    pub fn undo(&mut self) -> Option<UndoableAction> {
        let action = self.past.pop_back()?;
        self.future.push_front(action.clone());
        Some(action)
    }

    /// Move the next undone action back to the past and return it.
    ///
    /// The caller applies [`UndoableAction::forward`].
    pub fn redo(&mut self) -> Option<UndoableAction> {
        let action = self.future.pop_front()?;
        self.past.push_back(action.clone());
        Some(action)
    }

    /// Returns true when there is something to undo.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    /// Returns true when there is something to redo.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    /// Drop both stacks.
    pub fn clear(&mut self) {
        self.past.clear();
        self.future.clear();
    }

    /// Action the next [`Self::undo`] would return.
    #[must_use]
    pub fn peek_undo(&self) -> Option<&UndoableAction> {
        self.past.back()
    }

    /// Action the next [`Self::redo`] would return.
    #[must_use]
    pub fn peek_redo(&self) -> Option<&UndoableAction> {
        self.future.front()
    }

    /// Number of undoable actions.
    #[must_use]
    pub fn past_len(&self) -> usize {
        self.past.len()
    }

    /// Number of redoable actions.
    #[must_use]
    pub fn future_len(&self) -> usize {
        self.future.len()
    }
}
