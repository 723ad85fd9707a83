use serde::{Deserialize, Serialize};

use crate::id::{CategoryId, TaskId};
use crate::priority::Priority;
use crate::task::Task;

/// Change applied to a nullable field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValuePatch<T> {
    /// Overwrite with the provided value.
    Set(T),
    /// Reset the field to null.
    Clear,
}

impl<T> ValuePatch<T> {
    /// Build a patch that makes the field equal to `value`.
    #[must_use]
    pub fn from_option(value: Option<T>) -> Self {
        value.map_or(Self::Clear, Self::Set)
    }

    /// Resulting field value after the patch.
    #[must_use]
    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Set(value) => Some(value),
            Self::Clear => None,
        }
    }
}

/// Fields accepted when creating a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTaskInput {
    /// Task title; validated upstream.
    pub title: String,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
    /// Optional owning category.
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    /// Urgency bucket.
    pub priority: Priority,
    /// Optional parent task.
    #[serde(default)]
    pub parent_id: Option<TaskId>,
    /// Optional due date as epoch seconds.
    #[serde(default)]
    pub due_date: Option<i64>,
}

impl CreateTaskInput {
    /// Minimal input with only the required fields.
    #[must_use]
    pub fn new(title: impl Into<String>, priority: Priority) -> Self {
        Self {
            title: title.into(),
            description: None,
            category_id: None,
            priority,
            parent_id: None,
            due_date: None,
        }
    }

    /// Attach the task under `parent`.
    #[must_use]
    pub fn with_parent(mut self, parent: TaskId) -> Self {
        self.parent_id = Some(parent);
        self
    }

    /// Attach the task to `category`.
    #[must_use]
    pub fn with_category(mut self, category: CategoryId) -> Self {
        self.category_id = Some(category);
        self
    }

    /// Set the due date (epoch seconds).
    #[must_use]
    pub fn with_due_date(mut self, due_date: i64) -> Self {
        self.due_date = Some(due_date);
        self
    }
}

/// Recreating a task keeps every user-editable field; the repository assigns
/// a fresh id, position, and timestamps.
impl From<&Task> for CreateTaskInput {
    fn from(task: &Task) -> Self {
        Self {
            title: task.title.clone(),
            description: task.description.clone(),
            category_id: task.category_id,
            priority: task.priority,
            parent_id: task.parent_id,
            due_date: task.due_date,
        }
    }
}

/// Partial update: only present fields change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateTaskInput {
    /// New title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Description change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<ValuePatch<String>>,
    /// Category change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<ValuePatch<CategoryId>>,
    /// New priority.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    /// Parent change; presence alone marks a hierarchy edit, even for `Clear`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<ValuePatch<TaskId>>,
    /// New completion flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_done: Option<bool>,
    /// New sibling position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<i32>,
    /// Due date change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<ValuePatch<i64>>,
}

impl UpdateTaskInput {
    /// Patch that only flips the completion flag.
    #[must_use]
    pub fn done(is_done: bool) -> Self {
        Self {
            is_done: Some(is_done),
            ..Self::default()
        }
    }

    /// Patch that reapplies every mutable field of `snapshot`.
    ///
    /// Position is left out: sibling order is owned by the repository and
    /// changes only through reordering.
    #[must_use]
    pub fn restore(snapshot: &Task) -> Self {
        Self {
            title: Some(snapshot.title.clone()),
            description: Some(ValuePatch::from_option(snapshot.description.clone())),
            category_id: Some(ValuePatch::from_option(snapshot.category_id)),
            priority: Some(snapshot.priority),
            parent_id: Some(ValuePatch::from_option(snapshot.parent_id)),
            is_done: Some(snapshot.is_done),
            position: None,
            due_date: Some(ValuePatch::from_option(snapshot.due_date)),
        }
    }

    /// Returns true when the parent link is part of the patch.
    #[must_use]
    pub const fn touches_hierarchy(&self) -> bool {
        self.parent_id.is_some()
    }

    /// Returns true when the patch changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.category_id.is_none()
            && self.priority.is_none()
            && self.parent_id.is_none()
            && self.is_done.is_none()
            && self.position.is_none()
            && self.due_date.is_none()
    }

    /// Apply the field changes to `task`. Timestamps are left to the caller.
    pub fn apply_to(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title.clone_from(title);
        }
        if let Some(patch) = &self.description {
            task.description = patch.clone().into_option();
        }
        if let Some(patch) = &self.category_id {
            task.category_id = patch.clone().into_option();
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(patch) = &self.parent_id {
            task.parent_id = patch.clone().into_option();
        }
        if let Some(is_done) = self.is_done {
            task.is_done = is_done;
        }
        if let Some(position) = self.position {
            task.position = position;
        }
        if let Some(patch) = &self.due_date {
            task.due_date = patch.clone().into_option();
        }
    }
}
