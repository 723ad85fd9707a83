//! In-process storage implementation for taskdeck.
//!
//! Mirrors the persistence rules of the production database: sequential ids,
//! per-group sibling positions, cascading deletes, and category nulling.

mod error;

pub use error::MemoryStoreError;

use std::collections::BTreeMap;

use taskdeck_core::{
    Category, CategoryId, CreateCategoryInput, CreateTaskInput, Task, TaskId, TaskTree,
    UpdateCategoryInput, UpdateTaskInput, ValuePatch, build_task_tree, validate_title,
};
use time::OffsetDateTime;
use tracing::{debug, info};

/// Result alias for store operations.
pub type Result<T> = std::result::Result<T, MemoryStoreError>;

const DEFAULT_CATEGORIES: [(&str, &str); 4] = [
    ("Personal", "#9ece6a"),
    ("Tech Guild", "#7aa2f7"),
    ("Work", "#e0af68"),
    ("Other", "#414868"),
];

/// Task and category storage kept entirely in memory.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    tasks: BTreeMap<TaskId, Task>,
    categories: BTreeMap<CategoryId, Category>,
    next_task_id: i64,
    next_category_id: i64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn now() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            tasks: BTreeMap::new(),
            categories: BTreeMap::new(),
            next_task_id: 1,
            next_category_id: 1,
        }
    }

    /// Create a store seeded with the built-in categories.
    #[must_use]
    pub fn with_default_categories() -> Self {
        let mut store = Self::new();
        let ts = now();
        for (name, color) in DEFAULT_CATEGORIES {
            let id = store.allocate_category_id();
            store.categories.insert(
                id,
                Category {
                    id,
                    name: name.to_owned(),
                    color: color.to_owned(),
                    created_at: ts,
                    updated_at: ts,
                },
            );
        }
        store
    }

    const fn allocate_task_id(&mut self) -> TaskId {
        let id = TaskId(self.next_task_id);
        self.next_task_id += 1;
        id
    }

    const fn allocate_category_id(&mut self) -> CategoryId {
        let id = CategoryId(self.next_category_id);
        self.next_category_id += 1;
        id
    }

    fn next_position(&self, parent_id: Option<TaskId>, category_id: Option<CategoryId>) -> i32 {
        self.tasks
            .values()
            .filter(|task| task.parent_id == parent_id && task.category_id == category_id)
            .map(|task| task.position)
            .max()
            .map_or(0, |max| max + 1)
    }

    fn ensure_category(&self, category: Option<CategoryId>) -> Result<()> {
        match category {
            Some(id) if !self.categories.contains_key(&id) => {
                Err(MemoryStoreError::CategoryNotFound(id))
            }
            _ => Ok(()),
        }
    }

    fn ensure_parent(&self, task: Option<TaskId>, parent: TaskId) -> Result<()> {
        if !self.tasks.contains_key(&parent) {
            return Err(MemoryStoreError::ParentNotFound(parent));
        }
        let Some(task) = task else {
            return Ok(());
        };
        // Walk up from the requested parent; meeting `task` means a cycle.
        let mut cursor = Some(parent);
        while let Some(current) = cursor {
            if current == task {
                return Err(MemoryStoreError::ParentCycle { task, parent });
            }
            cursor = self.tasks.get(&current).and_then(|t| t.parent_id);
        }
        Ok(())
    }

    /// Insert a new task at the end of its sibling group.
    ///
    /// # Errors
    /// Returns an error if the title is invalid or the parent/category is unknown.
    pub fn create_task(&mut self, input: CreateTaskInput) -> Result<Task> {
        let title = validate_title(&input.title)?.to_owned();
        self.ensure_category(input.category_id)?;
        if let Some(parent) = input.parent_id {
            self.ensure_parent(None, parent)?;
        }

        let ts = now();
        let task = Task {
            id: self.allocate_task_id(),
            title,
            description: input.description,
            category_id: input.category_id,
            priority: input.priority,
            parent_id: input.parent_id,
            is_done: false,
            position: self.next_position(input.parent_id, input.category_id),
            due_date: input.due_date,
            created_at: ts,
            updated_at: ts,
            completed_at: None,
        };
        info!(task_id = %task.id, position = task.position, "Created task");
        self.tasks.insert(task.id, task.clone());
        Ok(task)
    }

    /// All tasks ordered by position.
    #[must_use]
    pub fn list_tasks(&self) -> Vec<Task> {
        let mut tasks: Vec<Task> = self.tasks.values().cloned().collect();
        // BTreeMap iteration is by id, so equal positions stay id-ordered.
        tasks.sort_by_key(|task| task.position);
        tasks
    }

    /// Materialized forest of every task.
    #[must_use]
    pub fn task_tree(&self) -> Vec<TaskTree> {
        build_task_tree(self.list_tasks())
    }

    /// Fetch a single task.
    ///
    /// # Errors
    /// Returns [`MemoryStoreError::TaskNotFound`] when the id is unknown.
    pub fn get_task(&self, id: TaskId) -> Result<Task> {
        self.tasks
            .get(&id)
            .cloned()
            .ok_or(MemoryStoreError::TaskNotFound(id))
    }

    /// Apply a partial update.
    ///
    /// Completing a task stamps `completed_at`; reopening clears it.
    ///
    /// # Errors
    /// Returns an error if the task is missing, the title is invalid, or the
    /// new parent/category is unknown or would create a cycle.
    pub fn update_task(&mut self, id: TaskId, input: &UpdateTaskInput) -> Result<Task> {
        if !self.tasks.contains_key(&id) {
            return Err(MemoryStoreError::TaskNotFound(id));
        }
        let mut input = input.clone();
        if let Some(title) = input.title.take() {
            input.title = Some(validate_title(&title)?.to_owned());
        }
        if let Some(ValuePatch::Set(category)) = input.category_id {
            self.ensure_category(Some(category))?;
        }
        if let Some(ValuePatch::Set(parent)) = input.parent_id {
            self.ensure_parent(Some(id), parent)?;
        }

        let ts = now();
        let task = self
            .tasks
            .get_mut(&id)
            .ok_or(MemoryStoreError::TaskNotFound(id))?;
        input.apply_to(task);
        task.updated_at = ts;
        match input.is_done {
            Some(true) => task.completed_at = Some(ts),
            Some(false) => task.completed_at = None,
            None => {}
        }
        debug!(task_id = %id, "Updated task");
        Ok(task.clone())
    }

    /// Delete a task together with all of its descendants.
    ///
    /// Returns every removed id, the requested one first.
    ///
    /// # Errors
    /// Returns [`MemoryStoreError::TaskNotFound`] when the id is unknown.
    pub fn delete_task(&mut self, id: TaskId) -> Result<Vec<TaskId>> {
        if !self.tasks.contains_key(&id) {
            return Err(MemoryStoreError::TaskNotFound(id));
        }
        let mut removed = vec![id];
        let mut cursor = 0;
        while cursor < removed.len() {
            let current = removed[cursor];
            removed.extend(
                self.tasks
                    .values()
                    .filter(|task| task.parent_id == Some(current))
                    .map(|task| task.id),
            );
            cursor += 1;
        }
        for task in &removed {
            self.tasks.remove(task);
        }
        info!(task_id = %id, cascaded = removed.len() - 1, "Deleted task");
        Ok(removed)
    }

    /// Move a task to `new_position` within its `(parent, category)` group,
    /// shifting the siblings in between.
    ///
    /// # Errors
    /// Returns [`MemoryStoreError::TaskNotFound`] when the id is unknown.
    pub fn reorder_task(&mut self, id: TaskId, new_position: i32) -> Result<()> {
        let task = self.get_task(id)?;
        let old_position = task.position;
        if old_position == new_position {
            return Ok(());
        }

        let ts = now();
        for sibling in self.tasks.values_mut().filter(|other| {
            other.id != id
                && other.parent_id == task.parent_id
                && other.category_id == task.category_id
        }) {
            if old_position < new_position {
                if sibling.position > old_position && sibling.position <= new_position {
                    sibling.position -= 1;
                }
            } else if sibling.position >= new_position && sibling.position < old_position {
                sibling.position += 1;
            }
        }
        if let Some(moved) = self.tasks.get_mut(&id) {
            moved.position = new_position;
            moved.updated_at = ts;
        }
        debug!(task_id = %id, old_position, new_position, "Reordered task");
        Ok(())
    }

    /// Insert a new category.
    ///
    /// # Errors
    /// Returns [`MemoryStoreError::DuplicateCategory`] when the name is taken.
    pub fn create_category(&mut self, input: CreateCategoryInput) -> Result<Category> {
        if self.categories.values().any(|c| c.name == input.name) {
            return Err(MemoryStoreError::DuplicateCategory(input.name));
        }
        let ts = now();
        let category = Category {
            id: self.allocate_category_id(),
            name: input.name,
            color: input.color,
            created_at: ts,
            updated_at: ts,
        };
        info!(category_id = %category.id, name = %category.name, "Created category");
        self.categories.insert(category.id, category.clone());
        Ok(category)
    }

    /// All categories ordered by name.
    #[must_use]
    pub fn list_categories(&self) -> Vec<Category> {
        let mut categories: Vec<Category> = self.categories.values().cloned().collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        categories
    }

    /// Apply a partial category update.
    ///
    /// # Errors
    /// Returns an error if the category is missing or the new name is taken.
    pub fn update_category(&mut self, id: CategoryId, input: UpdateCategoryInput) -> Result<Category> {
        if let Some(name) = &input.name
            && self.categories.values().any(|c| c.id != id && &c.name == name)
        {
            return Err(MemoryStoreError::DuplicateCategory(name.clone()));
        }
        let category = self
            .categories
            .get_mut(&id)
            .ok_or(MemoryStoreError::CategoryNotFound(id))?;
        if let Some(name) = input.name {
            category.name = name;
        }
        if let Some(color) = input.color {
            category.color = color;
        }
        category.updated_at = now();
        Ok(category.clone())
    }

    /// Delete a category; its tasks become uncategorized.
    ///
    /// # Errors
    /// Returns [`MemoryStoreError::CategoryNotFound`] when the id is unknown.
    pub fn delete_category(&mut self, id: CategoryId) -> Result<()> {
        self.categories
            .remove(&id)
            .ok_or(MemoryStoreError::CategoryNotFound(id))?;
        let mut detached = 0_usize;
        for task in self.tasks.values_mut().filter(|t| t.category_id == Some(id)) {
            task.category_id = None;
            detached += 1;
        }
        info!(category_id = %id, detached, "Deleted category");
        Ok(())
    }
}
