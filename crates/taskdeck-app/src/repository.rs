//! Async repository contracts consumed by the caches.

use anyhow::Error;
use std::sync::Arc;
use taskdeck_core::{
    Category, CategoryId, CreateCategoryInput, CreateTaskInput, Task, TaskId, TaskTree,
    UpdateCategoryInput, UpdateTaskInput,
};
use taskdeck_store_memory::{MemoryStore, MemoryStoreError};
use tokio::sync::Mutex;

/// Task persistence boundary.
///
/// Implementations own id assignment, positions, timestamps, and cascading
/// deletes; callers only mirror what they return.
#[allow(async_fn_in_trait)]
pub trait TaskRepository: Send + Sync {
    /// Error type bubbled up from the backing store.
    type Error: Into<Error> + Send;

    /// Persist a new task.
    ///
    /// # Errors
    /// Returns a store-specific error when the task cannot be created.
    async fn create_task(&self, input: CreateTaskInput) -> Result<Task, Self::Error>;

    /// Fetch every task as a flat list.
    ///
    /// # Errors
    /// Returns a store-specific error when listing fails.
    async fn get_all_tasks(&self) -> Result<Vec<Task>, Self::Error>;

    /// Fetch the materialized task forest.
    ///
    /// # Errors
    /// Returns a store-specific error when the tree cannot be built.
    async fn get_task_tree(&self) -> Result<Vec<TaskTree>, Self::Error>;

    /// Apply a partial update and return the stored task.
    ///
    /// # Errors
    /// Returns a store-specific error, including not-found.
    async fn update_task(&self, id: TaskId, input: UpdateTaskInput) -> Result<Task, Self::Error>;

    /// Delete a task and, by cascade, its descendants.
    ///
    /// # Errors
    /// Returns a store-specific error, including not-found.
    async fn delete_task(&self, id: TaskId) -> Result<(), Self::Error>;

    /// Move a task to a new sibling position.
    ///
    /// # Errors
    /// Returns a store-specific error when reordering fails.
    async fn reorder_task(&self, id: TaskId, new_position: i32) -> Result<(), Self::Error>;
}

/// Category persistence boundary.
#[allow(async_fn_in_trait)]
pub trait CategoryRepository: Send + Sync {
    /// Error type bubbled up from the backing store.
    type Error: Into<Error> + Send;

    /// Persist a new category.
    ///
    /// # Errors
    /// Returns a store-specific error when the category cannot be created.
    async fn create_category(&self, input: CreateCategoryInput) -> Result<Category, Self::Error>;

    /// Fetch every category.
    ///
    /// # Errors
    /// Returns a store-specific error when listing fails.
    async fn get_all_categories(&self) -> Result<Vec<Category>, Self::Error>;

    /// Apply a partial update and return the stored category.
    ///
    /// # Errors
    /// Returns a store-specific error, including not-found.
    async fn update_category(
        &self,
        id: CategoryId,
        input: UpdateCategoryInput,
    ) -> Result<Category, Self::Error>;

    /// Delete a category; its tasks become uncategorized.
    ///
    /// # Errors
    /// Returns a store-specific error, including not-found.
    async fn delete_category(&self, id: CategoryId) -> Result<(), Self::Error>;
}

impl TaskRepository for Arc<Mutex<MemoryStore>> {
    type Error = MemoryStoreError;

    async fn create_task(&self, input: CreateTaskInput) -> Result<Task, Self::Error> {
        self.lock().await.create_task(input)
    }

    async fn get_all_tasks(&self) -> Result<Vec<Task>, Self::Error> {
        Ok(self.lock().await.list_tasks())
    }

    async fn get_task_tree(&self) -> Result<Vec<TaskTree>, Self::Error> {
        Ok(self.lock().await.task_tree())
    }

    async fn update_task(&self, id: TaskId, input: UpdateTaskInput) -> Result<Task, Self::Error> {
        self.lock().await.update_task(id, &input)
    }

    async fn delete_task(&self, id: TaskId) -> Result<(), Self::Error> {
        self.lock().await.delete_task(id).map(|_| ())
    }

    async fn reorder_task(&self, id: TaskId, new_position: i32) -> Result<(), Self::Error> {
        self.lock().await.reorder_task(id, new_position)
    }
}

impl CategoryRepository for Arc<Mutex<MemoryStore>> {
    type Error = MemoryStoreError;

    async fn create_category(&self, input: CreateCategoryInput) -> Result<Category, Self::Error> {
        self.lock().await.create_category(input)
    }

    async fn get_all_categories(&self) -> Result<Vec<Category>, Self::Error> {
        Ok(self.lock().await.list_categories())
    }

    async fn update_category(
        &self,
        id: CategoryId,
        input: UpdateCategoryInput,
    ) -> Result<Category, Self::Error> {
        self.lock().await.update_category(id, input)
    }

    async fn delete_category(&self, id: CategoryId) -> Result<(), Self::Error> {
        self.lock().await.delete_category(id)
    }
}
