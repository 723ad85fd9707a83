//! Client-side category cache.

use anyhow::Error;
use taskdeck_core::{Category, CategoryId, CreateCategoryInput, UpdateCategoryInput};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::config::{NotificationConfig, ProjectConfig};
use crate::error::TaskCacheError;
use crate::notifier::{self, NotificationLevel, Notifier};
use crate::repository::CategoryRepository;

/// Snapshot of the cached categories.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryState {
    /// Categories in repository order.
    pub categories: Vec<Category>,
    /// True while a load is in flight.
    pub loading: bool,
    /// Last load failure, cleared by a successful load.
    pub error: Option<String>,
}

impl CategoryState {
    /// Cached category with the given id.
    #[must_use]
    pub fn category(&self, id: CategoryId) -> Option<&Category> {
        self.categories.iter().find(|category| category.id == id)
    }
}

/// Mirrors repository categories. Category edits are not undoable.
#[derive(Debug)]
pub struct CategoryCache<R, N> {
    repo: R,
    notifier: N,
    durations: NotificationConfig,
    state: watch::Sender<CategoryState>,
}

#[allow(clippy::future_not_send)]
impl<R, N> CategoryCache<R, N>
where
    R: CategoryRepository,
    N: Notifier,
{
    /// Create an empty cache with default notification durations.
    pub fn new(repo: R, notifier: N) -> Self {
        Self::with_config(repo, notifier, &ProjectConfig::default())
    }

    /// Create an empty cache using notification durations from `config`.
    pub fn with_config(repo: R, notifier: N, config: &ProjectConfig) -> Self {
        let (state, _) = watch::channel(CategoryState::default());
        Self {
            repo,
            notifier,
            durations: config.notifications,
            state,
        }
    }

    /// Receiver that observes every state transition.
    pub fn subscribe(&self) -> watch::Receiver<CategoryState> {
        self.state.subscribe()
    }

    /// Current state snapshot.
    pub fn state(&self) -> CategoryState {
        self.state.borrow().clone()
    }

    fn notify(&self, level: NotificationLevel, message: &str) {
        notifier::dispatch(
            &self.notifier,
            level,
            message,
            Some(self.durations.duration(level)),
        );
    }

    fn fail(&self, action: &'static str, err: impl Into<Error>) -> TaskCacheError {
        let err = err.into();
        warn!(action, error = %err, "Category operation failed");
        self.notify(NotificationLevel::Error, &format!("Failed to {action}: {err}"));
        TaskCacheError::repository(action, err)
    }

    /// Replace the cached categories. Failures are kept in
    /// [`CategoryState::error`] and reported, never returned.
    pub async fn load(&self) {
        self.state.send_modify(|state| state.loading = true);
        match self.repo.get_all_categories().await {
            Ok(categories) => {
                info!(categories = categories.len(), "Loaded categories");
                self.state.send_modify(|state| {
                    state.categories = categories;
                    state.error = None;
                    state.loading = false;
                });
            }
            Err(err) => {
                let err: Error = err.into();
                warn!(error = %err, "Failed to load categories");
                let message = format!("Failed to load categories: {err}");
                self.state.send_modify(|state| {
                    state.error = Some(message.clone());
                    state.loading = false;
                });
                self.notify(NotificationLevel::Error, &message);
            }
        }
    }

    /// Create a category and append it locally.
    ///
    /// # Errors
    /// Returns [`TaskCacheError::Repository`] when the repository rejects the
    /// request.
    pub async fn create_category(
        &self,
        input: CreateCategoryInput,
    ) -> Result<Category, TaskCacheError> {
        let category = self
            .repo
            .create_category(input)
            .await
            .map_err(|err| self.fail("create category", err))?;
        self.state
            .send_modify(|state| state.categories.push(category.clone()));
        self.notify(NotificationLevel::Success, "Category created");
        Ok(category)
    }

    /// Apply a partial update and replace the cached entry.
    ///
    /// # Errors
    /// Returns [`TaskCacheError::Repository`] when the repository rejects the
    /// request.
    pub async fn update_category(
        &self,
        id: CategoryId,
        input: UpdateCategoryInput,
    ) -> Result<Category, TaskCacheError> {
        let category = self
            .repo
            .update_category(id, input)
            .await
            .map_err(|err| self.fail("update category", err))?;
        self.state.send_modify(|state| {
            if let Some(slot) = state.categories.iter_mut().find(|cached| cached.id == id) {
                slot.clone_from(&category);
            }
        });
        self.notify(NotificationLevel::Success, "Category updated");
        Ok(category)
    }

    /// Delete a category.
    ///
    /// Tasks lose the category in the repository; reload the task cache to
    /// observe that.
    ///
    /// # Errors
    /// Returns [`TaskCacheError::Repository`] when the repository rejects the
    /// request.
    pub async fn delete_category(&self, id: CategoryId) -> Result<(), TaskCacheError> {
        self.repo
            .delete_category(id)
            .await
            .map_err(|err| self.fail("delete category", err))?;
        self.state
            .send_modify(|state| state.categories.retain(|category| category.id != id));
        info!(category_id = %id, "Category deleted");
        self.notify(NotificationLevel::Success, "Category deleted");
        Ok(())
    }
}
