//! Client-side task cache with undo/redo orchestration.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::Error;
use taskdeck_core::{
    CategoryGroup, CreateTaskInput, PriorityGroup, Task, TaskId, TaskTree, UpdateTaskInput,
    group_by_category, group_by_priority, sort_task_tree, sorted_tasks,
};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::{NotificationConfig, ProjectConfig};
use crate::error::TaskCacheError;
use crate::history::{TaskIntent, UndoHistory, UndoableAction};
use crate::notifier::{self, NotificationLevel, Notifier};
use crate::repository::TaskRepository;

/// Snapshot of everything the cache knows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheState {
    /// Flat list of tasks in repository order.
    pub tasks: Vec<Task>,
    /// Forest as last returned by the repository.
    pub task_tree: Vec<TaskTree>,
    /// True while a full load is in flight.
    pub loading: bool,
    /// Last load or refresh failure, cleared by a successful load.
    pub error: Option<String>,
}

impl CacheState {
    /// Cached task with the given id.
    #[must_use]
    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    /// Direct children of `id` known to the cache.
    #[must_use]
    pub fn subtasks_of(&self, id: TaskId) -> Vec<Task> {
        self.tasks
            .iter()
            .filter(|task| task.parent_id == Some(id))
            .cloned()
            .collect()
    }

    /// Tasks in display order.
    #[must_use]
    pub fn sorted_tasks(&self) -> Vec<Task> {
        sorted_tasks(self.tasks.clone())
    }

    /// Forest with every level in display order.
    #[must_use]
    pub fn sorted_tree(&self) -> Vec<TaskTree> {
        sort_task_tree(&self.task_tree)
    }

    /// Top-level tasks grouped by category, each group in display order.
    #[must_use]
    pub fn by_category(&self) -> Vec<CategoryGroup> {
        group_by_category(&self.tasks)
    }

    /// Tasks grouped into the four priority buckets.
    #[must_use]
    pub fn by_priority(&self) -> Vec<PriorityGroup> {
        group_by_priority(&self.tasks)
    }
}

/// Who asked for a mutation. Only direct calls are recorded in history.
#[derive(Debug, Clone, Copy)]
enum Origin<'a> {
    User,
    Undo(&'a UndoableAction),
    Redo(&'a UndoableAction),
}

impl Origin<'_> {
    const fn records(self) -> bool {
        matches!(self, Self::User)
    }

    fn success_message(self, message: &str) -> String {
        match self {
            Self::User => message.to_owned(),
            Self::Undo(action) => format!("Undo: {}", action.describe()),
            Self::Redo(action) => format!("Redo: {}", action.describe()),
        }
    }

    fn failure_message(self, action: &str, err: &Error) -> String {
        match self {
            Self::User => format!("Failed to {action}: {err}"),
            Self::Undo(undone) => format!("Failed to undo {}: {err}", undone.describe()),
            Self::Redo(redone) => format!("Failed to redo {}: {err}", redone.describe()),
        }
    }
}

fn into_anyhow<E: Into<Error>>(err: E) -> Error {
    err.into()
}

fn with_descendants(tasks: &[Task], root: TaskId) -> HashSet<TaskId> {
    let mut ids = HashSet::from([root]);
    let mut frontier = vec![root];
    while let Some(parent) = frontier.pop() {
        for task in tasks.iter().filter(|task| task.parent_id == Some(parent)) {
            if ids.insert(task.id) {
                frontier.push(task.id);
            }
        }
    }
    ids
}

/// Mirrors repository state, records undoable mutations, and reports every
/// outcome through a [`Notifier`].
///
/// State transitions are published on a `watch` channel; each one is applied
/// in a single `send_modify`, so subscribers never see a half-applied update.
///
/// Mutations are not serialized. Two calls in flight at once may interleave
/// their repository responses, and the later one can capture a stale
/// `before` snapshot. Callers must not issue a second mutation for the same
/// task until the first has returned.
#[derive(Debug)]
pub struct TaskCache<R, N> {
    repo: R,
    notifier: N,
    durations: NotificationConfig,
    state: watch::Sender<CacheState>,
    history: Mutex<UndoHistory>,
}

#[allow(clippy::future_not_send)]
impl<R, N> TaskCache<R, N>
where
    R: TaskRepository,
    N: Notifier,
{
    /// Create an empty cache with default settings.
    pub fn new(repo: R, notifier: N) -> Self {
        Self::with_config(repo, notifier, &ProjectConfig::default())
    }

    /// Create an empty cache using the history cap and notification
    /// durations from `config`.
    pub fn with_config(repo: R, notifier: N, config: &ProjectConfig) -> Self {
        let (state, _) = watch::channel(CacheState::default());
        Self {
            repo,
            notifier,
            durations: config.notifications,
            state,
            history: Mutex::new(UndoHistory::with_limit(config.history.limit)),
        }
    }

    /// Underlying repository.
    pub const fn repository(&self) -> &R {
        &self.repo
    }

    /// Receiver that observes every state transition.
    pub fn subscribe(&self) -> watch::Receiver<CacheState> {
        self.state.subscribe()
    }

    /// Current state snapshot.
    pub fn state(&self) -> CacheState {
        self.state.borrow().clone()
    }

    /// Returns true when there is something to undo.
    pub fn can_undo(&self) -> bool {
        self.history().can_undo()
    }

    /// Returns true when there is something to redo.
    pub fn can_redo(&self) -> bool {
        self.history().can_redo()
    }

    /// Drop both undo and redo stacks.
    pub fn clear_history(&self) {
        self.history().clear();
    }

    /// Copy of the undo history.
    pub fn history_snapshot(&self) -> UndoHistory {
        self.history().clone()
    }

    fn history(&self) -> MutexGuard<'_, UndoHistory> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self, level: NotificationLevel, message: &str) {
        notifier::dispatch(
            &self.notifier,
            level,
            message,
            Some(self.durations.duration(level)),
        );
    }

    fn succeed(&self, origin: Origin<'_>, message: &str) {
        self.notify(NotificationLevel::Success, &origin.success_message(message));
    }

    fn fail(&self, action: &'static str, err: impl Into<Error>, origin: Origin<'_>) -> TaskCacheError {
        let err = err.into();
        warn!(action, error = %err, "Task operation failed");
        self.notify(NotificationLevel::Error, &origin.failure_message(action, &err));
        TaskCacheError::repository(action, err)
    }

    fn record(&self, action: UndoableAction) {
        debug!(task_id = %action.task_id(), action = %action.describe(), "Recorded undoable action");
        self.history().add_action(action);
    }

    fn record_refresh_failure(&self, err: &Error) {
        warn!(error = %err, "Failed to refresh tasks after mutation");
        let message = format!("Failed to refresh tasks: {err}");
        self.state.send_modify(|state| state.error = Some(message));
    }

    fn replace_task(&self, task: &Task) {
        self.state.send_modify(|state| {
            if let Some(slot) = state.tasks.iter_mut().find(|cached| cached.id == task.id) {
                slot.clone_from(task);
            }
        });
    }

    async fn fetch_all(&self) -> Result<(Vec<Task>, Vec<TaskTree>), Error> {
        let (tasks, task_tree) =
            tokio::join!(self.repo.get_all_tasks(), self.repo.get_task_tree());
        Ok((tasks.map_err(into_anyhow)?, task_tree.map_err(into_anyhow)?))
    }

    async fn refetch_tree(&self) {
        match self.repo.get_task_tree().await {
            Ok(task_tree) => self.state.send_modify(|state| state.task_tree = task_tree),
            Err(err) => self.record_refresh_failure(&into_anyhow(err)),
        }
    }

    /// Fetch the task list and tree concurrently and replace both.
    ///
    /// Failures are kept in [`CacheState::error`] and reported to the
    /// notifier; they are never returned.
    pub async fn load(&self) {
        self.state.send_modify(|state| state.loading = true);
        match self.fetch_all().await {
            Ok((tasks, task_tree)) => {
                info!(tasks = tasks.len(), roots = task_tree.len(), "Loaded tasks");
                self.state.send_modify(|state| {
                    state.tasks = tasks;
                    state.task_tree = task_tree;
                    state.error = None;
                    state.loading = false;
                });
            }
            Err(err) => {
                warn!(error = %err, "Failed to load tasks");
                let message = format!("Failed to load tasks: {err}");
                self.state.send_modify(|state| {
                    state.error = Some(message.clone());
                    state.loading = false;
                });
                self.notify(NotificationLevel::Error, &message);
            }
        }
    }

    /// Create a task, append it locally, and refresh the tree.
    ///
    /// # Errors
    /// Returns [`TaskCacheError::Repository`] when the repository rejects the
    /// request; local state is left untouched.
    pub async fn create_task(&self, input: CreateTaskInput) -> Result<Task, TaskCacheError> {
        self.run_create(input, Origin::User).await
    }

    /// Apply a partial update. The tree is refreshed only when the patch
    /// carries a parent change.
    ///
    /// # Errors
    /// Returns [`TaskCacheError::Repository`] when the repository rejects the
    /// request.
    pub async fn update_task(
        &self,
        id: TaskId,
        input: UpdateTaskInput,
    ) -> Result<Task, TaskCacheError> {
        self.run_update(id, input, Origin::User).await
    }

    /// Delete a task; the repository cascades to its descendants.
    ///
    /// # Errors
    /// Returns [`TaskCacheError::Repository`] when the repository rejects the
    /// request.
    pub async fn delete_task(&self, id: TaskId) -> Result<(), TaskCacheError> {
        self.run_delete(id, Origin::User).await
    }

    /// Set the completion flag and refresh the tree.
    ///
    /// # Errors
    /// Returns [`TaskCacheError::Repository`] when the repository rejects the
    /// request.
    pub async fn toggle_done(&self, id: TaskId, is_done: bool) -> Result<Task, TaskCacheError> {
        self.run_toggle(id, is_done, Origin::User).await
    }

    /// Move a task among its siblings, then reload tasks and tree.
    ///
    /// Reordering is not recorded in the undo history.
    ///
    /// # Errors
    /// Returns [`TaskCacheError::Repository`] when the repository rejects the
    /// request.
    pub async fn reorder_task(&self, id: TaskId, new_position: i32) -> Result<(), TaskCacheError> {
        self.repo
            .reorder_task(id, new_position)
            .await
            .map_err(|err| self.fail("reorder task", err, Origin::User))?;
        match self.fetch_all().await {
            Ok((tasks, task_tree)) => self.state.send_modify(|state| {
                state.tasks = tasks;
                state.task_tree = task_tree;
            }),
            Err(err) => self.record_refresh_failure(&err),
        }
        info!(task_id = %id, new_position, "Task reordered");
        self.succeed(Origin::User, "Task moved");
        Ok(())
    }

    /// Reverse the most recent recorded action.
    ///
    /// Returns `Ok(None)` when there is nothing to undo. When the reversal
    /// fails the action is recorded again so it stays undoable.
    ///
    /// # Errors
    /// Returns [`TaskCacheError::Repository`] when the reversal is rejected.
    pub async fn undo(&self) -> Result<Option<UndoableAction>, TaskCacheError> {
        let Some(action) = self.history().undo() else {
            return Ok(None);
        };
        match self.apply(action.inverse(), Origin::Undo(&action)).await {
            Ok(()) => {
                info!(action = %action.describe(), "Undo applied");
                Ok(Some(action))
            }
            Err(err) => {
                self.history().add_action(action);
                Err(err)
            }
        }
    }

    /// Re-apply the most recently undone action.
    ///
    /// Returns `Ok(None)` when there is nothing to redo. A failed redo is not
    /// returned to the redo stack.
    ///
    /// # Errors
    /// Returns [`TaskCacheError::Repository`] when the replay is rejected.
    pub async fn redo(&self) -> Result<Option<UndoableAction>, TaskCacheError> {
        let Some(action) = self.history().redo() else {
            return Ok(None);
        };
        self.apply(action.forward(), Origin::Redo(&action)).await?;
        info!(action = %action.describe(), "Redo applied");
        Ok(Some(action))
    }

    async fn apply(&self, intent: TaskIntent, origin: Origin<'_>) -> Result<(), TaskCacheError> {
        match intent {
            TaskIntent::Create(input) => self.run_create(input, origin).await.map(|_| ()),
            TaskIntent::Update { id, input } => {
                self.run_update(id, input, origin).await.map(|_| ())
            }
            TaskIntent::Delete(id) => self.run_delete(id, origin).await,
            TaskIntent::Toggle { id, is_done } => {
                self.run_toggle(id, is_done, origin).await.map(|_| ())
            }
        }
    }

    async fn run_create(
        &self,
        input: CreateTaskInput,
        origin: Origin<'_>,
    ) -> Result<Task, TaskCacheError> {
        let task = self
            .repo
            .create_task(input)
            .await
            .map_err(|err| self.fail("create task", err, origin))?;
        info!(task_id = %task.id, "Task created");
        self.state.send_modify(|state| state.tasks.push(task.clone()));
        self.refetch_tree().await;
        if origin.records() {
            self.record(UndoableAction::CreateTask { task: task.clone() });
        }
        self.succeed(origin, "Task created");
        Ok(task)
    }

    async fn run_update(
        &self,
        id: TaskId,
        input: UpdateTaskInput,
        origin: Origin<'_>,
    ) -> Result<Task, TaskCacheError> {
        let before = self.state.borrow().task(id).cloned();
        let refetch = input.touches_hierarchy();
        let task = self
            .repo
            .update_task(id, input)
            .await
            .map_err(|err| self.fail("update task", err, origin))?;
        self.replace_task(&task);
        if refetch {
            self.refetch_tree().await;
        }
        if origin.records() {
            match before {
                Some(before) => self.record(UndoableAction::UpdateTask {
                    task_id: id,
                    before,
                    after: task.clone(),
                }),
                None => debug!(task_id = %id, "Task not cached, skipping undo record"),
            }
        }
        debug!(task_id = %id, refetch, "Task updated");
        self.succeed(origin, "Task updated");
        Ok(task)
    }

    async fn run_delete(&self, id: TaskId, origin: Origin<'_>) -> Result<(), TaskCacheError> {
        let (task, subtasks) = {
            let state = self.state.borrow();
            (state.task(id).cloned(), state.subtasks_of(id))
        };
        self.repo
            .delete_task(id)
            .await
            .map_err(|err| self.fail("delete task", err, origin))?;
        self.state.send_modify(|state| {
            let removed = with_descendants(&state.tasks, id);
            state.tasks.retain(|task| !removed.contains(&task.id));
        });
        self.refetch_tree().await;
        if origin.records() {
            match task {
                Some(task) => self.record(UndoableAction::DeleteTask { task, subtasks }),
                None => debug!(task_id = %id, "Task not cached, skipping undo record"),
            }
        }
        info!(task_id = %id, "Task deleted");
        self.succeed(origin, "Task deleted");
        Ok(())
    }

    async fn run_toggle(
        &self,
        id: TaskId,
        is_done: bool,
        origin: Origin<'_>,
    ) -> Result<Task, TaskCacheError> {
        // Unknown tasks are assumed to have been open.
        let before = self.state.borrow().task(id).is_some_and(|task| task.is_done);
        let task = self
            .repo
            .update_task(id, UpdateTaskInput::done(is_done))
            .await
            .map_err(|err| self.fail("toggle task", err, origin))?;
        self.replace_task(&task);
        self.refetch_tree().await;
        if origin.records() {
            self.record(UndoableAction::ToggleTask {
                task_id: id,
                before,
                after: is_done,
            });
        }
        debug!(task_id = %id, is_done, "Task toggled");
        self.succeed(origin, if is_done { "Task completed" } else { "Task reopened" });
        Ok(task)
    }
}
