#![allow(missing_docs)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::{Result, bail};
use taskdeck_app::{
    CacheState, ChannelNotifier, HistoryConfig, Notification, NotificationLevel, ProjectConfig,
    TaskCache, TaskRepository, UndoableAction,
};
use taskdeck_core::{
    CreateTaskInput, Priority, Task, TaskId, TaskTree, UpdateTaskInput, ValuePatch, forest_ids,
};
use taskdeck_store_memory::MemoryStore;
use tokio::sync::mpsc::UnboundedReceiver;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Op {
    Create,
    List,
    Tree,
    Update,
    Delete,
    Reorder,
}

#[derive(Default)]
struct Inner {
    store: Mutex<MemoryStore>,
    calls: Mutex<HashMap<Op, usize>>,
    failing: Mutex<HashSet<Op>>,
}

/// Repository over a [`MemoryStore`] that counts calls and fails on demand.
#[derive(Clone, Default)]
struct FlakyRepository {
    inner: Arc<Inner>,
}

fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl FlakyRepository {
    fn store(&self) -> MutexGuard<'_, MemoryStore> {
        guard(&self.inner.store)
    }

    fn fail(&self, op: Op) {
        guard(&self.inner.failing).insert(op);
    }

    fn recover(&self, op: Op) {
        guard(&self.inner.failing).remove(&op);
    }

    fn calls(&self, op: Op) -> usize {
        guard(&self.inner.calls).get(&op).copied().unwrap_or(0)
    }

    fn enter(&self, op: Op) -> Result<()> {
        *guard(&self.inner.calls).entry(op).or_default() += 1;
        if guard(&self.inner.failing).contains(&op) {
            bail!("{op:?} unavailable");
        }
        Ok(())
    }
}

impl TaskRepository for FlakyRepository {
    type Error = anyhow::Error;

    async fn create_task(&self, input: CreateTaskInput) -> Result<Task> {
        self.enter(Op::Create)?;
        Ok(self.store().create_task(input)?)
    }

    async fn get_all_tasks(&self) -> Result<Vec<Task>> {
        self.enter(Op::List)?;
        Ok(self.store().list_tasks())
    }

    async fn get_task_tree(&self) -> Result<Vec<TaskTree>> {
        self.enter(Op::Tree)?;
        Ok(self.store().task_tree())
    }

    async fn update_task(&self, id: TaskId, input: UpdateTaskInput) -> Result<Task> {
        self.enter(Op::Update)?;
        Ok(self.store().update_task(id, &input)?)
    }

    async fn delete_task(&self, id: TaskId) -> Result<()> {
        self.enter(Op::Delete)?;
        self.store().delete_task(id)?;
        Ok(())
    }

    async fn reorder_task(&self, id: TaskId, new_position: i32) -> Result<()> {
        self.enter(Op::Reorder)?;
        Ok(self.store().reorder_task(id, new_position)?)
    }
}

type Cache = TaskCache<FlakyRepository, ChannelNotifier>;

fn setup() -> (FlakyRepository, Cache, UnboundedReceiver<Notification>) {
    let repo = FlakyRepository::default();
    let (notifier, rx) = ChannelNotifier::new();
    let cache = TaskCache::new(repo.clone(), notifier);
    (repo, cache, rx)
}

fn drain(rx: &mut UnboundedReceiver<Notification>) -> Vec<Notification> {
    std::iter::from_fn(|| rx.try_recv().ok()).collect()
}

fn messages(rx: &mut UnboundedReceiver<Notification>) -> Vec<(NotificationLevel, String)> {
    drain(rx)
        .into_iter()
        .map(|n| (n.level, n.message))
        .collect()
}

fn titles(state: &CacheState) -> Vec<String> {
    state.tasks.iter().map(|task| task.title.clone()).collect()
}

fn seed(repo: &FlakyRepository, title: &str, parent: Option<TaskId>) -> Result<Task> {
    let mut input = CreateTaskInput::new(title, Priority::Medium);
    if let Some(parent) = parent {
        input = input.with_parent(parent);
    }
    Ok(repo.store().create_task(input)?)
}

#[tokio::test]
async fn load_fetches_list_and_tree_together() -> Result<()> {
    let (repo, cache, mut rx) = setup();
    let parent = seed(&repo, "Parent", None)?;
    let child = seed(&repo, "Child", Some(parent.id))?;

    cache.load().await;

    let state = cache.state();
    assert_eq!(titles(&state), vec!["Parent", "Child"]);
    assert_eq!(forest_ids(&state.task_tree), vec![parent.id, child.id]);
    assert_eq!(state.task_tree.len(), 1);
    assert!(!state.loading);
    assert_eq!(state.error, None);
    assert_eq!(repo.calls(Op::List), 1);
    assert_eq!(repo.calls(Op::Tree), 1);
    assert!(drain(&mut rx).is_empty());
    Ok(())
}

#[tokio::test]
async fn load_failure_keeps_cached_data_and_sets_error() -> Result<()> {
    let (repo, cache, mut rx) = setup();
    seed(&repo, "Keep me", None)?;
    cache.load().await;

    repo.fail(Op::Tree);
    seed(&repo, "Unseen", None)?;
    cache.load().await;

    let state = cache.state();
    assert_eq!(titles(&state), vec!["Keep me"]);
    assert!(!state.loading);
    let Some(error) = state.error else {
        panic!("load failure should be kept in state");
    };
    assert!(error.starts_with("Failed to load tasks"));
    let notes = messages(&mut rx);
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].0, NotificationLevel::Error);

    repo.recover(Op::Tree);
    cache.load().await;
    let state = cache.state();
    assert_eq!(state.error, None);
    assert_eq!(titles(&state), vec!["Keep me", "Unseen"]);
    Ok(())
}

#[tokio::test]
async fn create_appends_refetches_tree_and_records_undo() -> Result<()> {
    let (repo, cache, mut rx) = setup();
    cache.load().await;

    let task = cache
        .create_task(CreateTaskInput::new("Buy groceries", Priority::Medium))
        .await?;

    let state = cache.state();
    assert_eq!(state.tasks, vec![task.clone()]);
    assert_eq!(forest_ids(&state.task_tree), vec![task.id]);
    assert_eq!(repo.calls(Op::Tree), 2);
    assert!(cache.can_undo());
    assert_eq!(
        cache.history_snapshot().peek_undo(),
        Some(&UndoableAction::CreateTask { task })
    );
    assert_eq!(
        messages(&mut rx),
        vec![(NotificationLevel::Success, "Task created".to_owned())]
    );
    Ok(())
}

#[tokio::test]
async fn create_failure_leaves_state_and_history_untouched() -> Result<()> {
    let (repo, cache, mut rx) = setup();
    cache.load().await;
    repo.fail(Op::Create);

    let Err(err) = cache
        .create_task(CreateTaskInput::new("Never stored", Priority::Low))
        .await
    else {
        panic!("create should propagate the repository failure");
    };
    assert_eq!(err.action(), "create task");
    assert!(cache.state().tasks.is_empty());
    assert!(!cache.can_undo());
    assert_eq!(repo.calls(Op::Tree), 1);
    assert_eq!(
        messages(&mut rx),
        vec![(
            NotificationLevel::Error,
            "Failed to create task: Create unavailable".to_owned()
        )]
    );
    Ok(())
}

#[tokio::test]
async fn update_refetches_tree_only_for_parent_changes() -> Result<()> {
    let (repo, cache, mut rx) = setup();
    let parent = seed(&repo, "Parent", None)?;
    let child = seed(&repo, "Child", Some(parent.id))?;
    cache.load().await;

    let renamed = cache
        .update_task(
            child.id,
            UpdateTaskInput {
                title: Some("Renamed".into()),
                ..UpdateTaskInput::default()
            },
        )
        .await?;
    assert_eq!(renamed.title, "Renamed");
    assert_eq!(repo.calls(Op::Tree), 1);
    let state = cache.state();
    assert_eq!(state.task(child.id).map(|t| t.title.as_str()), Some("Renamed"));
    // Attribute edits leave the tree as last fetched.
    let stale = state
        .task_tree
        .first()
        .and_then(|root| root.find(child.id))
        .map(|node| node.task.title.clone());
    assert_eq!(stale.as_deref(), Some("Child"));

    cache
        .update_task(
            child.id,
            UpdateTaskInput {
                parent_id: Some(ValuePatch::Clear),
                ..UpdateTaskInput::default()
            },
        )
        .await?;
    assert_eq!(repo.calls(Op::Tree), 2);
    assert_eq!(cache.state().task_tree.len(), 2);

    let Some(UndoableAction::UpdateTask { before, after, .. }) =
        cache.history_snapshot().peek_undo().cloned()
    else {
        panic!("update should be recorded");
    };
    assert_eq!(before.parent_id, Some(parent.id));
    assert_eq!(after.parent_id, None);
    assert_eq!(drain(&mut rx).len(), 2);
    Ok(())
}

#[tokio::test]
async fn update_of_uncached_task_is_not_recorded() -> Result<()> {
    let (repo, cache, mut rx) = setup();
    let hidden = seed(&repo, "Not loaded", None)?;

    cache
        .update_task(
            hidden.id,
            UpdateTaskInput {
                priority: Some(Priority::Urgent),
                ..UpdateTaskInput::default()
            },
        )
        .await?;

    assert!(!cache.can_undo());
    assert!(cache.state().tasks.is_empty());
    assert_eq!(
        messages(&mut rx),
        vec![(NotificationLevel::Success, "Task updated".to_owned())]
    );
    Ok(())
}

#[tokio::test]
async fn toggle_then_undo_reopens_task() -> Result<()> {
    let (repo, cache, mut rx) = setup();
    let task = seed(&repo, "Write report", None)?;
    cache.load().await;

    let done = cache.toggle_done(task.id, true).await?;
    assert!(done.is_done);
    assert!(done.completed_at.is_some());
    assert_eq!(repo.calls(Op::Tree), 2);
    assert_eq!(
        cache.history_snapshot().peek_undo(),
        Some(&UndoableAction::ToggleTask {
            task_id: task.id,
            before: false,
            after: true,
        })
    );

    let Some(undone) = cache.undo().await? else {
        panic!("toggle should be undoable");
    };
    assert_eq!(undone.task_id(), task.id);
    let state = cache.state();
    assert_eq!(state.task(task.id).map(|t| t.is_done), Some(false));
    assert!(!cache.can_undo());
    assert!(cache.can_redo());
    assert_eq!(
        messages(&mut rx),
        vec![
            (NotificationLevel::Success, "Task completed".to_owned()),
            (NotificationLevel::Success, "Undo: complete task".to_owned()),
        ]
    );

    cache.redo().await?;
    assert_eq!(cache.state().task(task.id).map(|t| t.is_done), Some(true));
    assert_eq!(
        messages(&mut rx),
        vec![(NotificationLevel::Success, "Redo: complete task".to_owned())]
    );
    Ok(())
}

#[tokio::test]
async fn toggle_of_uncached_task_assumes_it_was_open() -> Result<()> {
    let (repo, cache, _rx) = setup();
    let task = seed(&repo, "Already done", None)?;
    repo.store().update_task(task.id, &UpdateTaskInput::done(true))?;

    cache.toggle_done(task.id, true).await?;

    assert_eq!(
        cache.history_snapshot().peek_undo(),
        Some(&UndoableAction::ToggleTask {
            task_id: task.id,
            before: false,
            after: true,
        })
    );
    Ok(())
}

#[tokio::test]
async fn delete_drops_descendants_and_undo_recreates_only_the_parent() -> Result<()> {
    let (repo, cache, mut rx) = setup();
    let parent = seed(&repo, "Plan trip", None)?;
    let first = seed(&repo, "Book flights", Some(parent.id))?;
    let second = seed(&repo, "Book hotel", Some(parent.id))?;
    let other = seed(&repo, "Unrelated", None)?;
    cache.load().await;

    cache.delete_task(parent.id).await?;

    let state = cache.state();
    assert_eq!(titles(&state), vec!["Unrelated"]);
    assert_eq!(forest_ids(&state.task_tree), vec![other.id]);
    let Some(UndoableAction::DeleteTask { task, subtasks }) =
        cache.history_snapshot().peek_undo().cloned()
    else {
        panic!("delete should be recorded");
    };
    assert_eq!(task.id, parent.id);
    let subtask_ids: Vec<TaskId> = subtasks.iter().map(|t| t.id).collect();
    assert_eq!(subtask_ids, vec![first.id, second.id]);

    cache.undo().await?;

    let state = cache.state();
    let Some(restored) = state.tasks.iter().find(|t| t.title == "Plan trip") else {
        panic!("undo should recreate the deleted task");
    };
    assert_ne!(restored.id, parent.id);
    assert_eq!(state.tasks.len(), 2);
    assert!(state.tasks.iter().all(|t| t.parent_id.is_none()));
    assert_eq!(
        messages(&mut rx),
        vec![
            (NotificationLevel::Success, "Task deleted".to_owned()),
            (
                NotificationLevel::Success,
                "Undo: delete \"Plan trip\"".to_owned()
            ),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn failed_undo_keeps_the_action_undoable() -> Result<()> {
    let (repo, cache, mut rx) = setup();
    cache.load().await;
    let task = cache
        .create_task(CreateTaskInput::new("Draft", Priority::Medium))
        .await?;
    drain(&mut rx);

    repo.fail(Op::Delete);
    let Err(err) = cache.undo().await else {
        panic!("undo should propagate the repository failure");
    };
    assert_eq!(err.action(), "delete task");
    assert!(cache.can_undo());
    assert!(!cache.can_redo());
    assert_eq!(cache.state().tasks, vec![task]);
    let notes = messages(&mut rx);
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].0, NotificationLevel::Error);
    assert!(notes[0].1.starts_with("Failed to undo create \"Draft\""));

    repo.recover(Op::Delete);
    cache.undo().await?;
    assert!(cache.state().tasks.is_empty());
    Ok(())
}

#[tokio::test]
async fn failed_redo_is_not_requeued() -> Result<()> {
    let (repo, cache, mut rx) = setup();
    cache.load().await;
    cache
        .create_task(CreateTaskInput::new("Draft", Priority::Medium))
        .await?;
    cache.undo().await?;
    drain(&mut rx);

    repo.fail(Op::Create);
    assert!(cache.redo().await.is_err());

    assert!(!cache.can_redo());
    assert!(cache.can_undo());
    assert!(cache.state().tasks.is_empty());
    assert_eq!(drain(&mut rx).len(), 1);
    Ok(())
}

#[tokio::test]
async fn replays_do_not_record_new_history() -> Result<()> {
    let (_repo, cache, _rx) = setup();
    cache.load().await;
    cache
        .create_task(CreateTaskInput::new("One", Priority::Low))
        .await?;
    cache
        .create_task(CreateTaskInput::new("Two", Priority::Low))
        .await?;

    cache.undo().await?;
    let history = cache.history_snapshot();
    assert_eq!((history.past_len(), history.future_len()), (1, 1));

    cache.redo().await?;
    let history = cache.history_snapshot();
    assert_eq!((history.past_len(), history.future_len()), (2, 0));
    assert_eq!(titles(&cache.state()), vec!["One", "Two"]);
    Ok(())
}

#[tokio::test]
async fn redo_of_create_leaves_stale_id_in_history() -> Result<()> {
    let (_repo, cache, mut rx) = setup();
    cache.load().await;
    let original = cache
        .create_task(CreateTaskInput::new("Phoenix", Priority::Medium))
        .await?;
    cache.undo().await?;
    cache.redo().await?;

    let state = cache.state();
    assert_eq!(state.tasks.len(), 1);
    assert_ne!(state.tasks[0].id, original.id);
    drain(&mut rx);

    // The recorded action still points at the first id.
    assert!(cache.undo().await.is_err());
    assert!(cache.can_undo());
    assert_eq!(titles(&cache.state()), vec!["Phoenix"]);
    assert_eq!(drain(&mut rx).len(), 1);
    Ok(())
}

#[tokio::test]
async fn empty_history_is_a_silent_no_op() -> Result<()> {
    let (_repo, cache, mut rx) = setup();
    assert!(cache.undo().await?.is_none());
    assert!(cache.redo().await?.is_none());
    assert!(drain(&mut rx).is_empty());
    Ok(())
}

#[tokio::test]
async fn reorder_reloads_everything_without_recording() -> Result<()> {
    let (repo, cache, mut rx) = setup();
    let a = seed(&repo, "A", None)?;
    seed(&repo, "B", None)?;
    seed(&repo, "C", None)?;
    cache.load().await;

    cache.reorder_task(a.id, 2).await?;

    assert_eq!(titles(&cache.state()), vec!["B", "C", "A"]);
    assert_eq!(repo.calls(Op::List), 2);
    assert_eq!(repo.calls(Op::Tree), 2);
    assert!(!cache.can_undo());
    assert_eq!(
        messages(&mut rx),
        vec![(NotificationLevel::Success, "Task moved".to_owned())]
    );
    Ok(())
}

#[tokio::test]
async fn tree_refresh_failure_does_not_fail_the_mutation() -> Result<()> {
    let (repo, cache, mut rx) = setup();
    cache.load().await;
    repo.fail(Op::Tree);

    let task = cache
        .create_task(CreateTaskInput::new("Offline tree", Priority::Low))
        .await?;

    let state = cache.state();
    assert_eq!(state.tasks, vec![task]);
    assert!(state.task_tree.is_empty());
    assert!(state.error.is_some_and(|e| e.starts_with("Failed to refresh tasks")));
    assert!(cache.can_undo());
    assert_eq!(
        messages(&mut rx),
        vec![(NotificationLevel::Success, "Task created".to_owned())]
    );
    Ok(())
}

#[tokio::test]
async fn subscribers_observe_each_transition() -> Result<()> {
    let (_repo, cache, _rx) = setup();
    let mut updates = cache.subscribe();
    cache.load().await;
    assert!(updates.has_changed()?);
    assert!(!updates.borrow_and_update().loading);

    cache
        .create_task(CreateTaskInput::new("Watched", Priority::Urgent))
        .await?;
    assert!(updates.has_changed()?);
    let state = updates.borrow_and_update().clone();
    assert_eq!(titles(&state), vec!["Watched"]);
    assert_eq!(state.task_tree.len(), 1);
    Ok(())
}

#[tokio::test]
async fn configured_history_limit_caps_undo_depth() -> Result<()> {
    let repo = FlakyRepository::default();
    let (notifier, mut rx) = ChannelNotifier::new();
    let config = ProjectConfig {
        history: HistoryConfig { limit: 2 },
        ..ProjectConfig::default()
    };
    let cache = TaskCache::with_config(repo, notifier, &config);

    for title in ["One", "Two", "Three"] {
        cache
            .create_task(CreateTaskInput::new(title, Priority::Low))
            .await?;
    }
    assert_eq!(cache.history_snapshot().past_len(), 2);

    let durations: Vec<_> = drain(&mut rx).into_iter().map(|n| n.duration).collect();
    assert_eq!(
        durations,
        vec![Some(config.notifications.duration(NotificationLevel::Success)); 3]
    );

    cache.clear_history();
    assert!(!cache.can_undo());
    Ok(())
}

async fn loaded_with_one_task(
    title: &str,
) -> Result<(FlakyRepository, Cache, UnboundedReceiver<Notification>, Task)> {
    let (repo, cache, rx) = setup();
    let task = seed(&repo, title, None)?;
    cache.load().await;
    Ok((repo, cache, rx, task))
}

fn assert_single_error(rx: &mut UnboundedReceiver<Notification>, prefix: &str) {
    let notes = messages(rx);
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].0, NotificationLevel::Error);
    assert!(notes[0].1.starts_with(prefix), "unexpected message: {}", notes[0].1);
}

#[tokio::test]
async fn update_failure_leaves_state_and_history_untouched() -> Result<()> {
    let (repo, cache, mut rx, task) = loaded_with_one_task("Stable").await?;
    let before = cache.state();
    repo.fail(Op::Update);

    let Err(err) = cache
        .update_task(
            task.id,
            UpdateTaskInput {
                title: Some("Changed".into()),
                parent_id: Some(ValuePatch::Clear),
                ..UpdateTaskInput::default()
            },
        )
        .await
    else {
        panic!("update should propagate the repository failure");
    };
    assert_eq!(err.action(), "update task");
    assert_eq!(cache.state().tasks, before.tasks);
    assert_eq!(repo.calls(Op::Tree), 1);
    assert!(!cache.can_undo());
    assert_single_error(&mut rx, "Failed to update task");
    Ok(())
}

#[tokio::test]
async fn delete_failure_leaves_state_and_history_untouched() -> Result<()> {
    let (repo, cache, mut rx, task) = loaded_with_one_task("Sticky").await?;
    let before = cache.state();
    repo.fail(Op::Delete);

    let Err(err) = cache.delete_task(task.id).await else {
        panic!("delete should propagate the repository failure");
    };
    assert_eq!(err.action(), "delete task");
    assert_eq!(cache.state().tasks, before.tasks);
    assert_eq!(cache.state().task_tree, before.task_tree);
    assert!(!cache.can_undo());
    assert_single_error(&mut rx, "Failed to delete task");
    Ok(())
}

#[tokio::test]
async fn toggle_failure_leaves_state_and_history_untouched() -> Result<()> {
    let (repo, cache, mut rx, task) = loaded_with_one_task("Still open").await?;
    let before = cache.state();
    repo.fail(Op::Update);

    let Err(err) = cache.toggle_done(task.id, true).await else {
        panic!("toggle should propagate the repository failure");
    };
    assert_eq!(err.action(), "toggle task");
    assert_eq!(cache.state().tasks, before.tasks);
    assert_eq!(cache.state().task(task.id).map(|t| t.is_done), Some(false));
    assert!(!cache.can_undo());
    assert_single_error(&mut rx, "Failed to toggle task");
    Ok(())
}

#[tokio::test]
async fn undoing_delete_of_completed_task_restores_it_open() -> Result<()> {
    let (_repo, cache, mut rx, task) = loaded_with_one_task("Finished").await?;
    cache.toggle_done(task.id, true).await?;
    cache.delete_task(task.id).await?;
    drain(&mut rx);

    cache.undo().await?;

    let state = cache.state();
    assert_eq!(titles(&state), vec!["Finished"]);
    assert_ne!(state.tasks[0].id, task.id);
    assert!(!state.tasks[0].is_done);
    assert_eq!(drain(&mut rx).len(), 1);
    Ok(())
}
