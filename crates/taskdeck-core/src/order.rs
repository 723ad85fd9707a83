//! Display ordering and grouping of tasks.

use std::cmp::Ordering;

use crate::id::CategoryId;
use crate::priority::Priority;
use crate::task::{Task, TaskTree};

/// Top-level tasks sharing a category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryGroup {
    /// Category key; `None` collects uncategorized tasks.
    pub category_id: Option<CategoryId>,
    /// Members in display order.
    pub tasks: Vec<Task>,
}

/// Top-level tasks sharing a priority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriorityGroup {
    /// Group key.
    pub priority: Priority,
    /// Members in display order.
    pub tasks: Vec<Task>,
}

/// Display comparator shared by every ordered view.
///
/// Open tasks come first, then lower priority rank, then earlier due date
/// with undated tasks after every dated one. Anything else compares equal.
#[must_use]
pub fn compare_tasks(a: &Task, b: &Task) -> Ordering {
    a.is_done
        .cmp(&b.is_done)
        .then_with(|| a.priority.rank().cmp(&b.priority.rank()))
        .then_with(|| match (a.due_date, b.due_date) {
            (Some(a_due), Some(b_due)) => a_due.cmp(&b_due),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
}

/// Sort in place with [`compare_tasks`]; ties keep their input order.
pub fn sort_tasks(tasks: &mut [Task]) {
    tasks.sort_by(compare_tasks);
}

/// Owned variant of [`sort_tasks`].
#[must_use]
pub fn sorted_tasks(mut tasks: Vec<Task>) -> Vec<Task> {
    sort_tasks(&mut tasks);
    tasks
}

/// Group top-level tasks by category in first-seen order.
#[must_use]
pub fn group_by_category(tasks: &[Task]) -> Vec<CategoryGroup> {
    let mut groups: Vec<CategoryGroup> = Vec::new();
    for task in tasks.iter().filter(|task| task.is_top_level()) {
        match groups
            .iter_mut()
            .find(|group| group.category_id == task.category_id)
        {
            Some(group) => group.tasks.push(task.clone()),
            None => groups.push(CategoryGroup {
                category_id: task.category_id,
                tasks: vec![task.clone()],
            }),
        }
    }
    for group in &mut groups {
        sort_tasks(&mut group.tasks);
    }
    groups
}

/// Group top-level tasks by priority.
///
/// Always yields four groups in `Urgent, High, Medium, Low` order, empty
/// groups included.
#[must_use]
pub fn group_by_priority(tasks: &[Task]) -> Vec<PriorityGroup> {
    let mut groups: Vec<PriorityGroup> = Priority::ALL
        .into_iter()
        .map(|priority| PriorityGroup {
            priority,
            tasks: Vec::new(),
        })
        .collect();
    for task in tasks.iter().filter(|task| task.is_top_level()) {
        groups[usize::from(task.priority.rank())].tasks.push(task.clone());
    }
    for group in &mut groups {
        sort_tasks(&mut group.tasks);
    }
    groups
}

/// Sort every sibling list of the forest, children before their parents.
#[must_use]
pub fn sort_task_tree(tree: &[TaskTree]) -> Vec<TaskTree> {
    let mut nodes: Vec<TaskTree> = tree
        .iter()
        .map(|node| TaskTree {
            task: node.task.clone(),
            subtasks: sort_task_tree(&node.subtasks),
        })
        .collect();
    nodes.sort_by(|a, b| compare_tasks(&a.task, &b.task));
    nodes
}
