//! Materialization of the flat task list into a forest.

use std::collections::HashMap;

use crate::id::TaskId;
use crate::task::{Task, TaskTree};

/// Build the task forest from a flat list.
///
/// Roots are tasks without a parent, in input order; children keep their
/// relative input order. Nodes are moved into place rather than cloned.
/// A task whose parent is not in `tasks` is unreachable and is dropped.
#[must_use]
pub fn build_task_tree(tasks: Vec<Task>) -> Vec<TaskTree> {
    let mut order = Vec::with_capacity(tasks.len());
    let mut children: HashMap<TaskId, Vec<TaskId>> = HashMap::new();
    let mut nodes: HashMap<TaskId, TaskTree> = HashMap::with_capacity(tasks.len());

    for task in tasks {
        order.push((task.id, task.parent_id));
        if let Some(parent) = task.parent_id {
            children.entry(parent).or_default().push(task.id);
        }
        nodes.insert(task.id, TaskTree::leaf(task));
    }

    order
        .into_iter()
        .filter(|(_, parent)| parent.is_none())
        .filter_map(|(id, _)| attach_subtree(id, &mut nodes, &children))
        .collect()
}

fn attach_subtree(
    id: TaskId,
    nodes: &mut HashMap<TaskId, TaskTree>,
    children: &HashMap<TaskId, Vec<TaskId>>,
) -> Option<TaskTree> {
    // Removing the node first also guards against parent cycles.
    let mut node = nodes.remove(&id)?;
    if let Some(child_ids) = children.get(&id) {
        node.subtasks = child_ids
            .iter()
            .filter_map(|&child| attach_subtree(child, nodes, children))
            .collect();
    }
    Some(node)
}
