//! Domain types, tree materialization, and display ordering for taskdeck.

/// Category records and inputs.
pub mod category;
/// Identifier types.
pub mod id;
pub mod order;
/// Task inputs and partial updates.
pub mod patch;
/// Priority buckets.
pub mod priority;
/// Task records and the task forest.
pub mod task;
pub mod tree;

pub use category::{Category, CreateCategoryInput, UpdateCategoryInput};
pub use id::{CategoryId, TaskId};
pub use order::{
    CategoryGroup, PriorityGroup, compare_tasks, group_by_category, group_by_priority,
    sort_task_tree, sort_tasks, sorted_tasks,
};
pub use patch::{CreateTaskInput, UpdateTaskInput, ValuePatch};
pub use priority::{ParsePriorityError, Priority};
pub use task::{MAX_TITLE_CHARS, Task, TaskTree, TitleError, forest_ids, validate_title};
pub use tree::build_task_tree;
