//! Application services for taskdeck: repository contracts, the task and
//! category caches, undo history, notifications, and configuration.

pub mod category_cache;
/// Project configuration loaded from `.taskdeck/config.toml`.
pub mod config;
pub mod error;
pub mod history;
pub mod notifier;
pub mod repository;
pub mod task_cache;
pub mod telemetry;

pub use category_cache::{CategoryCache, CategoryState};
pub use config::{HistoryConfig, NotificationConfig, ProjectConfig};
pub use error::TaskCacheError;
pub use history::{MAX_HISTORY, TaskIntent, UndoHistory, UndoableAction};
pub use notifier::{ChannelNotifier, Notification, NotificationLevel, Notifier, TracingNotifier};
pub use repository::{CategoryRepository, TaskRepository};
pub use task_cache::{CacheState, TaskCache};
pub use telemetry::install_tracing;
