//! Error types surfaced by the cache services.

use anyhow::Error;
use thiserror::Error;

/// Failure of a cache operation.
#[derive(Debug, Error)]
pub enum TaskCacheError {
    /// The repository rejected the request; nothing was applied locally.
    #[error("failed to {action}: {source}")]
    Repository {
        /// Short description of the attempted operation.
        action: &'static str,
        /// Error bubbled up from the repository.
        #[source]
        source: Error,
    },
}

impl TaskCacheError {
    pub(crate) fn repository(action: &'static str, source: impl Into<Error>) -> Self {
        Self::Repository {
            action,
            source: source.into(),
        }
    }

    /// Operation that failed.
    #[must_use]
    pub const fn action(&self) -> &'static str {
        match self {
            Self::Repository { action, .. } => action,
        }
    }
}
