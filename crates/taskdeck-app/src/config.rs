use std::{fs, path::Path, time::Duration};

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use crate::history::MAX_HISTORY;
use crate::notifier::NotificationLevel;

const CONFIG_DIR: &str = ".taskdeck";
const CONFIG_FILE: &str = "config.toml";

/// Top-level project configuration loaded from `.taskdeck/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProjectConfig {
    /// Undo history settings.
    #[serde(default)]
    pub history: HistoryConfig,
    /// Notification display durations.
    #[serde(default)]
    pub notifications: NotificationConfig,
}

impl ProjectConfig {
    /// Load configuration from `dir`, falling back to defaults when no file exists.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let config_path = dir.as_ref().join(CONFIG_DIR).join(CONFIG_FILE);
        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&config_path)
            .with_context(|| format!("failed to read {}", config_path.display()))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("failed to parse {}", config_path.display()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        self.history.ensure_limit_in_range()
    }
}

/// `[history]` block.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HistoryConfig {
    /// Number of undoable actions to retain.
    #[serde(default = "HistoryConfig::default_limit")]
    pub limit: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            limit: Self::default_limit(),
        }
    }
}

impl HistoryConfig {
    const fn default_limit() -> usize {
        MAX_HISTORY
    }

    fn ensure_limit_in_range(&self) -> Result<()> {
        if self.limit == 0 || self.limit > MAX_HISTORY {
            bail!(
                "history limit must be between 1 and {MAX_HISTORY}, got {}",
                self.limit
            );
        }
        Ok(())
    }
}

/// `[notifications]` block, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Display time for success messages.
    pub success_ms: u64,
    /// Display time for error messages.
    pub error_ms: u64,
    /// Display time for informational messages.
    pub info_ms: u64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            success_ms: 2000,
            error_ms: 5000,
            info_ms: 3000,
        }
    }
}

impl NotificationConfig {
    /// Display time for a notification of the given level.
    #[must_use]
    pub const fn duration(&self, level: NotificationLevel) -> Duration {
        let ms = match level {
            NotificationLevel::Success => self.success_ms,
            NotificationLevel::Error => self.error_ms,
            NotificationLevel::Info => self.info_ms,
        };
        Duration::from_millis(ms)
    }
}
