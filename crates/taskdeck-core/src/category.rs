use serde::{Deserialize, Serialize};

use crate::id::CategoryId;

/// Category record as returned by the repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Repository-assigned identifier.
    pub id: CategoryId,
    /// Unique display name.
    pub name: String,
    /// Hex color such as `#7aa2f7`.
    pub color: String,
    /// Creation time as epoch seconds.
    pub created_at: i64,
    /// Last modification time as epoch seconds.
    pub updated_at: i64,
}

/// Fields accepted when creating a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateCategoryInput {
    /// Display name.
    pub name: String,
    /// Hex color.
    pub color: String,
}

/// Partial category update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateCategoryInput {
    /// New name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New color.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}
