use crate::model::{default_timestamp, Id, Labels};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A node of the category forest. The tree owns the parent/child edges;
/// `parent_id` is only a back-reference by identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: Id,
    pub code: String,
    #[serde(default)]
    pub labels: Labels,
    #[serde(default)]
    pub parent_id: Option<Id>,
    #[serde(default = "default_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "default_timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl Category {
    pub fn new(id: impl Into<Id>, code: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            code: code.into(),
            labels: Labels::new(),
            parent_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// What happens to the children of a deleted category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletePolicy {
    RejectIfHasChildren,
    CascadeDeleteSubtree,
    ReparentChildrenToGrandparent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCategory {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Id>,
    pub code: String,
    #[serde(default)]
    pub labels: Labels,
    #[serde(default)]
    pub parent_id: Option<Id>,
}

impl NewCategory {
    pub fn into_category(self) -> (Category, Option<Id>) {
        let mut category = Category::new(
            self.id.unwrap_or_else(crate::model::generate_id),
            self.code,
        );
        category.labels = self.labels;
        (category, self.parent_id)
    }
}

/// Category update model for PATCH operations. Re-parenting goes through
/// the dedicated move operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Labels>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveCategory {
    #[serde(default)]
    pub parent_id: Option<Id>,
}
