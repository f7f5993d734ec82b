use crate::model::{default_timestamp, Id, Labels};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An attribute reference inside a family
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyAttribute {
    pub attribute_id: Id,
    #[serde(default)]
    pub required: bool,
    /// Marks the attribute used as the product label
    #[serde(default)]
    pub label: bool,
}

impl FamilyAttribute {
    pub fn required(attribute_id: impl Into<Id>) -> Self {
        Self {
            attribute_id: attribute_id.into(),
            required: true,
            label: false,
        }
    }

    pub fn optional(attribute_id: impl Into<Id>) -> Self {
        Self {
            attribute_id: attribute_id.into(),
            required: false,
            label: false,
        }
    }

    pub fn as_label(mut self) -> Self {
        self.label = true;
        self
    }
}

/// Reusable schema: which attributes apply to a class of products
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Family {
    pub id: Id,
    pub code: String,
    #[serde(default)]
    pub labels: Labels,
    pub attributes: Vec<FamilyAttribute>,
    #[serde(default = "default_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "default_timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl Family {
    pub fn new(id: impl Into<Id>, code: impl Into<String>, attributes: Vec<FamilyAttribute>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            code: code.into(),
            labels: Labels::new(),
            attributes,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn contains(&self, attribute_id: &str) -> bool {
        self.attributes.iter().any(|a| a.attribute_id == attribute_id)
    }

    pub fn attribute(&self, attribute_id: &str) -> Option<&FamilyAttribute> {
        self.attributes.iter().find(|a| a.attribute_id == attribute_id)
    }

    pub fn attribute_ids(&self) -> impl Iterator<Item = &Id> {
        self.attributes.iter().map(|a| &a.attribute_id)
    }

    pub fn required_attributes(&self) -> impl Iterator<Item = &FamilyAttribute> {
        self.attributes.iter().filter(|a| a.required)
    }

    pub fn label_attribute(&self) -> Option<&Id> {
        self.attributes
            .iter()
            .find(|a| a.label)
            .map(|a| &a.attribute_id)
    }

    pub fn from_new(new_family: NewFamily) -> Self {
        let mut family = Family::new(
            new_family.id.unwrap_or_else(crate::model::generate_id),
            new_family.code,
            new_family.attributes,
        );
        family.labels = new_family.labels;
        family
    }
}

/// Family update model; `attributes` replaces the whole attribute list
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FamilyUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Labels>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Vec<FamilyAttribute>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewFamily {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Id>,
    pub code: String,
    #[serde(default)]
    pub labels: Labels,
    pub attributes: Vec<FamilyAttribute>,
}
