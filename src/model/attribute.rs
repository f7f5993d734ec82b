use crate::model::{default_timestamp, Id, Labels};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeType {
    Text,
    Number,
    Boolean,
    Date,
    SimpleSelect,
    MultiSelect,
    Media,
}

impl AttributeType {
    pub fn is_select(&self) -> bool {
        matches!(self, AttributeType::SimpleSelect | AttributeType::MultiSelect)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AttributeType::Text => "text",
            AttributeType::Number => "number",
            AttributeType::Boolean => "boolean",
            AttributeType::Date => "date",
            AttributeType::SimpleSelect => "simple_select",
            AttributeType::MultiSelect => "multi_select",
            AttributeType::Media => "media",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeOption {
    pub code: String,
    #[serde(default)]
    pub labels: Labels,
    #[serde(default)]
    pub sort_order: Option<u32>,
}

impl AttributeOption {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            labels: Labels::new(),
            sort_order: None,
        }
    }
}

/// Attribute metadata. Options are kept in display order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub id: Id,
    pub code: String,
    #[serde(rename = "type")]
    pub attribute_type: AttributeType,
    #[serde(default)]
    pub scopable: bool,
    #[serde(default)]
    pub localizable: bool,
    #[serde(default)]
    pub options: Vec<AttributeOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_code: Option<String>,
    #[serde(default)]
    pub labels: Labels,
    /// Free-form UI/constraint metadata, e.g. {"unit": "cm", "min": 0}
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<serde_json::Value>,
    /// When set, values are only accepted on instances classified under one
    /// of these categories or below them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available_in_categories: Option<Vec<Id>>,
    #[serde(default = "default_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "default_timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl Attribute {
    pub fn new(id: impl Into<Id>, code: impl Into<String>, attribute_type: AttributeType) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            code: code.into(),
            attribute_type,
            scopable: false,
            localizable: false,
            options: Vec::new(),
            group_code: None,
            labels: Labels::new(),
            config: None,
            available_in_categories: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn scopable(mut self) -> Self {
        self.scopable = true;
        self
    }

    pub fn localizable(mut self) -> Self {
        self.localizable = true;
        self
    }

    pub fn with_options<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = codes.into_iter().map(AttributeOption::new).collect();
        self
    }

    pub fn has_option(&self, code: &str) -> bool {
        self.options.iter().any(|o| o.code == code)
    }

    pub fn from_new(new_attribute: NewAttribute) -> Self {
        let now = Utc::now();
        Self {
            id: new_attribute.id.unwrap_or_else(crate::model::generate_id),
            code: new_attribute.code,
            attribute_type: new_attribute.attribute_type,
            scopable: new_attribute.scopable,
            localizable: new_attribute.localizable,
            options: new_attribute.options,
            group_code: new_attribute.group_code,
            labels: new_attribute.labels,
            config: new_attribute.config,
            available_in_categories: new_attribute.available_in_categories,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a partial update; invariants are re-checked by the registry
    pub fn apply_update(&mut self, update: AttributeUpdate) {
        if let Some(code) = update.code {
            self.code = code;
        }
        if let Some(attribute_type) = update.attribute_type {
            self.attribute_type = attribute_type;
        }
        if let Some(scopable) = update.scopable {
            self.scopable = scopable;
        }
        if let Some(localizable) = update.localizable {
            self.localizable = localizable;
        }
        if let Some(options) = update.options {
            self.options = options;
        }
        if let Some(group_code) = update.group_code {
            self.group_code = Some(group_code);
        }
        if let Some(labels) = update.labels {
            self.labels = labels;
        }
        if let Some(config) = update.config {
            self.config = Some(config);
        }
        if let Some(categories) = update.available_in_categories {
            self.available_in_categories = Some(categories);
        }
        self.updated_at = Utc::now();
    }
}

/// Attribute input model for creation
/// The ID is generated server-side if not provided
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAttribute {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Id>,
    pub code: String,
    #[serde(rename = "type")]
    pub attribute_type: AttributeType,
    #[serde(default)]
    pub scopable: bool,
    #[serde(default)]
    pub localizable: bool,
    #[serde(default)]
    pub options: Vec<AttributeOption>,
    #[serde(default)]
    pub group_code: Option<String>,
    #[serde(default)]
    pub labels: Labels,
    #[serde(default)]
    pub config: Option<serde_json::Value>,
    #[serde(default)]
    pub available_in_categories: Option<Vec<Id>>,
}

/// Attribute update model for PATCH operations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttributeUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub attribute_type: Option<AttributeType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scopable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub localizable: Option<bool>,
    /// Replaces the entire option list
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<AttributeOption>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Labels>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available_in_categories: Option<Vec<Id>>,
}
