use crate::model::{default_timestamp, default_true, Id};
use chrono::{DateTime, Utc};
use itertools::Itertools;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceKind {
    /// Root (or intermediate) model carrying the values shared by its variants
    ProductModel,
    /// Standalone product assigned directly to a family
    Product,
    /// Leaf of a family variant hierarchy
    Variant,
}

/// One stored value. `(attribute, scope, locale)` is unique per instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductValue {
    pub attribute: Id,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    pub data: serde_json::Value,
}

impl ProductValue {
    pub fn new(attribute: impl Into<Id>, data: serde_json::Value) -> Self {
        Self {
            attribute: attribute.into(),
            scope: None,
            locale: None,
            data,
        }
    }

    pub fn scoped(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    pub fn localized(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    pub fn key(&self) -> ValueKey<'_> {
        (
            self.attribute.as_str(),
            self.scope.as_deref(),
            self.locale.as_deref(),
        )
    }

    /// The first value reusing an earlier value's key
    pub fn first_repeated(values: &[ProductValue]) -> Option<&ProductValue> {
        values.iter().duplicates_by(|v| v.key()).next()
    }

    /// Null, empty strings and empty lists do not count as a value
    pub fn is_empty(&self) -> bool {
        match &self.data {
            serde_json::Value::Null => true,
            serde_json::Value::String(s) => s.trim().is_empty(),
            serde_json::Value::Array(items) => items.is_empty(),
            _ => false,
        }
    }
}

pub type ValueKey<'a> = (&'a str, Option<&'a str>, Option<&'a str>);

/// A product model, product or variant together with its attribute values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductInstance {
    pub id: Id,
    pub code: String,
    pub kind: InstanceKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_id: Option<Id>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_variant_id: Option<Id>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Id>,
    /// 0 for root models and plain products, n for a variant at level n
    #[serde(default)]
    pub level: usize,
    #[serde(default)]
    pub categories: Vec<Id>,
    #[serde(default)]
    pub values: Vec<ProductValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "default_timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl ProductInstance {
    pub fn new(id: impl Into<Id>, code: impl Into<String>, kind: InstanceKind) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            code: code.into(),
            kind,
            family_id: None,
            family_variant_id: None,
            parent_id: None,
            level: 0,
            categories: Vec::new(),
            values: Vec::new(),
            sku: None,
            title: None,
            enabled: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Standalone product of `family_id`
    pub fn product(id: impl Into<Id>, code: impl Into<String>, family_id: impl Into<Id>) -> Self {
        let mut product = Self::new(id, code, InstanceKind::Product);
        product.family_id = Some(family_id.into());
        product
    }

    /// Root product model of a family variant
    pub fn root_model(
        id: impl Into<Id>,
        code: impl Into<String>,
        family_variant_id: impl Into<Id>,
    ) -> Self {
        let mut model = Self::new(id, code, InstanceKind::ProductModel);
        model.family_variant_id = Some(family_variant_id.into());
        model
    }

    /// Variant at `level` below `parent_id`
    pub fn variant(
        id: impl Into<Id>,
        code: impl Into<String>,
        family_variant_id: impl Into<Id>,
        parent_id: impl Into<Id>,
        level: usize,
    ) -> Self {
        let mut variant = Self::new(id, code, InstanceKind::Variant);
        variant.family_variant_id = Some(family_variant_id.into());
        variant.parent_id = Some(parent_id.into());
        variant.level = level;
        variant
    }

    pub fn with_value(mut self, value: ProductValue) -> Self {
        self.set_value(value);
        self
    }

    pub fn in_category(mut self, category_id: impl Into<Id>) -> Self {
        self.categories.push(category_id.into());
        self
    }

    /// Insert or replace the value stored under the same key
    pub fn set_value(&mut self, value: ProductValue) {
        match self.values.iter_mut().find(|v| v.key() == value.key()) {
            Some(existing) => *existing = value,
            None => self.values.push(value),
        }
    }

    pub fn value(&self, attribute: &str, scope: Option<&str>, locale: Option<&str>) -> Option<&ProductValue> {
        self.values
            .iter()
            .find(|v| v.key() == (attribute, scope, locale))
    }

    pub fn from_new(new_instance: NewProductInstance) -> Self {
        let mut instance = Self::new(
            new_instance.id.unwrap_or_else(crate::model::generate_id),
            new_instance.code,
            new_instance.kind,
        );
        instance.family_id = new_instance.family_id;
        instance.family_variant_id = new_instance.family_variant_id;
        instance.parent_id = new_instance.parent_id;
        instance.level = new_instance.level;
        instance.categories = new_instance.categories;
        for value in new_instance.values {
            instance.set_value(value);
        }
        instance.sku = new_instance.sku;
        instance.title = new_instance.title;
        instance.enabled = new_instance.enabled;
        instance
    }

    pub fn apply_update(&mut self, update: ProductInstanceUpdate) {
        if let Some(code) = update.code {
            self.code = code;
        }
        if let Some(title) = update.title {
            self.title = Some(title);
        }
        if let Some(sku) = update.sku {
            self.sku = Some(sku);
        }
        if let Some(family_variant_id) = update.family_variant_id {
            self.family_variant_id = Some(family_variant_id);
        }
        if let Some(parent_id) = update.parent_id {
            self.parent_id = Some(parent_id);
        }
        if let Some(categories) = update.categories {
            self.categories = categories;
        }
        if let Some(values) = update.values {
            for value in values {
                self.set_value(value);
            }
        }
        if let Some(enabled) = update.enabled {
            self.enabled = enabled;
        }
        self.updated_at = Utc::now();
    }
}

/// Instance input model for creation; the ID is set server-side if absent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProductInstance {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Id>,
    pub code: String,
    pub kind: InstanceKind,
    #[serde(default)]
    pub family_id: Option<Id>,
    #[serde(default)]
    pub family_variant_id: Option<Id>,
    #[serde(default)]
    pub parent_id: Option<Id>,
    #[serde(default)]
    pub level: usize,
    #[serde(default)]
    pub categories: Vec<Id>,
    #[serde(default)]
    pub values: Vec<ProductValue>,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Partial update; `values` are merged key by key
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductInstanceUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_variant_id: Option<Id>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Id>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<Id>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<ProductValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

/// Listing filter for product instances
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductFilter {
    /// Case-insensitive substring match on the code
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub family_variant_id: Option<Id>,
    #[serde(default)]
    pub parent_id: Option<Id>,
}

impl ProductFilter {
    pub fn matches(&self, instance: &ProductInstance) -> bool {
        if let Some(search) = &self.search {
            if !instance
                .code
                .to_lowercase()
                .contains(&search.to_lowercase())
            {
                return false;
            }
        }
        if self.family_variant_id.is_some() && instance.family_variant_id != self.family_variant_id {
            return false;
        }
        if self.parent_id.is_some() && instance.parent_id != self.parent_id {
            return false;
        }
        true
    }
}
