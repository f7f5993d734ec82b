use crate::model::{default_timestamp, Id, Labels};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One variation level. `axes` distinguish sibling variants at this level,
/// `attributes` are further values owned by this level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantLevel {
    pub axes: Vec<Id>,
    #[serde(default)]
    pub attributes: Vec<Id>,
}

impl VariantLevel {
    pub fn new<A, B>(axes: A, attributes: B) -> Self
    where
        A: IntoIterator,
        A::Item: Into<Id>,
        B: IntoIterator,
        B::Item: Into<Id>,
    {
        Self {
            axes: axes.into_iter().map(Into::into).collect(),
            attributes: attributes.into_iter().map(Into::into).collect(),
        }
    }

    /// Axes first, then the level's other attributes
    pub fn all_attributes(&self) -> impl Iterator<Item = &Id> {
        self.axes.iter().chain(self.attributes.iter())
    }

    pub fn contains(&self, attribute_id: &str) -> bool {
        self.all_attributes().any(|a| a == attribute_id)
    }
}

/// A family specialization splitting attributes across ordered levels.
/// Level numbers are 1-based; level 0 is the root product model that owns
/// the family's common attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FamilyVariant {
    pub id: Id,
    pub code: String,
    pub family_id: Id,
    #[serde(default)]
    pub labels: Labels,
    pub levels: Vec<VariantLevel>,
    #[serde(default = "default_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "default_timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl FamilyVariant {
    pub fn new(
        id: impl Into<Id>,
        code: impl Into<String>,
        family_id: impl Into<Id>,
        levels: Vec<VariantLevel>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            code: code.into(),
            family_id: family_id.into(),
            labels: Labels::new(),
            levels,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    /// The 1-based level definition, `None` for level 0 or past the last level
    pub fn level(&self, level: usize) -> Option<&VariantLevel> {
        level.checked_sub(1).and_then(|i| self.levels.get(i))
    }

    /// Level owning `attribute_id`; 0 when no level claims it
    pub fn level_of(&self, attribute_id: &str) -> usize {
        self.levels
            .iter()
            .position(|l| l.contains(attribute_id))
            .map(|i| i + 1)
            .unwrap_or(0)
    }

    pub fn is_axis(&self, attribute_id: &str) -> bool {
        self.levels
            .iter()
            .any(|l| l.axes.iter().any(|a| a == attribute_id))
    }

    /// Axis attributes of levels `1..=level`, coarsest first
    pub fn axes_up_to(&self, level: usize) -> Vec<(usize, &Id)> {
        self.levels
            .iter()
            .take(level)
            .enumerate()
            .flat_map(|(i, l)| l.axes.iter().map(move |a| (i + 1, a)))
            .collect()
    }

    pub fn from_new(new_variant: NewFamilyVariant) -> Self {
        let mut variant = FamilyVariant::new(
            new_variant.id.unwrap_or_else(crate::model::generate_id),
            new_variant.code,
            new_variant.family_id,
            new_variant.levels,
        );
        variant.labels = new_variant.labels;
        variant
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewFamilyVariant {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Id>,
    pub code: String,
    pub family_id: Id,
    #[serde(default)]
    pub labels: Labels,
    pub levels: Vec<VariantLevel>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shirt_variant() -> FamilyVariant {
        FamilyVariant::new(
            "fv-shirt",
            "shirt_by_color_size",
            "fam-shirt",
            vec![
                VariantLevel::new(["color"], ["image"]),
                VariantLevel::new(["size"], ["ean"]),
            ],
        )
    }

    #[test]
    fn test_level_lookup_is_one_based() {
        let variant = shirt_variant();
        assert!(variant.level(0).is_none());
        assert_eq!(variant.level(1).unwrap().axes, vec!["color".to_string()]);
        assert!(variant.level(3).is_none());
    }

    #[test]
    fn test_level_of_common_attribute_is_zero() {
        let variant = shirt_variant();
        assert_eq!(variant.level_of("name"), 0);
        assert_eq!(variant.level_of("image"), 1);
        assert_eq!(variant.level_of("size"), 2);
    }

    #[test]
    fn test_axes_up_to() {
        let variant = shirt_variant();
        let axes: Vec<_> = variant
            .axes_up_to(2)
            .into_iter()
            .map(|(l, a)| (l, a.as_str()))
            .collect();
        assert_eq!(axes, vec![(1, "color"), (2, "size")]);
        assert!(variant.axes_up_to(0).is_empty());
    }
}
