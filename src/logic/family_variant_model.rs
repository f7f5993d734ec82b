use itertools::Itertools;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::logic::attribute_registry::AttributeRegistry;
use crate::logic::error::{CatalogError, CatalogResult};
use crate::logic::family_model::FamilyRegistry;
use crate::model::{Attribute, AttributeType, Family, FamilyVariant, Id};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FamilyVariantRegistry {
    variants: BTreeMap<Id, FamilyVariant>,
}

impl FamilyVariantRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    pub fn get(&self, id: &str) -> CatalogResult<&FamilyVariant> {
        self.variants
            .get(id)
            .ok_or_else(|| CatalogError::FamilyVariantNotFound(id.to_string()))
    }

    pub fn list(&self) -> Vec<&FamilyVariant> {
        self.variants
            .values()
            .sorted_by(|a, b| a.code.cmp(&b.code))
            .collect()
    }

    pub fn variants_of<'a>(&'a self, family_id: &'a str) -> impl Iterator<Item = &'a FamilyVariant> {
        self.variants
            .values()
            .filter(move |v| v.family_id == family_id)
    }

    pub fn define(
        &mut self,
        variant: FamilyVariant,
        families: &FamilyRegistry,
        attributes: &AttributeRegistry,
    ) -> CatalogResult<&FamilyVariant> {
        if self.variants.contains_key(&variant.id) {
            return Err(CatalogError::DuplicateFamilyVariant(variant.id));
        }
        if self.variants.values().any(|v| v.code == variant.code) {
            return Err(CatalogError::DuplicateFamilyVariant(variant.code));
        }
        let family = families.get(&variant.family_id)?;
        check_levels(&variant, family, attributes)?;

        debug!(
            "Defined family variant '{}' with {} levels on family '{}'",
            variant.code,
            variant.depth(),
            family.code
        );
        let id = variant.id.clone();
        Ok(self.variants.entry(id).or_insert(variant))
    }

    pub fn delete(&mut self, id: &str) -> CatalogResult<FamilyVariant> {
        debug!("Deleting family variant '{}'", id);
        self.variants
            .remove(id)
            .ok_or_else(|| CatalogError::FamilyVariantNotFound(id.to_string()))
    }

    /// The attribute set fixed for every variant sharing the same ancestor at
    /// `level`: the family's common attributes plus everything owned by
    /// levels `1..=level`.
    pub fn attributes_at_or_above_level(
        &self,
        id: &str,
        level: usize,
        families: &FamilyRegistry,
    ) -> CatalogResult<Vec<Id>> {
        let variant = self.get(id)?;
        let family = families.get(&variant.family_id)?;
        Ok(fixed_attributes(variant, family, level)
            .into_iter()
            .cloned()
            .collect())
    }
}

/// Common attributes in family order, then each level's axes and attributes
pub fn fixed_attributes<'a>(variant: &'a FamilyVariant, family: &'a Family, level: usize) -> Vec<&'a Id> {
    let common = family
        .attribute_ids()
        .filter(|a| variant.level_of(a) == 0);
    let levels = variant
        .levels
        .iter()
        .take(level)
        .flat_map(|l| l.all_attributes());
    common.chain(levels).collect()
}

/// Why `attribute` cannot identify a variant, if it cannot
pub fn axis_violation(attribute: &Attribute) -> Option<&'static str> {
    if attribute.scopable || attribute.localizable {
        Some("axes cannot be scopable or localizable")
    } else if matches!(
        attribute.attribute_type,
        AttributeType::MultiSelect | AttributeType::Media
    ) {
        Some("axes must hold a single comparable value")
    } else {
        None
    }
}

fn check_levels(
    variant: &FamilyVariant,
    family: &Family,
    attributes: &AttributeRegistry,
) -> CatalogResult<()> {
    if variant.levels.is_empty() {
        return Err(CatalogError::EmptyVariantLevel { level: 1 });
    }

    for (index, level) in variant.levels.iter().enumerate() {
        if level.axes.is_empty() {
            return Err(CatalogError::EmptyVariantLevel { level: index + 1 });
        }
        if let Some(outsider) = level.all_attributes().find(|a| !family.contains(a)) {
            return Err(CatalogError::AttributeNotInFamily {
                family: family.id.clone(),
                attribute: outsider.clone(),
            });
        }
    }

    if let Some(repeated) = variant
        .levels
        .iter()
        .flat_map(|l| l.all_attributes())
        .duplicates()
        .next()
    {
        return Err(CatalogError::AttributeAssignedToMultipleLevels {
            attribute: repeated.clone(),
        });
    }

    for axis in variant.levels.iter().flat_map(|l| l.axes.iter()) {
        if let Some(reason) = axis_violation(attributes.get(axis)?) {
            return Err(CatalogError::InvalidVariantAxis {
                attribute: axis.clone(),
                reason: reason.to_string(),
            });
        }
    }

    Ok(())
}
