use itertools::Itertools;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::logic::attribute_registry::AttributeRegistry;
use crate::logic::error::{CatalogError, CatalogResult};
use crate::logic::family_variant_model::FamilyVariantRegistry;
use crate::model::{Family, FamilyAttribute, FamilyUpdate, Id};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FamilyRegistry {
    families: BTreeMap<Id, Family>,
}

impl FamilyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.families.len()
    }

    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.families.contains_key(id)
    }

    pub fn get(&self, id: &str) -> CatalogResult<&Family> {
        self.families
            .get(id)
            .ok_or_else(|| CatalogError::FamilyNotFound(id.to_string()))
    }

    pub fn list(&self) -> Vec<&Family> {
        self.families
            .values()
            .sorted_by(|a, b| a.code.cmp(&b.code))
            .collect()
    }

    pub fn families_using<'a>(&'a self, attribute_id: &'a str) -> impl Iterator<Item = &'a Family> {
        self.families
            .values()
            .filter(move |f| f.contains(attribute_id))
    }

    pub fn define(&mut self, family: Family, attributes: &AttributeRegistry) -> CatalogResult<&Family> {
        if self.families.contains_key(&family.id) {
            return Err(CatalogError::DuplicateFamily(family.id));
        }
        if self.families.values().any(|f| f.code == family.code) {
            return Err(CatalogError::DuplicateFamily(family.code));
        }
        check_definition(&family.id, &family.attributes, attributes)?;

        debug!(
            "Defined family '{}' with {} attributes",
            family.code,
            family.attributes.len()
        );
        let id = family.id.clone();
        Ok(self.families.entry(id).or_insert(family))
    }

    /// Replace a family's definition. Attributes dropped from the family must
    /// not be claimed by any of its variant levels.
    pub fn update(
        &mut self,
        id: &str,
        update: FamilyUpdate,
        attributes: &AttributeRegistry,
        variants: &FamilyVariantRegistry,
    ) -> CatalogResult<&Family> {
        let mut family = self.get(id)?.clone();

        if let Some(code) = update.code {
            if self.families.values().any(|f| f.code == code && f.id != id) {
                return Err(CatalogError::DuplicateFamily(code));
            }
            family.code = code;
        }
        if let Some(labels) = update.labels {
            family.labels = labels;
        }
        if let Some(new_attributes) = update.attributes {
            check_definition(id, &new_attributes, attributes)?;
            for variant in variants.variants_of(id) {
                let dropped = variant
                    .levels
                    .iter()
                    .flat_map(|l| l.all_attributes())
                    .find(|a| !new_attributes.iter().any(|n| &n.attribute_id == *a));
                if let Some(attribute) = dropped {
                    return Err(CatalogError::FamilyAttributeInUse {
                        family: id.to_string(),
                        attribute: attribute.clone(),
                        variant: variant.id.clone(),
                    });
                }
            }
            family.attributes = new_attributes;
        }
        family.updated_at = chrono::Utc::now();

        debug!("Updated family '{}'", family.code);
        self.families.insert(id.to_string(), family);
        self.get(id)
    }

    pub fn delete(&mut self, id: &str, variants: &FamilyVariantRegistry) -> CatalogResult<Family> {
        self.get(id)?;
        let users: Vec<Id> = variants.variants_of(id).map(|v| v.id.clone()).collect();
        if !users.is_empty() {
            return Err(CatalogError::FamilyInUse {
                family: id.to_string(),
                variants: users,
            });
        }
        debug!("Deleted family '{}'", id);
        self.families
            .remove(id)
            .ok_or_else(|| CatalogError::FamilyNotFound(id.to_string()))
    }

    /// Attributes marked required, in family order
    pub fn required_attributes(&self, id: &str) -> CatalogResult<Vec<&FamilyAttribute>> {
        Ok(self.get(id)?.required_attributes().collect())
    }
}

fn check_definition(
    family_id: &str,
    members: &[FamilyAttribute],
    attributes: &AttributeRegistry,
) -> CatalogResult<()> {
    if let Some(missing) = members.iter().find(|m| !attributes.contains(&m.attribute_id)) {
        return Err(CatalogError::AttributeNotFound(missing.attribute_id.clone()));
    }
    if let Some(repeated) = members.iter().map(|m| &m.attribute_id).duplicates().next() {
        return Err(CatalogError::DuplicateAttributeInFamily {
            family: family_id.to_string(),
            attribute: repeated.clone(),
        });
    }
    let labels: Vec<Id> = members
        .iter()
        .filter(|m| m.label)
        .map(|m| m.attribute_id.clone())
        .collect();
    if labels.len() > 1 {
        return Err(CatalogError::MultipleLabelAttributes {
            family: family_id.to_string(),
            attributes: labels,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Attribute, AttributeType, FamilyVariant, VariantLevel};

    fn attributes() -> AttributeRegistry {
        let mut registry = AttributeRegistry::new();
        registry
            .define(Attribute::new("name", "name", AttributeType::Text))
            .unwrap();
        registry
            .define(Attribute::new("description", "description", AttributeType::Text))
            .unwrap();
        registry
            .define(
                Attribute::new("color", "color", AttributeType::SimpleSelect)
                    .with_options(["red", "blue"]),
            )
            .unwrap();
        registry
    }

    fn shirts() -> Family {
        Family::new(
            "shirts",
            "shirts",
            vec![
                FamilyAttribute::required("name").as_label(),
                FamilyAttribute::optional("description"),
                FamilyAttribute::required("color"),
            ],
        )
    }

    #[test]
    fn test_define_and_required_attributes() {
        let mut families = FamilyRegistry::new();
        families.define(shirts(), &attributes()).unwrap();

        let required: Vec<_> = families
            .required_attributes("shirts")
            .unwrap()
            .into_iter()
            .map(|a| a.attribute_id.as_str())
            .collect();
        assert_eq!(required, vec!["name", "color"]);
        assert_eq!(
            families.get("shirts").unwrap().label_attribute().map(|s| s.as_str()),
            Some("name")
        );
    }

    #[test]
    fn test_define_unknown_attribute() {
        let mut families = FamilyRegistry::new();
        let family = Family::new("f", "f", vec![FamilyAttribute::required("weight")]);
        assert_eq!(
            families.define(family, &attributes()).unwrap_err(),
            CatalogError::AttributeNotFound("weight".to_string())
        );
        assert!(families.is_empty());
    }

    #[test]
    fn test_define_duplicate_attribute() {
        let mut families = FamilyRegistry::new();
        let family = Family::new(
            "f",
            "f",
            vec![
                FamilyAttribute::required("name"),
                FamilyAttribute::optional("name"),
            ],
        );
        assert!(matches!(
            families.define(family, &attributes()),
            Err(CatalogError::DuplicateAttributeInFamily { .. })
        ));
    }

    #[test]
    fn test_define_multiple_labels() {
        let mut families = FamilyRegistry::new();
        let family = Family::new(
            "f",
            "f",
            vec![
                FamilyAttribute::required("name").as_label(),
                FamilyAttribute::optional("description").as_label(),
            ],
        );
        assert!(matches!(
            families.define(family, &attributes()),
            Err(CatalogError::MultipleLabelAttributes { .. })
        ));
    }

    #[test]
    fn test_define_duplicate_family() {
        let mut families = FamilyRegistry::new();
        families.define(shirts(), &attributes()).unwrap();
        assert_eq!(
            families.define(shirts(), &attributes()).unwrap_err(),
            CatalogError::DuplicateFamily("shirts".to_string())
        );
    }

    #[test]
    fn test_update_and_delete_respect_variants() {
        let attributes = attributes();
        let mut families = FamilyRegistry::new();
        families.define(shirts(), &attributes).unwrap();
        let mut variants = FamilyVariantRegistry::new();
        variants
            .define(
                FamilyVariant::new(
                    "shirts_by_color",
                    "shirts_by_color",
                    "shirts",
                    vec![VariantLevel::new(["color"], Vec::<Id>::new())],
                ),
                &families,
                &attributes,
            )
            .unwrap();

        let update = FamilyUpdate {
            attributes: Some(vec![FamilyAttribute::required("name")]),
            ..Default::default()
        };
        assert!(matches!(
            families.update("shirts", update, &attributes, &variants),
            Err(CatalogError::FamilyAttributeInUse { .. })
        ));
        assert!(matches!(
            families.delete("shirts", &variants),
            Err(CatalogError::FamilyInUse { .. })
        ));

        let update = FamilyUpdate {
            attributes: Some(vec![
                FamilyAttribute::required("name"),
                FamilyAttribute::optional("color"),
            ]),
            ..Default::default()
        };
        let family = families
            .update("shirts", update, &attributes, &variants)
            .unwrap();
        assert_eq!(family.required_attributes().count(), 1);

        families
            .delete("shirts", &FamilyVariantRegistry::new())
            .unwrap();
        assert!(!families.contains("shirts"));
    }
}
