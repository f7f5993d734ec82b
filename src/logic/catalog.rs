use log::debug;
use serde::{Deserialize, Serialize};

use crate::logic::attribute_registry::AttributeRegistry;
use crate::logic::category_tree::CategoryTree;
use crate::logic::error::{CatalogError, CatalogResult};
use crate::logic::family_model::FamilyRegistry;
use crate::logic::family_variant_model::{axis_violation, FamilyVariantRegistry};
use crate::logic::validate::{ProductValidator, VariantContext, Verdict};
use crate::model::{
    Attribute, AttributeOption, AttributeUpdate, Category, CategoryUpdate, ChannelLocales,
    DeletePolicy, Family, FamilyUpdate, FamilyVariant, Id, ProductInstance,
};

/// The schema side of the PIM: attributes, categories, families and family
/// variants, owned together so cross-registry rules can be enforced.
///
/// A `Catalog` is an explicitly constructed value. Readers work on a clone
/// (a snapshot); writers are serialized by the store that owns it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    attributes: AttributeRegistry,
    categories: CategoryTree,
    families: FamilyRegistry,
    family_variants: FamilyVariantRegistry,
}

/// Kinds of persisted catalog documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Attribute,
    Category,
    Family,
    FamilyVariant,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Attribute => "attribute",
            DocumentKind::Category => "category",
            DocumentKind::Family => "family",
            DocumentKind::FamilyVariant => "family_variant",
        }
    }

    pub fn parse(kind: &str) -> Option<Self> {
        match kind {
            "attribute" => Some(DocumentKind::Attribute),
            "category" => Some(DocumentKind::Category),
            "family" => Some(DocumentKind::Family),
            "family_variant" => Some(DocumentKind::FamilyVariant),
            _ => None,
        }
    }
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a catalog from stored definitions, re-checking every invariant
    pub fn from_parts(
        attributes: Vec<Attribute>,
        categories: Vec<Category>,
        families: Vec<Family>,
        family_variants: Vec<FamilyVariant>,
    ) -> CatalogResult<Self> {
        let mut catalog = Catalog {
            categories: CategoryTree::from_categories(categories)?,
            ..Default::default()
        };
        for attribute in attributes {
            catalog.check_category_refs(attribute.available_in_categories.as_deref())?;
            catalog.attributes.define(attribute)?;
        }
        for family in families {
            catalog.families.define(family, &catalog.attributes)?;
        }
        for variant in family_variants {
            catalog
                .family_variants
                .define(variant, &catalog.families, &catalog.attributes)?;
        }
        debug!(
            "Loaded catalog: {} attributes, {} categories, {} families, {} family variants",
            catalog.attributes.len(),
            catalog.categories.len(),
            catalog.families.len(),
            catalog.family_variants.len()
        );
        Ok(catalog)
    }

    /// Every definition as `(kind, id, json)`, parents before children
    pub fn documents(&self) -> serde_json::Result<Vec<(DocumentKind, Id, serde_json::Value)>> {
        let mut documents = Vec::new();
        for attribute in self.attributes.list() {
            documents.push((
                DocumentKind::Attribute,
                attribute.id.clone(),
                serde_json::to_value(attribute)?,
            ));
        }
        for category in self.categories.list() {
            documents.push((
                DocumentKind::Category,
                category.id.clone(),
                serde_json::to_value(category)?,
            ));
        }
        for family in self.families.list() {
            documents.push((
                DocumentKind::Family,
                family.id.clone(),
                serde_json::to_value(family)?,
            ));
        }
        for variant in self.family_variants.list() {
            documents.push((
                DocumentKind::FamilyVariant,
                variant.id.clone(),
                serde_json::to_value(variant)?,
            ));
        }
        Ok(documents)
    }

    pub fn attributes(&self) -> &AttributeRegistry {
        &self.attributes
    }

    pub fn categories(&self) -> &CategoryTree {
        &self.categories
    }

    pub fn families(&self) -> &FamilyRegistry {
        &self.families
    }

    pub fn family_variants(&self) -> &FamilyVariantRegistry {
        &self.family_variants
    }

    // Attributes

    pub fn define_attribute(&mut self, attribute: Attribute) -> CatalogResult<&Attribute> {
        self.check_category_refs(attribute.available_in_categories.as_deref())?;
        self.attributes.define(attribute)
    }

    pub fn update_attribute(&mut self, id: &str, update: AttributeUpdate) -> CatalogResult<&Attribute> {
        self.check_category_refs(update.available_in_categories.as_deref())?;
        if self.family_variants.list().iter().any(|v| v.is_axis(id)) {
            let mut updated = self.attributes.get(id)?.clone();
            updated.apply_update(update.clone());
            if let Some(reason) = axis_violation(&updated) {
                return Err(CatalogError::InvalidVariantAxis {
                    attribute: id.to_string(),
                    reason: reason.to_string(),
                });
            }
        }
        self.attributes.update(id, update)
    }

    pub fn delete_attribute(&mut self, id: &str) -> CatalogResult<Attribute> {
        self.attributes.delete(id, &self.families)
    }

    pub fn add_attribute_option(&mut self, id: &str, option: AttributeOption) -> CatalogResult<&Attribute> {
        self.attributes.add_option(id, option)
    }

    pub fn update_attribute_option(
        &mut self,
        id: &str,
        code: &str,
        option: AttributeOption,
    ) -> CatalogResult<&Attribute> {
        self.attributes.update_option(id, code, option)
    }

    pub fn remove_attribute_option(&mut self, id: &str, code: &str) -> CatalogResult<&Attribute> {
        self.attributes.remove_option(id, code)
    }

    pub fn reorder_attribute_options(&mut self, id: &str, order: &[String]) -> CatalogResult<&Attribute> {
        self.attributes.reorder_options(id, order)
    }

    // Categories

    pub fn insert_category(&mut self, category: Category, parent_id: Option<&str>) -> CatalogResult<&Category> {
        self.categories.insert(category, parent_id)
    }

    pub fn update_category(&mut self, id: &str, update: CategoryUpdate) -> CatalogResult<&Category> {
        self.categories.update(id, update)
    }

    pub fn move_category(&mut self, id: &str, new_parent: Option<&str>) -> CatalogResult<&Category> {
        self.categories.move_to(id, new_parent)
    }

    /// Categories still named by an attribute's category restriction cannot
    /// be removed
    pub fn delete_category(&mut self, id: &str, policy: DeletePolicy) -> CatalogResult<Vec<Id>> {
        let mut removed = vec![self.categories.get(id)?.id.clone()];
        if policy == DeletePolicy::CascadeDeleteSubtree {
            removed.extend(self.categories.descendants_of(id)?);
        }
        for category in &removed {
            let attributes: Vec<Id> = self
                .attributes
                .list()
                .into_iter()
                .filter(|a| {
                    a.available_in_categories
                        .as_ref()
                        .is_some_and(|allowed| allowed.contains(category))
                })
                .map(|a| a.id.clone())
                .collect();
            if !attributes.is_empty() {
                return Err(CatalogError::CategoryInUse {
                    category: category.clone(),
                    attributes,
                });
            }
        }
        self.categories.delete(id, policy)
    }

    // Families

    pub fn define_family(&mut self, family: Family) -> CatalogResult<&Family> {
        self.families.define(family, &self.attributes)
    }

    pub fn update_family(&mut self, id: &str, update: FamilyUpdate) -> CatalogResult<&Family> {
        self.families
            .update(id, update, &self.attributes, &self.family_variants)
    }

    pub fn delete_family(&mut self, id: &str) -> CatalogResult<Family> {
        self.families.delete(id, &self.family_variants)
    }

    // Family variants

    pub fn define_family_variant(&mut self, variant: FamilyVariant) -> CatalogResult<&FamilyVariant> {
        self.family_variants
            .define(variant, &self.families, &self.attributes)
    }

    pub fn delete_family_variant(&mut self, id: &str) -> CatalogResult<FamilyVariant> {
        self.family_variants.delete(id)
    }

    pub fn attributes_at_or_above_level(&self, variant_id: &str, level: usize) -> CatalogResult<Vec<Id>> {
        self.family_variants
            .attributes_at_or_above_level(variant_id, level, &self.families)
    }

    // Validation

    pub fn validate(
        &self,
        instance: &ProductInstance,
        context: &VariantContext<'_>,
        settings: &ChannelLocales,
    ) -> Verdict {
        ProductValidator::validate(instance, self, context, settings)
    }

    fn check_category_refs(&self, categories: Option<&[Id]>) -> CatalogResult<()> {
        if let Some(missing) = categories
            .unwrap_or_default()
            .iter()
            .find(|c| !self.categories.contains(c))
        {
            return Err(CatalogError::CategoryNotFound(missing.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AttributeType, FamilyAttribute, VariantLevel};

    fn catalog() -> Catalog {
        let mut catalog = Catalog::new();
        catalog
            .insert_category(Category::new("root", "root"), None)
            .unwrap();
        catalog
            .insert_category(Category::new("shirts", "shirts"), Some("root"))
            .unwrap();
        catalog
            .define_attribute(Attribute::new("name", "name", AttributeType::Text))
            .unwrap();
        catalog
            .define_attribute(
                Attribute::new("color", "color", AttributeType::SimpleSelect)
                    .with_options(["red", "blue"]),
            )
            .unwrap();
        catalog
            .define_family(Family::new(
                "shirts",
                "shirts",
                vec![
                    FamilyAttribute::required("name"),
                    FamilyAttribute::required("color"),
                ],
            ))
            .unwrap();
        catalog
            .define_family_variant(FamilyVariant::new(
                "by_color",
                "by_color",
                "shirts",
                vec![VariantLevel::new(["color"], Vec::<Id>::new())],
            ))
            .unwrap();
        catalog
    }

    #[test]
    fn test_documents_round_trip_through_parts() {
        let catalog = catalog();
        let documents = catalog.documents().unwrap();
        assert_eq!(documents.len(), 6);

        let mut attributes = Vec::new();
        let mut categories = Vec::new();
        let mut families = Vec::new();
        let mut variants = Vec::new();
        for (kind, _, body) in documents {
            match kind {
                DocumentKind::Attribute => attributes.push(serde_json::from_value(body).unwrap()),
                DocumentKind::Category => categories.push(serde_json::from_value(body).unwrap()),
                DocumentKind::Family => families.push(serde_json::from_value(body).unwrap()),
                DocumentKind::FamilyVariant => variants.push(serde_json::from_value(body).unwrap()),
            }
        }
        let restored = Catalog::from_parts(attributes, categories, families, variants).unwrap();
        assert_eq!(restored, catalog);
    }

    #[test]
    fn test_attribute_category_restriction_must_exist() {
        let mut catalog = catalog();
        let mut attribute = Attribute::new("fit", "fit", AttributeType::Text);
        attribute.available_in_categories = Some(vec!["pants".to_string()]);
        assert_eq!(
            catalog.define_attribute(attribute).unwrap_err(),
            CatalogError::CategoryNotFound("pants".to_string())
        );
    }

    #[test]
    fn test_axis_cannot_become_scopable() {
        let mut catalog = catalog();
        let update = AttributeUpdate {
            scopable: Some(true),
            ..Default::default()
        };
        assert!(matches!(
            catalog.update_attribute("color", update),
            Err(CatalogError::InvalidVariantAxis { .. })
        ));
    }

    #[test]
    fn test_axis_cannot_change_to_multi_value_type() {
        let mut catalog = catalog();
        let update = AttributeUpdate {
            attribute_type: Some(AttributeType::MultiSelect),
            ..Default::default()
        };
        assert!(matches!(
            catalog.update_attribute("color", update),
            Err(CatalogError::InvalidVariantAxis { .. })
        ));
        assert_eq!(
            catalog.attributes().get("color").unwrap().attribute_type,
            AttributeType::SimpleSelect
        );

        // Attributes that are not axes may change type freely
        let update = AttributeUpdate {
            attribute_type: Some(AttributeType::Media),
            ..Default::default()
        };
        assert!(catalog.update_attribute("name", update).is_ok());
    }

    #[test]
    fn test_restricting_category_cannot_be_deleted() {
        let mut catalog = catalog();
        let mut fabric = Attribute::new("fabric", "fabric", AttributeType::Text);
        fabric.available_in_categories = Some(vec!["shirts".to_string()]);
        catalog.define_attribute(fabric).unwrap();

        // The restriction is found below a cascaded root as well
        assert_eq!(
            catalog
                .delete_category("root", DeletePolicy::CascadeDeleteSubtree)
                .unwrap_err(),
            CatalogError::CategoryInUse {
                category: "shirts".to_string(),
                attributes: vec!["fabric".to_string()],
            }
        );
        assert_eq!(catalog.categories().len(), 2);

        catalog
            .update_attribute(
                "fabric",
                AttributeUpdate {
                    available_in_categories: Some(vec!["root".to_string()]),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(
            catalog
                .delete_category("shirts", DeletePolicy::RejectIfHasChildren)
                .unwrap(),
            vec!["shirts".to_string()]
        );
    }

    #[test]
    fn test_from_parts_rejects_restriction_to_missing_category() {
        let mut fabric = Attribute::new("fabric", "fabric", AttributeType::Text);
        fabric.available_in_categories = Some(vec!["gone".to_string()]);
        assert_eq!(
            Catalog::from_parts(vec![fabric], Vec::new(), Vec::new(), Vec::new()).unwrap_err(),
            CatalogError::CategoryNotFound("gone".to_string())
        );
    }

    #[test]
    fn test_delete_order_follows_references() {
        let mut catalog = catalog();
        assert!(matches!(
            catalog.delete_attribute("color"),
            Err(CatalogError::AttributeInUse { .. })
        ));
        assert!(matches!(
            catalog.delete_family("shirts"),
            Err(CatalogError::FamilyInUse { .. })
        ));
        catalog.delete_family_variant("by_color").unwrap();
        catalog.delete_family("shirts").unwrap();
        catalog.delete_attribute("color").unwrap();
        assert!(catalog.families().is_empty());
    }
}
