use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::logic::catalog::Catalog;
use crate::model::{
    Attribute, AttributeType, ChannelLocales, Family, FamilyVariant, Id, InstanceKind,
    ProductInstance, ProductValue, ValueKey,
};

/// One reason an instance does not conform to its schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Violation {
    /// The assigned family / family variant (or level) could not be resolved
    SchemaNotFound { reference: Option<Id> },
    UnknownAttribute { attribute: Id },
    /// The scope/locale of a value does not fit the attribute's flags or the
    /// configured channels and locales
    InvalidValueScope {
        attribute: Id,
        scope: Option<String>,
        locale: Option<String>,
    },
    MissingRequiredValue {
        attribute: Id,
        scope: Option<String>,
        locale: Option<String>,
    },
    TypeMismatch {
        attribute: Id,
        expected: AttributeType,
    },
    InvalidOptionValue { attribute: Id, value: String },
    AttributeNotInCategory { attribute: Id },
    UnknownCategory { category: Id },
    VariantAxisViolation { level: usize, attribute: Id },
}

/// Outcome of validating one instance. `Invalid` always carries at least
/// one reason, in check order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reasons", rename_all = "snake_case")]
pub enum Verdict {
    Valid,
    Invalid(Vec<Violation>),
}

impl Verdict {
    pub fn from_reasons(reasons: Vec<Violation>) -> Self {
        if reasons.is_empty() {
            Verdict::Valid
        } else {
            Verdict::Invalid(reasons)
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Verdict::Valid)
    }

    pub fn reasons(&self) -> &[Violation] {
        match self {
            Verdict::Valid => &[],
            Verdict::Invalid(reasons) => reasons,
        }
    }
}

/// Where an instance sits in its product model hierarchy.
///
/// `ancestors` runs from the immediate parent up to the root model.
/// `siblings` are other instances of the same family variant and level that
/// share those ancestors.
#[derive(Debug, Clone, Copy, Default)]
pub struct VariantContext<'a> {
    pub ancestors: &'a [ProductInstance],
    pub siblings: &'a [ProductInstance],
}

impl<'a> VariantContext<'a> {
    pub fn new(ancestors: &'a [ProductInstance], siblings: &'a [ProductInstance]) -> Self {
        Self {
            ancestors,
            siblings,
        }
    }
}

type ValueMap<'v> = HashMap<ValueKey<'v>, &'v ProductValue>;

/// Values visible on an instance: its own on top of everything inherited
fn effective_values<'v>(own: &'v ProductInstance, ancestors: &'v [ProductInstance]) -> ValueMap<'v> {
    let mut values = HashMap::new();
    for ancestor in ancestors.iter().rev() {
        for value in &ancestor.values {
            values.insert(value.key(), value);
        }
    }
    for value in &own.values {
        values.insert(value.key(), value);
    }
    values
}

fn present<'v>(values: &ValueMap<'v>, key: ValueKey<'v>) -> bool {
    values.get(&key).is_some_and(|v| !v.is_empty())
}

fn data_at<'v>(values: &ValueMap<'v>, key: ValueKey<'v>) -> Option<&'v serde_json::Value> {
    values.get(&key).map(|v| &v.data)
}

struct ResolvedSchema<'c> {
    family: &'c Family,
    variant: Option<&'c FamilyVariant>,
}

/// Structural validation of product models, products and variants.
///
/// Stateless: every call is a pure function of the instance, the catalog
/// snapshot, the hierarchy context and the channel/locale settings.
pub struct ProductValidator;

impl ProductValidator {
    pub fn validate(
        instance: &ProductInstance,
        catalog: &Catalog,
        context: &VariantContext<'_>,
        settings: &ChannelLocales,
    ) -> Verdict {
        let schema = match Self::resolve_schema(instance, catalog) {
            Ok(schema) => schema,
            Err(violation) => return Verdict::Invalid(vec![violation]),
        };

        if let Some(variant) = schema.variant {
            if let Err(violation) = Self::check_parent(instance, variant, context) {
                return Verdict::Invalid(vec![violation]);
            }
        }

        let effective = effective_values(instance, context.ancestors);
        let mut reasons = Vec::new();

        Self::check_attribute_membership(instance, &schema, catalog, settings, &mut reasons);
        Self::check_required_values(instance, &schema, catalog, &effective, settings, &mut reasons);
        Self::check_value_contents(instance, &schema, catalog, context, &mut reasons);
        Self::check_categories(instance, catalog, &mut reasons);
        if let Some(variant) = schema.variant {
            Self::check_variant_axes(instance, &schema, variant, context, &effective, &mut reasons);
        }

        Verdict::from_reasons(reasons)
    }

    fn resolve_schema<'c>(
        instance: &ProductInstance,
        catalog: &'c Catalog,
    ) -> Result<ResolvedSchema<'c>, Violation> {
        let not_found = |reference: Option<&Id>| Violation::SchemaNotFound {
            reference: reference.cloned(),
        };

        match &instance.family_variant_id {
            Some(variant_id) => {
                let variant = catalog
                    .family_variants()
                    .get(variant_id)
                    .map_err(|_| not_found(Some(variant_id)))?;
                let family = catalog
                    .families()
                    .get(&variant.family_id)
                    .map_err(|_| not_found(Some(&variant.family_id)))?;
                if let Some(declared) = &instance.family_id {
                    if declared != &family.id {
                        return Err(not_found(Some(declared)));
                    }
                }
                if instance.level > variant.depth()
                    || (instance.kind == InstanceKind::Variant && instance.level == 0)
                {
                    return Err(Violation::SchemaNotFound {
                        reference: Some(format!("{}#level{}", variant_id, instance.level)),
                    });
                }
                Ok(ResolvedSchema {
                    family,
                    variant: Some(variant),
                })
            }
            None => {
                if instance.kind == InstanceKind::Variant || instance.level > 0 {
                    return Err(not_found(None));
                }
                let family_id = instance.family_id.as_ref().ok_or_else(|| not_found(None))?;
                let family = catalog
                    .families()
                    .get(family_id)
                    .map_err(|_| not_found(Some(family_id)))?;
                Ok(ResolvedSchema {
                    family,
                    variant: None,
                })
            }
        }
    }

    /// A variant at level n hangs below an instance of the same family
    /// variant at level n - 1; values are only inherited through that chain
    fn check_parent(
        instance: &ProductInstance,
        variant: &FamilyVariant,
        context: &VariantContext<'_>,
    ) -> Result<(), Violation> {
        if instance.level == 0 {
            return Ok(());
        }
        let parent_matches = context.ancestors.first().is_some_and(|parent| {
            instance.parent_id.as_ref() == Some(&parent.id)
                && parent.family_variant_id.as_deref() == Some(variant.id.as_str())
                && parent.level + 1 == instance.level
        });
        if parent_matches {
            Ok(())
        } else {
            Err(Violation::SchemaNotFound {
                reference: instance.parent_id.clone(),
            })
        }
    }

    /// Attribute keys must belong to the family, with scope and locale
    /// matching the attribute's flags
    fn check_attribute_membership(
        instance: &ProductInstance,
        schema: &ResolvedSchema<'_>,
        catalog: &Catalog,
        settings: &ChannelLocales,
        reasons: &mut Vec<Violation>,
    ) {
        let mut reported = HashSet::new();
        for value in &instance.values {
            let attribute = match Self::family_attribute(schema, catalog, &value.attribute) {
                Some(attribute) => attribute,
                None => {
                    if reported.insert(value.attribute.as_str()) {
                        reasons.push(Violation::UnknownAttribute {
                            attribute: value.attribute.clone(),
                        });
                    }
                    continue;
                }
            };

            let scope_ok = match (&value.scope, attribute.scopable) {
                (Some(scope), true) => settings.has_channel(scope),
                (None, false) => true,
                _ => false,
            };
            let locale_ok = match (&value.locale, attribute.localizable) {
                (Some(locale), true) => settings.has_locale(locale),
                (None, false) => true,
                _ => false,
            };
            if !scope_ok || !locale_ok {
                reasons.push(Violation::InvalidValueScope {
                    attribute: value.attribute.clone(),
                    scope: value.scope.clone(),
                    locale: value.locale.clone(),
                });
            }
        }
    }

    /// Required attributes (and variant axes) owned at or above the
    /// instance's level need a value per channel and locale
    fn check_required_values(
        instance: &ProductInstance,
        schema: &ResolvedSchema<'_>,
        catalog: &Catalog,
        effective: &ValueMap<'_>,
        settings: &ChannelLocales,
        reasons: &mut Vec<Violation>,
    ) {
        for member in &schema.family.attributes {
            let needed = match schema.variant {
                None => member.required,
                Some(variant) => {
                    let owner = variant.level_of(&member.attribute_id);
                    owner <= instance.level && (member.required || variant.is_axis(&member.attribute_id))
                }
            };
            if !needed {
                continue;
            }
            let Ok(attribute) = catalog.attributes().get(&member.attribute_id) else {
                continue;
            };

            let scopes: Vec<Option<&str>> = if attribute.scopable {
                settings.channels.iter().map(|c| Some(c.as_str())).collect()
            } else {
                vec![None]
            };
            let locales: Vec<Option<&str>> = if attribute.localizable {
                settings.locales.iter().map(|l| Some(l.as_str())).collect()
            } else {
                vec![None]
            };

            for &scope in &scopes {
                for &locale in &locales {
                    if !present(effective, (attribute.id.as_str(), scope, locale)) {
                        reasons.push(Violation::MissingRequiredValue {
                            attribute: attribute.id.clone(),
                            scope: scope.map(str::to_string),
                            locale: locale.map(str::to_string),
                        });
                    }
                }
            }
        }
    }

    /// Data types, select options and category restrictions of the
    /// instance's own values
    fn check_value_contents(
        instance: &ProductInstance,
        schema: &ResolvedSchema<'_>,
        catalog: &Catalog,
        context: &VariantContext<'_>,
        reasons: &mut Vec<Violation>,
    ) {
        let mut restricted_reported = HashSet::new();
        for value in &instance.values {
            let Some(attribute) = Self::family_attribute(schema, catalog, &value.attribute) else {
                continue;
            };
            if value.data.is_null() {
                continue;
            }

            if !type_matches(attribute.attribute_type, &value.data) {
                reasons.push(Violation::TypeMismatch {
                    attribute: attribute.id.clone(),
                    expected: attribute.attribute_type,
                });
            } else if attribute.attribute_type.is_select() {
                for code in selected_codes(&value.data) {
                    if !attribute.has_option(code) {
                        reasons.push(Violation::InvalidOptionValue {
                            attribute: attribute.id.clone(),
                            value: code.to_string(),
                        });
                    }
                }
            }

            if let Some(allowed) = &attribute.available_in_categories {
                let classified = instance
                    .categories
                    .iter()
                    .chain(context.ancestors.iter().flat_map(|a| a.categories.iter()))
                    .any(|c| catalog.categories().is_within_any(c, allowed));
                if !value.is_empty() && !classified && restricted_reported.insert(attribute.id.as_str()) {
                    reasons.push(Violation::AttributeNotInCategory {
                        attribute: attribute.id.clone(),
                    });
                }
            }
        }
    }

    fn check_categories(instance: &ProductInstance, catalog: &Catalog, reasons: &mut Vec<Violation>) {
        for category in &instance.categories {
            if !catalog.categories().contains(category) {
                reasons.push(Violation::UnknownCategory {
                    category: category.clone(),
                });
            }
        }
    }

    /// Own values must sit at the level that owns them and must not override
    /// the parent. Siblings sharing axis values up to some level must agree on
    /// everything owned by that level.
    fn check_variant_axes(
        instance: &ProductInstance,
        schema: &ResolvedSchema<'_>,
        variant: &FamilyVariant,
        context: &VariantContext<'_>,
        effective: &ValueMap<'_>,
        reasons: &mut Vec<Violation>,
    ) {
        let level = instance.level;
        let mut reported: HashSet<(usize, Id)> = HashSet::new();
        let mut report = |reasons: &mut Vec<Violation>, level: usize, attribute: &str| {
            if reported.insert((level, attribute.to_string())) {
                reasons.push(Violation::VariantAxisViolation {
                    level,
                    attribute: attribute.to_string(),
                });
            }
        };

        let inherited = context
            .ancestors
            .split_first()
            .map(|(parent, rest)| effective_values(parent, rest));

        for value in &instance.values {
            if !schema.family.contains(&value.attribute) {
                continue;
            }
            let owner = variant.level_of(&value.attribute);
            if owner > level {
                report(reasons, owner, value.attribute.as_str());
            } else if owner < level {
                let parent_data = inherited
                    .as_ref()
                    .and_then(|parent_values| data_at(parent_values, value.key()));
                if parent_data.is_some_and(|data| data != &value.data) {
                    report(reasons, owner, value.attribute.as_str());
                }
            }
        }

        if level == 0 {
            return;
        }

        let axes = variant.axes_up_to(level);
        for sibling in context.siblings {
            if sibling.id == instance.id
                || sibling.level != level
                || sibling.family_variant_id.as_deref() != Some(variant.id.as_str())
            {
                continue;
            }
            let theirs = effective_values(sibling, context.ancestors);
            let axis_equal = |axis: &str| {
                data_at(effective, (axis, None, None)) == data_at(&theirs, (axis, None, None))
            };

            for shared in 0..level {
                let diverged = axes
                    .iter()
                    .filter(|(axis_level, _)| *axis_level <= shared)
                    .any(|(_, axis)| !axis_equal(axis.as_str()));
                if diverged {
                    break;
                }
                for attribute in owned_by_level(schema.family, variant, shared) {
                    if !same_values(effective, &theirs, attribute) {
                        report(reasons, shared, attribute.as_str());
                    }
                }
            }

            let duplicate = axes.iter().all(|(_, axis)| axis_equal(axis.as_str()));
            if duplicate {
                if let Some(axis) = variant.level(level).and_then(|l| l.axes.first()) {
                    report(reasons, level, axis.as_str());
                }
            }
        }
    }

    /// The catalog attribute behind a family member, if both exist
    fn family_attribute<'c>(
        schema: &ResolvedSchema<'c>,
        catalog: &'c Catalog,
        attribute_id: &str,
    ) -> Option<&'c Attribute> {
        if !schema.family.contains(attribute_id) {
            return None;
        }
        catalog.attributes().get(attribute_id).ok()
    }
}

/// Attributes whose values are owned by exactly `level` (0 = common)
fn owned_by_level<'a>(family: &'a Family, variant: &'a FamilyVariant, level: usize) -> Vec<&'a Id> {
    match variant.level(level) {
        Some(definition) => definition.all_attributes().collect(),
        None => family
            .attribute_ids()
            .filter(|a| variant.level_of(a) == 0)
            .collect(),
    }
}

fn same_values<'v>(ours: &ValueMap<'v>, theirs: &ValueMap<'v>, attribute: &str) -> bool {
    let keys: HashSet<ValueKey<'v>> = ours
        .keys()
        .chain(theirs.keys())
        .filter(|(a, _, _)| *a == attribute)
        .copied()
        .collect();
    keys.into_iter()
        .all(|key| data_at(ours, key) == data_at(theirs, key))
}

fn type_matches(attribute_type: AttributeType, data: &serde_json::Value) -> bool {
    use serde_json::Value;
    match (attribute_type, data) {
        (AttributeType::Text | AttributeType::Media | AttributeType::SimpleSelect, Value::String(_)) => true,
        (AttributeType::Number, Value::Number(_)) => true,
        (AttributeType::Boolean, Value::Bool(_)) => true,
        (AttributeType::Date, Value::String(s)) => {
            chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
                || chrono::DateTime::parse_from_rfc3339(s).is_ok()
        }
        (AttributeType::MultiSelect, Value::Array(items)) => items.iter().all(Value::is_string),
        _ => false,
    }
}

fn selected_codes(data: &serde_json::Value) -> Vec<&str> {
    match data {
        serde_json::Value::String(code) => vec![code.as_str()],
        serde_json::Value::Array(items) => items.iter().filter_map(|i| i.as_str()).collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Category, FamilyAttribute, VariantLevel};
    use serde_json::json;

    fn settings() -> ChannelLocales {
        ChannelLocales::new(["ecommerce", "mobile"], ["en_US", "ar_EG"])
    }

    fn catalog() -> Catalog {
        let mut catalog = Catalog::new();
        catalog
            .insert_category(Category::new("apparel", "apparel"), None)
            .unwrap();
        catalog
            .insert_category(Category::new("shirts", "shirts"), Some("apparel"))
            .unwrap();
        catalog
            .insert_category(Category::new("electronics", "electronics"), None)
            .unwrap();

        let mut fabric = Attribute::new("fabric", "fabric", AttributeType::Text);
        fabric.available_in_categories = Some(vec!["apparel".to_string()]);
        for attribute in [
            Attribute::new("sku", "sku", AttributeType::Text),
            Attribute::new("name", "name", AttributeType::Text).localizable(),
            Attribute::new("price", "price", AttributeType::Number).scopable(),
            Attribute::new("color", "color", AttributeType::SimpleSelect)
                .with_options(["red", "blue"]),
            Attribute::new("size", "size", AttributeType::SimpleSelect)
                .with_options(["s", "m", "l"]),
            Attribute::new("tags", "tags", AttributeType::MultiSelect)
                .with_options(["new", "sale"]),
            Attribute::new("image", "image", AttributeType::Media),
            Attribute::new("release", "release", AttributeType::Date),
            Attribute::new("notes", "notes", AttributeType::Text),
            fabric,
        ] {
            catalog.define_attribute(attribute).unwrap();
        }

        catalog
            .define_family(Family::new(
                "shirts",
                "shirts",
                vec![
                    FamilyAttribute::required("sku").as_label(),
                    FamilyAttribute::optional("notes"),
                    FamilyAttribute::required("name"),
                    FamilyAttribute::optional("price"),
                    FamilyAttribute::required("color"),
                    FamilyAttribute::optional("size"),
                    FamilyAttribute::optional("tags"),
                    FamilyAttribute::optional("image"),
                    FamilyAttribute::optional("release"),
                    FamilyAttribute::optional("fabric"),
                ],
            ))
            .unwrap();
        catalog
            .define_family_variant(FamilyVariant::new(
                "shirts_by_color_size",
                "shirts_by_color_size",
                "shirts",
                vec![
                    VariantLevel::new(["color"], ["image"]),
                    VariantLevel::new(["size"], ["sku"]),
                ],
            ))
            .unwrap();
        catalog
    }

    fn complete_product() -> ProductInstance {
        ProductInstance::product("p1", "P1", "shirts")
            .with_value(ProductValue::new("sku", json!("SKU-1")))
            .with_value(ProductValue::new("name", json!("Shirt")).localized("en_US"))
            .with_value(ProductValue::new("name", json!("قميص")).localized("ar_EG"))
            .with_value(ProductValue::new("color", json!("red")))
    }

    fn validate(instance: &ProductInstance, catalog: &Catalog) -> Verdict {
        ProductValidator::validate(instance, catalog, &VariantContext::default(), &settings())
    }

    #[test]
    fn test_complete_product_is_valid() {
        let verdict = validate(&complete_product(), &catalog());
        assert_eq!(verdict, Verdict::Valid);
        assert!(verdict.reasons().is_empty());
    }

    #[test]
    fn test_missing_required_then_added() {
        let mut catalog = catalog();
        catalog
            .define_family(Family::new(
                "simple",
                "simple",
                vec![
                    FamilyAttribute::required("sku"),
                    FamilyAttribute::optional("notes"),
                ],
            ))
            .unwrap();

        let product = ProductInstance::product("p", "P", "simple")
            .with_value(ProductValue::new("notes", json!("hello")));
        assert_eq!(
            validate(&product, &catalog),
            Verdict::Invalid(vec![Violation::MissingRequiredValue {
                attribute: "sku".to_string(),
                scope: None,
                locale: None,
            }])
        );

        let product = product.with_value(ProductValue::new("sku", json!("S")));
        assert!(validate(&product, &catalog).is_valid());
    }

    #[test]
    fn test_required_per_locale_and_channel() {
        let mut priced = catalog();
        priced
            .define_family(Family::new(
                "priced",
                "priced",
                vec![FamilyAttribute::required("price")],
            ))
            .unwrap();
        let product = ProductInstance::product("p", "P", "priced")
            .with_value(ProductValue::new("price", json!(10)).scoped("ecommerce"));
        assert_eq!(
            validate(&product, &priced).reasons(),
            &[Violation::MissingRequiredValue {
                attribute: "price".to_string(),
                scope: Some("mobile".to_string()),
                locale: None,
            }]
        );

        let product = complete_product();
        let mut only_english = product.clone();
        only_english.values.retain(|v| v.locale.as_deref() != Some("ar_EG"));
        assert_eq!(
            validate(&only_english, &catalog()).reasons(),
            &[Violation::MissingRequiredValue {
                attribute: "name".to_string(),
                scope: None,
                locale: Some("ar_EG".to_string()),
            }]
        );
    }

    #[test]
    fn test_empty_value_counts_as_missing() {
        let product = complete_product().with_value(ProductValue::new("sku", json!("")));
        assert!(matches!(
            validate(&product, &catalog()).reasons(),
            [Violation::MissingRequiredValue { attribute, .. }] if attribute == "sku"
        ));
    }

    #[test]
    fn test_invalid_option_value() {
        let catalog = catalog();
        let product = complete_product().with_value(ProductValue::new("color", json!("green")));
        assert_eq!(
            validate(&product, &catalog).reasons(),
            &[Violation::InvalidOptionValue {
                attribute: "color".to_string(),
                value: "green".to_string(),
            }]
        );

        let product = complete_product()
            .with_value(ProductValue::new("tags", json!(["new", "clearance", "gift"])));
        assert_eq!(validate(&product, &catalog).reasons().len(), 2);
    }

    #[test]
    fn test_unknown_attribute_and_category_collected_together() {
        let product = complete_product()
            .with_value(ProductValue::new("weight", json!(3)))
            .with_value(ProductValue::new("weight", json!(4)).scoped("mobile"))
            .with_value(ProductValue::new("color", json!("green")))
            .in_category("ghost");
        assert_eq!(
            validate(&product, &catalog()),
            Verdict::Invalid(vec![
                Violation::UnknownAttribute {
                    attribute: "weight".to_string()
                },
                Violation::InvalidOptionValue {
                    attribute: "color".to_string(),
                    value: "green".to_string(),
                },
                Violation::UnknownCategory {
                    category: "ghost".to_string()
                },
            ])
        );
    }

    #[test]
    fn test_value_scope_must_match_flags() {
        let product = complete_product()
            .with_value(ProductValue::new("notes", json!("x")).localized("en_US"))
            .with_value(ProductValue::new("price", json!(3)).scoped("print"));
        let reasons = validate(&product, &catalog()).reasons().to_vec();
        assert_eq!(reasons.len(), 2);
        assert!(reasons
            .iter()
            .all(|r| matches!(r, Violation::InvalidValueScope { .. })));
    }

    #[test]
    fn test_type_mismatch() {
        let product = complete_product()
            .with_value(ProductValue::new("release", json!("not a date")))
            .with_value(ProductValue::new("notes", json!(12)));
        assert_eq!(
            validate(&product, &catalog()).reasons(),
            &[
                Violation::TypeMismatch {
                    attribute: "release".to_string(),
                    expected: AttributeType::Date,
                },
                Violation::TypeMismatch {
                    attribute: "notes".to_string(),
                    expected: AttributeType::Text,
                },
            ]
        );

        let dated = complete_product().with_value(ProductValue::new("release", json!("2024-05-01")));
        assert!(validate(&dated, &catalog()).is_valid());
    }

    #[test]
    fn test_category_restricted_attribute() {
        let catalog = catalog();
        let product = complete_product().with_value(ProductValue::new("fabric", json!("cotton")));
        assert_eq!(
            validate(&product, &catalog).reasons(),
            &[Violation::AttributeNotInCategory {
                attribute: "fabric".to_string()
            }]
        );
        // A descendant of the allowed category qualifies
        let product = product.in_category("shirts");
        assert!(validate(&product, &catalog).is_valid());
    }

    #[test]
    fn test_schema_not_found_short_circuits() {
        let product = ProductInstance::product("p", "P", "ghost")
            .with_value(ProductValue::new("weight", json!(1)))
            .in_category("nowhere");
        assert_eq!(
            validate(&product, &catalog()),
            Verdict::Invalid(vec![Violation::SchemaNotFound {
                reference: Some("ghost".to_string())
            }])
        );

        let unassigned = ProductInstance::new("x", "X", InstanceKind::Product);
        assert_eq!(
            validate(&unassigned, &catalog()).reasons(),
            &[Violation::SchemaNotFound { reference: None }]
        );

        let too_deep = ProductInstance::variant("v", "V", "shirts_by_color_size", "m", 3);
        assert!(matches!(
            validate(&too_deep, &catalog()).reasons(),
            [Violation::SchemaNotFound { .. }]
        ));
    }

    fn root_model() -> ProductInstance {
        ProductInstance::root_model("model", "MODEL", "shirts_by_color_size")
            .with_value(ProductValue::new("name", json!("Shirt")).localized("en_US"))
            .with_value(ProductValue::new("name", json!("قميص")).localized("ar_EG"))
            .in_category("shirts")
    }

    fn color_model(id: &str, color: &str) -> ProductInstance {
        ProductInstance::variant(id, id, "shirts_by_color_size", "model", 1)
            .with_value(ProductValue::new("color", json!(color)))
    }

    fn sized(id: &str, parent: &str, size: &str) -> ProductInstance {
        ProductInstance::variant(id, id, "shirts_by_color_size", parent, 2)
            .with_value(ProductValue::new("size", json!(size)))
            .with_value(ProductValue::new("sku", json!(format!("SKU-{}", id))))
    }

    #[test]
    fn test_root_model_only_needs_common_attributes() {
        let verdict = validate(&root_model(), &catalog());
        assert_eq!(verdict, Verdict::Valid);

        let with_size = root_model().with_value(ProductValue::new("size", json!("m")));
        assert_eq!(
            validate(&with_size, &catalog()).reasons(),
            &[Violation::VariantAxisViolation {
                level: 2,
                attribute: "size".to_string()
            }]
        );
    }

    #[test]
    fn test_variant_inherits_from_ancestors() {
        let catalog = catalog();
        let red = color_model("red", "red");
        let ancestors = vec![red.clone(), root_model()];
        let small = sized("red-s", "red", "s");

        let verdict = ProductValidator::validate(
            &small,
            &catalog,
            &VariantContext::new(&ancestors, &[]),
            &settings(),
        );
        assert_eq!(verdict, Verdict::Valid);

        // Without its parent chain nothing can be inherited
        assert_eq!(
            validate(&small, &catalog).reasons(),
            &[Violation::SchemaNotFound {
                reference: Some("red".to_string())
            }]
        );
    }

    #[test]
    fn test_parent_must_belong_to_same_family_variant() {
        let mut catalog = catalog();
        catalog
            .define_family(Family::new(
                "mugs",
                "mugs",
                vec![
                    FamilyAttribute::required("name"),
                    FamilyAttribute::required("color"),
                ],
            ))
            .unwrap();
        let mug = ProductInstance::product("mug", "MUG", "mugs")
            .with_value(ProductValue::new("name", json!("Mug")).localized("en_US"))
            .with_value(ProductValue::new("name", json!("كوب")).localized("ar_EG"))
            .with_value(ProductValue::new("color", json!("red")));
        let stray = sized("stray", "mug", "s");
        let ancestors = vec![mug];
        let verdict = ProductValidator::validate(
            &stray,
            &catalog,
            &VariantContext::new(&ancestors, &[]),
            &settings(),
        );
        assert_eq!(
            verdict.reasons(),
            &[Violation::SchemaNotFound {
                reference: Some("mug".to_string())
            }]
        );

        // Skipping a level is rejected as well
        let ancestors = vec![root_model()];
        let skipped = sized("skipped", "model", "s")
            .with_value(ProductValue::new("color", json!("red")));
        let verdict = ProductValidator::validate(
            &skipped,
            &catalog,
            &VariantContext::new(&ancestors, &[]),
            &settings(),
        );
        assert!(matches!(verdict.reasons(), [Violation::SchemaNotFound { .. }]));
    }

    #[test]
    fn test_variant_cannot_override_parent_axis() {
        let catalog = catalog();
        let ancestors = vec![color_model("red", "red"), root_model()];
        let small = sized("red-s", "red", "s").with_value(ProductValue::new("color", json!("blue")));
        let verdict = ProductValidator::validate(
            &small,
            &catalog,
            &VariantContext::new(&ancestors, &[]),
            &settings(),
        );
        assert_eq!(
            verdict.reasons(),
            &[Violation::VariantAxisViolation {
                level: 1,
                attribute: "color".to_string()
            }]
        );
    }

    #[test]
    fn test_siblings_sharing_color_must_share_fixed_values() {
        let catalog = catalog();
        let ancestors = vec![color_model("red", "red"), root_model()];
        let first = sized("a", "red", "s").with_value(ProductValue::new("image", json!("red.png")));
        let second = sized("b", "red", "m").with_value(ProductValue::new("image", json!("other.png")));
        let siblings = vec![first.clone()];

        let verdict = ProductValidator::validate(
            &second,
            &catalog,
            &VariantContext::new(&ancestors, &siblings),
            &settings(),
        );
        assert_eq!(
            verdict.reasons(),
            &[Violation::VariantAxisViolation {
                level: 1,
                attribute: "image".to_string()
            }]
        );

        let consistent = second.with_value(ProductValue::new("image", json!("red.png")));
        let verdict = ProductValidator::validate(
            &consistent,
            &catalog,
            &VariantContext::new(&ancestors, &siblings),
            &settings(),
        );
        assert!(verdict.is_valid(), "{:?}", verdict);

        // Under another color the image is free
        let blue_ancestors = vec![color_model("blue", "blue"), root_model()];
        let blue = sized("c", "blue", "s").with_value(ProductValue::new("image", json!("blue.png")));
        let verdict = ProductValidator::validate(
            &blue,
            &catalog,
            &VariantContext::new(&blue_ancestors, &[]),
            &settings(),
        );
        assert!(verdict.is_valid(), "{:?}", verdict);
    }

    #[test]
    fn test_duplicate_axis_combination() {
        let catalog = catalog();
        let ancestors = vec![color_model("red", "red"), root_model()];
        let siblings = vec![sized("red-s", "red", "s")];
        let twin = sized("red-s-2", "red", "s");
        let verdict = ProductValidator::validate(
            &twin,
            &catalog,
            &VariantContext::new(&ancestors, &siblings),
            &settings(),
        );
        assert_eq!(
            verdict.reasons(),
            &[Violation::VariantAxisViolation {
                level: 2,
                attribute: "size".to_string()
            }]
        );
    }

    #[test]
    fn test_define_then_validate_round_trip() {
        let mut catalog = Catalog::new();
        catalog
            .define_attribute(Attribute::new("title", "title", AttributeType::Text))
            .unwrap();
        catalog
            .define_attribute(
                Attribute::new("finish", "finish", AttributeType::SimpleSelect)
                    .with_options(["matte", "gloss"]),
            )
            .unwrap();
        catalog
            .define_family(Family::new(
                "paint",
                "paint",
                vec![
                    FamilyAttribute::required("title"),
                    FamilyAttribute::required("finish"),
                ],
            ))
            .unwrap();

        let product = ProductInstance::product("p", "P", "paint")
            .with_value(ProductValue::new("title", json!("Wall paint")))
            .with_value(ProductValue::new("finish", json!("matte")));
        let verdict = validate(&product, &catalog);
        assert_eq!(verdict, Verdict::Valid);
        assert!(verdict.reasons().is_empty());
    }

    #[test]
    fn test_verdict_serialization() {
        let verdict = Verdict::Invalid(vec![Violation::UnknownCategory {
            category: "ghost".to_string(),
        }]);
        assert_eq!(
            serde_json::to_value(&verdict).unwrap(),
            json!({
                "status": "invalid",
                "reasons": [{"reason": "unknown_category", "category": "ghost"}]
            })
        );
        assert_eq!(
            serde_json::to_value(Verdict::Valid).unwrap(),
            json!({"status": "valid"})
        );
    }
}
