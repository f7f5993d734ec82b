use crate::logic::{Catalog, CatalogResult};
use crate::model::{
    Attribute, AttributeType, Category, Family, FamilyAttribute, FamilyVariant, Labels,
    ProductInstance, ProductValue, VariantLevel,
};
use crate::store::traits::Store;
use anyhow::Result;
use log::info;
use serde_json::json;

pub const DEMO_FAMILY_ID: &str = "clothing";
pub const DEMO_FAMILY_VARIANT_ID: &str = "clothing_color_size";
pub const DEMO_PRODUCT_MODEL_ID: &str = "polo_shirt";

fn labels(en: &str, ar: &str) -> Labels {
    Labels::from([
        ("en_US".to_string(), en.to_string()),
        ("ar_EG".to_string(), ar.to_string()),
    ])
}

fn category(id: &str, en: &str, ar: &str) -> Category {
    let mut category = Category::new(id, id);
    category.labels = labels(en, ar);
    category
}

fn attribute(id: &str, attribute_type: AttributeType, en: &str, ar: &str) -> Attribute {
    let mut attribute = Attribute::new(id, id, attribute_type);
    attribute.labels = labels(en, ar);
    attribute
}

pub async fn load_seed_data<S: Store>(store: &S) -> Result<()> {
    let already_seeded = store.snapshot().await?.families().contains(DEMO_FAMILY_ID);
    if already_seeded {
        info!("Seed catalog already present, skipping");
        return Ok(());
    }

    store.mutate(load_catalog).await?;
    info!("Seed catalog loaded");

    for instance in demo_products() {
        store.upsert_product(instance).await?;
    }
    info!("Seed product models loaded");

    Ok(())
}

/// Apparel demo catalog: a category tree, attributes, one family and a
/// colour then size family variant
pub fn load_catalog(catalog: &mut Catalog) -> CatalogResult<()> {
    catalog.insert_category(category("apparel", "Apparel", "ملابس"), None)?;
    catalog.insert_category(category("men", "Men", "رجال"), Some("apparel"))?;
    catalog.insert_category(category("women", "Women", "نساء"), Some("apparel"))?;
    catalog.insert_category(category("men_shirts", "Shirts", "قمصان"), Some("men"))?;
    catalog.insert_category(category("women_dresses", "Dresses", "فساتين"), Some("women"))?;

    let mut care = attribute("care_instructions", AttributeType::Text, "Care instructions", "تعليمات العناية");
    care.available_in_categories = Some(vec!["apparel".to_string()]);

    for attribute in [
        attribute("sku", AttributeType::Text, "SKU", "رمز المنتج"),
        attribute("name", AttributeType::Text, "Name", "الاسم").localizable(),
        attribute("description", AttributeType::Text, "Description", "الوصف").localizable(),
        attribute("price", AttributeType::Number, "Price", "السعر").scopable(),
        attribute("color", AttributeType::SimpleSelect, "Color", "اللون")
            .with_options(["red", "blue", "black"]),
        attribute("size", AttributeType::SimpleSelect, "Size", "المقاس")
            .with_options(["s", "m", "l", "xl"]),
        attribute("material", AttributeType::SimpleSelect, "Material", "الخامة")
            .with_options(["cotton", "linen"]),
        attribute("image", AttributeType::Media, "Image", "الصورة"),
        care,
    ] {
        catalog.define_attribute(attribute)?;
    }

    let mut family = Family::new(
        DEMO_FAMILY_ID,
        DEMO_FAMILY_ID,
        vec![
            FamilyAttribute::required("name").as_label(),
            FamilyAttribute::optional("description"),
            FamilyAttribute::optional("price"),
            FamilyAttribute::optional("material"),
            FamilyAttribute::optional("care_instructions"),
            FamilyAttribute::required("color"),
            FamilyAttribute::optional("image"),
            FamilyAttribute::required("size"),
            FamilyAttribute::required("sku"),
        ],
    );
    family.labels = labels("Clothing", "ملابس");
    catalog.define_family(family)?;

    let mut variant = FamilyVariant::new(
        DEMO_FAMILY_VARIANT_ID,
        DEMO_FAMILY_VARIANT_ID,
        DEMO_FAMILY_ID,
        vec![
            VariantLevel::new(["color"], ["image"]),
            VariantLevel::new(["size"], ["sku"]),
        ],
    );
    variant.labels = labels("Clothing by color and size", "ملابس حسب اللون والمقاس");
    catalog.define_family_variant(variant)?;

    Ok(())
}

/// A polo shirt model with two colours and three sized variants, parents
/// before children
pub fn demo_products() -> Vec<ProductInstance> {
    let fv = DEMO_FAMILY_VARIANT_ID;
    let model = ProductInstance::root_model(DEMO_PRODUCT_MODEL_ID, "POLO_SHIRT", fv)
        .with_value(ProductValue::new("name", json!("Polo shirt")).localized("en_US"))
        .with_value(ProductValue::new("name", json!("قميص بولو")).localized("ar_EG"))
        .with_value(ProductValue::new("material", json!("cotton")))
        .with_value(ProductValue::new("price", json!(29.9)).scoped("ecommerce"))
        .with_value(ProductValue::new("care_instructions", json!("Machine wash cold")))
        .in_category("men_shirts");

    let colour = |id: &str, code: &str, color: &str| {
        ProductInstance::variant(id, code, fv, DEMO_PRODUCT_MODEL_ID, 1)
            .with_value(ProductValue::new("color", json!(color)))
            .with_value(ProductValue::new("image", json!(format!("{}.jpg", id))))
    };
    let sized = |id: &str, code: &str, parent: &str, size: &str| {
        ProductInstance::variant(id, code, fv, parent, 2)
            .with_value(ProductValue::new("size", json!(size)))
            .with_value(ProductValue::new("sku", json!(code)))
    };

    vec![
        model,
        colour("polo_shirt_red", "POLO_SHIRT_RED", "red"),
        colour("polo_shirt_blue", "POLO_SHIRT_BLUE", "blue"),
        sized("polo_shirt_red_m", "POLO_SHIRT_RED_M", "polo_shirt_red", "m"),
        sized("polo_shirt_red_l", "POLO_SHIRT_RED_L", "polo_shirt_red", "l"),
        sized("polo_shirt_blue_m", "POLO_SHIRT_BLUE_M", "polo_shirt_blue", "m"),
    ]
}
