pub mod attribute_registry;
pub mod catalog;
pub mod category_tree;
pub mod error;
pub mod family_model;
pub mod family_variant_model;
pub mod validate;

pub use attribute_registry::AttributeRegistry;
pub use catalog::{Catalog, DocumentKind};
pub use category_tree::CategoryTree;
pub use error::{CatalogError, CatalogResult, ErrorKind};
pub use family_model::FamilyRegistry;
pub use family_variant_model::FamilyVariantRegistry;
pub use validate::{ProductValidator, VariantContext, Verdict, Violation};
