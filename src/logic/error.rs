use serde::Serialize;
use thiserror::Error;

use crate::model::Id;

/// Coarse classification used by the API layer to pick a status code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    Duplicate,
    StructuralViolation,
    ReferentialIntegrity,
    InvalidInput,
}

/// Failures of catalog mutations. These describe invalid caller input and
/// are never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Attribute '{0}' not found")]
    AttributeNotFound(Id),

    #[error("Attribute '{0}' already exists")]
    DuplicateAttribute(Id),

    #[error("Invalid definition for attribute '{attribute}': {reason}")]
    InvalidAttributeDefinition { attribute: Id, reason: String },

    #[error("Attribute '{attribute}' is used by families: {}", families.join(", "))]
    AttributeInUse { attribute: Id, families: Vec<Id> },

    #[error("Option '{option}' not found for attribute '{attribute}'")]
    OptionNotFound { attribute: Id, option: String },

    #[error("Option '{option}' already exists for attribute '{attribute}'")]
    DuplicateOption { attribute: Id, option: String },

    #[error("Invalid option order for attribute '{attribute}': {reason}")]
    InvalidOptionOrder { attribute: Id, reason: String },

    #[error("Category '{0}' not found")]
    CategoryNotFound(Id),

    #[error("Category '{0}' already exists")]
    DuplicateCategory(Id),

    #[error("Parent category '{0}' not found")]
    ParentNotFound(Id),

    #[error("Moving category '{category}' under '{new_parent}' would create a cycle")]
    CycleDetected { category: Id, new_parent: Id },

    #[error("Category '{0}' has children")]
    CategoryHasChildren(Id),

    #[error("Category '{category}' restricts attributes: {}", attributes.join(", "))]
    CategoryInUse { category: Id, attributes: Vec<Id> },

    #[error("Family '{0}' not found")]
    FamilyNotFound(Id),

    #[error("Family '{0}' already exists")]
    DuplicateFamily(Id),

    #[error("Attribute '{attribute}' is listed more than once in family '{family}'")]
    DuplicateAttributeInFamily { family: Id, attribute: Id },

    #[error("Family '{family}' marks more than one label attribute: {}", attributes.join(", "))]
    MultipleLabelAttributes { family: Id, attributes: Vec<Id> },

    #[error("Family '{family}' is used by family variants: {}", variants.join(", "))]
    FamilyInUse { family: Id, variants: Vec<Id> },

    #[error("Attribute '{attribute}' of family '{family}' is used by family variant '{variant}'")]
    FamilyAttributeInUse { family: Id, attribute: Id, variant: Id },

    #[error("Family variant '{0}' not found")]
    FamilyVariantNotFound(Id),

    #[error("Family variant '{0}' already exists")]
    DuplicateFamilyVariant(Id),

    #[error("Attribute '{attribute}' is not part of family '{family}'")]
    AttributeNotInFamily { family: Id, attribute: Id },

    #[error("Attribute '{attribute}' is assigned to more than one variant level")]
    AttributeAssignedToMultipleLevels { attribute: Id },

    #[error("Variant level {level} has no axis attributes")]
    EmptyVariantLevel { level: usize },

    #[error("Attribute '{attribute}' cannot be a variant axis: {reason}")]
    InvalidVariantAxis { attribute: Id, reason: String },

    #[error("Product '{0}' not found")]
    ProductNotFound(Id),

    #[error("Product with code '{0}' already exists")]
    DuplicateProduct(String),

    #[error("Product '{product}' still has {children} child instances")]
    ProductHasChildren { product: Id, children: usize },

    #[error("Product '{product}' at level {level} cannot hang below '{parent}': {reason}")]
    InvalidParent {
        product: Id,
        parent: Id,
        level: usize,
        reason: String,
    },
}

impl CatalogError {
    pub fn kind(&self) -> ErrorKind {
        use CatalogError::*;
        match self {
            AttributeNotFound(_)
            | OptionNotFound { .. }
            | CategoryNotFound(_)
            | ParentNotFound(_)
            | FamilyNotFound(_)
            | FamilyVariantNotFound(_)
            | ProductNotFound(_) => ErrorKind::NotFound,
            DuplicateAttribute(_)
            | DuplicateOption { .. }
            | DuplicateCategory(_)
            | DuplicateFamily(_)
            | DuplicateFamilyVariant(_)
            | DuplicateProduct(_) => ErrorKind::Duplicate,
            CycleDetected { .. }
            | EmptyVariantLevel { .. }
            | MultipleLabelAttributes { .. }
            | AttributeAssignedToMultipleLevels { .. }
            | DuplicateAttributeInFamily { .. }
            | AttributeNotInFamily { .. }
            | InvalidVariantAxis { .. }
            | InvalidParent { .. } => ErrorKind::StructuralViolation,
            AttributeInUse { .. }
            | CategoryHasChildren(_)
            | CategoryInUse { .. }
            | FamilyInUse { .. }
            | FamilyAttributeInUse { .. }
            | ProductHasChildren { .. } => ErrorKind::ReferentialIntegrity,
            InvalidAttributeDefinition { .. } | InvalidOptionOrder { .. } => {
                ErrorKind::InvalidInput
            }
        }
    }
}

pub type CatalogResult<T> = std::result::Result<T, CatalogError>;
