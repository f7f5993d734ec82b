use itertools::Itertools;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::logic::error::{CatalogError, CatalogResult};
use crate::logic::family_model::FamilyRegistry;
use crate::model::{Attribute, AttributeOption, AttributeUpdate, Id};

/// Attribute definitions keyed by identifier
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeRegistry {
    attributes: BTreeMap<Id, Attribute>,
}

impl AttributeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.attributes.contains_key(id)
    }

    pub fn get(&self, id: &str) -> CatalogResult<&Attribute> {
        self.attributes
            .get(id)
            .ok_or_else(|| CatalogError::AttributeNotFound(id.to_string()))
    }

    pub fn find_by_code(&self, code: &str) -> Option<&Attribute> {
        self.attributes.values().find(|a| a.code == code)
    }

    /// All attributes ordered by code
    pub fn list(&self) -> Vec<&Attribute> {
        self.attributes
            .values()
            .sorted_by(|a, b| a.code.cmp(&b.code))
            .collect()
    }

    pub fn define(&mut self, attribute: Attribute) -> CatalogResult<&Attribute> {
        if self.attributes.contains_key(&attribute.id) {
            return Err(CatalogError::DuplicateAttribute(attribute.id));
        }
        if self.find_by_code(&attribute.code).is_some() {
            return Err(CatalogError::DuplicateAttribute(attribute.code));
        }
        check_definition(&attribute)?;

        debug!(
            "Defined attribute '{}' ({})",
            attribute.code,
            attribute.attribute_type.as_str()
        );
        let id = attribute.id.clone();
        Ok(self.attributes.entry(id).or_insert(attribute))
    }

    pub fn update(&mut self, id: &str, update: AttributeUpdate) -> CatalogResult<&Attribute> {
        let mut attribute = self.get(id)?.clone();
        if let Some(code) = &update.code {
            if self
                .find_by_code(code)
                .is_some_and(|other| other.id != attribute.id)
            {
                return Err(CatalogError::DuplicateAttribute(code.clone()));
            }
        }
        attribute.apply_update(update);
        check_definition(&attribute)?;

        debug!("Updated attribute '{}'", attribute.code);
        Ok(self.replace(attribute))
    }

    /// Remove an attribute that no family references
    pub fn delete(&mut self, id: &str, families: &FamilyRegistry) -> CatalogResult<Attribute> {
        self.get(id)?;
        let users: Vec<Id> = families
            .families_using(id)
            .map(|f| f.id.clone())
            .collect();
        if !users.is_empty() {
            return Err(CatalogError::AttributeInUse {
                attribute: id.to_string(),
                families: users,
            });
        }

        debug!("Deleted attribute '{}'", id);
        self.attributes
            .remove(id)
            .ok_or_else(|| CatalogError::AttributeNotFound(id.to_string()))
    }

    pub fn add_option(&mut self, id: &str, mut option: AttributeOption) -> CatalogResult<&Attribute> {
        let mut attribute = self.get(id)?.clone();
        if !attribute.attribute_type.is_select() {
            return Err(CatalogError::InvalidAttributeDefinition {
                attribute: attribute.id,
                reason: "only select attributes accept options".to_string(),
            });
        }
        if attribute.has_option(&option.code) {
            return Err(CatalogError::DuplicateOption {
                attribute: attribute.id,
                option: option.code,
            });
        }
        if option.sort_order.is_none() {
            option.sort_order = Some(attribute.options.len() as u32 + 1);
        }
        attribute.options.push(option);
        attribute.updated_at = chrono::Utc::now();
        Ok(self.replace(attribute))
    }

    pub fn update_option(
        &mut self,
        id: &str,
        code: &str,
        option: AttributeOption,
    ) -> CatalogResult<&Attribute> {
        let mut attribute = self.get(id)?.clone();
        if option.code != code && attribute.has_option(&option.code) {
            return Err(CatalogError::DuplicateOption {
                attribute: attribute.id,
                option: option.code,
            });
        }
        let slot = attribute
            .options
            .iter_mut()
            .find(|o| o.code == code)
            .ok_or_else(|| CatalogError::OptionNotFound {
                attribute: id.to_string(),
                option: code.to_string(),
            })?;
        *slot = option;
        attribute.updated_at = chrono::Utc::now();
        Ok(self.replace(attribute))
    }

    pub fn remove_option(&mut self, id: &str, code: &str) -> CatalogResult<&Attribute> {
        let mut attribute = self.get(id)?.clone();
        let before = attribute.options.len();
        attribute.options.retain(|o| o.code != code);
        if attribute.options.len() == before {
            return Err(CatalogError::OptionNotFound {
                attribute: id.to_string(),
                option: code.to_string(),
            });
        }
        check_definition(&attribute)?;
        attribute.updated_at = chrono::Utc::now();
        Ok(self.replace(attribute))
    }

    /// Reorder options; `order` must name every option exactly once.
    /// Positions become the new 1-based `sort_order`.
    pub fn reorder_options(&mut self, id: &str, order: &[String]) -> CatalogResult<&Attribute> {
        let mut attribute = self.get(id)?.clone();
        let invalid = |reason: String| CatalogError::InvalidOptionOrder {
            attribute: id.to_string(),
            reason,
        };

        if let Some(unknown) = order.iter().find(|code| !attribute.has_option(code)) {
            return Err(CatalogError::OptionNotFound {
                attribute: id.to_string(),
                option: unknown.clone(),
            });
        }
        if let Some(repeated) = order.iter().duplicates().next() {
            return Err(invalid(format!("option '{}' listed twice", repeated)));
        }
        if order.len() != attribute.options.len() {
            return Err(invalid(format!(
                "order must include all {} options",
                attribute.options.len()
            )));
        }

        let mut reordered = Vec::with_capacity(order.len());
        for (position, code) in order.iter().enumerate() {
            if let Some(index) = attribute.options.iter().position(|o| &o.code == code) {
                let mut option = attribute.options.swap_remove(index);
                option.sort_order = Some(position as u32 + 1);
                reordered.push(option);
            }
        }
        attribute.options = reordered;
        attribute.updated_at = chrono::Utc::now();
        Ok(self.replace(attribute))
    }

    fn replace(&mut self, attribute: Attribute) -> &Attribute {
        let id = attribute.id.clone();
        self.attributes.insert(id.clone(), attribute);
        &self.attributes[&id]
    }
}

/// Select types need at least one option, other types none, and option
/// codes are unique within the attribute.
fn check_definition(attribute: &Attribute) -> CatalogResult<()> {
    let invalid = |reason: &str| CatalogError::InvalidAttributeDefinition {
        attribute: attribute.id.clone(),
        reason: reason.to_string(),
    };

    if attribute.code.trim().is_empty() {
        return Err(invalid("code must not be empty"));
    }
    if attribute.attribute_type.is_select() && attribute.options.is_empty() {
        return Err(invalid("select attributes must declare at least one option"));
    }
    if !attribute.attribute_type.is_select() && !attribute.options.is_empty() {
        return Err(invalid("only select attributes may declare options"));
    }
    if let Some(code) = attribute.options.iter().map(|o| &o.code).duplicates().next() {
        return Err(CatalogError::DuplicateOption {
            attribute: attribute.id.clone(),
            option: code.clone(),
        });
    }
    Ok(())
}
