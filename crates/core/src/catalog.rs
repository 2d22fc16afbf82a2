//! Read-only catalog of item definitions.

use crate::item::{ItemDefinition, ItemId};
use std::collections::HashMap;
use thiserror::Error;

/// Errors raised while building a catalog.
#[derive(Debug, Error, PartialEq)]
pub enum CatalogError {
    /// Definition without an id.
    #[error("item definition has an empty id")]
    EmptyId,
    /// Two definitions share an id.
    #[error("duplicate item definition: {0}")]
    Duplicate(ItemId),
    /// Stackable item with a non-positive cap.
    #[error("item {id} has invalid max stack size {size}")]
    InvalidStackSize {
        /// Offending item.
        id: ItemId,
        /// Declared cap.
        size: i32,
    },
}

/// Item definitions keyed by id.
#[derive(Debug, Clone, Default)]
pub struct ItemCatalog {
    items: HashMap<ItemId, ItemDefinition>,
}

impl ItemCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self {
            items: HashMap::new(),
        }
    }

    /// Build a catalog, rejecting invalid or duplicate definitions.
    pub fn from_definitions(
        definitions: impl IntoIterator<Item = ItemDefinition>,
    ) -> Result<Self, CatalogError> {
        let mut catalog = Self::new();
        for definition in definitions {
            catalog.insert(definition)?;
        }
        Ok(catalog)
    }

    /// Register one definition.
    pub fn insert(&mut self, definition: ItemDefinition) -> Result<(), CatalogError> {
        if !definition.id.is_valid() {
            return Err(CatalogError::EmptyId);
        }
        if definition.stackable && definition.max_stack_size <= 0 {
            return Err(CatalogError::InvalidStackSize {
                id: definition.id.clone(),
                size: definition.max_stack_size,
            });
        }
        if self.items.contains_key(&definition.id) {
            return Err(CatalogError::Duplicate(definition.id));
        }
        self.items.insert(definition.id.clone(), definition);
        Ok(())
    }

    /// Look up a definition.
    pub fn lookup(&self, id: &ItemId) -> Option<&ItemDefinition> {
        self.items.get(id)
    }

    /// Whether `id` is known.
    pub fn contains(&self, id: &ItemId) -> bool {
        self.items.contains_key(id)
    }

    /// Number of definitions.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterate definitions in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = &ItemDefinition> {
        self.items.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        let catalog = ItemCatalog::from_definitions([ItemDefinition::new("apple", 5)]).unwrap();
        assert_eq!(catalog.len(), 1);
        assert!(catalog.lookup(&ItemId::new("apple")).is_some());
        assert!(catalog.lookup(&ItemId::new("pear")).is_none());
    }

    #[test]
    fn test_rejects_duplicates() {
        let result = ItemCatalog::from_definitions([
            ItemDefinition::new("apple", 5),
            ItemDefinition::new("apple", 3),
        ]);
        assert_eq!(result.unwrap_err(), CatalogError::Duplicate(ItemId::new("apple")));
    }

    #[test]
    fn test_rejects_bad_definitions() {
        let mut catalog = ItemCatalog::new();
        assert_eq!(
            catalog.insert(ItemDefinition::new("", 5)),
            Err(CatalogError::EmptyId)
        );

        let mut broken = ItemDefinition::new("broken", 5);
        broken.max_stack_size = 0;
        assert!(matches!(
            catalog.insert(broken),
            Err(CatalogError::InvalidStackSize { size: 0, .. })
        ));
    }
}
