use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use invsync_core::{ItemCatalog, ItemDefinition, Recipe, RecipeOutput, RecipeRegistry};
use tracing::debug;

use crate::AssetError;

/// Load an item catalog from the provided JSON file path.
pub fn catalog_from_file(path: &Path) -> Result<ItemCatalog, AssetError> {
    let data = fs::read_to_string(path)?;
    catalog_from_str(&data)
}

/// Load an item catalog from an in-memory JSON string.
pub fn catalog_from_str(input: &str) -> Result<ItemCatalog, AssetError> {
    let defs: Vec<ItemDefinition> = serde_json::from_str(input)?;
    let catalog = ItemCatalog::from_definitions(defs)?;
    debug!(items = catalog.len(), "item pack loaded");
    Ok(catalog)
}

/// Load a recipe pack from a JSON file, validated against `catalog`.
pub fn recipes_from_file(path: &Path, catalog: &ItemCatalog) -> Result<RecipeRegistry, AssetError> {
    let data = fs::read_to_string(path)?;
    recipes_from_str(&data, catalog)
}

/// Load a recipe pack from an in-memory JSON string, validated against `catalog`.
pub fn recipes_from_str(input: &str, catalog: &ItemCatalog) -> Result<RecipeRegistry, AssetError> {
    let recipes: Vec<Recipe> = serde_json::from_str(input)?;
    let mut seen = BTreeSet::new();
    for recipe in &recipes {
        if !seen.insert(recipe.id.clone()) {
            return Err(AssetError::DuplicateRecipe(recipe.id.clone()));
        }
        validate_recipe(recipe, catalog)?;
    }
    debug!(recipes = recipes.len(), "recipe pack loaded");
    Ok(RecipeRegistry::from_recipes(recipes))
}

fn validate_recipe(recipe: &Recipe, catalog: &ItemCatalog) -> Result<(), AssetError> {
    let invalid = |reason: &'static str| AssetError::InvalidRecipe {
        recipe: recipe.id.clone(),
        reason,
    };
    if recipe.quantity_created <= 0 {
        return Err(invalid("quantity_created must be positive"));
    }
    if recipe.components.is_empty() {
        return Err(invalid("no components"));
    }
    let mut listed = BTreeSet::new();
    for component in &recipe.components {
        if component.quantity <= 0 {
            return Err(invalid("component quantity must be positive"));
        }
        if !listed.insert(&component.item_id) {
            return Err(invalid("component listed twice"));
        }
        if !catalog.contains(&component.item_id) {
            return Err(AssetError::UnknownItem {
                recipe: recipe.id.clone(),
                item: component.item_id.clone(),
            });
        }
    }
    if let RecipeOutput::Item(item) = &recipe.output {
        if !catalog.contains(item) {
            return Err(AssetError::UnknownItem {
                recipe: recipe.id.clone(),
                item: item.clone(),
            });
        }
    }
    Ok(())
}
