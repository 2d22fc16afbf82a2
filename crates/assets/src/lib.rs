#![warn(missing_docs)]
//! Item and recipe pack loading + validation.
//!
//! Packs are JSON arrays: item packs hold [`ItemDefinition`]s, recipe packs
//! hold [`Recipe`]s. Recipes are checked against the catalog they will run
//! with, so a pack that names an unknown item never reaches an inventory.

mod loader;

pub use loader::{catalog_from_file, catalog_from_str, recipes_from_file, recipes_from_str};

use invsync_core::{CatalogError, ItemId, RecipeId};
use thiserror::Error;

#[doc(no_inline)]
pub use invsync_core::{ItemDefinition, Recipe};

/// Errors emitted during pack loading.
#[derive(Debug, Error)]
pub enum AssetError {
    /// Wrap IO errors when reading packs.
    #[error("failed to read asset pack: {0}")]
    Io(#[from] std::io::Error),
    /// Wrap serde parsing issues.
    #[error("failed to parse asset pack: {0}")]
    Parse(#[from] serde_json::Error),
    /// The item definitions do not form a valid catalog.
    #[error("invalid item catalog: {0}")]
    Catalog(#[from] CatalogError),
    /// A recipe names an item the catalog does not define.
    #[error("recipe {recipe} references unknown item {item}")]
    UnknownItem {
        /// Offending recipe.
        recipe: RecipeId,
        /// Missing item.
        item: ItemId,
    },
    /// Two recipes share an id.
    #[error("duplicate recipe: {0}")]
    DuplicateRecipe(RecipeId),
    /// A recipe with non-positive quantities or a repeated component.
    #[error("recipe {recipe} is invalid: {reason}")]
    InvalidRecipe {
        /// Offending recipe.
        recipe: RecipeId,
        /// What is wrong.
        reason: &'static str,
    },
}
