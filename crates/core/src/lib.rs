#![warn(missing_docs)]
//! Core item primitives shared across the workspace.
//!
//! Everything here is plain data: identifiers, stacks, static item
//! definitions, and the recipe tables. Containers and inventories that
//! mutate these live in `invsync-inventory`.

pub mod catalog;
pub mod crafting;
pub mod item;

// Re-export commonly used types
pub use catalog::{CatalogError, ItemCatalog};
pub use crafting::{Recipe, RecipeId, RecipeOutput, RecipeRegistry};
pub use item::{
    ChangeReason, ItemDefinition, ItemId, ItemStack, SlotTag, Tag, UsableData, WeaponData,
};
