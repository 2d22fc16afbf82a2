//! Recipe definitions and the registry that holds them.
//!
//! Recipes are static data. Which recipes an inventory has unlocked, and
//! which of those it can currently afford, is tracked per inventory.

use crate::item::{ItemId, ItemStack, Tag};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Unique recipe identifier (e.g. "wooden_planks").
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecipeId(String);

impl RecipeId {
    /// Create an identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecipeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecipeId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// What a recipe produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecipeOutput {
    /// Items added to the crafting inventory.
    Item(ItemId),
    /// A named world object; the inventory only confirms it.
    Object(String),
}

/// Crafting recipe definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    /// Unique id.
    pub id: RecipeId,
    /// Items consumed by one craft.
    pub components: Vec<ItemStack>,
    /// Produced item or object.
    pub output: RecipeOutput,
    /// Quantity produced per craft.
    #[serde(default = "default_quantity_created")]
    pub quantity_created: i32,
    /// Tags used to group available recipes.
    #[serde(default)]
    pub tags: Vec<Tag>,
}

fn default_quantity_created() -> i32 {
    1
}

impl Recipe {
    /// Components with repeated items summed, in first-listed order.
    pub fn required_components(&self) -> Vec<ItemStack> {
        let mut required: Vec<ItemStack> = Vec::with_capacity(self.components.len());
        for component in &self.components {
            match required.iter_mut().find(|stack| stack.item_id == component.item_id) {
                Some(stack) => stack.quantity += component.quantity,
                None => required.push(component.clone()),
            }
        }
        required
    }

    /// Check every component against `count`, which reports contained quantities.
    pub fn can_craft(&self, count: impl Fn(&ItemId) -> i32) -> bool {
        self.required_components()
            .iter()
            .all(|component| count(&component.item_id) >= component.quantity)
    }

    /// Whether any of this recipe's tags falls under `filter`.
    pub fn matches_filter(&self, filter: &Tag) -> bool {
        self.tags.iter().any(|tag| tag.matches(filter))
    }
}

/// Recipe registry managing all loaded recipes.
#[derive(Debug, Clone, Default)]
pub struct RecipeRegistry {
    recipes: BTreeMap<RecipeId, Recipe>,
}

impl RecipeRegistry {
    /// Create a new empty recipe registry.
    pub fn new() -> Self {
        Self {
            recipes: BTreeMap::new(),
        }
    }

    /// Build a registry; later recipes replace earlier ones with the same id.
    pub fn from_recipes(recipes: impl IntoIterator<Item = Recipe>) -> Self {
        let mut registry = Self::new();
        for recipe in recipes {
            registry.add_recipe(recipe);
        }
        registry
    }

    /// Add a recipe to the registry.
    pub fn add_recipe(&mut self, recipe: Recipe) {
        self.recipes.insert(recipe.id.clone(), recipe);
    }

    /// Get a recipe by ID.
    pub fn get(&self, id: &RecipeId) -> Option<&Recipe> {
        self.recipes.get(id)
    }

    /// All recipes in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Recipe> {
        self.recipes.values()
    }

    /// Get the number of loaded recipes.
    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    /// Check if registry is empty.
    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }
}
