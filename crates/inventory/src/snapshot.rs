//! Versioned replication payload of an inventory.

use crate::slots::TaggedStack;
use invsync_core::{ItemStack, RecipeId};
use serde::{Deserialize, Serialize};

/// Full replicated state of an inventory at one authority version.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InventorySnapshot {
    /// Monotonic authority version; observers ignore older snapshots.
    pub version: u64,
    /// Container totals in insertion order, tagged quantities included.
    pub items: Vec<ItemStack>,
    /// Tagged slot contents.
    pub tagged: Vec<TaggedStack>,
    /// Unlocked recipes.
    pub unlocked_recipes: Vec<RecipeId>,
}
