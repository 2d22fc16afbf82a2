//! Shared item tables, slot layouts and world collaborators for tests.

use invsync_core::{
    ItemCatalog, ItemDefinition, ItemId, ItemStack, Recipe, RecipeId, RecipeOutput, RecipeRegistry,
    Tag, WeaponData,
};
use invsync_inventory::{
    ContainerLimits, DroppedStack, InventoryConfig, SlotLayout, SpecializedSlot, UniversalSlot,
    WorldSpawner,
};
use std::sync::{Arc, Mutex};

/// Items used across the test suites.
///
/// | id | stack | notes |
/// |---|---|---|
/// | apple | 5 | weight 1 |
/// | arrow | 20 | category `Ammo` |
/// | sword | 1 | `Weapon.OneHanded` |
/// | greatsword | 1 | `Weapon.TwoHanded` |
/// | shield | 1 | `OffHand` |
/// | helmet | 1 | `Armor.Head` |
/// | potion | 5 | usable |
/// | log, plank | 10, 20 | crafting inputs |
pub fn sample_catalog() -> Arc<ItemCatalog> {
    let blade = WeaponData {
        damage: 6.0,
        cooldown_seconds: 0.8,
        range: 1.5,
    };
    let mut sword = ItemDefinition::new("sword", 1)
        .with_category("Weapon.OneHanded")
        .with_weapon(blade);
    sword.stackable = false;
    let mut greatsword = ItemDefinition::new("greatsword", 1)
        .with_category("Weapon.TwoHanded")
        .with_weapon(WeaponData { damage: 11.0, ..blade });
    greatsword.stackable = false;

    let definitions = [
        ItemDefinition::new("apple", 5).with_weight(1.0),
        ItemDefinition::new("arrow", 20).with_category("Ammo"),
        sword,
        greatsword,
        ItemDefinition::new("shield", 1).with_category("OffHand"),
        ItemDefinition::new("helmet", 1).with_category("Armor.Head"),
        ItemDefinition::new("potion", 5).with_usable(1),
        ItemDefinition::new("log", 10),
        ItemDefinition::new("plank", 20),
    ];
    match ItemCatalog::from_definitions(definitions) {
        Ok(catalog) => Arc::new(catalog),
        Err(err) => panic!("sample catalog is invalid: {err}"),
    }
}

/// `planks`: one log into four planks. `torch`: a plank into an object.
pub fn sample_recipes() -> Arc<RecipeRegistry> {
    Arc::new(RecipeRegistry::from_recipes([
        Recipe {
            id: RecipeId::new("planks"),
            components: vec![ItemStack::new("log", 1)],
            output: RecipeOutput::Item(ItemId::new("plank")),
            quantity_created: 4,
            tags: vec![Tag::new("Crafting.Wood")],
        },
        Recipe {
            id: RecipeId::new("campfire"),
            components: vec![ItemStack::new("plank", 3), ItemStack::new("log", 1)],
            output: RecipeOutput::Object("Campfire".into()),
            quantity_created: 1,
            tags: vec![Tag::new("Crafting.Structure")],
        },
    ]))
}

/// `Armor.Head` specialized; `OffHand` and a two-handed `MainHand` universal.
///
/// A `Weapon.TwoHanded` item in `MainHand` blocks `OffHand`, and only
/// `MainHand` may hold two-handed weapons.
pub fn sample_layout() -> SlotLayout {
    SlotLayout::new()
        .with_specialized(SpecializedSlot::new("Armor.Head"))
        .with_universal(UniversalSlot::new("OffHand"))
        .with_universal(
            UniversalSlot::new("MainHand")
                .blocking("OffHand", Some(Tag::new("Weapon.TwoHanded")))
                .exclusive_to("Weapon.TwoHanded"),
        )
}

/// [`sample_layout`] with `max_slot_count` generic slots and no weight cap.
pub fn sample_config(max_slot_count: i32) -> InventoryConfig {
    InventoryConfig {
        limits: ContainerLimits {
            max_weight: 0.0,
            max_slot_count,
        },
        layout: sample_layout(),
        recipe_filters: vec![Tag::new("Crafting")],
        unlocked_recipes: vec![RecipeId::new("planks")],
    }
}

/// World spawner that records drops and optionally refuses them.
#[derive(Debug, Clone, Default)]
pub struct RecordingSpawner {
    drops: Arc<Mutex<Vec<DroppedStack>>>,
    refuse: bool,
}

impl RecordingSpawner {
    /// Spawner that accepts every drop.
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawner that refuses every drop.
    pub fn refusing() -> Self {
        Self {
            refuse: true,
            ..Self::default()
        }
    }

    /// Drops recorded so far, shared with every clone.
    pub fn drops(&self) -> Vec<DroppedStack> {
        self.drops.lock().map(|drops| drops.clone()).unwrap_or_default()
    }

    /// Total quantity of `item` dropped so far.
    pub fn dropped_quantity(&self, item: &str) -> i32 {
        self.drops()
            .iter()
            .filter(|drop| drop.stack.item_id.as_str() == item)
            .map(|drop| drop.stack.quantity)
            .sum()
    }
}

impl WorldSpawner for RecordingSpawner {
    fn spawn_dropped_stack(&mut self, drop: &DroppedStack) -> bool {
        if self.refuse {
            return false;
        }
        if let Ok(mut drops) = self.drops.lock() {
            drops.push(drop.clone());
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixtures_are_consistent() {
        let catalog = sample_catalog();
        for recipe in sample_recipes().iter() {
            for component in &recipe.components {
                assert!(catalog.contains(&component.item_id), "{}", component.item_id);
            }
        }
        for slot in sample_layout().all_slots() {
            assert!(slot.is_valid());
        }
    }

    #[test]
    fn test_spawner_clones_share_drops() {
        let spawner = RecordingSpawner::new();
        let mut handle = spawner.clone();
        assert!(handle.spawn_dropped_stack(&DroppedStack {
            stack: ItemStack::new("apple", 2),
            angle_degrees: 0.0,
        }));
        assert_eq!(spawner.dropped_quantity("apple"), 2);
        assert!(!RecordingSpawner::refusing().spawn_dropped_stack(&DroppedStack {
            stack: ItemStack::new("apple", 1),
            angle_degrees: 0.0,
        }));
    }
}
