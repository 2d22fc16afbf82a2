//! Item identifiers, stacks and static definitions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Hierarchical dotted name used for item categories, slot tags and recipe tags.
///
/// `Weapon.TwoHanded` matches the query `Weapon` as well as itself, but not
/// `Weap` or `Weapon.OneHanded`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tag(String);

/// Tags naming tagged slots are ordinary tags.
pub type SlotTag = Tag;

impl Tag {
    /// Create a tag from its dotted name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The dotted name.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Empty tags never match anything.
    pub fn is_valid(&self) -> bool {
        !self.0.is_empty()
    }

    /// Check whether this tag equals `query` or is nested below it.
    pub fn matches(&self, query: &Tag) -> bool {
        if !query.is_valid() || !self.is_valid() {
            return false;
        }
        if self.0 == query.0 {
            return true;
        }
        self.0.starts_with(&query.0) && self.0.as_bytes().get(query.0.len()) == Some(&b'.')
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Tag {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Tag {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Identifier of an item definition in the [`crate::ItemCatalog`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    /// Create an identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The empty id marks an empty slot.
    pub fn is_valid(&self) -> bool {
        !self.0.is_empty()
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ItemId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A quantity of one item kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemStack {
    /// Item kind.
    pub item_id: ItemId,
    /// Number of items.
    pub quantity: i32,
}

impl ItemStack {
    /// The empty stack.
    pub const EMPTY: ItemStack = ItemStack {
        item_id: ItemId(String::new()),
        quantity: 0,
    };

    /// Create a stack.
    pub fn new(item_id: impl Into<ItemId>, quantity: i32) -> Self {
        Self {
            item_id: item_id.into(),
            quantity,
        }
    }

    /// A stack is valid when it names an item and holds at least one of it.
    pub fn is_valid(&self) -> bool {
        self.item_id.is_valid() && self.quantity > 0
    }

    /// Inverse of [`ItemStack::is_valid`].
    pub fn is_empty(&self) -> bool {
        !self.is_valid()
    }

    /// Reset to the empty stack.
    pub fn clear(&mut self) {
        *self = Self::EMPTY;
    }

    /// Check that this stack holds at least `quantity` of `item_id`.
    pub fn contains(&self, item_id: &ItemId, quantity: i32) -> bool {
        self.item_id == *item_id && self.quantity >= quantity
    }
}

impl Default for ItemStack {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// Combat parameters carried by weapon items.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeaponData {
    /// Damage per hit.
    pub damage: f32,
    /// Seconds between attacks.
    #[serde(default = "default_cooldown")]
    pub cooldown_seconds: f32,
    /// Reach in world units.
    #[serde(default = "default_range")]
    pub range: f32,
}

fn default_cooldown() -> f32 {
    1.0
}

fn default_range() -> f32 {
    1.5
}

/// Present on items that can be consumed from a tagged slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsableData {
    /// Quantity removed per use.
    #[serde(default = "default_quantity_per_use")]
    pub quantity_per_use: i32,
}

fn default_quantity_per_use() -> i32 {
    1
}

/// Static description of an item kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDefinition {
    /// Unique id.
    pub id: ItemId,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Whether several items share one stack.
    #[serde(default = "default_stackable")]
    pub stackable: bool,
    /// Stack cap for stackable items.
    #[serde(default = "default_max_stack_size")]
    pub max_stack_size: i32,
    /// Weight of a single item.
    #[serde(default)]
    pub weight: f32,
    /// Trade value of a single item.
    #[serde(default)]
    pub value: i32,
    /// Categories, matched hierarchically against slot tags.
    #[serde(default)]
    pub categories: Vec<Tag>,
    /// Weapon capability.
    #[serde(default)]
    pub weapon: Option<WeaponData>,
    /// Use capability.
    #[serde(default)]
    pub usable: Option<UsableData>,
}

fn default_stackable() -> bool {
    true
}

fn default_max_stack_size() -> i32 {
    5
}

impl ItemDefinition {
    /// Weightless stackable definition with the given stack cap.
    pub fn new(id: impl Into<ItemId>, max_stack_size: i32) -> Self {
        let id = id.into();
        Self {
            name: id.as_str().to_string(),
            id,
            stackable: max_stack_size > 1,
            max_stack_size,
            weight: 0.0,
            value: 0,
            categories: Vec::new(),
            weapon: None,
            usable: None,
        }
    }

    /// Set the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the per-item weight.
    pub fn with_weight(mut self, weight: f32) -> Self {
        self.weight = weight;
        self
    }

    /// Set the per-item value.
    pub fn with_value(mut self, value: i32) -> Self {
        self.value = value;
        self
    }

    /// Add a category.
    pub fn with_category(mut self, category: impl Into<Tag>) -> Self {
        self.categories.push(category.into());
        self
    }

    /// Attach weapon data.
    pub fn with_weapon(mut self, weapon: WeaponData) -> Self {
        self.weapon = Some(weapon);
        self
    }

    /// Make the item usable.
    pub fn with_usable(mut self, quantity_per_use: i32) -> Self {
        self.usable = Some(UsableData { quantity_per_use });
        self
    }

    /// Effective stack cap: 1 for non-stackable items.
    pub fn stack_limit(&self) -> i32 {
        if self.stackable {
            self.max_stack_size.max(1)
        } else {
            1
        }
    }

    /// Hierarchical category check.
    pub fn has_category(&self, query: &Tag) -> bool {
        self.categories.iter().any(|category| category.matches(query))
    }

    /// Whether the item can be wielded as a weapon.
    pub fn has_weapon_capability(&self) -> bool {
        self.weapon.is_some()
    }
}

/// Why a container or slot changed; carried on every change event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeReason {
    /// Created or received from a source.
    Added,
    /// Removed on request.
    Removed,
    /// Quantity adjusted in place.
    Updated,
    /// Wiped by `clear`.
    ForceDestroyed,
    /// Moved between generic storage and tagged slots.
    Moved,
    /// Spawned into the world.
    Dropped,
    /// Used up.
    Consumed,
    /// Consumed as a crafting component.
    Transformed,
    /// Extracted into another container.
    Transferred,
    /// Derived from an authoritative snapshot.
    Synced,
}
