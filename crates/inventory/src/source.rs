//! Collaborators at the edge of a container: where items come from, and
//! where dropped items go.

use invsync_core::{ChangeReason, ItemId, ItemStack};
use serde::{Deserialize, Serialize};

/// Anything items can be extracted from.
pub trait ItemSource {
    /// Remove up to `quantity` of `item_id`; returns how many were removed.
    ///
    /// Non-authoritative sources return 0.
    fn extract_if_authoritative(
        &mut self,
        item_id: &ItemId,
        quantity: i32,
        reason: ChangeReason,
    ) -> i32;

    /// Quantity of `item_id` that could be extracted right now.
    fn contained_quantity(&self, item_id: &ItemId) -> i32;
}

/// Source that creates items from nothing, used by loot grants and crafting.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnlimitedSource;

impl UnlimitedSource {
    /// Create the source.
    pub fn new() -> Self {
        Self
    }
}

impl ItemSource for UnlimitedSource {
    fn extract_if_authoritative(
        &mut self,
        _item_id: &ItemId,
        quantity: i32,
        _reason: ChangeReason,
    ) -> i32 {
        quantity.max(0)
    }

    fn contained_quantity(&self, _item_id: &ItemId) -> i32 {
        i32::MAX
    }
}

/// A world pickup holds a single stack.
impl ItemSource for ItemStack {
    fn extract_if_authoritative(
        &mut self,
        item_id: &ItemId,
        quantity: i32,
        _reason: ChangeReason,
    ) -> i32 {
        if self.item_id != *item_id || quantity <= 0 {
            return 0;
        }
        let extracted = quantity.min(self.quantity);
        self.quantity -= extracted;
        if self.quantity <= 0 {
            self.clear();
        }
        extracted
    }

    fn contained_quantity(&self, item_id: &ItemId) -> i32 {
        if self.item_id == *item_id {
            self.quantity
        } else {
            0
        }
    }
}

/// One stack handed to the world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DroppedStack {
    /// Item and quantity.
    pub stack: ItemStack,
    /// Drop direction in degrees around the owner.
    pub angle_degrees: f32,
}

/// World-side collaborator that materialises dropped stacks.
pub trait WorldSpawner: Send {
    /// Spawn the stack; returns false if the world refused it.
    fn spawn_dropped_stack(&mut self, drop: &DroppedStack) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_world_stack_extraction() {
        let mut pickup = ItemStack::new("apple", 4);
        let apple = ItemId::new("apple");

        assert_eq!(pickup.extract_if_authoritative(&apple, 3, ChangeReason::Added), 3);
        assert_eq!(pickup.contained_quantity(&apple), 1);
        assert_eq!(pickup.extract_if_authoritative(&apple, 3, ChangeReason::Added), 1);
        assert!(pickup.is_empty());
        assert_eq!(
            pickup.extract_if_authoritative(&ItemId::new("pear"), 1, ChangeReason::Added),
            0
        );
    }

    #[test]
    fn test_unlimited_source() {
        let mut source = UnlimitedSource::new();
        assert_eq!(
            source.extract_if_authoritative(&ItemId::new("apple"), 7, ChangeReason::Added),
            7
        );
    }
}
