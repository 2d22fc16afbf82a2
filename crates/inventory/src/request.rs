//! Mutation requests forwarded from client replicas to the authority.

use invsync_core::{ItemId, RecipeId, SlotTag};
use serde::{Deserialize, Serialize};

/// Arguments of a generic/tagged move.
///
/// `source`/`target` of `None` mean generic storage. A swap is requested when
/// `swap_item_id` is set and `swap_quantity > 0`; the target must still hold
/// that item when the authority applies the move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRequest {
    /// Item to move.
    pub item_id: ItemId,
    /// Requested quantity.
    pub quantity: i32,
    /// Tagged source slot.
    pub source: Option<SlotTag>,
    /// Tagged target slot.
    pub target: Option<SlotTag>,
    /// Item expected in the target, moving back to the source.
    pub swap_item_id: Option<ItemId>,
    /// Quantity expected in the target.
    pub swap_quantity: i32,
}

impl MoveRequest {
    /// Generic-to-generic request for `quantity` of `item_id`.
    pub fn new(item_id: impl Into<ItemId>, quantity: i32) -> Self {
        Self {
            item_id: item_id.into(),
            quantity,
            source: None,
            target: None,
            swap_item_id: None,
            swap_quantity: 0,
        }
    }

    /// Take the items from a tagged slot.
    pub fn from_slot(mut self, slot: impl Into<SlotTag>) -> Self {
        self.source = Some(slot.into());
        self
    }

    /// Put the items into a tagged slot.
    pub fn to_slot(mut self, slot: impl Into<SlotTag>) -> Self {
        self.target = Some(slot.into());
        self
    }

    /// Expect the target to hold `quantity` of `item_id` and swap it back.
    pub fn with_swap(mut self, item_id: impl Into<ItemId>, quantity: i32) -> Self {
        self.swap_item_id = Some(item_id.into());
        self.swap_quantity = quantity;
        self
    }

    /// The swap-back item when a swap was requested.
    pub fn swap_item(&self) -> Option<&ItemId> {
        self.swap_item_id
            .as_ref()
            .filter(|id| id.is_valid() && self.swap_quantity > 0)
    }
}

/// Request queued by a client replica instead of mutating locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InventoryRequest {
    /// Generic/tagged move.
    MoveItems(MoveRequest),
    /// Drop from the container.
    DropItems {
        /// Item to drop.
        item_id: ItemId,
        /// Quantity to drop.
        quantity: i32,
        /// Drop direction in degrees.
        angle_degrees: f32,
    },
    /// Drop from a tagged slot.
    DropFromTaggedSlot {
        /// Source slot.
        slot: SlotTag,
        /// Quantity to drop.
        quantity: i32,
        /// Drop direction in degrees.
        angle_degrees: f32,
    },
    /// Drop everything.
    DropAllItems,
    /// Consume from generic storage.
    UseItem {
        /// Usable item.
        item_id: ItemId,
    },
    /// Consume from a tagged slot.
    UseItemFromTaggedSlot {
        /// Slot holding a usable item.
        slot: SlotTag,
    },
    /// Craft one batch of a recipe.
    CraftRecipe {
        /// Recipe to craft.
        recipe: RecipeId,
    },
    /// Lock or unlock a recipe.
    SetRecipeLock {
        /// Recipe to change.
        recipe: RecipeId,
        /// New state.
        locked: bool,
    },
}

impl InventoryRequest {
    /// Quantity the requester expects to be affected.
    pub fn requested_quantity(&self) -> i32 {
        match self {
            InventoryRequest::MoveItems(request) => request.quantity,
            InventoryRequest::DropItems { quantity, .. }
            | InventoryRequest::DropFromTaggedSlot { quantity, .. } => *quantity,
            InventoryRequest::DropAllItems
            | InventoryRequest::UseItem { .. }
            | InventoryRequest::UseItemFromTaggedSlot { .. }
            | InventoryRequest::CraftRecipe { .. }
            | InventoryRequest::SetRecipeLock { .. } => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_swap_item_requires_quantity() {
        let request = MoveRequest::new("sword", 1).to_slot("MainHand").with_swap("axe", 0);
        assert!(request.swap_item().is_none());

        let request = MoveRequest::new("sword", 1).to_slot("MainHand").with_swap("axe", 1);
        assert_eq!(request.swap_item(), Some(&ItemId::new("axe")));
    }
}
