//! Pure slot-to-slot move algorithm shared by the authoritative inventory
//! and the client view model.

use invsync_core::{ItemCatalog, ItemStack, SlotTag};
use serde::{Deserialize, Serialize};

/// Outcome of a move between two slots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MoveResult {
    /// Quantity that left the source; 0 on failure.
    pub quantity_moved: i32,
    /// Whether the two slots exchanged contents.
    pub was_swap: bool,
}

impl MoveResult {
    /// Nothing moved.
    pub const FAILED: MoveResult = MoveResult {
        quantity_moved: 0,
        was_swap: false,
    };

    /// Whether anything moved.
    pub fn succeeded(&self) -> bool {
        self.quantity_moved > 0
    }
}

/// Address of a visual or authoritative slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SlotRef {
    /// Index into the generic grid.
    Generic(usize),
    /// Named tagged slot.
    Tagged(SlotTag),
}

impl SlotRef {
    /// Tagged slot reference from anything convertible to a tag.
    pub fn tagged(tag: impl Into<SlotTag>) -> Self {
        SlotRef::Tagged(tag.into())
    }

    /// The tag for tagged slots.
    pub fn tag(&self) -> Option<&SlotTag> {
        match self {
            SlotRef::Tagged(tag) => Some(tag),
            SlotRef::Generic(_) => None,
        }
    }

    /// Whether this names a tagged slot.
    pub fn is_tagged(&self) -> bool {
        matches!(self, SlotRef::Tagged(_))
    }
}

/// Whether moving `source` onto `target` exchanges the two stacks.
pub fn should_swap(catalog: &ItemCatalog, source: &ItemStack, target: &ItemStack) -> bool {
    if target.is_empty() {
        return false;
    }
    let stackable = catalog
        .lookup(&source.item_id)
        .is_some_and(|def| def.stackable);
    !(stackable && source.item_id == target.item_id)
}

/// Move up to `requested` items from `source` onto `target`.
///
/// Same-kind stackable items merge, capped by the stack limit unless
/// `ignore_max_stacks` is set. Different kinds swap, which requires moving the
/// whole source stack. Moving a whole stack into an empty slot is also a swap.
pub fn move_between_slots(
    catalog: &ItemCatalog,
    source: &mut ItemStack,
    target: &mut ItemStack,
    ignore_max_stacks: bool,
    requested: i32,
    allow_partial: bool,
) -> MoveResult {
    if source.is_empty() || requested <= 0 {
        return MoveResult::FAILED;
    }
    let Some(def) = catalog.lookup(&source.item_id) else {
        return MoveResult::FAILED;
    };
    if !allow_partial && requested > source.quantity {
        return MoveResult::FAILED;
    }

    let mut transfer = requested.min(source.quantity);
    let swap = if target.is_valid() {
        let should_stack = def.stackable && source.item_id == target.item_id;
        if !should_stack && source.quantity > requested {
            // a partial stack cannot be swapped with a different kind
            return MoveResult::FAILED;
        }
        if should_stack && !ignore_max_stacks {
            transfer = transfer.min(def.stack_limit() - target.quantity);
        }
        !should_stack
    } else {
        transfer >= source.quantity
    };

    if transfer <= 0 || (!allow_partial && transfer < requested) {
        return MoveResult::FAILED;
    }

    if swap {
        std::mem::swap(source, target);
    } else {
        if target.is_empty() {
            *target = ItemStack::new(source.item_id.clone(), 0);
        }
        target.quantity += transfer;
        source.quantity -= transfer;
        if source.quantity <= 0 {
            source.clear();
        }
    }

    MoveResult {
        quantity_moved: transfer,
        was_swap: swap,
    }
}

/// Slot storage addressable by [`SlotRef`].
pub trait SlotStore {
    /// Contents of a slot, or `None` if the slot does not exist.
    fn slot(&self, slot: &SlotRef) -> Option<&ItemStack>;

    /// Mutable contents of an existing slot.
    fn slot_mut(&mut self, slot: &SlotRef) -> Option<&mut ItemStack>;
}

/// Run [`move_between_slots`] on two slots of the same store.
pub fn move_in_store<S: SlotStore + ?Sized>(
    store: &mut S,
    catalog: &ItemCatalog,
    source: &SlotRef,
    target: &SlotRef,
    ignore_max_stacks: bool,
    requested: i32,
    allow_partial: bool,
) -> MoveResult {
    if source == target {
        return MoveResult::FAILED;
    }
    let (Some(source_stack), Some(target_stack)) = (store.slot(source), store.slot(target)) else {
        return MoveResult::FAILED;
    };
    let mut source_stack = source_stack.clone();
    let mut target_stack = target_stack.clone();

    let result = move_between_slots(
        catalog,
        &mut source_stack,
        &mut target_stack,
        ignore_max_stacks,
        requested,
        allow_partial,
    );
    if result.succeeded() {
        if let Some(slot) = store.slot_mut(source) {
            *slot = source_stack;
        }
        if let Some(slot) = store.slot_mut(target) {
            *slot = target_stack;
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use invsync_core::ItemDefinition;

    fn catalog() -> ItemCatalog {
        let mut sword = ItemDefinition::new("sword", 1);
        sword.stackable = false;
        ItemCatalog::from_definitions([
            ItemDefinition::new("apple", 5),
            ItemDefinition::new("pear", 5),
            sword,
        ])
        .unwrap()
    }

    #[test]
    fn test_merge_respects_stack_cap() {
        let catalog = catalog();
        let mut source = ItemStack::new("apple", 3);
        let mut target = ItemStack::new("apple", 2);

        let result = move_between_slots(&catalog, &mut source, &mut target, false, 3, true);

        assert_eq!(result, MoveResult { quantity_moved: 3, was_swap: false });
        assert_eq!(source, ItemStack::EMPTY);
        assert_eq!(target, ItemStack::new("apple", 5));
    }

    #[test]
    fn test_merge_partial_when_target_nearly_full() {
        let catalog = catalog();
        let mut source = ItemStack::new("apple", 3);
        let mut target = ItemStack::new("apple", 4);

        let result = move_between_slots(&catalog, &mut source, &mut target, false, 3, true);

        assert_eq!(result.quantity_moved, 1);
        assert_eq!(source.quantity, 2);
        assert_eq!(target.quantity, 5);
    }

    #[test]
    fn test_ignore_max_stacks() {
        let catalog = catalog();
        let mut source = ItemStack::new("apple", 3);
        let mut target = ItemStack::new("apple", 4);

        let result = move_between_slots(&catalog, &mut source, &mut target, true, 3, true);

        assert_eq!(result.quantity_moved, 3);
        assert_eq!(target.quantity, 7);
    }

    #[test]
    fn test_all_or_nothing() {
        let catalog = catalog();
        let mut source = ItemStack::new("apple", 3);
        let mut target = ItemStack::new("apple", 4);

        let result = move_between_slots(&catalog, &mut source, &mut target, false, 3, false);

        assert_eq!(result, MoveResult::FAILED);
        assert_eq!(source.quantity, 3);
        assert_eq!(target.quantity, 4);
    }

    #[test]
    fn test_swap_different_kinds() {
        let catalog = catalog();
        let mut source = ItemStack::new("apple", 3);
        let mut target = ItemStack::new("pear", 2);

        let result = move_between_slots(&catalog, &mut source, &mut target, false, 3, true);

        assert_eq!(result, MoveResult { quantity_moved: 3, was_swap: true });
        assert_eq!(source, ItemStack::new("pear", 2));
        assert_eq!(target, ItemStack::new("apple", 3));
    }

    #[test]
    fn test_partial_swap_rejected() {
        let catalog = catalog();
        let mut source = ItemStack::new("apple", 3);
        let mut target = ItemStack::new("pear", 2);

        let result = move_between_slots(&catalog, &mut source, &mut target, false, 2, true);

        assert_eq!(result, MoveResult::FAILED);
    }

    #[test]
    fn test_full_move_into_empty_is_swap() {
        let catalog = catalog();
        let mut source = ItemStack::new("apple", 3);
        let mut target = ItemStack::EMPTY;

        let result = move_between_slots(&catalog, &mut source, &mut target, false, 3, true);

        assert!(result.was_swap);
        assert!(source.is_empty());
        assert_eq!(target, ItemStack::new("apple", 3));
    }

    #[test]
    fn test_split_into_empty() {
        let catalog = catalog();
        let mut source = ItemStack::new("apple", 3);
        let mut target = ItemStack::EMPTY;

        let result = move_between_slots(&catalog, &mut source, &mut target, false, 1, true);

        assert!(!result.was_swap);
        assert_eq!(source, ItemStack::new("apple", 2));
        assert_eq!(target, ItemStack::new("apple", 1));
    }

    #[test]
    fn test_non_stackable_same_kind_swaps() {
        let catalog = catalog();
        let mut source = ItemStack::new("sword", 1);
        let mut target = ItemStack::new("sword", 1);

        let result = move_between_slots(&catalog, &mut source, &mut target, false, 1, true);

        assert!(result.was_swap);
        assert_eq!(source.quantity, 1);
        assert_eq!(target.quantity, 1);
    }

    #[test]
    fn test_empty_source_fails() {
        let catalog = catalog();
        let mut source = ItemStack::EMPTY;
        let mut target = ItemStack::new("apple", 1);
        let result = move_between_slots(&catalog, &mut source, &mut target, false, 1, true);
        assert!(!result.succeeded());
    }
}
