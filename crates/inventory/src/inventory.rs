//! Inventory: an item container with tagged slots.
//!
//! Tagged slots hold part of the container's totals. Specialized slots take
//! one category of items; universal slots take anything, may block one
//! another, and may reserve a category for themselves. All mutations are
//! authority-gated; on a client replica the public entry points queue an
//! [`InventoryRequest`] and return a local guess instead.

use crate::authority::{require_authority, NetRole};
use crate::container::{ContainerLimits, ItemContainer};
use crate::crafting::RecipeBook;
use crate::events::{InventoryEvent, SubscriberId};
use crate::move_engine::{move_in_store, SlotRef, SlotStore};
use crate::request::{InventoryRequest, MoveRequest};
use crate::slots::{find_tagged_slot_for_item, SlotLayout, TaggedStack};
use crate::snapshot::InventorySnapshot;
use crate::source::{ItemSource, UnlimitedSource, WorldSpawner};
use invsync_core::{
    ChangeReason, ItemCatalog, ItemDefinition, ItemId, ItemStack, Recipe, RecipeId, RecipeOutput,
    RecipeRegistry, SlotTag, Tag,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Static configuration of an inventory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InventoryConfig {
    /// Weight and generic slot limits.
    pub limits: ContainerLimits,
    /// Tagged slots.
    pub layout: SlotLayout,
    /// Tags used to group available recipes.
    pub recipe_filters: Vec<Tag>,
    /// Recipes unlocked from the start.
    pub unlocked_recipes: Vec<RecipeId>,
}

/// Where [`Inventory::add_items_to_any_slot`] puts items first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PreferredSlotPolicy {
    /// Fill generic storage before tagged slots.
    PreferGenericInventory,
    /// Fill matching tagged slots, then generic storage, then other universal slots.
    #[default]
    PreferSpecializedTaggedSlot,
    /// Fill every tagged slot before generic storage.
    PreferAnyTaggedSlot,
}

/// Split of an incoming quantity between generic storage and tagged slots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Distribution {
    /// Quantity for generic storage.
    pub generic: i32,
    /// Quantity per tagged slot, in fill order.
    pub tagged: Vec<(SlotTag, i32)>,
}

impl Distribution {
    fn plans(&self, slot: &SlotTag) -> bool {
        self.tagged.iter().any(|(planned, _)| planned == slot)
    }

    fn push(&mut self, slot: &SlotTag, quantity: i32) {
        if quantity > 0 {
            self.tagged.push((slot.clone(), quantity));
        }
    }
}

/// Outcome of move validation.
struct ValidatedMove {
    quantity: i32,
    unblock: Option<SlotTag>,
}

/// Item container with tagged slots and crafting state.
#[derive(Debug)]
pub struct Inventory {
    container: ItemContainer,
    layout: SlotLayout,
    tagged: Vec<TaggedStack>,
    published_tagged: BTreeMap<SlotTag, ItemStack>,
    recipes: RecipeBook,
}

impl Inventory {
    /// Create an empty authoritative inventory.
    pub fn new(
        catalog: Arc<ItemCatalog>,
        recipes: Arc<RecipeRegistry>,
        config: InventoryConfig,
    ) -> Self {
        let mut layout = config.layout;
        layout.sort_universal();
        let mut book = RecipeBook::new(recipes).with_filters(config.recipe_filters);
        for recipe in &config.unlocked_recipes {
            book.set_lock(recipe, false);
        }
        let mut inventory = Self {
            container: ItemContainer::new(catalog, config.limits),
            layout,
            tagged: Vec::new(),
            published_tagged: BTreeMap::new(),
            recipes: book,
        };
        inventory.refresh_recipes(false);
        inventory
    }

    /// Set the network role.
    pub fn with_role(mut self, role: NetRole) -> Self {
        self.container = self.container.with_role(role);
        self
    }

    /// Attach the world collaborator used by drops.
    pub fn with_spawner(mut self, spawner: Box<dyn WorldSpawner>) -> Self {
        self.container.set_spawner(spawner);
        self
    }

    /// Replace the world collaborator.
    pub fn set_spawner(&mut self, spawner: Box<dyn WorldSpawner>) {
        self.container.set_spawner(spawner);
    }

    /// Underlying container.
    pub fn container(&self) -> &ItemContainer {
        &self.container
    }

    /// Tagged slot layout.
    pub fn layout(&self) -> &SlotLayout {
        &self.layout
    }

    /// Network role.
    pub fn role(&self) -> NetRole {
        self.container.role()
    }

    /// Catalog used for lookups.
    pub fn catalog(&self) -> &Arc<ItemCatalog> {
        self.container.catalog()
    }

    /// Recipe state.
    pub fn recipe_book(&self) -> &RecipeBook {
        &self.recipes
    }

    /// Authority version.
    pub fn version(&self) -> u64 {
        self.container.version()
    }

    /// Total quantity of `item_id`, tagged slots included.
    pub fn count(&self, item_id: &ItemId) -> i32 {
        self.container.count(item_id)
    }

    /// Whether at least `quantity` of `item_id` is held anywhere.
    pub fn contains(&self, item_id: &ItemId, quantity: i32) -> bool {
        self.container.contains(item_id, quantity)
    }

    /// Quantity of `item_id` outside tagged slots.
    pub fn generic_quantity(&self, item_id: &ItemId) -> i32 {
        self.container.generic_quantity(item_id)
    }

    /// Non-empty tagged slots, plus blocked empty ones.
    pub fn tagged_items(&self) -> &[TaggedStack] {
        &self.tagged
    }

    /// Contents of a tagged slot; empty if unset.
    pub fn item_in_tagged_slot(&self, slot: &SlotTag) -> ItemStack {
        self.tagged_index(slot)
            .map(|index| self.tagged[index].stack.clone())
            .unwrap_or_default()
    }

    /// Whether a blocking universal slot currently blocks `slot`.
    pub fn is_tagged_slot_blocked(&self, slot: &SlotTag) -> bool {
        self.tagged_index(slot).is_some_and(|index| self.tagged[index].blocked)
    }

    /// Whether `item_id` may ever occupy `slot`.
    pub fn is_tagged_slot_compatible(&self, item_id: &ItemId, slot: &SlotTag) -> bool {
        self.catalog()
            .lookup(item_id)
            .is_some_and(|def| self.layout.is_compatible(def, slot))
    }

    /// Subscribe to change events.
    pub fn subscribe(&mut self) -> SubscriberId {
        self.container.subscribe()
    }

    /// Stop receiving events.
    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        self.container.unsubscribe(id)
    }

    /// Take pending events for a subscriber.
    pub fn drain_events(&mut self, id: SubscriberId) -> Vec<InventoryEvent> {
        self.container.drain_events(id)
    }

    /// Take requests queued while acting as a client.
    pub fn take_requests(&mut self) -> Vec<InventoryRequest> {
        self.container.take_requests()
    }

    /// Requests queued and not yet taken.
    pub fn queued_requests(&self) -> usize {
        self.container.queued_requests()
    }

    /// Publish a craft confirmation received from the authority.
    pub fn notify_craft_confirmed(&mut self, output: RecipeOutput, quantity: i32) {
        self.container
            .publish(InventoryEvent::CraftConfirmed { output, quantity });
    }

    // ---------------------------------------------------------------------
    // Capacity
    // ---------------------------------------------------------------------

    /// How many of `item_id` fit anywhere: generic storage plus every tagged slot.
    pub fn receivable_quantity(&self, item_id: &ItemId) -> i32 {
        let Some(def) = self.catalog().lookup(item_id) else {
            return 0;
        };
        let mut total = i64::from(self.container.receivable_by_slots(def, false));
        for specialized in &self.layout.specialized {
            let receivable =
                self.tagged_receivable(def, &specialized.slot, i32::MAX, true, false, true);
            total += i64::from(receivable);
        }
        let mut blocked: Vec<&SlotTag> = Vec::new();
        for universal in &self.layout.universal {
            if blocked.contains(&&universal.slot) {
                continue;
            }
            let receivable =
                self.tagged_receivable(def, &universal.slot, i32::MAX, true, false, true);
            if receivable > 0 {
                total += i64::from(receivable);
                if let Some(other) = universal.blocked_by(def) {
                    blocked.push(other);
                }
            }
        }
        let total = i32::try_from(total).unwrap_or(i32::MAX);
        total.min(self.container.receivable_by_weight(def))
    }

    /// How many of `def` one tagged slot accepts.
    ///
    /// Without `allow_swapback` a slot holding a different item, a blocked
    /// slot, and a move that would block an occupied slot all yield 0.
    pub fn receivable_for_tagged_slot(
        &self,
        def: &ItemDefinition,
        slot: &SlotTag,
        requested: i32,
        allow_partial: bool,
        allow_swapback: bool,
    ) -> i32 {
        self.tagged_receivable(def, slot, requested, allow_partial, allow_swapback, !allow_swapback)
    }

    fn tagged_receivable(
        &self,
        def: &ItemDefinition,
        slot: &SlotTag,
        requested: i32,
        allow_partial: bool,
        allow_swapback: bool,
        check_blocking: bool,
    ) -> i32 {
        if requested <= 0 || !self.layout.is_compatible(def, slot) {
            return 0;
        }
        if check_blocking && self.would_item_move_indirectly_violate_blocking(slot, def).is_some() {
            return 0;
        }

        let limit = def.stack_limit();
        let mut viable = limit.min(requested);
        let current = self.item_in_tagged_slot(slot);
        if current.is_valid() {
            if current.item_id == def.id {
                if !allow_swapback || limit > 1 {
                    viable = viable.min(limit - current.quantity);
                }
            } else if !allow_swapback {
                return 0;
            }
        }
        if !allow_swapback && self.is_tagged_slot_blocked(slot) {
            return 0;
        }
        if !allow_partial && viable < requested {
            return 0;
        }
        viable.max(0)
    }

    /// Occupied slot that would become blocked if `def` entered `slot`.
    pub fn would_item_move_indirectly_violate_blocking(
        &self,
        slot: &SlotTag,
        def: &ItemDefinition,
    ) -> Option<SlotTag> {
        let blocked = self.layout.universal_slot(slot)?.blocked_by(def)?;
        self.item_in_tagged_slot(blocked)
            .is_valid()
            .then(|| blocked.clone())
    }

    /// Pick a tagged slot for `item_id` based on current contents.
    pub fn find_tagged_slot_for_item(
        &self,
        item_id: &ItemId,
        prefer_empty_universal: bool,
    ) -> Option<SlotTag> {
        let catalog = self.catalog();
        let def = catalog.lookup(item_id)?;
        find_tagged_slot_for_item(
            &self.layout,
            def,
            |slot| {
                let occupant = self.item_in_tagged_slot(slot);
                occupant.is_valid().then_some(occupant)
            },
            |id| catalog.lookup(id),
            prefer_empty_universal,
        )
    }

    // ---------------------------------------------------------------------
    // Generic storage
    // ---------------------------------------------------------------------

    /// Add items created from nothing to generic storage.
    pub fn add_items(&mut self, stack: ItemStack, allow_partial: bool) -> i32 {
        self.add_items_from(&mut UnlimitedSource, stack, allow_partial)
    }

    /// Add items extracted from `source` to generic storage.
    pub fn add_items_from(
        &mut self,
        source: &mut dyn ItemSource,
        stack: ItemStack,
        allow_partial: bool,
    ) -> i32 {
        let added = self.container.add_items_from(source, stack, allow_partial);
        if added > 0 {
            self.refresh_recipes(false);
        }
        added
    }

    /// Move items out of another container into generic storage.
    ///
    /// Nothing leaves `other` unless it fits here.
    pub fn extract_from_other_container(
        &mut self,
        other: &mut dyn ItemSource,
        stack: ItemStack,
        allow_partial: bool,
    ) -> i32 {
        self.add_items_from(other, stack, allow_partial)
    }

    /// Remove items, generic storage first.
    pub fn remove_items(&mut self, stack: ItemStack, allow_partial: bool) -> i32 {
        self.destroy_items(stack, ChangeReason::Removed, allow_partial)
    }

    /// Remove items with an explicit reason.
    ///
    /// Generic storage is drained first; any remainder comes out of tagged
    /// slots, last declared first.
    pub fn destroy_items(
        &mut self,
        stack: ItemStack,
        reason: ChangeReason,
        allow_partial: bool,
    ) -> i32 {
        if !require_authority(self.role(), "destroy_items") || stack.is_empty() {
            return 0;
        }
        let total = self.count(&stack.item_id);
        if total <= 0 || (!allow_partial && total < stack.quantity) {
            return 0;
        }
        let viable = total.min(stack.quantity);
        let from_generic = viable.min(self.generic_quantity(&stack.item_id));
        let mut from_tagged = viable - from_generic;

        self.container.remove_raw(&stack.item_id, viable);
        let mut touched: Vec<(SlotTag, i32)> = Vec::new();
        for entry in self.tagged.iter_mut().rev() {
            if from_tagged <= 0 {
                break;
            }
            if entry.stack.item_id != stack.item_id {
                continue;
            }
            let taken = from_tagged.min(entry.stack.quantity);
            entry.stack.quantity -= taken;
            if entry.stack.quantity <= 0 {
                entry.stack.clear();
            }
            from_tagged -= taken;
            touched.push((entry.slot.clone(), taken));
        }
        for (slot, _) in &touched {
            self.refresh_blocking(slot);
        }
        self.commit();

        debug!(item = %stack.item_id, quantity = viable, ?reason, "items destroyed");
        if from_generic > 0 {
            self.container.publish(InventoryEvent::ItemRemoved {
                stack: ItemStack::new(stack.item_id.clone(), from_generic),
                reason,
            });
        }
        for (slot, taken) in touched {
            self.container.publish(InventoryEvent::ItemRemovedFromTaggedSlot {
                slot,
                stack: ItemStack::new(stack.item_id.clone(), taken),
                reason,
            });
        }
        self.refresh_recipes(false);
        viable
    }

    /// Drop items from generic storage into the world.
    pub fn drop_items(&mut self, stack: ItemStack, angle_degrees: f32) -> i32 {
        let dropped = self.container.drop_items(stack, angle_degrees);
        if dropped > 0 && self.role().has_authority() {
            self.refresh_recipes(false);
        }
        dropped
    }

    /// Drop every tagged slot (last first), then every generic stack (newest first).
    ///
    /// Returns the number of stacks dropped.
    pub fn drop_all_items(&mut self) -> i32 {
        let tagged: Vec<TaggedStack> = self
            .tagged
            .iter()
            .rev()
            .filter(|entry| entry.stack.is_valid())
            .cloned()
            .collect();
        let generic: Vec<ItemStack> = self.container.generic_items().into_iter().rev().collect();
        let total = tagged.len() + generic.len();

        if self.role().is_client() {
            self.container.forward(InventoryRequest::DropAllItems);
            return total as i32;
        }
        if total == 0 {
            return 0;
        }

        let step = 360.0 / total as f32;
        let offset = tagged.len();
        let mut dropped = 0;
        for (index, entry) in tagged.into_iter().enumerate() {
            let angle = step * index as f32;
            if self.drop_from_tagged_slot(&entry.slot, entry.stack.quantity, angle) > 0 {
                dropped += 1;
            }
        }
        for (index, stack) in generic.into_iter().enumerate() {
            if self.container.drop_items(stack, step * (offset + index) as f32) > 0 {
                dropped += 1;
            }
        }
        self.refresh_recipes(false);
        dropped
    }

    /// Remove everything, tagged slots included.
    pub fn clear(&mut self) {
        if !require_authority(self.role(), "clear") {
            return;
        }
        for entry in &self.tagged {
            if entry.stack.is_valid() {
                self.container.publish(InventoryEvent::ItemRemovedFromTaggedSlot {
                    slot: entry.slot.clone(),
                    stack: entry.stack.clone(),
                    reason: ChangeReason::ForceDestroyed,
                });
            }
        }
        self.container.clear();
        self.tagged.clear();
        self.refresh_recipes(false);
    }

    // ---------------------------------------------------------------------
    // Tagged slots
    // ---------------------------------------------------------------------

    /// Put items from `source` into a tagged slot.
    ///
    /// A different occupant is moved to generic storage first, as is an item
    /// that this placement would block, or the item blocking this slot.
    pub fn add_to_tagged_slot(
        &mut self,
        source: &mut dyn ItemSource,
        slot: &SlotTag,
        stack: ItemStack,
        allow_partial: bool,
    ) -> i32 {
        if !require_authority(self.role(), "add_to_tagged_slot") || stack.is_empty() {
            return 0;
        }
        let catalog = Arc::clone(self.catalog());
        let Some(def) = catalog.lookup(&stack.item_id) else {
            error!(item = %stack.item_id, "add_to_tagged_slot: unknown item definition");
            return 0;
        };
        if !self.layout.contains(slot) {
            warn!(slot = %slot, "add_to_tagged_slot: unknown tagged slot");
            return 0;
        }

        let previous = self.item_in_tagged_slot(slot);
        let push_out = previous.is_valid() && previous.item_id != def.id;
        let blocked_here = self.is_tagged_slot_blocked(slot);
        let make_way = push_out || blocked_here;
        let viable = self
            .tagged_receivable(def, slot, stack.quantity, allow_partial, make_way, false)
            .min(self.container.receivable_by_weight(def))
            .min(source.contained_quantity(&def.id));
        if viable <= 0 || (!allow_partial && viable < stack.quantity) {
            return 0;
        }

        // occupants that make way, all checked before anything moves
        let mut displaced: Vec<SlotTag> = Vec::new();
        if let Some(blocked) = self.would_item_move_indirectly_violate_blocking(slot, def) {
            displaced.push(blocked);
        }
        if push_out {
            displaced.push(slot.clone());
        }
        if blocked_here {
            if let Some(blocker) = self.layout.blocker_of(slot) {
                displaced.push(blocker.slot.clone());
            }
        }
        let mut arriving: Vec<(&ItemDefinition, i32)> = Vec::new();
        for tag in &displaced {
            let occupant = self.item_in_tagged_slot(tag);
            if occupant.is_empty() {
                continue;
            }
            let Some(occupant_def) = catalog.lookup(&occupant.item_id) else {
                return 0;
            };
            arriving.push((occupant_def, occupant.quantity));
        }
        if !self.generic_room_for(None, &arriving) {
            debug!(slot = %slot, item = %def.id, "no generic room for displaced occupants");
            return 0;
        }
        for tag in &displaced {
            if !self.vacate_tagged_slot(tag) {
                return 0;
            }
        }

        let extracted = source.extract_if_authoritative(&def.id, viable, ChangeReason::Transferred);
        if extracted <= 0 {
            return 0;
        }
        self.container.insert_raw(&def.id, extracted);
        let entry = self.tagged_entry_mut(slot);
        if entry.stack.item_id == def.id {
            entry.stack.quantity += extracted;
        } else {
            entry.stack = ItemStack::new(def.id.clone(), extracted);
        }
        self.refresh_blocking(slot);
        self.commit();

        debug!(slot = %slot, item = %def.id, quantity = extracted, "added to tagged slot");
        self.container.publish(InventoryEvent::ItemAddedToTaggedSlot {
            slot: slot.clone(),
            stack: ItemStack::new(def.id.clone(), extracted),
            previous,
            reason: ChangeReason::Added,
        });
        self.refresh_recipes(false);
        extracted
    }

    /// Take items out of a tagged slot.
    ///
    /// With `destroy` the items leave the inventory; otherwise they stay as
    /// generic storage.
    pub fn remove_from_tagged_slot(
        &mut self,
        slot: &SlotTag,
        quantity: i32,
        reason: ChangeReason,
        allow_partial: bool,
        destroy: bool,
    ) -> i32 {
        if !require_authority(self.role(), "remove_from_tagged_slot") || quantity <= 0 {
            return 0;
        }
        let current = self.item_in_tagged_slot(slot);
        if current.is_empty() || (!allow_partial && current.quantity < quantity) {
            return 0;
        }
        let removed = quantity.min(current.quantity);
        if destroy {
            self.container.remove_raw(&current.item_id, removed);
        }
        let entry = self.tagged_entry_mut(slot);
        entry.stack.quantity -= removed;
        if entry.stack.quantity <= 0 {
            entry.stack.clear();
        }
        self.refresh_blocking(slot);
        self.commit();

        let stack = ItemStack::new(current.item_id, removed);
        self.container.publish(InventoryEvent::ItemRemovedFromTaggedSlot {
            slot: slot.clone(),
            stack: stack.clone(),
            reason,
        });
        if !destroy {
            self.container.publish(InventoryEvent::ItemAdded { stack, reason });
        }
        self.refresh_recipes(false);
        removed
    }

    /// Move a tagged slot's contents back to generic storage.
    pub fn clear_tagged_slot(&mut self, slot: &SlotTag) -> i32 {
        let occupant = self.item_in_tagged_slot(slot);
        if occupant.is_empty() {
            return 0;
        }
        let request = MoveRequest::new(occupant.item_id, occupant.quantity).from_slot(slot.clone());
        self.move_items(request)
    }

    /// Drop items straight from a tagged slot.
    pub fn drop_from_tagged_slot(
        &mut self,
        slot: &SlotTag,
        quantity: i32,
        angle_degrees: f32,
    ) -> i32 {
        let occupant = self.item_in_tagged_slot(slot);
        if occupant.is_empty() || quantity <= 0 {
            return 0;
        }
        let quantity = quantity.min(occupant.quantity);
        if self.role().is_client() {
            self.container.forward(InventoryRequest::DropFromTaggedSlot {
                slot: slot.clone(),
                quantity,
                angle_degrees,
            });
            return quantity;
        }
        if !self
            .container
            .spawn_dropped(&ItemStack::new(occupant.item_id, quantity), angle_degrees)
        {
            return 0;
        }
        self.remove_from_tagged_slot(slot, quantity, ChangeReason::Dropped, true, true)
    }

    /// Consume one use of `item_id` from generic storage.
    pub fn use_item(&mut self, item_id: &ItemId) -> i32 {
        let used = self.container.use_item(item_id);
        if used > 0 && self.role().has_authority() {
            self.refresh_recipes(false);
        }
        used
    }

    /// Consume one use of the item in a tagged slot.
    pub fn use_item_from_tagged_slot(&mut self, slot: &SlotTag) -> i32 {
        let occupant = self.item_in_tagged_slot(slot);
        if occupant.is_empty() {
            return 0;
        }
        let usable = self.catalog().lookup(&occupant.item_id).and_then(|def| def.usable);
        let Some(usable) = usable else {
            debug!(item = %occupant.item_id, "item is not usable");
            return 0;
        };
        let quantity = usable.quantity_per_use.max(1);
        if occupant.quantity < quantity {
            return 0;
        }
        if self.role().is_client() {
            self.container
                .forward(InventoryRequest::UseItemFromTaggedSlot { slot: slot.clone() });
            return quantity;
        }
        self.remove_from_tagged_slot(slot, quantity, ChangeReason::Consumed, false, true)
    }

    // ---------------------------------------------------------------------
    // Moves
    // ---------------------------------------------------------------------

    /// Read-only: how much [`Inventory::move_items`] would move right now.
    pub fn validate_move_item(&self, request: &MoveRequest) -> i32 {
        self.validate_move(request).map_or(0, |validated| validated.quantity)
    }

    /// Move items between generic storage and tagged slots.
    ///
    /// On a client the request is queued and the locally validated quantity
    /// is returned as a guess.
    pub fn move_items(&mut self, request: MoveRequest) -> i32 {
        if self.role().is_client() {
            let guess = self.validate_move_item(&request);
            self.container.forward(InventoryRequest::MoveItems(request));
            return guess;
        }
        self.move_items_authoritative(&request)
    }

    /// Validate against current state and apply a move.
    pub fn move_items_authoritative(&mut self, request: &MoveRequest) -> i32 {
        if !require_authority(self.role(), "move_items") {
            return 0;
        }
        let Some(validated) = self.validate_move(request) else {
            return 0;
        };
        if let Some(blocked) = &validated.unblock {
            if !self.vacate_tagged_slot(blocked) {
                return 0;
            }
        }

        let moved = match (&request.source, &request.target) {
            (Some(source), Some(target)) => {
                self.apply_tagged_to_tagged(source, target, validated.quantity)
            }
            (Some(source), None) => {
                let swap = request
                    .swap_item()
                    .map(|id| ItemStack::new(id.clone(), request.swap_quantity));
                self.apply_tagged_to_generic(source, &request.item_id, validated.quantity, swap)
            }
            (None, Some(target)) => {
                self.apply_generic_to_tagged(target, &request.item_id, validated.quantity)
            }
            (None, None) => 0,
        };
        debug!(item = %request.item_id, requested = request.quantity, moved, "move applied");
        moved
    }

    fn validate_move(&self, request: &MoveRequest) -> Option<ValidatedMove> {
        if request.quantity <= 0 || !request.item_id.is_valid() {
            return None;
        }
        if request.source.is_none() && request.target.is_none() {
            return None;
        }
        if request.source.is_some() && request.source == request.target {
            return None;
        }
        let catalog = self.catalog();
        let Some(def) = catalog.lookup(&request.item_id) else {
            error!(item = %request.item_id, "move_items: unknown item definition");
            return None;
        };

        let available = match &request.source {
            Some(slot) => {
                let occupant = self.item_in_tagged_slot(slot);
                if occupant.item_id != request.item_id {
                    return None;
                }
                occupant.quantity
            }
            None => self.generic_quantity(&request.item_id),
        };
        if available <= 0 {
            return None;
        }

        let swap = match request.swap_item() {
            Some(swap_id) => {
                let Some(swap_def) = catalog.lookup(swap_id) else {
                    error!(item = %swap_id, "move_items: unknown swap item definition");
                    return None;
                };
                let held = match &request.target {
                    Some(slot) => self.item_in_tagged_slot(slot),
                    None => ItemStack::new(swap_id.clone(), self.generic_quantity(swap_id)),
                };
                if held.item_id != *swap_id || held.quantity < request.swap_quantity {
                    debug!(item = %swap_id, "swap target changed since prediction, rejecting move");
                    return None;
                }
                Some((swap_def, held.quantity.min(request.swap_quantity)))
            }
            None => None,
        };

        let mut quantity = available.min(request.quantity);
        let mut unblock = None;
        match &request.target {
            Some(slot) => {
                if !self.layout.contains(slot) {
                    return None;
                }
                let receivable =
                    self.tagged_receivable(def, slot, quantity, true, swap.is_some(), false);
                quantity = quantity.min(receivable);

                // the blocked occupant leaves first, then the swap lands on top of it
                let mut arriving: Vec<(&ItemDefinition, i32)> = Vec::new();
                if let Some(blocked) = self.would_item_move_indirectly_violate_blocking(slot, def) {
                    if request.source.as_ref() == Some(&blocked) {
                        return None;
                    }
                    let occupant = self.item_in_tagged_slot(&blocked);
                    arriving.push((catalog.lookup(&occupant.item_id)?, occupant.quantity));
                    if !self.generic_room_for(None, &arriving) {
                        debug!(slot = %blocked, "no generic room to unblock");
                        return None;
                    }
                    unblock = Some(blocked);
                }
                if let (Some((swap_def, swap_quantity)), None) = (&swap, &request.source) {
                    arriving.push((*swap_def, *swap_quantity));
                    if !self.generic_room_for(Some((def, quantity)), &arriving) {
                        debug!(item = %swap_def.id, "no generic room for the swapped item");
                        return None;
                    }
                }
            }
            None => {
                let mut room = self.container.receivable_by_slots(def, false);
                if let Some((swap_def, swap_quantity)) = &swap {
                    if self.frees_generic_stack(swap_def, *swap_quantity) {
                        room = room.max(def.stack_limit());
                    }
                }
                quantity = quantity.min(room);
            }
        }

        if let (Some((swap_def, swap_quantity)), Some(source)) = (&swap, &request.source) {
            // the source slot must empty out and accept what comes back
            let returnable =
                self.tagged_receivable(swap_def, source, *swap_quantity, false, true, false);
            if quantity < available || returnable < *swap_quantity {
                return None;
            }
        }

        (quantity > 0).then_some(ValidatedMove { quantity, unblock })
    }

    /// Whether generic storage keeps within its slot limit once `leaving` goes
    /// out and every stack in `arriving` comes in.
    fn generic_room_for(
        &self,
        leaving: Option<(&ItemDefinition, i32)>,
        arriving: &[(&ItemDefinition, i32)],
    ) -> bool {
        let mut change: BTreeMap<&ItemId, (i32, i32)> = BTreeMap::new();
        if let Some((def, quantity)) = leaving {
            change.entry(&def.id).or_insert((def.stack_limit(), 0)).1 -= quantity;
        }
        for (def, quantity) in arriving {
            change.entry(&def.id).or_insert((def.stack_limit(), 0)).1 += quantity;
        }
        let stacks = |n: i32, limit: i32| (n.max(0) + limit - 1) / limit;
        let needed: i32 = change
            .into_iter()
            .map(|(id, (limit, delta))| {
                let held = self.generic_quantity(id);
                stacks(held + delta, limit) - stacks(held, limit)
            })
            .sum();
        let free = self.container.limits().max_slot_count - self.container.used_slots();
        needed <= 0 || needed <= free
    }

    /// Whether taking `quantity` of `def` out of generic storage empties a generic stack.
    fn frees_generic_stack(&self, def: &ItemDefinition, quantity: i32) -> bool {
        let limit = def.stack_limit();
        let held = self.generic_quantity(&def.id);
        let stacks = |n: i32| (n.max(0) + limit - 1) / limit;
        stacks(held) > stacks(held - quantity)
    }

    fn apply_tagged_to_tagged(&mut self, source: &SlotTag, target: &SlotTag, quantity: i32) -> i32 {
        let catalog = Arc::clone(self.catalog());
        let source_before = self.item_in_tagged_slot(source);
        let target_before = self.item_in_tagged_slot(target);
        self.tagged_entry_mut(target);

        let result = move_in_store(
            self,
            &catalog,
            &SlotRef::Tagged(source.clone()),
            &SlotRef::Tagged(target.clone()),
            false,
            quantity,
            true,
        );
        if !result.succeeded() {
            self.tagged.retain(|entry| entry.stack.is_valid() || entry.blocked);
            return 0;
        }
        self.refresh_blocking(source);
        self.refresh_blocking(target);
        self.commit();

        let moved = ItemStack::new(source_before.item_id.clone(), result.quantity_moved);
        self.container.publish(InventoryEvent::ItemRemovedFromTaggedSlot {
            slot: source.clone(),
            stack: moved.clone(),
            reason: ChangeReason::Moved,
        });
        if result.was_swap && target_before.is_valid() {
            self.container.publish(InventoryEvent::ItemRemovedFromTaggedSlot {
                slot: target.clone(),
                stack: target_before.clone(),
                reason: ChangeReason::Moved,
            });
            self.container.publish(InventoryEvent::ItemAddedToTaggedSlot {
                slot: source.clone(),
                stack: target_before.clone(),
                previous: source_before,
                reason: ChangeReason::Moved,
            });
        }
        self.container.publish(InventoryEvent::ItemAddedToTaggedSlot {
            slot: target.clone(),
            stack: moved,
            previous: target_before,
            reason: ChangeReason::Moved,
        });
        result.quantity_moved
    }

    fn apply_tagged_to_generic(
        &mut self,
        source: &SlotTag,
        item_id: &ItemId,
        quantity: i32,
        swap: Option<ItemStack>,
    ) -> i32 {
        let before = self.item_in_tagged_slot(source);
        let entry = self.tagged_entry_mut(source);
        entry.stack.quantity -= quantity;
        if entry.stack.quantity <= 0 {
            entry.stack.clear();
        }
        if let Some(swap) = &swap {
            entry.stack = swap.clone();
        }
        self.refresh_blocking(source);
        self.commit();

        let moved = ItemStack::new(item_id.clone(), quantity);
        self.container.publish(InventoryEvent::ItemRemovedFromTaggedSlot {
            slot: source.clone(),
            stack: moved.clone(),
            reason: ChangeReason::Moved,
        });
        if let Some(swap) = &swap {
            self.container.publish(InventoryEvent::ItemRemoved {
                stack: swap.clone(),
                reason: ChangeReason::Moved,
            });
        }
        self.container.publish(InventoryEvent::ItemAdded {
            stack: moved,
            reason: ChangeReason::Moved,
        });
        if let Some(swap) = swap {
            self.container.publish(InventoryEvent::ItemAddedToTaggedSlot {
                slot: source.clone(),
                stack: swap,
                previous: before,
                reason: ChangeReason::Moved,
            });
        }
        quantity
    }

    fn apply_generic_to_tagged(
        &mut self,
        target: &SlotTag,
        item_id: &ItemId,
        quantity: i32,
    ) -> i32 {
        let before = self.item_in_tagged_slot(target);
        let entry = self.tagged_entry_mut(target);
        if entry.stack.item_id != *item_id {
            entry.stack = ItemStack::new(item_id.clone(), 0);
        }
        entry.stack.quantity += quantity;
        self.refresh_blocking(target);
        self.commit();

        let displaced = before.is_valid() && before.item_id != *item_id;
        let moved = ItemStack::new(item_id.clone(), quantity);
        if displaced {
            self.container.publish(InventoryEvent::ItemRemovedFromTaggedSlot {
                slot: target.clone(),
                stack: before.clone(),
                reason: ChangeReason::Moved,
            });
        }
        self.container.publish(InventoryEvent::ItemRemoved {
            stack: moved.clone(),
            reason: ChangeReason::Moved,
        });
        if displaced {
            self.container.publish(InventoryEvent::ItemAdded {
                stack: before.clone(),
                reason: ChangeReason::Moved,
            });
        }
        self.container.publish(InventoryEvent::ItemAddedToTaggedSlot {
            slot: target.clone(),
            stack: moved,
            previous: before,
            reason: ChangeReason::Moved,
        });
        quantity
    }

    /// Move everything in `slot` to generic storage. True if the slot ends up empty.
    fn vacate_tagged_slot(&mut self, slot: &SlotTag) -> bool {
        let occupant = self.item_in_tagged_slot(slot);
        if occupant.is_empty() {
            return true;
        }
        let request = MoveRequest::new(occupant.item_id, occupant.quantity).from_slot(slot.clone());
        self.move_items_authoritative(&request) == occupant.quantity
    }

    // ---------------------------------------------------------------------
    // Distribution
    // ---------------------------------------------------------------------

    /// Plan where `quantity` of `def` would go under `policy`.
    pub fn distribution_plan(
        &self,
        def: &ItemDefinition,
        quantity: i32,
        policy: PreferredSlotPolicy,
    ) -> Distribution {
        let mut plan = Distribution::default();
        let mut remaining = quantity;
        let limit = def.stack_limit();

        if limit > 1 {
            for entry in &self.tagged {
                if remaining <= 0 {
                    break;
                }
                if entry.stack.item_id == def.id
                    && entry.stack.is_valid()
                    && self.layout.contains(&entry.slot)
                {
                    let take = remaining.min(limit - entry.stack.quantity);
                    plan.push(&entry.slot, take);
                    remaining -= take.max(0);
                }
            }
        }

        let generic = self.generic_quantity(&def.id);
        let partial_room = if limit > 1 && generic % limit != 0 {
            limit - generic % limit
        } else {
            0
        };
        let top_off = remaining.min(partial_room);
        plan.generic += top_off;
        remaining -= top_off;
        let mut generic_left = (self.container.receivable_by_slots(def, false) - top_off).max(0);

        let mut fill_generic = |plan: &mut Distribution, remaining: &mut i32| {
            let take = (*remaining).min(generic_left);
            plan.generic += take;
            generic_left -= take;
            *remaining -= take;
        };

        if policy == PreferredSlotPolicy::PreferGenericInventory {
            fill_generic(&mut plan, &mut remaining);
        }

        for specialized in &self.layout.specialized {
            if remaining <= 0 {
                break;
            }
            if plan.plans(&specialized.slot) {
                continue;
            }
            let take = self.tagged_receivable(def, &specialized.slot, remaining, true, false, true);
            plan.push(&specialized.slot, take);
            remaining -= take;
        }

        let mut blocked: BTreeSet<SlotTag> = BTreeSet::new();
        let mut fill_universal =
            |plan: &mut Distribution, remaining: &mut i32, matching_only: bool| {
                for universal in &self.layout.universal {
                    if *remaining <= 0 {
                        break;
                    }
                    if plan.plans(&universal.slot) || blocked.contains(&universal.slot) {
                        continue;
                    }
                    if matching_only && !def.has_category(&universal.slot) {
                        continue;
                    }
                    let take =
                        self.tagged_receivable(def, &universal.slot, *remaining, true, false, true);
                    if take > 0 {
                        plan.push(&universal.slot, take);
                        *remaining -= take;
                        if let Some(other) = universal.blocked_by(def) {
                            blocked.insert(other.clone());
                        }
                    }
                }
            };

        fill_universal(&mut plan, &mut remaining, true);
        if policy == PreferredSlotPolicy::PreferSpecializedTaggedSlot {
            fill_generic(&mut plan, &mut remaining);
        }
        fill_universal(&mut plan, &mut remaining, false);

        plan.generic += remaining.max(0);
        plan
    }

    /// Add items across generic storage and tagged slots according to `policy`.
    pub fn add_items_to_any_slot(
        &mut self,
        source: &mut dyn ItemSource,
        stack: ItemStack,
        policy: PreferredSlotPolicy,
        allow_partial: bool,
    ) -> i32 {
        if !require_authority(self.role(), "add_items_to_any_slot") || stack.is_empty() {
            return 0;
        }
        let catalog = Arc::clone(self.catalog());
        let Some(def) = catalog.lookup(&stack.item_id) else {
            error!(item = %stack.item_id, "add_items_to_any_slot: unknown item definition");
            return 0;
        };
        let viable = self.receivable_quantity(&def.id).min(stack.quantity);
        if viable <= 0 || (!allow_partial && viable < stack.quantity) {
            return 0;
        }
        let extracted = source.extract_if_authoritative(&def.id, viable, ChangeReason::Transferred);
        if extracted <= 0 {
            return 0;
        }

        let plan = self.distribution_plan(def, extracted, policy);
        self.container.insert_raw(&def.id, extracted);
        let mut previous: Vec<ItemStack> = Vec::with_capacity(plan.tagged.len());
        for (slot, quantity) in &plan.tagged {
            previous.push(self.item_in_tagged_slot(slot));
            let entry = self.tagged_entry_mut(slot);
            if entry.stack.item_id != def.id {
                entry.stack = ItemStack::new(def.id.clone(), 0);
            }
            entry.stack.quantity += quantity;
            self.refresh_blocking(slot);
        }
        self.commit();

        if plan.generic > 0 {
            self.container.publish(InventoryEvent::ItemAdded {
                stack: ItemStack::new(def.id.clone(), plan.generic),
                reason: ChangeReason::Added,
            });
        }
        for ((slot, quantity), previous) in plan.tagged.into_iter().zip(previous) {
            self.container.publish(InventoryEvent::ItemAddedToTaggedSlot {
                slot,
                stack: ItemStack::new(def.id.clone(), quantity),
                previous,
                reason: ChangeReason::Added,
            });
        }
        self.refresh_recipes(false);
        extracted
    }

    /// Pick up a world stack, taking as much as fits.
    pub fn pickup_item(&mut self, world_stack: &mut ItemStack, policy: PreferredSlotPolicy) -> i32 {
        let wanted = world_stack.clone();
        self.add_items_to_any_slot(world_stack, wanted, policy, true)
    }

    // ---------------------------------------------------------------------
    // Crafting
    // ---------------------------------------------------------------------

    /// Whether every component of `recipe` is present.
    pub fn can_craft_recipe(&self, recipe: &Recipe) -> bool {
        recipe.can_craft(|id| self.count(id))
    }

    /// Craft one batch of an unlocked recipe.
    ///
    /// Item output that does not fit is dropped into the world.
    pub fn craft_recipe(&mut self, id: &RecipeId) -> bool {
        let Some(recipe) = self.recipes.recipe(id).cloned() else {
            warn!(recipe = %id, "craft_recipe: unknown recipe");
            return false;
        };
        if !self.recipes.is_unlocked(id) || !self.can_craft_recipe(&recipe) {
            return false;
        }
        if self.role().is_client() {
            self.container
                .forward(InventoryRequest::CraftRecipe { recipe: id.clone() });
            return true;
        }
        if !require_authority(self.role(), "craft_recipe") {
            return false;
        }

        for component in recipe.required_components() {
            let quantity = component.quantity;
            let item = component.item_id.clone();
            if self.destroy_items(component, ChangeReason::Transformed, false) < quantity {
                error!(recipe = %id, item = %item, "craft_recipe: component went missing");
                return false;
            }
        }
        if let RecipeOutput::Item(item_id) = &recipe.output {
            let output = ItemStack::new(item_id.clone(), recipe.quantity_created);
            let added = self.add_items(output, true);
            let overflow = recipe.quantity_created - added;
            if overflow > 0 {
                let leftover = ItemStack::new(item_id.clone(), overflow);
                if !self.container.spawn_dropped(&leftover, 0.0) {
                    warn!(
                        item = %item_id,
                        overflow,
                        "crafted items did not fit and could not be dropped"
                    );
                }
            }
        }
        debug!(recipe = %id, "recipe crafted");
        self.container.publish(InventoryEvent::CraftConfirmed {
            output: recipe.output,
            quantity: recipe.quantity_created,
        });
        true
    }

    /// Lock or unlock a recipe.
    pub fn set_recipe_lock(&mut self, id: &RecipeId, locked: bool) -> bool {
        if self.role().is_client() {
            self.container.forward(InventoryRequest::SetRecipeLock {
                recipe: id.clone(),
                locked,
            });
            return true;
        }
        if !require_authority(self.role(), "set_recipe_lock") {
            return false;
        }
        if !self.recipes.set_lock(id, locked) {
            return false;
        }
        self.container.commit();
        self.refresh_recipes(true);
        true
    }

    // ---------------------------------------------------------------------
    // Replication
    // ---------------------------------------------------------------------

    /// Full state for observers.
    pub fn snapshot(&self) -> InventorySnapshot {
        InventorySnapshot {
            version: self.version(),
            items: self.container.items().to_vec(),
            tagged: self
                .tagged
                .iter()
                .filter(|entry| entry.stack.is_valid() || entry.blocked)
                .cloned()
                .collect(),
            unlocked_recipes: self.recipes.unlocked().cloned().collect(),
        }
    }

    /// Replace state with a newer snapshot and publish the differences.
    pub fn apply_snapshot(&mut self, snapshot: InventorySnapshot) -> bool {
        if !self.container.replace_items(snapshot.items, snapshot.version) {
            return false;
        }
        self.tagged = snapshot
            .tagged
            .into_iter()
            .filter(|entry| self.layout.contains(&entry.slot))
            .collect();
        self.sync_reserved();
        self.container.update_weight_and_slots();
        let unlocked_changed = {
            let before: Vec<RecipeId> = self.recipes.unlocked().cloned().collect();
            self.recipes.set_unlocked(snapshot.unlocked_recipes);
            before != self.recipes.unlocked().cloned().collect::<Vec<_>>()
        };
        self.detect_and_publish_changes();
        self.refresh_recipes(unlocked_changed);
        true
    }

    /// Diff generic and tagged state against the last published state.
    ///
    /// All removals are published before any addition.
    pub fn detect_and_publish_changes(&mut self) {
        let (removed, added) = self.container.diff_generic();

        let current: BTreeMap<SlotTag, ItemStack> = self
            .tagged
            .iter()
            .filter(|entry| entry.stack.is_valid())
            .map(|entry| (entry.slot.clone(), entry.stack.clone()))
            .collect();
        let slots: BTreeSet<&SlotTag> =
            current.keys().chain(self.published_tagged.keys()).collect();

        let mut tagged_removed = Vec::new();
        let mut tagged_added = Vec::new();
        for slot in slots {
            let old = self.published_tagged.get(slot).cloned().unwrap_or_default();
            let new = current.get(slot).cloned().unwrap_or_default();
            if old.item_id == new.item_id {
                if new.quantity < old.quantity {
                    let delta = ItemStack::new(old.item_id, old.quantity - new.quantity);
                    tagged_removed.push((slot.clone(), delta));
                } else if new.quantity > old.quantity {
                    let delta = ItemStack::new(new.item_id, new.quantity - old.quantity);
                    tagged_added.push((slot.clone(), delta, old));
                }
            } else {
                if old.is_valid() {
                    tagged_removed.push((slot.clone(), old.clone()));
                }
                if new.is_valid() {
                    tagged_added.push((slot.clone(), new, old));
                }
            }
        }
        self.published_tagged = current;

        for stack in removed {
            self.container.publish(InventoryEvent::ItemRemoved {
                stack,
                reason: ChangeReason::Synced,
            });
        }
        for (slot, stack) in tagged_removed {
            self.container.publish(InventoryEvent::ItemRemovedFromTaggedSlot {
                slot,
                stack,
                reason: ChangeReason::Synced,
            });
        }
        for (slot, stack, previous) in tagged_added {
            self.container.publish(InventoryEvent::ItemAddedToTaggedSlot {
                slot,
                stack,
                previous,
                reason: ChangeReason::Synced,
            });
        }
        for stack in added {
            self.container.publish(InventoryEvent::ItemAdded {
                stack,
                reason: ChangeReason::Synced,
            });
        }
    }

    /// Apply a request forwarded by a client. Returns the quantity affected.
    pub fn apply_request(&mut self, request: InventoryRequest) -> i32 {
        if !require_authority(self.role(), "apply_request") {
            return 0;
        }
        match request {
            InventoryRequest::MoveItems(request) => self.move_items_authoritative(&request),
            InventoryRequest::DropItems {
                item_id,
                quantity,
                angle_degrees,
            } => self.drop_items(ItemStack::new(item_id, quantity), angle_degrees),
            InventoryRequest::DropFromTaggedSlot {
                slot,
                quantity,
                angle_degrees,
            } => self.drop_from_tagged_slot(&slot, quantity, angle_degrees),
            InventoryRequest::DropAllItems => self.drop_all_items(),
            InventoryRequest::UseItem { item_id } => self.use_item(&item_id),
            InventoryRequest::UseItemFromTaggedSlot { slot } => {
                self.use_item_from_tagged_slot(&slot)
            }
            InventoryRequest::CraftRecipe { recipe } => i32::from(self.craft_recipe(&recipe)),
            InventoryRequest::SetRecipeLock { recipe, locked } => {
                i32::from(self.set_recipe_lock(&recipe, locked))
            }
        }
    }

    // ---------------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------------

    fn tagged_index(&self, slot: &SlotTag) -> Option<usize> {
        self.tagged.iter().position(|entry| entry.slot == *slot)
    }

    fn tagged_entry_mut(&mut self, slot: &SlotTag) -> &mut TaggedStack {
        let index = match self.tagged_index(slot) {
            Some(index) => index,
            None => {
                self.tagged.push(TaggedStack::new(slot.clone(), ItemStack::EMPTY));
                self.tagged.len() - 1
            }
        };
        &mut self.tagged[index]
    }

    /// Recompute the blocked flag of the slot `slot` blocks.
    fn refresh_blocking(&mut self, slot: &SlotTag) {
        let Some(universal) = self.layout.universal_slot(slot) else {
            return;
        };
        let Some(blocked) = universal.blocks.clone() else {
            return;
        };
        let occupant = self.item_in_tagged_slot(slot);
        let blocks = occupant.is_valid()
            && self
                .catalog()
                .lookup(&occupant.item_id)
                .is_some_and(|def| universal.blocked_by(def).is_some());
        if blocks {
            self.tagged_entry_mut(&blocked).blocked = true;
        } else if let Some(index) = self.tagged_index(&blocked) {
            self.tagged[index].blocked = false;
        }
    }

    fn sync_reserved(&mut self) {
        let mut reserved: BTreeMap<ItemId, i32> = BTreeMap::new();
        for entry in &self.tagged {
            if entry.stack.is_valid() {
                *reserved.entry(entry.stack.item_id.clone()).or_insert(0) += entry.stack.quantity;
            }
        }
        self.container.set_reserved(reserved);
    }

    /// Drop empty slot entries, resync reservations and bump the version.
    fn commit(&mut self) {
        self.tagged.retain(|entry| entry.stack.is_valid() || entry.blocked);
        self.sync_reserved();
        self.container.commit();
    }

    fn refresh_recipes(&mut self, force: bool) {
        let container = &self.container;
        let changed = self.recipes.refresh(|id| container.count(id));
        if changed || force {
            self.container.publish(InventoryEvent::AvailableRecipesUpdated);
        }
    }
}

/// Another inventory handing items over; tagged slots give up items last.
impl ItemSource for Inventory {
    fn extract_if_authoritative(
        &mut self,
        item_id: &ItemId,
        quantity: i32,
        reason: ChangeReason,
    ) -> i32 {
        if !self.role().has_authority() || quantity <= 0 {
            return 0;
        }
        self.destroy_items(ItemStack::new(item_id.clone(), quantity), reason, true)
    }

    fn contained_quantity(&self, item_id: &ItemId) -> i32 {
        if self.role().has_authority() {
            self.count(item_id)
        } else {
            0
        }
    }
}

impl SlotStore for Inventory {
    fn slot(&self, slot: &SlotRef) -> Option<&ItemStack> {
        let tag = slot.tag()?;
        self.tagged_index(tag).map(|index| &self.tagged[index].stack)
    }

    fn slot_mut(&mut self, slot: &SlotRef) -> Option<&mut ItemStack> {
        let tag = slot.tag()?;
        let index = self.tagged_index(tag)?;
        Some(&mut self.tagged[index].stack)
    }
}
