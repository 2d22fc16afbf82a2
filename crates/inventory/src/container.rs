//! Weight- and slot-limited item container.
//!
//! The container stores aggregate quantities per item in insertion order;
//! it has no positional slots. Slot usage is derived from quantities and
//! stack limits. Quantities parked in tagged slots by an [`crate::Inventory`]
//! are still part of the container totals but are "reserved": they count
//! towards weight, not towards generic slot usage, and container events only
//! describe the generic part.

use crate::authority::{require_authority, NetRole};
use crate::events::{EventBus, InventoryEvent, SubscriberId};
use crate::request::InventoryRequest;
use crate::source::{DroppedStack, ItemSource, UnlimitedSource, WorldSpawner};
use invsync_core::{ChangeReason, ItemCatalog, ItemDefinition, ItemId, ItemStack};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Capacity limits of a container.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerLimits {
    /// Maximum total weight; `<= 0` means unlimited.
    pub max_weight: f32,
    /// Maximum number of generic stacks.
    pub max_slot_count: i32,
}

impl Default for ContainerLimits {
    fn default() -> Self {
        Self {
            max_weight: 0.0,
            max_slot_count: 16,
        }
    }
}

/// Authoritative aggregate item storage with change events.
pub struct ItemContainer {
    catalog: Arc<ItemCatalog>,
    role: NetRole,
    limits: ContainerLimits,
    items: Vec<ItemStack>,
    reserved: BTreeMap<ItemId, i32>,
    current_weight: f32,
    used_slots: i32,
    version: u64,
    published: BTreeMap<ItemId, i32>,
    events: EventBus,
    requests: Vec<InventoryRequest>,
    spawner: Option<Box<dyn WorldSpawner>>,
}

impl fmt::Debug for ItemContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemContainer")
            .field("role", &self.role)
            .field("limits", &self.limits)
            .field("items", &self.items)
            .field("reserved", &self.reserved)
            .field("current_weight", &self.current_weight)
            .field("used_slots", &self.used_slots)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

impl ItemContainer {
    /// Create an empty authoritative container.
    pub fn new(catalog: Arc<ItemCatalog>, limits: ContainerLimits) -> Self {
        Self {
            catalog,
            role: NetRole::Authority,
            limits,
            items: Vec::new(),
            reserved: BTreeMap::new(),
            current_weight: 0.0,
            used_slots: 0,
            version: 0,
            published: BTreeMap::new(),
            events: EventBus::new(),
            requests: Vec::new(),
            spawner: None,
        }
    }

    /// Set the network role.
    pub fn with_role(mut self, role: NetRole) -> Self {
        self.role = role;
        self
    }

    /// Attach the world collaborator used by drops.
    pub fn with_spawner(mut self, spawner: Box<dyn WorldSpawner>) -> Self {
        self.spawner = Some(spawner);
        self
    }

    /// Replace the world collaborator.
    pub fn set_spawner(&mut self, spawner: Box<dyn WorldSpawner>) {
        self.spawner = Some(spawner);
    }

    /// Network role.
    pub fn role(&self) -> NetRole {
        self.role
    }

    /// Capacity limits.
    pub fn limits(&self) -> ContainerLimits {
        self.limits
    }

    /// Catalog used for lookups.
    pub fn catalog(&self) -> &Arc<ItemCatalog> {
        &self.catalog
    }

    /// Stored totals in insertion order.
    pub fn items(&self) -> &[ItemStack] {
        &self.items
    }

    /// Generic (non-tagged) part of every stored item, insertion order, empty parts skipped.
    pub fn generic_items(&self) -> Vec<ItemStack> {
        self.items
            .iter()
            .map(|stack| {
                ItemStack::new(stack.item_id.clone(), self.generic_quantity(&stack.item_id))
            })
            .filter(ItemStack::is_valid)
            .collect()
    }

    /// Total quantity of `item_id`.
    pub fn count(&self, item_id: &ItemId) -> i32 {
        self.items
            .iter()
            .find(|stack| stack.item_id == *item_id)
            .map_or(0, |stack| stack.quantity)
    }

    /// Quantity of `item_id` outside tagged slots.
    pub fn generic_quantity(&self, item_id: &ItemId) -> i32 {
        (self.count(item_id) - self.reserved.get(item_id).copied().unwrap_or(0)).max(0)
    }

    /// Whether at least `quantity` of `item_id` is stored.
    pub fn contains(&self, item_id: &ItemId, quantity: i32) -> bool {
        self.count(item_id) >= quantity
    }

    /// Whether nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Derived total weight.
    pub fn current_weight(&self) -> f32 {
        self.current_weight
    }

    /// Derived generic slot usage.
    pub fn used_slots(&self) -> i32 {
        self.used_slots
    }

    /// Authority version of the current contents.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// How many of `item_id` the container could accept right now.
    pub fn receivable_quantity(&self, item_id: &ItemId) -> i32 {
        match self.catalog.lookup(item_id) {
            Some(def) => self.receivable_by_weight(def).min(self.receivable_by_slots(def, false)),
            None => 0,
        }
    }

    /// Whether the whole stack fits.
    pub fn can_receive(&self, stack: &ItemStack) -> bool {
        self.receivable_quantity(&stack.item_id) >= stack.quantity
    }

    /// Weight allowance for `def`; unlimited for weightless items or containers.
    pub fn receivable_by_weight(&self, def: &ItemDefinition) -> i32 {
        if self.limits.max_weight <= 0.0 || def.weight <= 0.0 {
            return i32::MAX;
        }
        let allowance = ((self.limits.max_weight - self.current_weight) / def.weight).floor();
        if allowance <= 0.0 {
            0
        } else if allowance >= i32::MAX as f32 {
            i32::MAX
        } else {
            allowance as i32
        }
    }

    /// Generic slot allowance for `def`: free slots plus room in the partial stack.
    ///
    /// With `allow_swapback`, a full container still accepts one stack since a
    /// swap frees the slot it fills.
    pub fn receivable_by_slots(&self, def: &ItemDefinition, allow_swapback: bool) -> i32 {
        let limit = def.stack_limit();
        let remainder = self.generic_quantity(&def.id) % limit;
        let till_next = if limit > 1 && remainder != 0 {
            limit - remainder
        } else {
            0
        };
        let free = (self.limits.max_slot_count - self.used_slots).max(0);
        let receivable = free.saturating_mul(limit).saturating_add(till_next);
        if allow_swapback && receivable == 0 {
            limit
        } else {
            receivable
        }
    }

    /// Add items created from nothing. Returns the quantity added.
    pub fn add_items(&mut self, stack: ItemStack, allow_partial: bool) -> i32 {
        self.add_items_from(&mut UnlimitedSource, stack, allow_partial)
    }

    /// Add items extracted from `source`. Returns the quantity added.
    pub fn add_items_from(
        &mut self,
        source: &mut dyn ItemSource,
        stack: ItemStack,
        allow_partial: bool,
    ) -> i32 {
        if !require_authority(self.role, "add_items") || stack.is_empty() {
            return 0;
        }
        let catalog = Arc::clone(&self.catalog);
        let Some(def) = catalog.lookup(&stack.item_id) else {
            error!(item = %stack.item_id, "add_items: unknown item definition");
            return 0;
        };

        let acceptable = self
            .receivable_by_weight(def)
            .min(self.receivable_by_slots(def, false))
            .min(source.contained_quantity(&stack.item_id));
        if acceptable <= 0 || (!allow_partial && acceptable < stack.quantity) {
            return 0;
        }
        let extracted = source.extract_if_authoritative(
            &stack.item_id,
            acceptable.min(stack.quantity),
            ChangeReason::Transferred,
        );
        if extracted <= 0 {
            return 0;
        }

        self.insert_raw(&stack.item_id, extracted);
        self.commit();
        debug!(item = %stack.item_id, quantity = extracted, "items added");
        self.publish(InventoryEvent::ItemAdded {
            stack: ItemStack::new(stack.item_id, extracted),
            reason: ChangeReason::Added,
        });
        extracted
    }

    /// Move items out of another container into this one.
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

    /// Remove items from generic storage. Returns the quantity removed.
    pub fn remove_items(&mut self, stack: ItemStack, allow_partial: bool) -> i32 {
        self.destroy_items(stack, ChangeReason::Removed, allow_partial)
    }

    /// Remove items from generic storage with an explicit reason.
    pub fn destroy_items(
        &mut self,
        stack: ItemStack,
        reason: ChangeReason,
        allow_partial: bool,
    ) -> i32 {
        if !require_authority(self.role, "destroy_items") || stack.is_empty() {
            return 0;
        }
        let available = self.generic_quantity(&stack.item_id);
        if available <= 0 || (!allow_partial && available < stack.quantity) {
            return 0;
        }
        let removed = available.min(stack.quantity);
        self.remove_raw(&stack.item_id, removed);
        self.commit();
        debug!(item = %stack.item_id, quantity = removed, ?reason, "items removed");
        self.publish(InventoryEvent::ItemRemoved {
            stack: ItemStack::new(stack.item_id, removed),
            reason,
        });
        removed
    }

    /// Drop items into the world.
    ///
    /// On a client this forwards a request and returns the locally guessed
    /// quantity. On the authority nothing is removed unless the spawner accepts.
    pub fn drop_items(&mut self, stack: ItemStack, angle_degrees: f32) -> i32 {
        if stack.is_empty() {
            return 0;
        }
        let quantity = stack.quantity.min(self.generic_quantity(&stack.item_id));
        if quantity <= 0 {
            return 0;
        }
        let dropped = ItemStack::new(stack.item_id, quantity);
        if self.role.is_client() {
            self.forward(InventoryRequest::DropItems {
                item_id: dropped.item_id,
                quantity,
                angle_degrees,
            });
            return quantity;
        }
        if !self.spawn_dropped(&dropped, angle_degrees) {
            return 0;
        }
        self.destroy_items(dropped, ChangeReason::Dropped, true)
    }

    /// Drop every stack, newest first, at evenly spaced angles.
    ///
    /// Returns the number of stacks dropped.
    pub fn drop_all_items(&mut self) -> i32 {
        let stacks: Vec<ItemStack> = self.generic_items().into_iter().rev().collect();
        if self.role.is_client() {
            self.forward(InventoryRequest::DropAllItems);
            return stacks.len() as i32;
        }
        if stacks.is_empty() {
            return 0;
        }
        let step = 360.0 / stacks.len() as f32;
        let mut dropped = 0;
        for (index, stack) in stacks.into_iter().enumerate() {
            if self.drop_items(stack, step * index as f32) > 0 {
                dropped += 1;
            }
        }
        dropped
    }

    /// Consume one use of `item_id`.
    ///
    /// On a client this forwards a request and returns the guessed quantity.
    pub fn use_item(&mut self, item_id: &ItemId) -> i32 {
        let Some(usable) = self.catalog.lookup(item_id).and_then(|def| def.usable) else {
            debug!(item = %item_id, "item is not usable");
            return 0;
        };
        let quantity = usable.quantity_per_use.max(1);
        if self.generic_quantity(item_id) < quantity {
            return 0;
        }
        if self.role.is_client() {
            self.forward(InventoryRequest::UseItem {
                item_id: item_id.clone(),
            });
            return quantity;
        }
        self.destroy_items(ItemStack::new(item_id.clone(), quantity), ChangeReason::Consumed, false)
    }

    /// Remove everything, publishing a removal per stack.
    pub fn clear(&mut self) {
        if !require_authority(self.role, "clear") {
            return;
        }
        for stack in self.generic_items() {
            self.publish(InventoryEvent::ItemRemoved {
                stack,
                reason: ChangeReason::ForceDestroyed,
            });
        }
        self.items.clear();
        self.reserved.clear();
        self.commit();
    }

    /// Replace contents with a replicated state and publish the difference.
    ///
    /// Snapshots not newer than the current version are ignored.
    pub fn apply_snapshot(&mut self, items: Vec<ItemStack>, version: u64) -> bool {
        if !self.replace_items(items, version) {
            return false;
        }
        self.detect_and_publish_changes();
        true
    }

    /// Diff generic quantities against the last published state and publish
    /// removals, then additions.
    pub fn detect_and_publish_changes(&mut self) {
        let (removed, added) = self.diff_generic();
        for stack in removed {
            self.publish(InventoryEvent::ItemRemoved {
                stack,
                reason: ChangeReason::Synced,
            });
        }
        for stack in added {
            self.publish(InventoryEvent::ItemAdded {
                stack,
                reason: ChangeReason::Synced,
            });
        }
    }

    /// Subscribe to change events.
    pub fn subscribe(&mut self) -> SubscriberId {
        self.events.subscribe()
    }

    /// Stop receiving events.
    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        self.events.unsubscribe(id)
    }

    /// Take pending events for a subscriber.
    pub fn drain_events(&mut self, id: SubscriberId) -> Vec<InventoryEvent> {
        self.events.drain(id)
    }

    /// Take requests queued while acting as a client.
    pub fn take_requests(&mut self) -> Vec<InventoryRequest> {
        std::mem::take(&mut self.requests)
    }

    /// Requests queued and not yet taken.
    pub fn queued_requests(&self) -> usize {
        self.requests.len()
    }

    pub(crate) fn publish(&mut self, event: InventoryEvent) {
        self.events.publish(event);
    }

    pub(crate) fn forward(&mut self, request: InventoryRequest) {
        debug!(?request, "forwarding request to authority");
        self.requests.push(request);
    }

    pub(crate) fn spawn_dropped(&mut self, stack: &ItemStack, angle_degrees: f32) -> bool {
        let Some(spawner) = self.spawner.as_mut() else {
            warn!(item = %stack.item_id, "drop requested without a world spawner");
            return false;
        };
        let drop = DroppedStack {
            stack: stack.clone(),
            angle_degrees,
        };
        if !spawner.spawn_dropped_stack(&drop) {
            warn!(item = %stack.item_id, "world refused dropped stack");
            return false;
        }
        true
    }

    /// Merge `quantity` into the stored total without events.
    pub(crate) fn insert_raw(&mut self, item_id: &ItemId, quantity: i32) {
        match self.items.iter_mut().find(|stack| stack.item_id == *item_id) {
            Some(stack) => stack.quantity += quantity,
            None => self.items.push(ItemStack::new(item_id.clone(), quantity)),
        }
    }

    /// Decrement the stored total without events; drops exhausted entries.
    pub(crate) fn remove_raw(&mut self, item_id: &ItemId, quantity: i32) -> i32 {
        let Some(index) = self.items.iter().position(|stack| stack.item_id == *item_id) else {
            return 0;
        };
        let removed = quantity.min(self.items[index].quantity);
        self.items[index].quantity -= removed;
        if self.items[index].quantity <= 0 {
            self.items.remove(index);
        }
        removed
    }

    /// Set quantities held in tagged slots.
    pub(crate) fn set_reserved(&mut self, reserved: BTreeMap<ItemId, i32>) {
        self.reserved = reserved;
    }

    /// Recompute derived values and bump the version.
    pub(crate) fn commit(&mut self) {
        self.update_weight_and_slots();
        self.version += 1;
    }

    pub(crate) fn replace_items(&mut self, items: Vec<ItemStack>, version: u64) -> bool {
        if version <= self.version {
            debug!(version, current = self.version, "ignoring stale snapshot");
            return false;
        }
        self.items = items.into_iter().filter(ItemStack::is_valid).collect();
        self.version = version;
        self.update_weight_and_slots();
        true
    }

    /// Generic quantities that shrank and grew since the last call.
    pub(crate) fn diff_generic(&mut self) -> (Vec<ItemStack>, Vec<ItemStack>) {
        let current: BTreeMap<ItemId, i32> = self
            .generic_items()
            .into_iter()
            .map(|stack| (stack.item_id, stack.quantity))
            .collect();

        let removed = self
            .published
            .iter()
            .filter_map(|(id, old)| {
                let new = current.get(id).copied().unwrap_or(0);
                (new < *old).then(|| ItemStack::new(id.clone(), old - new))
            })
            .collect();
        let added = self
            .generic_items()
            .into_iter()
            .filter_map(|stack| {
                let old = self.published.get(&stack.item_id).copied().unwrap_or(0);
                (stack.quantity > old).then(|| ItemStack::new(stack.item_id, stack.quantity - old))
            })
            .collect();

        self.published = current;
        (removed, added)
    }

    pub(crate) fn update_weight_and_slots(&mut self) {
        let mut weight = 0.0;
        let mut slots = 0;
        for stack in &self.items {
            let Some(def) = self.catalog.lookup(&stack.item_id) else {
                continue;
            };
            weight += def.weight * stack.quantity as f32;
            let reserved = self.reserved.get(&stack.item_id).copied().unwrap_or(0);
            let generic = (stack.quantity - reserved).max(0);
            let limit = def.stack_limit();
            slots += (generic + limit - 1) / limit;
        }
        self.current_weight = weight;
        self.used_slots = slots;
    }
}

/// Another container handing items over, generic storage only.
impl ItemSource for ItemContainer {
    fn extract_if_authoritative(
        &mut self,
        item_id: &ItemId,
        quantity: i32,
        reason: ChangeReason,
    ) -> i32 {
        if !self.role.has_authority() || quantity <= 0 {
            return 0;
        }
        self.destroy_items(ItemStack::new(item_id.clone(), quantity), reason, true)
    }

    fn contained_quantity(&self, item_id: &ItemId) -> i32 {
        if self.role.has_authority() {
            self.generic_quantity(item_id)
        } else {
            0
        }
    }
}
