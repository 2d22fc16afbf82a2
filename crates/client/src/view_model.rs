//! Visual projection of an inventory with optimistic prediction.
//!
//! The view model owns a fixed grid of generic slots plus a mirror of every
//! tagged slot. User actions are applied to the view immediately and a
//! matching [`ExpectedOperation`] is queued; inventory events that match a
//! queued expectation are confirmations and leave the view untouched.
//! Anything else is applied on top of the view, and if that is impossible the
//! whole view is rebuilt from the inventory.

use invsync_core::{ItemCatalog, ItemDefinition, ItemId, ItemStack, SlotTag};
use invsync_inventory::{
    find_tagged_slot_for_item, move_in_store, Inventory, InventoryEvent, MoveRequest, SlotLayout,
    SlotRef, SlotStore, SubscriberId,
};
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Kind of change a prediction expects the inventory to report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotOperation {
    /// Items enter generic storage.
    Add,
    /// Items enter a tagged slot.
    AddTagged,
    /// Items leave generic storage.
    Remove,
    /// Items leave a tagged slot.
    RemoveTagged,
}

/// One change the view already shows and expects the inventory to confirm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedOperation {
    /// Change kind.
    pub kind: SlotOperation,
    /// Tagged slot for the tagged kinds.
    pub slot: Option<SlotTag>,
    /// Item involved.
    pub item_id: ItemId,
    /// Exact quantity.
    pub quantity: i32,
}

impl ExpectedOperation {
    /// Expect items to enter generic storage.
    pub fn add(item_id: ItemId, quantity: i32) -> Self {
        Self {
            kind: SlotOperation::Add,
            slot: None,
            item_id,
            quantity,
        }
    }

    /// Expect items to leave generic storage.
    pub fn remove(item_id: ItemId, quantity: i32) -> Self {
        Self {
            kind: SlotOperation::Remove,
            slot: None,
            item_id,
            quantity,
        }
    }

    /// Expect items to enter `slot`.
    pub fn add_tagged(slot: SlotTag, item_id: ItemId, quantity: i32) -> Self {
        Self {
            kind: SlotOperation::AddTagged,
            slot: Some(slot),
            item_id,
            quantity,
        }
    }

    /// Expect items to leave `slot`.
    pub fn remove_tagged(slot: SlotTag, item_id: ItemId, quantity: i32) -> Self {
        Self {
            kind: SlotOperation::RemoveTagged,
            slot: Some(slot),
            item_id,
            quantity,
        }
    }

    /// Whether `event` is exactly the change this expectation describes.
    pub fn matches(&self, event: &InventoryEvent) -> bool {
        let (kind, slot, stack) = match event {
            InventoryEvent::ItemAdded { stack, .. } => (SlotOperation::Add, None, stack),
            InventoryEvent::ItemRemoved { stack, .. } => (SlotOperation::Remove, None, stack),
            InventoryEvent::ItemAddedToTaggedSlot { slot, stack, .. } => {
                (SlotOperation::AddTagged, Some(slot), stack)
            }
            InventoryEvent::ItemRemovedFromTaggedSlot { slot, stack, .. } => {
                (SlotOperation::RemoveTagged, Some(slot), stack)
            }
            InventoryEvent::CraftConfirmed { .. } | InventoryEvent::AvailableRecipesUpdated => {
                return false
            }
        };
        self.kind == kind
            && self.slot.as_ref() == slot
            && self.item_id == stack.item_id
            && self.quantity == stack.quantity
    }
}

/// Counters describing how well predictions track the inventory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewModelMetrics {
    /// Expectations queued.
    pub predictions: u64,
    /// Events that confirmed an expectation.
    pub confirmed: u64,
    /// Events applied without a matching expectation.
    pub unmatched: u64,
    /// Full rebuilds from the inventory.
    pub resyncs: u64,
    /// Stacks dropped because the grid was too small.
    pub overflow_drops: u64,
}

/// Client-side visual layout of one [`Inventory`].
#[derive(Debug)]
pub struct SlotViewModel {
    catalog: Arc<ItemCatalog>,
    layout: SlotLayout,
    grid: Vec<ItemStack>,
    tagged: BTreeMap<SlotTag, ItemStack>,
    pending: VecDeque<ExpectedOperation>,
    /// Overflow drops forwarded to the authority and not yet confirmed.
    overflow: Vec<ItemStack>,
    slot_count: usize,
    prefer_empty_universal: bool,
    subscription: Option<SubscriberId>,
    updates: Vec<SlotRef>,
    metrics: ViewModelMetrics,
}

impl SlotViewModel {
    /// Build a view of `inventory` with `slot_count` generic slots.
    pub fn new(inventory: &mut Inventory, slot_count: usize, prefer_empty_universal: bool) -> Self {
        let mut view = Self {
            catalog: Arc::clone(inventory.catalog()),
            layout: inventory.layout().clone(),
            grid: Vec::new(),
            tagged: BTreeMap::new(),
            pending: VecDeque::new(),
            overflow: Vec::new(),
            slot_count,
            prefer_empty_universal,
            subscription: None,
            updates: Vec::new(),
            metrics: ViewModelMetrics::default(),
        };
        view.initialize(inventory, slot_count, prefer_empty_universal);
        view
    }

    /// Rebuild the view from the inventory's current state.
    ///
    /// Subscribes on first use. Generic items are laid out in insertion
    /// order, topping up partial stacks before taking empty slots; whatever
    /// does not fit in the grid is dropped into the world. Overflow already
    /// on its way out is left off the grid and stays expected.
    pub fn initialize(
        &mut self,
        inventory: &mut Inventory,
        slot_count: usize,
        prefer_empty_universal: bool,
    ) {
        let subscription = match self.subscription {
            Some(id) => id,
            None => {
                let id = inventory.subscribe();
                self.subscription = Some(id);
                id
            }
        };
        inventory.drain_events(subscription);

        self.catalog = Arc::clone(inventory.catalog());
        self.layout = inventory.layout().clone();
        self.slot_count = slot_count;
        self.prefer_empty_universal = prefer_empty_universal;
        self.pending = self
            .overflow
            .iter()
            .map(|stack| ExpectedOperation::remove(stack.item_id.clone(), stack.quantity))
            .collect();
        self.updates.clear();
        self.grid = vec![ItemStack::EMPTY; slot_count];
        self.tagged = self
            .layout
            .all_slots()
            .map(|slot| (slot.clone(), ItemStack::EMPTY))
            .collect();
        for entry in inventory.tagged_items() {
            if entry.stack.is_empty() {
                continue;
            }
            if let Some(visual) = self.tagged.get_mut(&entry.slot) {
                *visual = entry.stack.clone();
            }
        }

        let mut withheld: BTreeMap<ItemId, i32> = BTreeMap::new();
        for stack in &self.overflow {
            *withheld.entry(stack.item_id.clone()).or_insert(0) += stack.quantity;
        }
        for stack in inventory.container().generic_items() {
            let leaving = withheld.get_mut(&stack.item_id).map_or(0, |held| {
                let taken = (*held).min(stack.quantity);
                *held -= taken;
                taken
            });
            let leftover = self.place_in_grid(&stack.item_id, stack.quantity - leaving);
            if leftover > 0 {
                self.drop_overflow(inventory, ItemStack::new(stack.item_id, leftover));
            }
        }

        if inventory.role().has_authority() {
            // overflow drops were applied locally and are already in the view
            inventory.drain_events(subscription);
        }

        self.updates = (0..slot_count)
            .map(SlotRef::Generic)
            .chain(self.tagged.keys().cloned().map(SlotRef::Tagged))
            .collect();
    }

    /// Stop observing the inventory.
    pub fn teardown(&mut self, inventory: &mut Inventory) {
        if let Some(id) = self.subscription.take() {
            inventory.unsubscribe(id);
        }
        self.pending.clear();
        self.overflow.clear();
    }

    /// Forget overflow drops the authority will never confirm.
    ///
    /// Call once every request has been answered; the next rebuild lays out
    /// those items again.
    pub fn abandon_overflow(&mut self) {
        if !self.overflow.is_empty() {
            debug!(stacks = self.overflow.len(), "abandoning unconfirmed overflow drops");
            self.overflow.clear();
        }
    }

    /// Overflow drops still waiting for the authority.
    pub fn overflow_in_flight(&self) -> &[ItemStack] {
        &self.overflow
    }

    /// Rebuild from scratch, keeping the current grid size and policy.
    pub fn force_full_update(&mut self, inventory: &mut Inventory) {
        self.metrics.resyncs += 1;
        debug!(pending = self.pending.len(), "rebuilding view from inventory");
        let (slot_count, prefer) = (self.slot_count, self.prefer_empty_universal);
        self.initialize(inventory, slot_count, prefer);
    }

    // ---------------------------------------------------------------------
    // Predictions
    // ---------------------------------------------------------------------

    /// Move a whole slot onto another slot.
    pub fn predict_move(
        &mut self,
        inventory: &mut Inventory,
        source: &SlotRef,
        target: &SlotRef,
    ) -> bool {
        let quantity = self.slot(source).map_or(0, |stack| stack.quantity);
        self.predict_split(inventory, source, target, quantity)
    }

    /// Move up to `quantity` items from `source` onto `target`.
    ///
    /// Grid-to-grid moves are purely visual. Anything touching a tagged slot
    /// is validated against the inventory, shown immediately, and forwarded
    /// as a move request.
    pub fn predict_split(
        &mut self,
        inventory: &mut Inventory,
        source: &SlotRef,
        target: &SlotRef,
        quantity: i32,
    ) -> bool {
        if source == target || quantity <= 0 {
            return false;
        }
        let (Some(source_before), Some(target_before)) =
            (self.slot(source).cloned(), self.slot(target).cloned())
        else {
            return false;
        };
        if source_before.is_empty() {
            return false;
        }
        let Some(def) = self.catalog.lookup(&source_before.item_id) else {
            error!(item = %source_before.item_id, "view holds an unknown item");
            return false;
        };
        let stackable = def.stackable;
        let catalog = Arc::clone(&self.catalog);

        if !source.is_tagged() && !target.is_tagged() {
            let result = move_in_store(self, &catalog, source, target, false, quantity, true);
            if result.succeeded() {
                self.updates.push(source.clone());
                self.updates.push(target.clone());
            }
            return result.succeeded();
        }

        if target_before.item_id == source_before.item_id && !stackable {
            return false;
        }
        let swapping = target_before.is_valid() && target_before.item_id != source_before.item_id;

        let mut request = MoveRequest::new(source_before.item_id.clone(), quantity);
        request.source = source.tag().cloned();
        request.target = target.tag().cloned();
        if swapping {
            request = request.with_swap(target_before.item_id.clone(), target_before.quantity);
        }
        let allowed = inventory.validate_move_item(&request);
        if allowed <= 0 {
            debug!(item = %request.item_id, ?source, ?target, "move rejected by local validation");
            return false;
        }

        let quantity = quantity.min(allowed);
        let result = move_in_store(self, &catalog, source, target, false, quantity, true);
        if !result.succeeded() {
            return false;
        }
        self.updates.push(source.clone());
        self.updates.push(target.clone());

        let moved = ItemStack::new(source_before.item_id.clone(), result.quantity_moved);
        self.expect_leave(source, &moved);
        self.expect_enter(target, &moved);
        if swapping && result.was_swap {
            self.expect_leave(target, &target_before);
            self.expect_enter(source, &target_before);
        }

        request.quantity = result.quantity_moved;
        let applied = inventory.move_items(request);
        if inventory.role().has_authority() && applied != result.quantity_moved {
            warn!(
                predicted = result.quantity_moved,
                applied,
                "local move diverged from prediction"
            );
            self.force_full_update(inventory);
        }
        true
    }

    /// Move a whole slot into the best tagged slot for its item.
    pub fn predict_move_to_any_tagged_slot(
        &mut self,
        inventory: &mut Inventory,
        source: &SlotRef,
    ) -> bool {
        let Some(stack) = self.slot(source).filter(|stack| stack.is_valid()) else {
            return false;
        };
        let Some(def) = self.catalog.lookup(&stack.item_id) else {
            return false;
        };
        let tagged = &self.tagged;
        let catalog = &self.catalog;
        let target = find_tagged_slot_for_item(
            &self.layout,
            def,
            |slot| tagged.get(slot).filter(|stack| stack.is_valid()).cloned(),
            |id| catalog.lookup(id),
            self.prefer_empty_universal,
        );
        let Some(target) = target.map(SlotRef::Tagged) else {
            return false;
        };
        if target == *source {
            return false;
        }
        self.predict_move(inventory, source, &target)
    }

    /// Drop up to `quantity` items from a slot into the world.
    pub fn predict_drop(
        &mut self,
        inventory: &mut Inventory,
        slot: &SlotRef,
        quantity: i32,
        angle_degrees: f32,
    ) -> bool {
        let Some(stack) = self.slot(slot).filter(|stack| stack.is_valid()).cloned() else {
            return false;
        };
        let quantity = quantity.min(stack.quantity);
        if quantity <= 0 {
            return false;
        }
        let dropped = match slot {
            SlotRef::Generic(_) => {
                inventory.drop_items(ItemStack::new(stack.item_id.clone(), quantity), angle_degrees)
            }
            SlotRef::Tagged(tag) => inventory.drop_from_tagged_slot(tag, quantity, angle_degrees),
        };
        self.take_from_slot(slot, &ItemStack::new(stack.item_id, dropped))
    }

    /// Use the item in a grid or tagged slot once.
    ///
    /// A grid slot must itself hold a full use; the inventory takes it from
    /// generic storage as a whole.
    pub fn predict_use(&mut self, inventory: &mut Inventory, slot: &SlotRef) -> bool {
        let Some(stack) = self.slot(slot).filter(|stack| stack.is_valid()).cloned() else {
            return false;
        };
        let per_use = self
            .catalog
            .lookup(&stack.item_id)
            .and_then(|def| def.usable)
            .map(|usable| usable.quantity_per_use.max(1));
        if per_use.map_or(true, |quantity| quantity > stack.quantity) {
            return false;
        }
        let consumed = match slot {
            SlotRef::Generic(_) => inventory.use_item(&stack.item_id),
            SlotRef::Tagged(tag) => inventory.use_item_from_tagged_slot(tag),
        };
        self.take_from_slot(slot, &ItemStack::new(stack.item_id, consumed))
    }

    fn take_from_slot(&mut self, slot: &SlotRef, taken: &ItemStack) -> bool {
        if taken.quantity <= 0 {
            return false;
        }
        if let Some(visual) = self.slot_mut(slot) {
            visual.quantity -= taken.quantity;
            if visual.quantity <= 0 {
                visual.clear();
            }
        }
        self.updates.push(slot.clone());
        self.expect_leave(slot, taken);
        true
    }

    fn expect_leave(&mut self, slot: &SlotRef, stack: &ItemStack) {
        let expected = match slot {
            SlotRef::Generic(_) => ExpectedOperation::remove(stack.item_id.clone(), stack.quantity),
            SlotRef::Tagged(tag) => {
                ExpectedOperation::remove_tagged(tag.clone(), stack.item_id.clone(), stack.quantity)
            }
        };
        self.push_expected(expected);
    }

    fn expect_enter(&mut self, slot: &SlotRef, stack: &ItemStack) {
        let expected = match slot {
            SlotRef::Generic(_) => ExpectedOperation::add(stack.item_id.clone(), stack.quantity),
            SlotRef::Tagged(tag) => {
                ExpectedOperation::add_tagged(tag.clone(), stack.item_id.clone(), stack.quantity)
            }
        };
        self.push_expected(expected);
    }

    fn push_expected(&mut self, expected: ExpectedOperation) {
        self.metrics.predictions += 1;
        self.pending.push_back(expected);
    }

    // ---------------------------------------------------------------------
    // Reconciliation
    // ---------------------------------------------------------------------

    /// Drain inventory events into the view.
    ///
    /// Stops at the first event the view cannot absorb and rebuilds.
    pub fn process_events(&mut self, inventory: &mut Inventory) {
        let Some(id) = self.subscription else {
            return;
        };
        for event in inventory.drain_events(id) {
            if !self.apply_event(&event) {
                self.force_full_update(inventory);
                return;
            }
        }
    }

    /// Apply one event. Returns false when the view diverged.
    fn apply_event(&mut self, event: &InventoryEvent) -> bool {
        if self.confirm(event) {
            return true;
        }
        match event {
            InventoryEvent::ItemAdded { stack, .. } => {
                self.metrics.unmatched += 1;
                let leftover = self.place_in_grid(&stack.item_id, stack.quantity);
                if leftover > 0 {
                    warn!(item = %stack.item_id, leftover, "grid cannot hold added items");
                    return false;
                }
                true
            }
            InventoryEvent::ItemRemoved { stack, .. } => {
                self.metrics.unmatched += 1;
                let removed = self.remove_from_grid(&stack.item_id, stack.quantity);
                if removed < stack.quantity {
                    warn!(
                        item = %stack.item_id,
                        expected = stack.quantity,
                        removed,
                        "grid is missing removed items"
                    );
                    return false;
                }
                true
            }
            InventoryEvent::ItemAddedToTaggedSlot { slot, stack, .. } => {
                self.metrics.unmatched += 1;
                let Some(visual) = self.tagged.get_mut(slot) else {
                    warn!(%slot, "event for a slot the view does not know");
                    return false;
                };
                if visual.is_empty() {
                    *visual = stack.clone();
                } else if visual.item_id == stack.item_id {
                    visual.quantity += stack.quantity;
                } else {
                    warn!(
                        %slot,
                        shown = %visual.item_id,
                        added = %stack.item_id,
                        "tagged slot misprediction"
                    );
                    return false;
                }
                self.updates.push(SlotRef::Tagged(slot.clone()));
                true
            }
            InventoryEvent::ItemRemovedFromTaggedSlot { slot, stack, .. } => {
                self.metrics.unmatched += 1;
                match self.tagged.get_mut(slot) {
                    Some(visual)
                        if visual.item_id == stack.item_id && visual.quantity >= stack.quantity =>
                    {
                        visual.quantity -= stack.quantity;
                        if visual.quantity <= 0 {
                            visual.clear();
                        }
                    }
                    _ => {
                        warn!(%slot, removed = %stack.item_id, "tagged slot misprediction");
                        return false;
                    }
                }
                self.updates.push(SlotRef::Tagged(slot.clone()));
                true
            }
            InventoryEvent::CraftConfirmed { .. } | InventoryEvent::AvailableRecipesUpdated => true,
        }
    }

    fn confirm(&mut self, event: &InventoryEvent) -> bool {
        let Some(index) = self.pending.iter().position(|expected| expected.matches(event)) else {
            return false;
        };
        if let Some(expected) = self.pending.remove(index) {
            if expected.kind == SlotOperation::Remove {
                let landed = self.overflow.iter().position(|stack| {
                    stack.item_id == expected.item_id && stack.quantity == expected.quantity
                });
                if let Some(landed) = landed {
                    self.overflow.remove(landed);
                }
            }
        }
        self.metrics.confirmed += 1;
        true
    }

    /// Whether nothing is pending and the view agrees with the inventory.
    pub fn is_settled(&self, inventory: &Inventory) -> bool {
        self.settle_violation(inventory).is_none()
    }

    /// Like [`SlotViewModel::is_settled`] but logs the first disagreement.
    pub fn assert_settled(&self, inventory: &Inventory) -> bool {
        match self.settle_violation(inventory) {
            Some(reason) => {
                warn!(%reason, "view model not settled");
                false
            }
            None => true,
        }
    }

    fn settle_violation(&self, inventory: &Inventory) -> Option<String> {
        if !self.pending.is_empty() {
            return Some(format!("{} expectations unconfirmed", self.pending.len()));
        }

        let mut shown: BTreeMap<&ItemId, i32> = BTreeMap::new();
        for stack in self.grid.iter().chain(self.tagged.values()).filter(|s| s.is_valid()) {
            *shown.entry(&stack.item_id).or_insert(0) += stack.quantity;
        }
        for stack in inventory.container().items() {
            let visual = shown.get(&stack.item_id).copied().unwrap_or(0);
            if visual != stack.quantity {
                return Some(format!("{} shown {} held {}", stack.item_id, visual, stack.quantity));
            }
        }
        for (item_id, quantity) in &shown {
            let held = inventory.count(item_id);
            if held != *quantity {
                return Some(format!("{item_id} shown {quantity} held {held}"));
            }
        }

        for (slot, stack) in &self.tagged {
            let held = inventory.item_in_tagged_slot(slot);
            if held != *stack {
                return Some(format!(
                    "slot {slot} shows {} x{} holds {} x{}",
                    stack.item_id, stack.quantity, held.item_id, held.quantity
                ));
            }
        }
        None
    }

    // ---------------------------------------------------------------------
    // Grid bookkeeping
    // ---------------------------------------------------------------------

    fn place_in_grid(&mut self, item_id: &ItemId, quantity: i32) -> i32 {
        let Some(limit) = self.catalog.lookup(item_id).map(ItemDefinition::stack_limit) else {
            error!(item = %item_id, "cannot place an unknown item");
            return quantity;
        };
        let mut remaining = quantity;
        while remaining > 0 {
            let Some(index) = self.find_slot_index_for_item(item_id, limit) else {
                break;
            };
            let slot = &mut self.grid[index];
            if slot.is_empty() {
                *slot = ItemStack::new(item_id.clone(), 0);
            }
            let take = remaining.min(limit - slot.quantity);
            slot.quantity += take;
            remaining -= take;
            self.updates.push(SlotRef::Generic(index));
        }
        remaining
    }

    fn remove_from_grid(&mut self, item_id: &ItemId, quantity: i32) -> i32 {
        let mut remaining = quantity;
        for index in (0..self.grid.len()).rev() {
            if remaining <= 0 {
                break;
            }
            let slot = &mut self.grid[index];
            if slot.is_empty() || slot.item_id != *item_id {
                continue;
            }
            let take = remaining.min(slot.quantity);
            slot.quantity -= take;
            if slot.quantity <= 0 {
                slot.clear();
            }
            remaining -= take;
            self.updates.push(SlotRef::Generic(index));
        }
        quantity - remaining
    }

    fn find_slot_index_for_item(&self, item_id: &ItemId, limit: i32) -> Option<usize> {
        self.grid
            .iter()
            .position(|slot| slot.is_valid() && slot.item_id == *item_id && slot.quantity < limit)
            .or_else(|| self.grid.iter().position(ItemStack::is_empty))
    }

    fn drop_overflow(&mut self, inventory: &mut Inventory, overflow: ItemStack) {
        warn!(
            item = %overflow.item_id,
            quantity = overflow.quantity,
            slot_count = self.slot_count,
            "grid too small for inventory, dropping overflow"
        );
        let dropped = inventory.drop_items(overflow.clone(), 0.0);
        if dropped <= 0 {
            return;
        }
        self.metrics.overflow_drops += 1;
        if inventory.role().is_client() {
            self.push_expected(ExpectedOperation::remove(overflow.item_id.clone(), dropped));
            self.overflow.push(ItemStack::new(overflow.item_id, dropped));
        }
    }

    // ---------------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------------

    /// Whether grid slot `index` could take at least one `item_id`.
    pub fn can_slot_receive_item(&self, item_id: &ItemId, index: usize) -> bool {
        let Some(def) = self.catalog.lookup(item_id) else {
            return false;
        };
        match self.grid.get(index) {
            Some(slot) if slot.is_empty() => true,
            Some(slot) => {
                slot.item_id == *item_id && def.stackable && slot.quantity < def.stack_limit()
            }
            None => false,
        }
    }

    /// Whether a tagged slot accepts `item_id` right now, by merge or swap.
    pub fn can_tagged_slot_receive_item(
        &self,
        inventory: &Inventory,
        item_id: &ItemId,
        slot: &SlotTag,
    ) -> bool {
        let Some(def) = self.catalog.lookup(item_id) else {
            return false;
        };
        if !self.layout.is_compatible(def, slot) || inventory.is_tagged_slot_blocked(slot) {
            return false;
        }
        match self.tagged.get(slot) {
            Some(shown) if shown.is_empty() => true,
            Some(shown) if shown.item_id == *item_id => {
                def.stackable && shown.quantity < def.stack_limit()
            }
            Some(_) => true,
            None => false,
        }
    }

    /// Generic grid contents.
    pub fn grid(&self) -> &[ItemStack] {
        &self.grid
    }

    /// Shown contents of a tagged slot.
    pub fn tagged_slot(&self, slot: &SlotTag) -> Option<&ItemStack> {
        self.tagged.get(slot)
    }

    /// Every tagged slot in name order.
    pub fn tagged_slots(&self) -> impl Iterator<Item = (&SlotTag, &ItemStack)> {
        self.tagged.iter()
    }

    /// Expectations not yet confirmed.
    pub fn pending(&self) -> impl Iterator<Item = &ExpectedOperation> {
        self.pending.iter()
    }

    /// Number of expectations not yet confirmed.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Prediction counters.
    pub fn metrics(&self) -> ViewModelMetrics {
        self.metrics
    }

    /// Number of generic slots.
    pub fn slot_count(&self) -> usize {
        self.slot_count
    }

    /// Slots changed since the last call, first change first, without repeats.
    pub fn take_slot_updates(&mut self) -> Vec<SlotRef> {
        let mut updates = std::mem::take(&mut self.updates);
        let mut seen = std::collections::HashSet::new();
        updates.retain(|slot| seen.insert(slot.clone()));
        updates
    }
}

impl SlotStore for SlotViewModel {
    fn slot(&self, slot: &SlotRef) -> Option<&ItemStack> {
        match slot {
            SlotRef::Generic(index) => self.grid.get(*index),
            SlotRef::Tagged(tag) => self.tagged.get(tag),
        }
    }

    fn slot_mut(&mut self, slot: &SlotRef) -> Option<&mut ItemStack> {
        match slot {
            SlotRef::Generic(index) => self.grid.get_mut(*index),
            SlotRef::Tagged(tag) => self.tagged.get_mut(tag),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use invsync_core::{RecipeRegistry, Tag};
    use invsync_inventory::{
        ContainerLimits, DroppedStack, InventoryConfig, InventoryRequest, NetRole, SpecializedSlot,
        UniversalSlot, UnlimitedSource, WorldSpawner,
    };
    use std::sync::Mutex;

    #[derive(Default, Clone)]
    struct Recorder {
        drops: Arc<Mutex<Vec<DroppedStack>>>,
    }

    impl WorldSpawner for Recorder {
        fn spawn_dropped_stack(&mut self, drop: &DroppedStack) -> bool {
            self.drops.lock().unwrap().push(drop.clone());
            true
        }
    }

    fn catalog() -> Arc<ItemCatalog> {
        Arc::new(
            ItemCatalog::from_definitions([
                ItemDefinition::new("apple", 5),
                ItemDefinition::new("sword", 1).with_category("Weapon.OneHanded"),
                ItemDefinition::new("greatsword", 1).with_category("Weapon.TwoHanded"),
                ItemDefinition::new("shield", 1).with_category("OffHand"),
                ItemDefinition::new("helmet", 1).with_category("Armor.Head"),
                ItemDefinition::new("potion", 5).with_usable(1),
            ])
            .unwrap(),
        )
    }

    fn inventory(role: NetRole) -> Inventory {
        let config = InventoryConfig {
            limits: ContainerLimits {
                max_weight: 0.0,
                max_slot_count: 16,
            },
            layout: SlotLayout::new()
                .with_specialized(SpecializedSlot::new("Armor.Head"))
                .with_universal(UniversalSlot::new("OffHand"))
                .with_universal(
                    UniversalSlot::new("MainHand")
                        .blocking("OffHand", Some(Tag::new("Weapon.TwoHanded")))
                        .exclusive_to("Weapon.TwoHanded"),
                ),
            ..InventoryConfig::default()
        };
        Inventory::new(catalog(), Arc::new(RecipeRegistry::default()), config).with_role(role)
    }

    fn tagged(name: &str) -> SlotRef {
        SlotRef::tagged(name)
    }

    fn grid_index(view: &SlotViewModel, item: &str) -> usize {
        view.grid()
            .iter()
            .position(|stack| stack.item_id.as_str() == item)
            .unwrap()
    }

    #[test]
    fn test_initialize_lays_out_stacks() {
        let mut inv = inventory(NetRole::None);
        inv.add_items(ItemStack::new("apple", 7), false);
        inv.add_items(ItemStack::new("sword", 1), false);

        let mut view = SlotViewModel::new(&mut inv, 6, false);

        assert_eq!(view.grid()[0], ItemStack::new("apple", 5));
        assert_eq!(view.grid()[1], ItemStack::new("apple", 2));
        assert_eq!(view.grid()[2], ItemStack::new("sword", 1));
        assert!(view.grid()[3].is_empty());
        assert_eq!(view.tagged_slots().count(), 3);
        assert_eq!(view.take_slot_updates().len(), 9);
        assert!(view.take_slot_updates().is_empty());
        assert!(view.assert_settled(&inv));
    }

    #[test]
    fn test_overflow_is_dropped() {
        let recorder = Recorder::default();
        let mut inv = inventory(NetRole::None).with_spawner(Box::new(recorder.clone()));
        inv.add_items(ItemStack::new("apple", 7), false);

        let view = SlotViewModel::new(&mut inv, 1, false);

        assert_eq!(view.grid()[0], ItemStack::new("apple", 5));
        assert_eq!(inv.count(&ItemId::new("apple")), 5);
        assert_eq!(recorder.drops.lock().unwrap()[0].stack, ItemStack::new("apple", 2));
        assert_eq!(view.metrics().overflow_drops, 1);
        assert!(view.is_settled(&inv));
    }

    #[test]
    fn test_move_to_tagged_is_confirmed() {
        let mut inv = inventory(NetRole::None);
        inv.add_items(ItemStack::new("shield", 1), false);
        let mut view = SlotViewModel::new(&mut inv, 4, false);

        assert!(view.predict_move(&mut inv, &SlotRef::Generic(0), &tagged("OffHand")));
        assert_eq!(view.tagged_slot(&Tag::new("OffHand")), Some(&ItemStack::new("shield", 1)));
        assert!(view.grid()[0].is_empty());
        assert_eq!(view.pending_len(), 2);

        view.process_events(&mut inv);
        assert_eq!(view.pending_len(), 0);
        assert_eq!(view.metrics().confirmed, 2);
        assert_eq!(view.metrics().unmatched, 0);
        assert!(view.assert_settled(&inv));
    }

    #[test]
    fn test_swap_with_tagged_occupant() {
        let mut inv = inventory(NetRole::None);
        inv.add_items(ItemStack::new("shield", 1), false);
        inv.move_items(MoveRequest::new("shield", 1).to_slot("OffHand"));
        inv.add_items(ItemStack::new("sword", 1), false);
        let mut view = SlotViewModel::new(&mut inv, 4, false);
        let sword = grid_index(&view, "sword");

        assert!(view.predict_move(&mut inv, &SlotRef::Generic(sword), &tagged("OffHand")));
        assert_eq!(view.grid()[sword], ItemStack::new("shield", 1));
        assert_eq!(inv.item_in_tagged_slot(&Tag::new("OffHand")), ItemStack::new("sword", 1));

        view.process_events(&mut inv);
        assert_eq!(view.metrics().resyncs, 0);
        assert!(view.assert_settled(&inv));
    }

    #[test]
    fn test_rejected_move_leaves_view_alone() {
        let mut inv = inventory(NetRole::None);
        inv.add_items(ItemStack::new("sword", 1), false);
        let mut view = SlotViewModel::new(&mut inv, 4, false);
        view.take_slot_updates();

        assert!(!view.predict_move(&mut inv, &SlotRef::Generic(0), &tagged("MainHand")));
        assert_eq!(view.grid()[0], ItemStack::new("sword", 1));
        assert_eq!(view.pending_len(), 0);
        assert!(view.take_slot_updates().is_empty());
    }

    #[test]
    fn test_unmatched_events_are_applied() {
        let mut inv = inventory(NetRole::None);
        let mut view = SlotViewModel::new(&mut inv, 4, false);

        inv.add_items(ItemStack::new("apple", 8), false);
        inv.add_to_tagged_slot(
            &mut UnlimitedSource::new(),
            &Tag::new("Armor.Head"),
            ItemStack::new("helmet", 1),
            false,
        );
        view.process_events(&mut inv);

        assert_eq!(view.grid()[0], ItemStack::new("apple", 5));
        assert_eq!(view.grid()[1], ItemStack::new("apple", 3));
        assert_eq!(view.tagged_slot(&Tag::new("Armor.Head")), Some(&ItemStack::new("helmet", 1)));
        assert_eq!(view.metrics().unmatched, 2);
        assert!(view.assert_settled(&inv));
    }

    #[test]
    fn test_divergence_triggers_resync() {
        let mut inv = inventory(NetRole::None);
        inv.add_items(ItemStack::new("apple", 3), false);
        let mut view = SlotViewModel::new(&mut inv, 4, false);

        // the view drops its apples without telling the inventory
        view.grid[0].clear();
        inv.remove_items(ItemStack::new("apple", 1), false);
        view.process_events(&mut inv);

        assert_eq!(view.metrics().resyncs, 1);
        assert_eq!(view.grid()[0], ItemStack::new("apple", 2));
        assert!(view.assert_settled(&inv));
    }

    #[test]
    fn test_grid_moves_are_visual_only() {
        let mut inv = inventory(NetRole::None);
        inv.add_items(ItemStack::new("apple", 4), false);
        let mut view = SlotViewModel::new(&mut inv, 4, false);
        let version = inv.version();

        assert!(view.predict_split(&mut inv, &SlotRef::Generic(0), &SlotRef::Generic(3), 1));
        assert_eq!(view.grid()[0], ItemStack::new("apple", 3));
        assert_eq!(view.grid()[3], ItemStack::new("apple", 1));
        assert_eq!(inv.version(), version);
        assert_eq!(view.pending_len(), 0);
        assert!(view.is_settled(&inv));
    }

    #[test]
    fn test_drop_and_use() {
        let recorder = Recorder::default();
        let mut inv = inventory(NetRole::None).with_spawner(Box::new(recorder.clone()));
        inv.add_items(ItemStack::new("apple", 4), false);
        inv.add_items(ItemStack::new("potion", 3), false);
        inv.move_items(MoveRequest::new("potion", 3).to_slot("OffHand"));
        let mut view = SlotViewModel::new(&mut inv, 4, false);

        assert!(view.predict_drop(&mut inv, &SlotRef::Generic(0), 2, 90.0));
        assert!(view.predict_use(&mut inv, &tagged("OffHand")));
        assert_eq!(view.grid()[0], ItemStack::new("apple", 2));
        assert_eq!(view.tagged_slot(&Tag::new("OffHand")), Some(&ItemStack::new("potion", 2)));

        view.process_events(&mut inv);
        assert!(view.assert_settled(&inv));
        assert_eq!(recorder.drops.lock().unwrap().len(), 1);
        assert!(!view.predict_use(&mut inv, &tagged("Armor.Head")));
    }

    #[test]
    fn test_use_from_grid() {
        let mut inv = inventory(NetRole::None);
        inv.add_items(ItemStack::new("apple", 2), false);
        inv.add_items(ItemStack::new("potion", 3), false);
        let mut view = SlotViewModel::new(&mut inv, 4, false);
        let potion = grid_index(&view, "potion");

        assert!(view.predict_use(&mut inv, &SlotRef::Generic(potion)));
        assert_eq!(view.grid()[potion], ItemStack::new("potion", 2));
        assert_eq!(view.pending_len(), 1);
        assert!(!view.predict_use(&mut inv, &SlotRef::Generic(grid_index(&view, "apple"))));
        assert!(!view.predict_use(&mut inv, &SlotRef::Generic(3)));

        view.process_events(&mut inv);
        assert_eq!(view.metrics().confirmed, 1);
        assert_eq!(inv.count(&ItemId::new("potion")), 2);
        assert!(view.assert_settled(&inv));
    }

    #[test]
    fn test_client_use_from_grid_forwards_item() {
        let mut replica = inventory(NetRole::Client);
        let mut host = inventory(NetRole::Authority);
        host.add_items(ItemStack::new("potion", 2), false);
        replica.apply_snapshot(host.snapshot());
        let mut view = SlotViewModel::new(&mut replica, 4, false);

        assert!(view.predict_use(&mut replica, &SlotRef::Generic(0)));
        assert_eq!(
            replica.take_requests(),
            vec![InventoryRequest::UseItem {
                item_id: ItemId::new("potion")
            }]
        );
    }

    #[test]
    fn test_move_to_any_tagged_slot_tops_up_partial_stack() {
        let mut inv = inventory(NetRole::None);
        inv.add_items(ItemStack::new("apple", 2), false);
        inv.move_items(MoveRequest::new("apple", 2).to_slot("OffHand"));
        inv.add_items(ItemStack::new("apple", 3), false);
        let mut view = SlotViewModel::new(&mut inv, 4, true);

        assert!(view.predict_move_to_any_tagged_slot(&mut inv, &SlotRef::Generic(0)));
        assert_eq!(view.tagged_slot(&Tag::new("OffHand")), Some(&ItemStack::new("apple", 5)));
        assert!(view.tagged_slot(&Tag::new("MainHand")).map_or(true, ItemStack::is_empty));

        view.process_events(&mut inv);
        assert!(view.assert_settled(&inv));
    }

    #[test]
    fn test_move_to_any_tagged_slot_prefers_specialized() {
        let mut inv = inventory(NetRole::None);
        inv.add_items(ItemStack::new("helmet", 1), false);
        let mut view = SlotViewModel::new(&mut inv, 4, false);

        assert!(view.predict_move_to_any_tagged_slot(&mut inv, &SlotRef::Generic(0)));
        view.process_events(&mut inv);
        assert_eq!(inv.item_in_tagged_slot(&Tag::new("Armor.Head")), ItemStack::new("helmet", 1));
        assert!(view.assert_settled(&inv));
    }

    #[test]
    fn test_client_prediction_waits_for_snapshot() {
        let mut host = inventory(NetRole::Authority);
        host.add_items(ItemStack::new("shield", 1), false);
        let mut replica = inventory(NetRole::Client);
        replica.apply_snapshot(host.snapshot());
        let mut view = SlotViewModel::new(&mut replica, 4, false);

        assert!(view.predict_move(&mut replica, &SlotRef::Generic(0), &tagged("OffHand")));
        assert!(!view.is_settled(&replica));

        for request in replica.take_requests() {
            host.apply_request(request);
        }
        replica.apply_snapshot(host.snapshot());
        view.process_events(&mut replica);

        assert_eq!(view.metrics().confirmed, 2);
        assert!(view.assert_settled(&replica));
    }

    #[test]
    fn test_slot_queries() {
        let mut inv = inventory(NetRole::None);
        inv.add_items(ItemStack::new("apple", 5), false);
        inv.add_items(ItemStack::new("greatsword", 1), false);
        let mut view = SlotViewModel::new(&mut inv, 3, false);

        let apple = ItemId::new("apple");
        assert!(!view.can_slot_receive_item(&apple, 0));
        assert!(view.can_slot_receive_item(&apple, 2));
        assert!(!view.can_slot_receive_item(&apple, 9));

        let shield = ItemId::new("shield");
        assert!(view.can_tagged_slot_receive_item(&inv, &shield, &Tag::new("OffHand")));
        assert!(view.predict_move(&mut inv, &SlotRef::Generic(1), &tagged("MainHand")));
        view.process_events(&mut inv);
        assert!(!view.can_tagged_slot_receive_item(&inv, &shield, &Tag::new("OffHand")));
        assert!(!view.can_tagged_slot_receive_item(&inv, &apple, &Tag::new("Armor.Head")));
    }

    #[test]
    fn test_teardown_unsubscribes() {
        let mut inv = inventory(NetRole::None);
        let mut view = SlotViewModel::new(&mut inv, 2, false);
        view.teardown(&mut inv);

        inv.add_items(ItemStack::new("apple", 1), false);
        view.process_events(&mut inv);
        assert!(view.grid()[0].is_empty());
    }
}
