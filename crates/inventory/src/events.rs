//! Change events and the pull-based event bus.
//!
//! Each subscriber owns a FIFO queue. Publishing clones the event into every
//! live queue; subscribers drain at their own pace and unsubscribe explicitly.

use invsync_core::{ChangeReason, ItemStack, RecipeOutput, SlotTag};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Observable change on a container or inventory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InventoryEvent {
    /// Items entered generic storage.
    ItemAdded {
        /// Item and quantity added.
        stack: ItemStack,
        /// Cause.
        reason: ChangeReason,
    },
    /// Items left generic storage.
    ItemRemoved {
        /// Item and quantity removed.
        stack: ItemStack,
        /// Cause.
        reason: ChangeReason,
    },
    /// Items entered a tagged slot.
    ItemAddedToTaggedSlot {
        /// Receiving slot.
        slot: SlotTag,
        /// Item and quantity added.
        stack: ItemStack,
        /// What occupied the slot before.
        previous: ItemStack,
        /// Cause.
        reason: ChangeReason,
    },
    /// Items left a tagged slot.
    ItemRemovedFromTaggedSlot {
        /// Source slot.
        slot: SlotTag,
        /// Item and quantity removed.
        stack: ItemStack,
        /// Cause.
        reason: ChangeReason,
    },
    /// A craft completed.
    CraftConfirmed {
        /// What was produced.
        output: RecipeOutput,
        /// How many.
        quantity: i32,
    },
    /// The set of craftable recipes changed.
    AvailableRecipesUpdated,
}

/// Handle returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubscriberId(u64);

/// Fan-out of events to per-subscriber queues.
#[derive(Debug, Clone, Default)]
pub struct EventBus {
    next_id: u64,
    queues: Vec<(SubscriberId, VecDeque<InventoryEvent>)>,
}

impl EventBus {
    /// Create a bus without subscribers.
    pub fn new() -> Self {
        Self {
            next_id: 0,
            queues: Vec::new(),
        }
    }

    /// Register a subscriber. Only events published afterwards are queued.
    pub fn subscribe(&mut self) -> SubscriberId {
        let id = SubscriberId(self.next_id);
        self.next_id += 1;
        self.queues.push((id, VecDeque::new()));
        id
    }

    /// Drop a subscriber and its pending events. Returns false for unknown ids.
    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        let before = self.queues.len();
        self.queues.retain(|(subscriber, _)| *subscriber != id);
        self.queues.len() != before
    }

    /// Queue an event for every subscriber.
    pub fn publish(&mut self, event: InventoryEvent) {
        for (_, queue) in &mut self.queues {
            queue.push_back(event.clone());
        }
    }

    /// Take all pending events for `id`, oldest first.
    pub fn drain(&mut self, id: SubscriberId) -> Vec<InventoryEvent> {
        self.queues
            .iter_mut()
            .find(|(subscriber, _)| *subscriber == id)
            .map(|(_, queue)| queue.drain(..).collect())
            .unwrap_or_default()
    }

    /// Number of events waiting for `id`.
    pub fn pending(&self, id: SubscriberId) -> usize {
        self.queues
            .iter()
            .find(|(subscriber, _)| *subscriber == id)
            .map_or(0, |(_, queue)| queue.len())
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.queues.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn added(quantity: i32) -> InventoryEvent {
        InventoryEvent::ItemAdded {
            stack: ItemStack::new("apple", quantity),
            reason: ChangeReason::Added,
        }
    }

    #[test]
    fn test_fan_out_and_drain() {
        let mut bus = EventBus::new();
        let a = bus.subscribe();
        let b = bus.subscribe();

        bus.publish(added(1));
        bus.publish(added(2));

        assert_eq!(bus.drain(a), vec![added(1), added(2)]);
        assert_eq!(bus.pending(a), 0);
        assert_eq!(bus.pending(b), 2);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let mut bus = EventBus::new();
        let id = bus.subscribe();
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));

        bus.publish(added(1));
        assert!(bus.drain(id).is_empty());
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_late_subscriber_misses_earlier_events() {
        let mut bus = EventBus::new();
        bus.publish(added(1));
        let id = bus.subscribe();
        assert_eq!(bus.pending(id), 0);
    }
}
