#![warn(missing_docs)]
//! Item containers and inventories with tagged slots.
//!
//! [`ItemContainer`] keeps aggregate item totals under weight and slot
//! limits. [`Inventory`] layers tagged slots, blocking rules, crafting and
//! snapshot replication on top of it. Both publish change events through a
//! pull-based [`EventBus`] and refuse to mutate unless they hold authority.

pub mod authority;
pub mod container;
pub mod crafting;
pub mod events;
pub mod inventory;
pub mod move_engine;
pub mod request;
pub mod slots;
pub mod snapshot;
pub mod source;

pub use authority::NetRole;
pub use container::{ContainerLimits, ItemContainer};
pub use crafting::RecipeBook;
pub use events::{EventBus, InventoryEvent, SubscriberId};
pub use inventory::{Distribution, Inventory, InventoryConfig, PreferredSlotPolicy};
pub use move_engine::{
    move_between_slots, move_in_store, should_swap, MoveResult, SlotRef, SlotStore,
};
pub use request::{InventoryRequest, MoveRequest};
pub use slots::{find_tagged_slot_for_item, SlotLayout, SpecializedSlot, TaggedStack, UniversalSlot};
pub use snapshot::InventorySnapshot;
pub use source::{DroppedStack, ItemSource, UnlimitedSource, WorldSpawner};
