//! Tagged-slot layout: specialized slots, universal slots and their
//! blocking relations, plus the slot-selection heuristic.

use invsync_core::{ItemDefinition, ItemId, ItemStack, SlotTag, Tag};
use serde::{Deserialize, Serialize};

/// Tagged slot that only accepts one category of items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecializedSlot {
    /// Slot name.
    pub slot: SlotTag,
    /// Required item category; the slot name itself when unset.
    #[serde(default)]
    pub category: Option<Tag>,
}

impl SpecializedSlot {
    /// Slot whose name doubles as the required category.
    pub fn new(slot: impl Into<SlotTag>) -> Self {
        Self {
            slot: slot.into(),
            category: None,
        }
    }

    /// Slot requiring an explicit category.
    pub fn with_category(slot: impl Into<SlotTag>, category: impl Into<Tag>) -> Self {
        Self {
            slot: slot.into(),
            category: Some(category.into()),
        }
    }

    /// Category an item must carry to fit.
    pub fn required_category(&self) -> &Tag {
        self.category.as_ref().unwrap_or(&self.slot)
    }

    /// Whether `def` may be placed here.
    pub fn accepts(&self, def: &ItemDefinition) -> bool {
        def.has_category(self.required_category())
    }
}

/// Tagged slot that accepts any item, subject to blocking and exclusivity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniversalSlot {
    /// Slot name.
    pub slot: SlotTag,
    /// Slot this one blocks while it holds a qualifying item.
    #[serde(default)]
    pub blocks: Option<SlotTag>,
    /// Category that activates blocking; any occupant blocks when unset.
    #[serde(default)]
    pub blocking_category: Option<Tag>,
    /// Items of this category may only go into this universal slot.
    #[serde(default)]
    pub exclusive_to_category: Option<Tag>,
}

impl UniversalSlot {
    /// Plain universal slot.
    pub fn new(slot: impl Into<SlotTag>) -> Self {
        Self {
            slot: slot.into(),
            blocks: None,
            blocking_category: None,
            exclusive_to_category: None,
        }
    }

    /// Block `other` while this slot holds an item of `category` (any item if `None`).
    pub fn blocking(mut self, other: impl Into<SlotTag>, category: Option<Tag>) -> Self {
        self.blocks = Some(other.into());
        self.blocking_category = category;
        self
    }

    /// Reserve items of `category` for this slot.
    pub fn exclusive_to(mut self, category: impl Into<Tag>) -> Self {
        self.exclusive_to_category = Some(category.into());
        self
    }

    /// The slot blocked when `def` sits here, if any.
    pub fn blocked_by(&self, def: &ItemDefinition) -> Option<&SlotTag> {
        let blocked = self.blocks.as_ref()?;
        match &self.blocking_category {
            Some(category) if !def.has_category(category) => None,
            _ => Some(blocked),
        }
    }
}

/// Declared tagged slots of an inventory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlotLayout {
    /// Category-restricted slots, in declaration order.
    pub specialized: Vec<SpecializedSlot>,
    /// Universal slots, blockers first once sorted.
    pub universal: Vec<UniversalSlot>,
}

impl SlotLayout {
    /// Layout without tagged slots.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a specialized slot.
    pub fn with_specialized(mut self, slot: SpecializedSlot) -> Self {
        self.specialized.push(slot);
        self
    }

    /// Append a universal slot and keep blockers ahead of blocked slots.
    pub fn with_universal(mut self, slot: UniversalSlot) -> Self {
        self.universal.push(slot);
        self.sort_universal();
        self
    }

    /// Specialized slot by name.
    pub fn specialized_slot(&self, slot: &SlotTag) -> Option<&SpecializedSlot> {
        self.specialized.iter().find(|s| s.slot == *slot)
    }

    /// Universal slot by name.
    pub fn universal_slot(&self, slot: &SlotTag) -> Option<&UniversalSlot> {
        self.universal.iter().find(|s| s.slot == *slot)
    }

    /// Whether `slot` is declared.
    pub fn contains(&self, slot: &SlotTag) -> bool {
        self.specialized_slot(slot).is_some() || self.universal_slot(slot).is_some()
    }

    /// Universal slot that blocks `slot`, if any.
    pub fn blocker_of(&self, slot: &SlotTag) -> Option<&UniversalSlot> {
        self.universal.iter().find(|u| u.blocks.as_ref() == Some(slot))
    }

    /// Every declared slot: universal slots first, then specialized.
    pub fn all_slots(&self) -> impl Iterator<Item = &SlotTag> {
        self.universal
            .iter()
            .map(|u| &u.slot)
            .chain(self.specialized.iter().map(|s| &s.slot))
    }

    /// Whether `def` may ever occupy `slot`, ignoring occupancy and blocking.
    pub fn is_compatible(&self, def: &ItemDefinition, slot: &SlotTag) -> bool {
        if self.universal_slot(slot).is_some() {
            return !self.universal.iter().any(|other| {
                other.slot != *slot
                    && other
                        .exclusive_to_category
                        .as_ref()
                        .is_some_and(|category| def.has_category(category))
            });
        }
        self.specialized_slot(slot).is_some_and(|s| s.accepts(def))
    }

    /// Order universal slots so that every blocker precedes the slot it blocks.
    ///
    /// Slots caught in a blocking cycle keep declaration order at the end.
    pub fn sort_universal(&mut self) {
        let mut pending: Vec<UniversalSlot> = std::mem::take(&mut self.universal);
        let mut sorted = Vec::with_capacity(pending.len());

        loop {
            let ready = pending.iter().position(|candidate| {
                !pending.iter().any(|other| {
                    other.blocks.as_ref() == Some(&candidate.slot) && other.slot != candidate.slot
                })
            });
            match ready {
                Some(index) => sorted.push(pending.remove(index)),
                None => break,
            }
        }
        sorted.append(&mut pending);
        self.universal = sorted;
    }
}

/// Contents of one tagged slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedStack {
    /// Slot name.
    pub slot: SlotTag,
    /// Occupant, possibly empty while the slot is blocked.
    pub stack: ItemStack,
    /// Set while a blocking universal slot holds a qualifying item.
    #[serde(default)]
    pub blocked: bool,
}

impl TaggedStack {
    /// Occupied, unblocked slot entry.
    pub fn new(slot: impl Into<SlotTag>, stack: ItemStack) -> Self {
        Self {
            slot: slot.into(),
            stack,
            blocked: false,
        }
    }
}

/// Choose a tagged slot for `def`.
///
/// `occupant` reports the stack currently shown in a slot (`None` when empty);
/// `occupant_def` resolves definitions for blocking and the better-fit
/// comparison. Universal slots blocked by their blocker's occupant are skipped.
///
/// Precedence, each level in declaration order:
/// 0. a slot already holding a partial stack of the same item;
/// 1. an empty specialized slot accepting the item;
/// 2. unless `prefer_empty_universal`, an occupied accepting specialized slot;
/// 3. an empty universal slot whose name is one of the item's categories;
/// 4. if `prefer_empty_universal`, any empty universal slot;
/// 5. an occupied universal slot matching the item's categories better than its occupant;
/// 6. an occupied accepting specialized slot;
/// 7. any empty universal slot, then the first universal slot.
pub fn find_tagged_slot_for_item<'a>(
    layout: &SlotLayout,
    def: &ItemDefinition,
    occupant: impl Fn(&SlotTag) -> Option<ItemStack>,
    occupant_def: impl Fn(&ItemId) -> Option<&'a ItemDefinition>,
    prefer_empty_universal: bool,
) -> Option<SlotTag> {
    let blocked = |slot: &SlotTag| {
        layout.blocker_of(slot).is_some_and(|blocker| {
            occupant(&blocker.slot)
                .and_then(|stack| occupant_def(&stack.item_id))
                .is_some_and(|d| blocker.blocked_by(d).is_some())
        })
    };

    let limit = def.stack_limit();
    if limit > 1 {
        let partial = layout.all_slots().find(|slot| {
            layout.is_compatible(def, slot)
                && !blocked(slot)
                && occupant(slot)
                    .is_some_and(|stack| stack.item_id == def.id && stack.quantity < limit)
        });
        if let Some(slot) = partial {
            return Some(slot.clone());
        }
    }

    let mut specialized_fallback: Option<&SlotTag> = None;
    for specialized in &layout.specialized {
        if !specialized.accepts(def) {
            continue;
        }
        if occupant(&specialized.slot).is_none() {
            return Some(specialized.slot.clone());
        }
        specialized_fallback.get_or_insert(&specialized.slot);
    }

    if !prefer_empty_universal {
        if let Some(slot) = specialized_fallback {
            return Some(slot.clone());
        }
    }

    let usable: Vec<&UniversalSlot> = layout
        .universal
        .iter()
        .filter(|u| layout.is_compatible(def, &u.slot) && !blocked(&u.slot))
        .collect();

    let mut first_empty: Option<&SlotTag> = None;
    for universal in &usable {
        if occupant(&universal.slot).is_none() {
            if def.has_category(&universal.slot) {
                return Some(universal.slot.clone());
            }
            first_empty.get_or_insert(&universal.slot);
        }
    }

    if prefer_empty_universal {
        if let Some(slot) = first_empty {
            return Some(slot.clone());
        }
    }

    for universal in &usable {
        let Some(current) = occupant(&universal.slot) else {
            continue;
        };
        let current_fits =
            occupant_def(&current.item_id).is_some_and(|d| d.has_category(&universal.slot));
        if def.has_category(&universal.slot) && !current_fits {
            return Some(universal.slot.clone());
        }
    }

    specialized_fallback
        .or(first_empty)
        .or_else(|| usable.first().map(|u| &u.slot))
        .cloned()
}
