//! Per-inventory recipe state: unlocked recipes and current availability.

use invsync_core::{ItemId, Recipe, RecipeId, RecipeRegistry, Tag};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::warn;

/// Unlocked recipes and which of them the owner can currently afford.
#[derive(Debug, Clone, Default)]
pub struct RecipeBook {
    registry: Arc<RecipeRegistry>,
    unlocked: BTreeSet<RecipeId>,
    filters: Vec<Tag>,
    available: Vec<RecipeId>,
    by_filter: BTreeMap<Tag, Vec<RecipeId>>,
}

impl RecipeBook {
    /// Book over `registry` with nothing unlocked.
    pub fn new(registry: Arc<RecipeRegistry>) -> Self {
        Self {
            registry,
            unlocked: BTreeSet::new(),
            filters: Vec::new(),
            available: Vec::new(),
            by_filter: BTreeMap::new(),
        }
    }

    /// Group available recipes by these tag filters.
    pub fn with_filters(mut self, filters: impl IntoIterator<Item = Tag>) -> Self {
        self.filters = filters.into_iter().collect();
        self
    }

    /// Recipe definition by id.
    pub fn recipe(&self, id: &RecipeId) -> Option<&Recipe> {
        self.registry.get(id)
    }

    /// Whether `id` is unlocked.
    pub fn is_unlocked(&self, id: &RecipeId) -> bool {
        self.unlocked.contains(id)
    }

    /// Unlocked recipes in id order.
    pub fn unlocked(&self) -> impl Iterator<Item = &RecipeId> {
        self.unlocked.iter()
    }

    /// Unlocked recipes whose components are all present.
    pub fn available(&self) -> &[RecipeId] {
        &self.available
    }

    /// Available recipes under one of the configured filters.
    pub fn available_for(&self, filter: &Tag) -> &[RecipeId] {
        self.by_filter.get(filter).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Lock or unlock a recipe. Returns whether the unlocked set changed.
    pub(crate) fn set_lock(&mut self, id: &RecipeId, locked: bool) -> bool {
        if locked {
            return self.unlocked.remove(id);
        }
        if self.registry.get(id).is_none() {
            warn!(recipe = %id, "cannot unlock unknown recipe");
            return false;
        }
        self.unlocked.insert(id.clone())
    }

    /// Replace the unlocked set wholesale (replication).
    pub(crate) fn set_unlocked(&mut self, unlocked: impl IntoIterator<Item = RecipeId>) {
        self.unlocked = unlocked.into_iter().collect();
    }

    /// Recompute availability. Returns whether the available set changed.
    pub(crate) fn refresh(&mut self, count: impl Fn(&ItemId) -> i32) -> bool {
        let available: Vec<RecipeId> = self
            .unlocked
            .iter()
            .filter(|id| self.registry.get(id).is_some_and(|recipe| recipe.can_craft(&count)))
            .cloned()
            .collect();
        if available == self.available {
            return false;
        }

        self.by_filter = self
            .filters
            .iter()
            .map(|filter| {
                let matching = available
                    .iter()
                    .filter(|id| {
                        self.registry
                            .get(id)
                            .is_some_and(|recipe| recipe.matches_filter(filter))
                    })
                    .cloned()
                    .collect();
                (filter.clone(), matching)
            })
            .collect();
        self.available = available;
        true
    }
}
