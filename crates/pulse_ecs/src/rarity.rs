//! Component rarity counters.
//!
//! Tracks, process-wide, how many entities currently hold each component type
//! *enabled*. Filter compilation sorts include/exclude lists ascending by
//! this count, so the least common type is checked first and a non-matching
//! entity is rejected after as few lookups as possible.
//!
//! The counter is a heuristic: it only affects filter evaluation order,
//! never the result set. One [`RaritySorter`] is constructed per engine and
//! shared by `Arc` — there is no hidden global.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::component::ComponentTypeId;

/// Live-enabled-population counter per component type.
///
/// Entries that reach zero are removed rather than stored as zero; looking
/// up an untracked type yields rarity 0.
#[derive(Debug, Default)]
pub struct RaritySorter {
    counts: DashMap<ComponentTypeId, usize>,
}

impl RaritySorter {
    /// Create an empty counter.
    #[must_use]
    pub fn new() -> Self {
        Self {
            counts: DashMap::new(),
        }
    }

    /// Create an empty counter behind an [`Arc`] for sharing.
    #[must_use]
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Record one more entity holding `ty` enabled.
    pub fn increment(&self, ty: ComponentTypeId) {
        *self.counts.entry(ty).or_insert(0) += 1;
    }

    /// Record one fewer entity holding `ty` enabled.
    ///
    /// Decrementing an untracked type is a no-op (the counter floors at
    /// zero); a count of 1 removes the entry entirely.
    pub fn decrement(&self, ty: ComponentTypeId) {
        if let Entry::Occupied(mut entry) = self.counts.entry(ty) {
            if *entry.get() > 1 {
                *entry.get_mut() -= 1;
            } else {
                entry.remove();
            }
        }
    }

    /// The number of entities currently holding `ty` enabled (0 if untracked).
    #[must_use]
    pub fn rarity(&self, ty: ComponentTypeId) -> usize {
        self.counts.get(&ty).map(|count| *count).unwrap_or(0)
    }

    /// Sort component types ascending by rarity (rarest first).
    ///
    /// The sort is stable, so types with equal counts keep their given order.
    #[must_use]
    pub fn sort_by_rarity(&self, types: &[ComponentTypeId]) -> Vec<ComponentTypeId> {
        let mut sorted = types.to_vec();
        sorted.sort_by_key(|ty| self.rarity(*ty));
        sorted
    }

    /// The number of distinct component types currently tracked.
    #[must_use]
    pub fn tracked_types(&self) -> usize {
        self.counts.len()
    }
}
