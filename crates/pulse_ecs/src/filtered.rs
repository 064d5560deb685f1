//! Filtered entity views and iteration helpers.
//!
//! A [`Filtered`] is the result of an
//! [`EntityRegistry::filter`](crate::registry::EntityRegistry::filter) pass.
//! It offers three iteration disciplines:
//!
//! - [`for_each`](Filtered::for_each) — plain synchronous iteration.
//! - [`sequential`](Filtered::sequential) — one entity's async callback is
//!   awaited to completion before the next starts.
//! - [`parallel`](Filtered::parallel) — all callbacks are launched together
//!   and their completions awaited jointly. This is concurrency inside one
//!   system's own logic; per-entity side effects may interleave.

use std::future::Future;

use futures::future::try_join_all;

use crate::registry::EntityRef;

/// A collection of entities selected by a filter pass.
#[derive(Debug, Default)]
pub struct Filtered {
    entities: Vec<EntityRef>,
}

impl Filtered {
    /// Wrap a list of entity handles.
    #[must_use]
    pub fn new(entities: Vec<EntityRef>) -> Self {
        Self { entities }
    }

    /// The number of entities in the view.
    #[must_use]
    pub fn count(&self) -> usize {
        self.entities.len()
    }

    /// Whether the view is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// The entity handles in the view.
    #[must_use]
    pub fn items(&self) -> &[EntityRef] {
        &self.entities
    }

    /// Consume the view, yielding its entity handles.
    #[must_use]
    pub fn into_items(self) -> Vec<EntityRef> {
        self.entities
    }

    /// Call `callback` synchronously for each entity with its index.
    pub fn for_each(&self, mut callback: impl FnMut(&EntityRef, usize)) {
        for (index, entity) in self.entities.iter().enumerate() {
            callback(entity, index);
        }
    }

    /// Await `callback` for each entity strictly in order: the previous
    /// entity's future completes before the next is started.
    ///
    /// # Errors
    ///
    /// Stops at, and returns, the first callback failure.
    pub async fn sequential<F, Fut>(&self, mut callback: F) -> anyhow::Result<()>
    where
        F: FnMut(EntityRef, usize) -> Fut,
        Fut: Future<Output = anyhow::Result<()>>,
    {
        for (index, entity) in self.entities.iter().enumerate() {
            callback(entity.clone(), index).await?;
        }
        Ok(())
    }

    /// Launch `callback` for every entity at once and await all completions.
    ///
    /// # Errors
    ///
    /// Returns the first callback failure once observed; other callbacks may
    /// already have run to completion.
    pub async fn parallel<F, Fut>(&self, callback: F) -> anyhow::Result<()>
    where
        F: Fn(EntityRef, usize) -> Fut,
        Fut: Future<Output = anyhow::Result<()>>,
    {
        let futures = self
            .entities
            .iter()
            .enumerate()
            .map(|(index, entity)| callback(entity.clone(), index));
        try_join_all(futures).await.map(|_| ())
    }
}
