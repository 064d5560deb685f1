//! Entity registry — owns the id-to-entity mapping.
//!
//! The registry exclusively owns entity identity: registering a duplicate id
//! fails, removal is the only way an entity leaves the engine (components die
//! with the entity). Entities are handed out as [`EntityRef`]s — shared,
//! lock-guarded handles — so systems can mutate component data while the
//! registry retains ownership of the map.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::trace;

use crate::entity::{Entity, EntityId};
use crate::error::EcsError;
use crate::filter::{ComponentFilter, compile_filter};
use crate::filtered::Filtered;
use crate::rarity::RaritySorter;

/// A shared, lock-guarded handle to a registered entity.
pub type EntityRef = Arc<RwLock<Entity>>;

/// Registry of all entities known to the engine.
///
/// # Examples
///
/// ```rust
/// use pulse_ecs::{ComponentFilter, EntityRegistry};
///
/// struct Position { x: f32 }
///
/// let mut registry = EntityRegistry::new();
/// let player = registry.spawn("player");
/// player.write().add_component(Position { x: 1.0 }).unwrap();
///
/// let moving = registry.filter(&ComponentFilter::new().include::<Position>(), false);
/// assert_eq!(moving.count(), 1);
/// ```
#[derive(Debug, Default)]
pub struct EntityRegistry {
    entities: HashMap<EntityId, EntityRef>,
    // Registration order; `all`/`active`/`inactive` iterate this so
    // repeated dispatches see entities in a stable order.
    order: Vec<EntityId>,
    rarity: Arc<RaritySorter>,
}

impl EntityRegistry {
    /// Create an empty registry with its own rarity counter.
    #[must_use]
    pub fn new() -> Self {
        Self::with_rarity(RaritySorter::shared())
    }

    /// Create an empty registry sharing an existing rarity counter.
    #[must_use]
    pub fn with_rarity(rarity: Arc<RaritySorter>) -> Self {
        Self {
            entities: HashMap::new(),
            order: Vec::new(),
            rarity,
        }
    }

    /// The rarity counter entities must be wired to.
    ///
    /// Entities constructed externally should clone this handle so their
    /// component mutations keep the counter consistent.
    #[must_use]
    pub fn rarity(&self) -> &Arc<RaritySorter> {
        &self.rarity
    }

    /// Create and register a fresh entity wired to this registry's counter.
    pub fn spawn(&mut self, name: impl Into<String>) -> EntityRef {
        let entity = Entity::new(name, Arc::clone(&self.rarity));
        let id = entity.id();
        let entity_ref: EntityRef = Arc::new(RwLock::new(entity));
        self.entities.insert(id, Arc::clone(&entity_ref));
        self.order.push(id);
        entity_ref
    }

    /// Register an externally created entity.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::DuplicateEntity`] if the id is already present.
    pub fn add(&mut self, entity: Entity) -> Result<EntityRef, EcsError> {
        let id = entity.id();
        if self.entities.contains_key(&id) {
            return Err(EcsError::DuplicateEntity {
                name: entity.name().to_string(),
                id,
            });
        }
        trace!(entity = entity.name(), %id, "entity registered");
        let entity_ref: EntityRef = Arc::new(RwLock::new(entity));
        self.entities.insert(id, Arc::clone(&entity_ref));
        self.order.push(id);
        Ok(entity_ref)
    }

    /// Remove an entity by id.
    ///
    /// Removing an unknown id is not an error; `None` is returned.
    pub fn remove(&mut self, id: EntityId) -> Option<EntityRef> {
        let removed = self.entities.remove(&id);
        if removed.is_some() {
            self.order.retain(|known| *known != id);
            trace!(%id, "entity removed");
        }
        removed
    }

    /// Look up an entity by id.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<EntityRef> {
        self.entities.get(&id).cloned()
    }

    /// The number of registered entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// All registered entities, in registration order.
    #[must_use]
    pub fn all(&self) -> Vec<EntityRef> {
        self.order
            .iter()
            .filter_map(|id| self.entities.get(id).cloned())
            .collect()
    }

    /// All entities whose `active` flag is set, in registration order.
    #[must_use]
    pub fn active(&self) -> Vec<EntityRef> {
        self.all()
            .into_iter()
            .filter(|e| e.read().active())
            .collect()
    }

    /// All entities whose `active` flag is clear, in registration order.
    #[must_use]
    pub fn inactive(&self) -> Vec<EntityRef> {
        self.all()
            .into_iter()
            .filter(|e| !e.read().active())
            .collect()
    }

    /// Select entities matching a component filter.
    ///
    /// The base population is every entity when `with_disabled` is set, else
    /// only active entities. An empty filter skips predicate evaluation and
    /// returns the base population directly. Otherwise both lists are
    /// rarity-sorted and a compiled predicate is applied; the sort affects
    /// evaluation cost only, never the result set. Matched entities keep
    /// their registration order.
    #[must_use]
    pub fn filter(&self, filter: &ComponentFilter, with_disabled: bool) -> Filtered {
        let base = if with_disabled { self.all() } else { self.active() };

        if filter.is_empty() {
            return Filtered::new(base);
        }

        let includes = self.rarity.sort_by_rarity(&filter.includes);
        let excludes = self.rarity.sort_by_rarity(&filter.excludes);
        let predicate = compile_filter(includes, excludes);

        let matched = base
            .into_iter()
            .filter(|entity| predicate(&entity.read()))
            .collect();
        Filtered::new(matched)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    struct Position;
    struct Velocity;
    struct Frozen;

    #[test]
    fn test_add_and_get() {
        let mut registry = EntityRegistry::new();
        let entity = Entity::new("player", Arc::clone(registry.rarity()));
        let id = entity.id();

        registry.add(entity).unwrap();
        assert!(registry.get(id).is_some());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_duplicate_id_fails() {
        let mut registry = EntityRegistry::new();
        let id = EntityId::new();

        let first = Entity::with_id(id, "a", Arc::clone(registry.rarity()));
        let second = Entity::with_id(id, "b", Arc::clone(registry.rarity()));

        registry.add(first).unwrap();
        let err = registry.add(second).unwrap_err();
        assert!(matches!(err, EcsError::DuplicateEntity { .. }));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_remove_unknown_id_is_not_an_error() {
        let mut registry = EntityRegistry::new();
        assert!(registry.remove(EntityId::new()).is_none());
    }

    #[test]
    fn test_remove_returns_entity() {
        let mut registry = EntityRegistry::new();
        let entity = registry.spawn("player");
        let id = entity.read().id();

        let removed = registry.remove(id).unwrap();
        assert_eq!(removed.read().id(), id);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_active_inactive_partition() {
        let mut registry = EntityRegistry::new();
        registry.spawn("awake");
        let sleeping = registry.spawn("sleeping");
        sleeping.write().set_active(false);

        assert_eq!(registry.active().len(), 1);
        assert_eq!(registry.inactive().len(), 1);
        assert_eq!(registry.all().len(), 2);
    }

    #[test]
    fn test_iteration_follows_registration_order() {
        let mut registry = EntityRegistry::new();
        for name in ["a", "b", "c", "d"] {
            registry.spawn(name);
        }

        let b_id = registry.all()[1].read().id();
        registry.remove(b_id);
        registry.spawn("e");

        let names: Vec<String> = registry
            .all()
            .iter()
            .map(|e| e.read().name().to_string())
            .collect();
        assert_eq!(names, vec!["a", "c", "d", "e"]);

        // The partitions keep the same order.
        registry.all()[0].write().set_active(false);
        let active: Vec<String> = registry
            .active()
            .iter()
            .map(|e| e.read().name().to_string())
            .collect();
        assert_eq!(active, vec!["c", "d", "e"]);
    }

    #[test]
    fn test_empty_filter_returns_base_population() {
        let mut registry = EntityRegistry::new();
        registry.spawn("a");
        let inactive = registry.spawn("b");
        inactive.write().set_active(false);

        let active_only = registry.filter(&ComponentFilter::new(), false);
        assert_eq!(active_only.count(), 1);

        let everyone = registry.filter(&ComponentFilter::new(), true);
        assert_eq!(everyone.count(), 2);
    }

    #[test]
    fn test_filter_includes_selects_subset() {
        let mut registry = EntityRegistry::new();

        let both = registry.spawn("both");
        both.write().add_component(Position).unwrap();
        both.write().add_component(Velocity).unwrap();

        let position_only = registry.spawn("position-only");
        position_only.write().add_component(Position).unwrap();

        registry.spawn("bare");

        let filter = ComponentFilter::new().include::<Position>().include::<Velocity>();
        let matched = registry.filter(&filter, false);

        assert_eq!(matched.count(), 1);
        assert_eq!(matched.items()[0].read().name(), "both");
    }

    #[test]
    fn test_filter_excludes_reject() {
        let mut registry = EntityRegistry::new();

        let frozen = registry.spawn("frozen");
        frozen.write().add_component(Position).unwrap();
        frozen.write().add_component(Frozen).unwrap();

        let free = registry.spawn("free");
        free.write().add_component(Position).unwrap();

        let filter = ComponentFilter::new().include::<Position>().exclude::<Frozen>();
        let matched = registry.filter(&filter, false);

        assert_eq!(matched.count(), 1);
        assert_eq!(matched.items()[0].read().name(), "free");
    }

    #[test]
    fn test_filter_ignores_inactive_without_flag() {
        let mut registry = EntityRegistry::new();

        let inactive = registry.spawn("inactive");
        inactive.write().add_component(Position).unwrap();
        inactive.write().set_active(false);

        let filter = ComponentFilter::new().include::<Position>();
        assert_eq!(registry.filter(&filter, false).count(), 0);
        assert_eq!(registry.filter(&filter, true).count(), 1);
    }

    #[test]
    fn test_filter_result_set_is_rarity_independent() {
        // Rarity ordering affects evaluation cost only; the matched id set
        // must be identical whatever the counters say.
        let mut registry = EntityRegistry::new();
        for i in 0..4 {
            let entity = registry.spawn(format!("e{i}"));
            entity.write().add_component(Position).unwrap();
            if i % 2 == 0 {
                entity.write().add_component(Velocity).unwrap();
            }
        }

        let filter = ComponentFilter::new().include::<Position>().include::<Velocity>();
        let ids: HashSet<EntityId> = registry
            .filter(&filter, false)
            .items()
            .iter()
            .map(|e| e.read().id())
            .collect();
        assert_eq!(ids.len(), 2);
    }
}
