//! Entity identity and the per-entity component store.
//!
//! An [`Entity`] is an identity owning two disjoint component sets: *enabled*
//! and *disabled*. A component type appears in at most one of the two sets at
//! a time. Component lookups (`component`, `has_components`) see only the
//! enabled set; disabled components are invisible until re-enabled.
//!
//! Every mutation that changes a component's enabled state also adjusts the
//! shared [`RaritySorter`], keeping the per-type live-population counts in
//! step with the entity data.

use std::sync::Arc;

use uuid::Uuid;

use crate::component::{Component, ComponentTypeId};
use crate::error::EcsError;
use crate::filter::ComponentFilter;
use crate::rarity::RaritySorter;

/// A unique entity identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(Uuid);

impl EntityId {
    /// Allocate a fresh random identity.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing [`Uuid`] as an entity id.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// The underlying [`Uuid`].
    #[must_use]
    pub const fn uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An ordered set of component instances, at most one per concrete type.
///
/// Insertion order is preserved so bulk enable/disable moves keep a stable
/// ordering.
#[derive(Default)]
struct ComponentSet {
    items: Vec<Box<dyn Component>>,
}

impl ComponentSet {
    fn insert(&mut self, component: Box<dyn Component>) {
        self.items.push(component);
    }

    fn contains(&self, ty: ComponentTypeId) -> bool {
        self.items
            .iter()
            .any(|c| ComponentTypeId::of_val(c.as_ref()) == ty)
    }

    fn get<T: Component>(&self) -> Option<&T> {
        self.items
            .iter()
            .find_map(|c| c.as_ref().as_any().downcast_ref::<T>())
    }

    fn get_mut<T: Component>(&mut self) -> Option<&mut T> {
        self.items
            .iter_mut()
            .find_map(|c| c.as_mut().as_any_mut().downcast_mut::<T>())
    }

    fn take(&mut self, ty: ComponentTypeId) -> Option<Box<dyn Component>> {
        let index = self
            .items
            .iter()
            .position(|c| ComponentTypeId::of_val(c.as_ref()) == ty)?;
        Some(self.items.remove(index))
    }

    fn drain(&mut self) -> Vec<Box<dyn Component>> {
        std::mem::take(&mut self.items)
    }

    fn types(&self) -> Vec<ComponentTypeId> {
        self.items
            .iter()
            .map(|c| ComponentTypeId::of_val(c.as_ref()))
            .collect()
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}

/// An identity owning enabled and disabled component sets.
///
/// Entities are created externally (wired to the engine's shared
/// [`RaritySorter`]) and registered into the
/// [`EntityRegistry`](crate::registry::EntityRegistry), which owns the
/// id-to-entity mapping.
///
/// # Examples
///
/// ```rust
/// use pulse_ecs::{ComponentTypeId, Entity, RaritySorter};
///
/// struct Position { x: f32, y: f32 }
///
/// let rarity = RaritySorter::shared();
/// let mut entity = Entity::new("player", rarity);
/// entity.add_component(Position { x: 0.0, y: 0.0 }).unwrap();
///
/// let position = entity.component::<Position>().unwrap();
/// assert_eq!(position.x, 0.0);
/// assert!(entity.has_components(&[ComponentTypeId::of::<Position>()]));
/// ```
pub struct Entity {
    id: EntityId,
    name: String,
    active: bool,
    enabled: ComponentSet,
    disabled: ComponentSet,
    rarity: Arc<RaritySorter>,
}

impl Entity {
    /// Create an active entity with a fresh random id.
    #[must_use]
    pub fn new(name: impl Into<String>, rarity: Arc<RaritySorter>) -> Self {
        Self::with_id(EntityId::new(), name, rarity)
    }

    /// Create an active entity with an explicit id.
    #[must_use]
    pub fn with_id(id: EntityId, name: impl Into<String>, rarity: Arc<RaritySorter>) -> Self {
        Self {
            id,
            name: name.into(),
            active: true,
            enabled: ComponentSet::default(),
            disabled: ComponentSet::default(),
            rarity,
        }
    }

    /// The entity's unique identity.
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// The entity's display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename the entity.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Whether the entity is active.
    #[must_use]
    pub fn active(&self) -> bool {
        self.active
    }

    /// Activate or deactivate the entity.
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Add a component in the enabled set.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::DuplicateComponent`] if a component of this type
    /// already exists in either set; the entity is unchanged on failure.
    pub fn add_component<C: Component>(&mut self, component: C) -> Result<(), EcsError> {
        self.add_component_with(component, true)
    }

    /// Add a component, choosing whether it starts enabled or disabled.
    ///
    /// Adding disabled still issues a rarity decrement, which is a defensive
    /// no-op since the component was never counted as enabled.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::DuplicateComponent`] if a component of this type
    /// already exists in either set; the entity is unchanged on failure.
    pub fn add_component_with<C: Component>(
        &mut self,
        component: C,
        enabled: bool,
    ) -> Result<(), EcsError> {
        let ty = ComponentTypeId::of::<C>();

        if self.enabled.contains(ty) || self.disabled.contains(ty) {
            return Err(EcsError::DuplicateComponent {
                component: ty.name(),
                entity_name: self.name.clone(),
                entity_id: self.id,
            });
        }

        if enabled {
            self.enabled.insert(Box::new(component));
            self.rarity.increment(ty);
        } else {
            self.disabled.insert(Box::new(component));
            self.rarity.decrement(ty);
        }
        Ok(())
    }

    /// Borrow an enabled component by type.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::ComponentNotFound`] if the type is not in the
    /// enabled set (disabled components are invisible here).
    pub fn component<T: Component>(&self) -> Result<&T, EcsError> {
        self.enabled
            .get::<T>()
            .ok_or_else(|| EcsError::ComponentNotFound {
                component: ComponentTypeId::of::<T>().name(),
                entity_name: self.name.clone(),
                entity_id: self.id,
            })
    }

    /// Mutably borrow an enabled component by type.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::ComponentNotFound`] if the type is not in the
    /// enabled set.
    pub fn component_mut<T: Component>(&mut self) -> Result<&mut T, EcsError> {
        let entity_name = self.name.clone();
        let entity_id = self.id;
        self.enabled
            .get_mut::<T>()
            .ok_or_else(|| EcsError::ComponentNotFound {
                component: ComponentTypeId::of::<T>().name(),
                entity_name,
                entity_id,
            })
    }

    /// Whether every listed type is in the enabled set.
    ///
    /// Short-circuits on the first missing type, in the given order — pass a
    /// rarity-sorted list to reject cheaply.
    #[must_use]
    pub fn has_components(&self, types: &[ComponentTypeId]) -> bool {
        types.iter().all(|ty| self.enabled.contains(*ty))
    }

    /// Whether at least one listed type is in the enabled set.
    #[must_use]
    pub fn has_any_component(&self, types: &[ComponentTypeId]) -> bool {
        types.iter().any(|ty| self.enabled.contains(*ty))
    }

    /// Remove a component from whichever set holds it.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::ComponentMissing`] if the type exists in neither
    /// set.
    pub fn remove_component(
        &mut self,
        ty: ComponentTypeId,
    ) -> Result<Box<dyn Component>, EcsError> {
        let removed = self
            .enabled
            .take(ty)
            .or_else(|| self.disabled.take(ty))
            .ok_or_else(|| EcsError::ComponentMissing {
                component: ty.name(),
                entity_name: self.name.clone(),
                entity_id: self.id,
            })?;

        self.rarity.decrement(ty);
        Ok(removed)
    }

    /// Move a component from the disabled set to the enabled set.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::AlreadyEnabled`] if the type is not currently
    /// disabled.
    pub fn enable_component(&mut self, ty: ComponentTypeId) -> Result<(), EcsError> {
        let component = self
            .disabled
            .take(ty)
            .ok_or_else(|| EcsError::AlreadyEnabled {
                component: ty.name(),
                entity_name: self.name.clone(),
                entity_id: self.id,
            })?;

        self.enabled.insert(component);
        self.rarity.increment(ty);
        Ok(())
    }

    /// Move a component from the enabled set to the disabled set.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::AlreadyDisabled`] if the type is not currently
    /// enabled.
    pub fn disable_component(&mut self, ty: ComponentTypeId) -> Result<(), EcsError> {
        let component = self
            .enabled
            .take(ty)
            .ok_or_else(|| EcsError::AlreadyDisabled {
                component: ty.name(),
                entity_name: self.name.clone(),
                entity_id: self.id,
            })?;

        self.disabled.insert(component);
        self.rarity.decrement(ty);
        Ok(())
    }

    /// Move every enabled component to the disabled set, decrementing rarity
    /// once per moved component.
    pub fn disable_all_components(&mut self) {
        for component in self.enabled.drain() {
            self.rarity.decrement(ComponentTypeId::of_val(component.as_ref()));
            self.disabled.insert(component);
        }
    }

    /// Move every disabled component back to the enabled set, incrementing
    /// rarity once per moved component.
    pub fn enable_all_components(&mut self) {
        for component in self.disabled.drain() {
            self.rarity.increment(ComponentTypeId::of_val(component.as_ref()));
            self.enabled.insert(component);
        }
    }

    /// Whether the entity satisfies a component filter: all includes present
    /// (enabled), no exclude present.
    #[must_use]
    pub fn matches(&self, filter: &ComponentFilter) -> bool {
        if !self.has_components(&filter.includes) {
            return false;
        }
        filter.excludes.is_empty() || !self.has_any_component(&filter.excludes)
    }

    /// Types currently in the enabled set, in insertion order.
    #[must_use]
    pub fn enabled_types(&self) -> Vec<ComponentTypeId> {
        self.enabled.types()
    }

    /// Types currently in the disabled set, in insertion order.
    #[must_use]
    pub fn disabled_types(&self) -> Vec<ComponentTypeId> {
        self.disabled.types()
    }

    /// Total component count across both sets.
    #[must_use]
    pub fn component_count(&self) -> usize {
        self.enabled.len() + self.disabled.len()
    }
}

impl std::fmt::Debug for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Entity")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("active", &self.active)
            .field("enabled", &self.enabled.types())
            .field("disabled", &self.disabled.types())
            .finish()
    }
}
