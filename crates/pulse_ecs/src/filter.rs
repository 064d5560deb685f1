//! Component filters and predicate compilation.
//!
//! A [`ComponentFilter`] pairs an `includes` list (the entity must hold ALL,
//! enabled) with an `excludes` list (the entity must hold NONE). An empty
//! `includes` matches every entity, subject to `excludes`.
//!
//! [`compile_filter`] turns two *already rarity-sorted* lists into a pure
//! predicate. Sorting matters only for cost: `has_components` short-circuits
//! on the first missing type, so checking the rarest include first rejects a
//! non-matching entity after the fewest lookups.

use crate::component::ComponentTypeId;
use crate::entity::Entity;

/// An include/exclude pair of component type lists.
///
/// Built in the same fluent style as the rest of the engine's descriptors:
///
/// ```rust
/// use pulse_ecs::ComponentFilter;
///
/// struct Position;
/// struct Frozen;
///
/// let filter = ComponentFilter::new().include::<Position>().exclude::<Frozen>();
/// assert!(!filter.is_empty());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ComponentFilter {
    /// Types the entity must hold enabled, all of them.
    pub includes: Vec<ComponentTypeId>,
    /// Types the entity must not hold enabled, none of them.
    pub excludes: Vec<ComponentTypeId>,
}

impl ComponentFilter {
    /// Create an empty filter (matches every entity).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Require component type `T`.
    #[must_use]
    pub fn include<T: Send + Sync + 'static>(self) -> Self {
        self.include_type(ComponentTypeId::of::<T>())
    }

    /// Forbid component type `T`.
    #[must_use]
    pub fn exclude<T: Send + Sync + 'static>(self) -> Self {
        self.exclude_type(ComponentTypeId::of::<T>())
    }

    /// Require a component type by runtime id.
    #[must_use]
    pub fn include_type(mut self, ty: ComponentTypeId) -> Self {
        self.includes.push(ty);
        self
    }

    /// Forbid a component type by runtime id.
    #[must_use]
    pub fn exclude_type(mut self, ty: ComponentTypeId) -> Self {
        self.excludes.push(ty);
        self
    }

    /// Whether both lists are empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.includes.is_empty() && self.excludes.is_empty()
    }

    /// Concatenate another filter's lists onto a copy of this one.
    ///
    /// Used to mix a group's filter extension into a system's own filter.
    #[must_use]
    pub fn merge(&self, other: &ComponentFilter) -> ComponentFilter {
        let mut merged = self.clone();
        merged.includes.extend_from_slice(&other.includes);
        merged.excludes.extend_from_slice(&other.excludes);
        merged
    }
}

/// Compile rarity-sorted include/exclude lists into an entity predicate.
///
/// The predicate rejects if any include type is missing (short-circuiting in
/// the given order), then rejects if any exclude type is present, and accepts
/// otherwise. It has no side effects and can be reused across an entire
/// filter pass.
#[must_use]
pub fn compile_filter(
    includes: Vec<ComponentTypeId>,
    excludes: Vec<ComponentTypeId>,
) -> impl Fn(&Entity) -> bool {
    move |entity: &Entity| {
        if !entity.has_components(&includes) {
            return false;
        }
        excludes.is_empty() || !entity.has_any_component(&excludes)
    }
}
