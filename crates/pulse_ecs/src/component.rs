//! Core [`Component`] trait and runtime type identity.
//!
//! A component is a plain data record attached to an entity. There is no
//! behaviour contract beyond `Any + Send + Sync`, so any `'static` data type
//! qualifies without ceremony — the blanket implementation covers it.
//!
//! [`ComponentTypeId`] is the runtime identity of a component type. Identity
//! is the `TypeId`; the type name rides along purely for error messages and
//! logging.

use std::any::{Any, TypeId};

/// The core component trait.
///
/// Components hold data without behaviour. Anything `Any + Send + Sync`
/// is a component via the blanket implementation:
///
/// ```rust
/// use pulse_ecs::{Component, ComponentTypeId};
///
/// struct Position {
///     x: f32,
///     y: f32,
/// }
///
/// let id = ComponentTypeId::of::<Position>();
/// assert_eq!(id, ComponentTypeId::of::<Position>());
/// ```
pub trait Component: Any + Send + Sync {
    /// Upcast to [`Any`] for downcasting to the concrete type.
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast to [`Any`].
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// The short type name of this component, for diagnostics.
    fn component_name(&self) -> &'static str;
}

impl<T: Any + Send + Sync> Component for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn component_name(&self) -> &'static str {
        short_type_name::<T>()
    }
}

impl std::fmt::Debug for dyn Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Component")
            .field("name", &self.component_name())
            .finish()
    }
}

/// Strips the module path from a type name (`a::b::Position` → `Position`).
fn short_type_name<T>() -> &'static str {
    let full = std::any::type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}

/// Runtime identity of a component type.
///
/// Equality and hashing use the [`TypeId`] only; the name is carried for
/// error messages ("component Position is not found in ...") and never
/// participates in identity.
#[derive(Debug, Clone, Copy)]
pub struct ComponentTypeId {
    id: TypeId,
    name: &'static str,
}

impl ComponentTypeId {
    /// The [`ComponentTypeId`] for a component type `T`.
    #[must_use]
    pub fn of<T: Any + Send + Sync>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: short_type_name::<T>(),
        }
    }

    /// The [`ComponentTypeId`] of a boxed or borrowed component instance.
    #[must_use]
    pub fn of_val(component: &dyn Component) -> Self {
        Self {
            id: component.as_any().type_id(),
            name: component.component_name(),
        }
    }

    /// The underlying [`TypeId`].
    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.id
    }

    /// The short type name, for diagnostics.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for ComponentTypeId {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ComponentTypeId {}

impl std::hash::Hash for ComponentTypeId {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl std::fmt::Display for ComponentTypeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}
