//! Provider tokens and resolution scopes.

use std::any::TypeId;

use uuid::Uuid;

/// The key under which a dependency provider is registered.
///
/// Either the identity of a concrete constructible type, or an opaque named
/// symbol for abstract registrations (several implementations behind one
/// key).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Token {
    /// A concrete type identity. The name rides along for diagnostics only;
    /// equality is by [`TypeId`].
    Type(TypeId, &'static str),
    /// An opaque symbolic key.
    Named(&'static str),
}

impl Token {
    /// The token for a concrete type `T`.
    #[must_use]
    pub fn of<T: 'static>() -> Self {
        Self::Type(TypeId::of::<T>(), short_type_name::<T>())
    }

    /// An opaque named token.
    #[must_use]
    pub const fn named(name: &'static str) -> Self {
        Self::Named(name)
    }

    /// The token description used in error messages.
    #[must_use]
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Type(_, name) => name,
            Self::Named(name) => name,
        }
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.describe())
    }
}

/// A dependency-resolution namespace.
///
/// The global scope always exists; group scopes are created on demand when a
/// group registers its provider overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ScopeId {
    /// The process-wide scope, always present.
    #[default]
    Global,
    /// A per-group scope keyed by the group's uuid.
    Group(Uuid),
}

impl std::fmt::Display for ScopeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Global => write!(f, "global"),
            Self::Group(uuid) => write!(f, "group:{uuid}"),
        }
    }
}

/// Strips the module path from a type name.
pub(crate) fn short_type_name<T>() -> &'static str {
    let full = std::any::type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}
