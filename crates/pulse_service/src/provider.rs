//! Provider recipes.

use std::any::Any;
use std::sync::Arc;

use crate::token::Token;

/// The boxed service value a factory produces.
pub type ServiceObject = Box<dyn Any + Send + Sync>;

/// A recipe for constructing a service — not yet an instance.
///
/// Two flavours mirror the registration surface: a *class* recipe constructs
/// via [`Default`], a *factory* recipe calls a zero-argument closure. Either
/// may be marked immutable, which makes every handle resolved from it reject
/// writes (see [`ServiceHandle`](crate::handle::ServiceHandle)).
///
/// # Examples
///
/// ```rust
/// use pulse_service::{Provider, Token};
///
/// #[derive(Default)]
/// struct Clock { ticks: u64 }
///
/// struct Config { max_entities: usize }
///
/// let providers = vec![
///     Provider::of::<Clock>(),
///     Provider::factory(Token::named("config"), || Config { max_entities: 1024 })
///         .immutable(),
/// ];
/// assert_eq!(providers.len(), 2);
/// ```
#[derive(Clone)]
pub struct Provider {
    token: Token,
    factory: Arc<dyn Fn() -> ServiceObject + Send + Sync>,
    immutable: bool,
}

impl Provider {
    /// A class recipe: the token is `T`'s type identity and construction is
    /// `T::default()`.
    #[must_use]
    pub fn of<T: Default + Send + Sync + 'static>() -> Self {
        Self {
            token: Token::of::<T>(),
            factory: Arc::new(|| Box::new(T::default())),
            immutable: false,
        }
    }

    /// A factory recipe under an explicit token.
    #[must_use]
    pub fn factory<T, F>(token: Token, factory: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self {
            token,
            factory: Arc::new(move || Box::new(factory())),
            immutable: false,
        }
    }

    /// A factory recipe keyed by the produced type's identity.
    #[must_use]
    pub fn factory_of<T, F>(factory: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::factory(Token::of::<T>(), factory)
    }

    /// Mark the provider immutable: handles resolved from it drop writes.
    #[must_use]
    pub fn immutable(mut self) -> Self {
        self.immutable = true;
        self
    }

    /// The registration key.
    #[must_use]
    pub fn token(&self) -> Token {
        self.token
    }

    /// Whether handles resolved from this provider reject writes.
    #[must_use]
    pub fn is_immutable(&self) -> bool {
        self.immutable
    }

    /// Construct a fresh instance.
    pub(crate) fn instantiate(&self) -> ServiceObject {
        (self.factory)()
    }
}

impl std::fmt::Debug for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Provider")
            .field("token", &self.token)
            .field("immutable", &self.immutable)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Clock {
        ticks: u64,
    }

    #[test]
    fn test_class_provider_constructs_default() {
        let provider = Provider::of::<Clock>();
        assert_eq!(provider.token(), Token::of::<Clock>());

        let object = provider.instantiate();
        let clock = object.downcast_ref::<Clock>().unwrap();
        assert_eq!(clock.ticks, 0);
    }

    #[test]
    fn test_factory_provider_runs_closure() {
        let provider = Provider::factory(Token::named("clock"), || Clock { ticks: 7 });
        let object = provider.instantiate();
        assert_eq!(object.downcast_ref::<Clock>().unwrap().ticks, 7);
    }

    #[test]
    fn test_immutable_flag() {
        assert!(!Provider::of::<Clock>().is_immutable());
        assert!(Provider::of::<Clock>().immutable().is_immutable());
    }
}
