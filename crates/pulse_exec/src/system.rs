//! Systems and their per-call context.
//!
//! A system is a stateless logic unit executed against a filtered entity
//! population. Systems never hold references to the engine between calls:
//! each invocation receives a [`SystemContext`] carrying the owning group's
//! id, the shared entity registry, the service container, the group-supplied
//! filter extension, and the call data.
//!
//! One long-lived instance exists per system type, held by the
//! [`SystemCache`]; the executor locks it for the duration of each queued
//! invocation.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use pulse_ecs::{ComponentFilter, EntityRegistry, Filtered};
use pulse_service::{ScopeId, ServiceContainer, ServiceError, ServiceHandle, Token};
use uuid::Uuid;

use crate::payload::Payload;

/// A stateless logic unit, invoked by the executor when its group runs.
///
/// # Examples
///
/// ```rust
/// use async_trait::async_trait;
/// use pulse_exec::{System, SystemContext};
///
/// struct Position { x: f32 }
///
/// #[derive(Default)]
/// struct MoveSystem;
///
/// #[async_trait]
/// impl System for MoveSystem {
///     async fn execute(&mut self, ctx: &SystemContext) -> anyhow::Result<()> {
///         let entities = ctx.filter(pulse_ecs::ComponentFilter::new().include::<Position>());
///         entities.for_each(|entity, _| {
///             let mut entity = entity.write();
///             if let Ok(position) = entity.component_mut::<Position>() {
///                 position.x += 1.0;
///             }
///         });
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait System: Send {
    /// The entry point, run once per queued invocation.
    ///
    /// # Errors
    ///
    /// A failure aborts the owning executor's whole run; remaining queued
    /// systems do not execute.
    async fn execute(&mut self, ctx: &SystemContext) -> Result<()>;

    /// Receive a dependency resolved from a container injection declaration.
    ///
    /// Called once per declared field before each invocation. The default
    /// ignores the handle; systems that declare injections store it under the
    /// matching field name.
    fn assign_dependency(&mut self, _field: &'static str, _handle: ServiceHandle) {}

    /// Extra type identities this system claims for injection matching.
    ///
    /// Declarations are matched against the concrete type plus everything
    /// listed here, so a system may pick up declarations made for a type it
    /// embeds or stands in for.
    fn injection_memberships(&self) -> Vec<TypeId> {
        Vec::new()
    }
}

/// Everything a system may touch during one invocation.
pub struct SystemContext {
    group_id: Uuid,
    entities: Arc<RwLock<EntityRegistry>>,
    services: Arc<ServiceContainer>,
    external: ComponentFilter,
    with_disabled: bool,
    data: Payload,
}

impl SystemContext {
    pub(crate) fn new(
        group_id: Uuid,
        entities: Arc<RwLock<EntityRegistry>>,
        services: Arc<ServiceContainer>,
        external: ComponentFilter,
        with_disabled: bool,
        data: Payload,
    ) -> Self {
        Self {
            group_id,
            entities,
            services,
            external,
            with_disabled,
            data,
        }
    }

    /// The id of the group this invocation belongs to.
    #[must_use]
    pub fn group_id(&self) -> Uuid {
        self.group_id
    }

    /// Whether disabled entities are part of the base population.
    #[must_use]
    pub fn with_disabled(&self) -> bool {
        self.with_disabled
    }

    /// The raw call data payload.
    #[must_use]
    pub fn payload(&self) -> &Payload {
        &self.data
    }

    /// The call data downcast to `T`.
    #[must_use]
    pub fn data<T: 'static>(&self) -> Option<&T> {
        self.data.downcast_ref::<T>()
    }

    /// The shared entity registry.
    #[must_use]
    pub fn entities(&self) -> &Arc<RwLock<EntityRegistry>> {
        &self.entities
    }

    /// Select entities with the group's filter extension mixed in.
    #[must_use]
    pub fn filter(&self, filter: ComponentFilter) -> Filtered {
        let mixed = filter.merge(&self.external);
        self.entities.read().filter(&mixed, self.with_disabled)
    }

    /// Select entities without the group's filter extension.
    #[must_use]
    pub fn clean_filter(&self, filter: ComponentFilter) -> Filtered {
        self.entities.read().filter(&filter, self.with_disabled)
    }

    /// Resolve a dependency from the owning group's scope, falling back to
    /// the global scope.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::ProviderNotFound`] if the token is registered
    /// nowhere.
    pub fn dependency(&self, token: Token) -> Result<ServiceHandle, ServiceError> {
        self.services.get(token, ScopeId::Group(self.group_id))
    }
}

impl std::fmt::Debug for SystemContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemContext")
            .field("group_id", &self.group_id)
            .field("with_disabled", &self.with_disabled)
            .finish()
    }
}

/// A recipe for a system: its type identity, name, and construction.
///
/// Recipes are what group options carry; the concrete instance is created
/// lazily by the [`SystemCache`] on first use.
#[derive(Clone)]
pub struct SystemRecipe {
    type_id: TypeId,
    name: &'static str,
    build: Arc<dyn Fn() -> Box<dyn System> + Send + Sync>,
}

impl SystemRecipe {
    /// The recipe for a default-constructible system type.
    #[must_use]
    pub fn of<S: System + Default + 'static>() -> Self {
        let full = std::any::type_name::<S>();
        Self {
            type_id: TypeId::of::<S>(),
            name: full.rsplit("::").next().unwrap_or(full),
            build: Arc::new(|| Box::new(S::default())),
        }
    }

    /// The system type's identity.
    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// The system type's short name, for diagnostics.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl std::fmt::Debug for SystemRecipe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemRecipe").field("name", &self.name).finish()
    }
}

/// A long-lived system instance, locked for the duration of each invocation.
pub type SharedSystem = Arc<tokio::sync::Mutex<Box<dyn System>>>;

/// Memoizes one instance per system type.
///
/// Handing out the same instance for every queue entry of a type is what
/// makes `repeat` cheap, and the per-instance async lock guarantees no two
/// queue entries run the same instance concurrently.
#[derive(Default)]
pub struct SystemCache {
    cache: Mutex<HashMap<TypeId, SharedSystem>>,
}

impl SystemCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the instance for a recipe, constructing it on first use.
    #[must_use]
    pub fn get(&self, recipe: &SystemRecipe) -> SharedSystem {
        let mut cache = self.cache.lock();
        let entry = cache
            .entry(recipe.type_id)
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new((recipe.build)())));
        Arc::clone(entry)
    }

    /// The number of instantiated systems.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.lock().len()
    }

    /// Whether no system has been instantiated yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache.lock().is_empty()
    }
}

impl std::fmt::Debug for SystemCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemCache")
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct NoopSystem;

    #[async_trait]
    impl System for NoopSystem {
        async fn execute(&mut self, _ctx: &SystemContext) -> Result<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct OtherSystem;

    #[async_trait]
    impl System for OtherSystem {
        async fn execute(&mut self, _ctx: &SystemContext) -> Result<()> {
            Ok(())
        }
    }

    fn context(external: ComponentFilter, with_disabled: bool, data: Payload) -> SystemContext {
        SystemContext::new(
            Uuid::new_v4(),
            Arc::new(RwLock::new(EntityRegistry::new())),
            ServiceContainer::shared(),
            external,
            with_disabled,
            data,
        )
    }

    struct Position;
    struct Velocity;

    #[test]
    fn test_cache_memoizes_per_type() {
        let cache = SystemCache::new();
        let recipe = SystemRecipe::of::<NoopSystem>();

        let first = cache.get(&recipe);
        let second = cache.get(&recipe);
        assert!(Arc::ptr_eq(&first, &second));

        let other = cache.get(&SystemRecipe::of::<OtherSystem>());
        assert!(!Arc::ptr_eq(&first, &other));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_recipe_name_is_short() {
        assert_eq!(SystemRecipe::of::<NoopSystem>().name(), "NoopSystem");
    }

    #[test]
    fn test_context_data_downcast() {
        let ctx = context(ComponentFilter::new(), false, Payload::new(3.5f64));
        assert_eq!(ctx.data::<f64>(), Some(&3.5));
        assert!(ctx.data::<u32>().is_none());
    }

    #[test]
    fn test_filter_mixes_in_the_external_extension() {
        let registry = Arc::new(RwLock::new(EntityRegistry::new()));
        {
            let mut registry = registry.write();
            let fast = registry.spawn("fast");
            fast.write().add_component(Position).unwrap();
            fast.write().add_component(Velocity).unwrap();
            let still = registry.spawn("still");
            still.write().add_component(Position).unwrap();
        }

        let ctx = SystemContext::new(
            Uuid::new_v4(),
            registry,
            ServiceContainer::shared(),
            ComponentFilter::new().include::<Velocity>(),
            false,
            Payload::none(),
        );

        // The extension narrows the system's own filter.
        let mixed = ctx.filter(ComponentFilter::new().include::<Position>());
        assert_eq!(mixed.count(), 1);

        // A clean filter ignores it.
        let clean = ctx.clean_filter(ComponentFilter::new().include::<Position>());
        assert_eq!(clean.count(), 2);
    }

    #[test]
    fn test_dependency_resolves_with_global_fallback() {
        use pulse_service::Provider;

        #[derive(Default)]
        struct Config {
            limit: usize,
        }

        let services = ServiceContainer::shared();
        services.register_global(vec![Provider::factory_of(|| Config { limit: 9 })]);

        let ctx = SystemContext::new(
            Uuid::new_v4(),
            Arc::new(RwLock::new(EntityRegistry::new())),
            services,
            ComponentFilter::new(),
            false,
            Payload::none(),
        );

        let handle = ctx.dependency(Token::of::<Config>()).unwrap();
        assert_eq!(handle.read(|c: &Config| c.limit).unwrap(), 9);
    }
}
