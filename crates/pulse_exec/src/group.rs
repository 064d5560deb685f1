//! System groups and plan ordering.
//!
//! A group declares, via [`SystemGroup::setup`], which systems run when its
//! signal fires and in what order. The declaration is re-evaluated on every
//! dispatch against the dispatch payload, so a plan may legitimately differ
//! call-to-call. [`GroupHandle::sorted`] normalizes the declared options and
//! stable-sorts them into the execution plan.
//!
//! Unset orders take slots of `(index + 1) * 10_000`, leaving room to
//! interleave explicit orders between defaulted neighbours.

use std::sync::Arc;

use pulse_ecs::ComponentTypeId;
use pulse_service::{Provider, ScopeId, ServiceContainer};
use uuid::Uuid;

use crate::payload::Payload;
use crate::system::{System, SystemRecipe};

/// The spacing between defaulted order slots.
pub const ORDER_STEP: i64 = 10_000;

/// A per-item gate, checked fresh when the item is dequeued.
pub type SystemGate = Arc<dyn Fn() -> bool + Send + Sync>;

/// An ordered collection of systems bound to a signal.
///
/// # Examples
///
/// ```rust
/// use pulse_exec::{GroupOption, Payload, SystemGroup};
/// # use async_trait::async_trait;
/// # use pulse_exec::{System, SystemContext};
/// # #[derive(Default)]
/// # struct InputSystem;
/// # #[async_trait]
/// # impl System for InputSystem {
/// #     async fn execute(&mut self, _ctx: &SystemContext) -> anyhow::Result<()> { Ok(()) }
/// # }
/// # #[derive(Default)]
/// # struct MoveSystem;
/// # #[async_trait]
/// # impl System for MoveSystem {
/// #     async fn execute(&mut self, _ctx: &SystemContext) -> anyhow::Result<()> { Ok(()) }
/// # }
///
/// #[derive(Default)]
/// struct FrameGroup;
///
/// impl SystemGroup for FrameGroup {
///     fn setup(&self, payload: &Payload) -> Vec<GroupOption> {
///         vec![
///             GroupOption::of::<InputSystem>(),
///             GroupOption::of::<MoveSystem>().with_data(payload.clone()).repeat(2),
///         ]
///     }
/// }
/// ```
pub trait SystemGroup: Send + Sync {
    /// Declare the group's systems for one dispatch.
    fn setup(&self, payload: &Payload) -> Vec<GroupOption>;

    /// Providers registered into the group's private scope at bind time,
    /// shadowing global registrations for this group only.
    fn dependencies(&self) -> Vec<Provider> {
        Vec::new()
    }
}

/// One declared system with its optional per-call overrides.
#[derive(Clone)]
pub struct GroupOption {
    recipe: SystemRecipe,
    data: Payload,
    with_disabled: Option<bool>,
    includes: Vec<ComponentTypeId>,
    excludes: Vec<ComponentTypeId>,
    repeat: Option<u32>,
    can_execute: Option<SystemGate>,
    order: Option<i64>,
}

impl GroupOption {
    /// Declare a system with no call data.
    #[must_use]
    pub fn of<S: System + Default + 'static>() -> Self {
        Self::from_recipe(SystemRecipe::of::<S>())
    }

    /// Declare a system from an existing recipe.
    #[must_use]
    pub fn from_recipe(recipe: SystemRecipe) -> Self {
        Self {
            recipe,
            data: Payload::none(),
            with_disabled: None,
            includes: Vec::new(),
            excludes: Vec::new(),
            repeat: None,
            can_execute: None,
            order: None,
        }
    }

    /// Static call data handed to the system on every invocation.
    #[must_use]
    pub fn with_data(mut self, data: Payload) -> Self {
        self.data = data;
        self
    }

    /// Include disabled entities in the system's base population.
    #[must_use]
    pub fn with_disabled(mut self, with_disabled: bool) -> Self {
        self.with_disabled = Some(with_disabled);
        self
    }

    /// Extend the system's filter with a required component type.
    #[must_use]
    pub fn include<T: Send + Sync + 'static>(mut self) -> Self {
        self.includes.push(ComponentTypeId::of::<T>());
        self
    }

    /// Extend the system's filter with a forbidden component type.
    #[must_use]
    pub fn exclude<T: Send + Sync + 'static>(mut self) -> Self {
        self.excludes.push(ComponentTypeId::of::<T>());
        self
    }

    /// Run the system this many times back-to-back.
    #[must_use]
    pub fn repeat(mut self, repeat: u32) -> Self {
        self.repeat = Some(repeat);
        self
    }

    /// Gate the invocation; checked fresh each time the item is dequeued.
    #[must_use]
    pub fn can_execute(mut self, gate: impl Fn() -> bool + Send + Sync + 'static) -> Self {
        self.can_execute = Some(Arc::new(gate));
        self
    }

    /// Pin the system to an explicit order instead of a defaulted slot.
    #[must_use]
    pub fn order(mut self, order: i64) -> Self {
        self.order = Some(order);
        self
    }

    fn normalize(self, index: usize) -> SortedOption {
        SortedOption {
            recipe: self.recipe,
            data: self.data,
            with_disabled: self.with_disabled.unwrap_or(false),
            includes: self.includes,
            excludes: self.excludes,
            repeat: self.repeat.unwrap_or(1),
            can_execute: self.can_execute.unwrap_or_else(|| Arc::new(|| true)),
            order: self
                .order
                .unwrap_or((index as i64 + 1) * ORDER_STEP),
        }
    }
}

impl std::fmt::Debug for GroupOption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupOption")
            .field("system", &self.recipe.name())
            .field("order", &self.order)
            .field("repeat", &self.repeat)
            .finish()
    }
}

/// A group option with every optional field defaulted and a guaranteed order.
#[derive(Clone)]
pub struct SortedOption {
    pub(crate) recipe: SystemRecipe,
    pub(crate) data: Payload,
    pub(crate) with_disabled: bool,
    pub(crate) includes: Vec<ComponentTypeId>,
    pub(crate) excludes: Vec<ComponentTypeId>,
    pub(crate) repeat: u32,
    pub(crate) can_execute: SystemGate,
    pub(crate) order: i64,
}

impl SortedOption {
    /// The declared system's recipe.
    #[must_use]
    pub fn recipe(&self) -> &SystemRecipe {
        &self.recipe
    }

    /// The effective execution order within the group.
    #[must_use]
    pub fn order(&self) -> i64 {
        self.order
    }

    /// The repeat count.
    #[must_use]
    pub fn repeat(&self) -> u32 {
        self.repeat
    }
}

/// A bound group instance: its identity plus the user's plan declaration.
///
/// One handle is created per binding injection and lives for the binding's
/// lifetime; its uuid keys the group's private dependency scope.
pub struct GroupHandle {
    uuid: Uuid,
    plan: Box<dyn SystemGroup>,
}

impl GroupHandle {
    /// Wrap a group declaration under a fresh identity.
    #[must_use]
    pub fn new(plan: Box<dyn SystemGroup>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            plan,
        }
    }

    /// The group's identity, also its dependency scope key.
    #[must_use]
    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// Compute the execution plan for one dispatch.
    ///
    /// Re-runs `setup` against the payload, normalizes every option, then
    /// stable-sorts ascending by effective order — equal orders keep their
    /// declaration sequence.
    #[must_use]
    pub fn sorted(&self, payload: &Payload) -> Vec<SortedOption> {
        let mut options: Vec<SortedOption> = self
            .plan
            .setup(payload)
            .into_iter()
            .enumerate()
            .map(|(index, option)| option.normalize(index))
            .collect();
        options.sort_by_key(|option| option.order);
        options
    }

    /// Register the group's provider list into its private scope.
    ///
    /// Called at bind time even when the list is empty, so the scope exists
    /// for later resolution.
    pub fn register_dependencies(&self, services: &ServiceContainer) {
        services.register_module(ScopeId::Group(self.uuid), self.plan.dependencies());
    }
}

impl std::fmt::Debug for GroupHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupHandle").field("uuid", &self.uuid).finish()
    }
}
