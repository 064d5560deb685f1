//! Signal-to-group bindings and their lifecycle.
//!
//! The [`SignalController`] owns the signal → ordered-execution-item table.
//! Binding a group to a signal instantiates the group immediately and
//! registers its dependency providers; subscribing attaches a listener per
//! bound signal that spins up a fresh [`Executor`] for every dispatch.
//! Pause, resume, and stop broadcast to the currently live executors —
//! concurrent dispatches have independent queues and independent pause
//! state.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use pulse_ecs::EntityRegistry;
use pulse_service::ServiceContainer;
use tracing::{debug, error};
use uuid::Uuid;

use crate::executor::Executor;
use crate::group::{GroupHandle, ORDER_STEP, SystemGroup};
use crate::payload::Payload;
use crate::signal::{Disposable, Signal};
use crate::system::SystemCache;

/// A binding-level gate, deciding per dispatch payload whether the bound
/// group participates.
pub type ExecutionGate = Arc<dyn Fn(&Payload) -> bool + Send + Sync>;

type GroupFactory = Arc<dyn Fn() -> Box<dyn SystemGroup> + Send + Sync>;

/// One bound group within a signal's execution list.
#[derive(Clone)]
pub struct ExecutionItem {
    group: Arc<GroupHandle>,
    gate: ExecutionGate,
    /// The declared order; `None` takes a positional slot on every
    /// re-normalization, so it may shift as items are appended.
    order: Option<i64>,
    effective_order: i64,
}

impl ExecutionItem {
    /// An item whose gate accepts every payload.
    #[must_use]
    pub fn always(group: Arc<GroupHandle>) -> Self {
        Self::gated(group, Arc::new(|_| true))
    }

    /// An item gated on the dispatch payload.
    #[must_use]
    pub fn gated(group: Arc<GroupHandle>, gate: ExecutionGate) -> Self {
        Self {
            group,
            gate,
            order: None,
            effective_order: 0,
        }
    }

    /// The bound group.
    #[must_use]
    pub fn group(&self) -> &Arc<GroupHandle> {
        &self.group
    }

    /// Whether the gate accepts this dispatch.
    #[must_use]
    pub fn accepts(&self, payload: &Payload) -> bool {
        (self.gate)(payload)
    }

    /// The effective order after the last normalization pass.
    #[must_use]
    pub fn effective_order(&self) -> i64 {
        self.effective_order
    }
}

impl std::fmt::Debug for ExecutionItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionItem")
            .field("group", &self.group.uuid())
            .field("order", &self.order)
            .field("effective_order", &self.effective_order)
            .finish()
    }
}

/// A declarative binding of one group to a signal.
#[derive(Clone)]
pub struct BindingConfig {
    group: GroupFactory,
    can_execute: Option<ExecutionGate>,
    order: Option<i64>,
}

impl BindingConfig {
    /// Bind a default-constructible group type.
    #[must_use]
    pub fn of<G: SystemGroup + Default + 'static>() -> Self {
        Self {
            group: Arc::new(|| Box::new(G::default())),
            can_execute: None,
            order: None,
        }
    }

    /// Gate the whole group on the dispatch payload.
    #[must_use]
    pub fn can_execute(mut self, gate: impl Fn(&Payload) -> bool + Send + Sync + 'static) -> Self {
        self.can_execute = Some(Arc::new(gate));
        self
    }

    /// Pin the binding to an explicit order instead of a positional slot.
    #[must_use]
    pub fn order(mut self, order: i64) -> Self {
        self.order = Some(order);
        self
    }
}

impl std::fmt::Debug for BindingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindingConfig")
            .field("order", &self.order)
            .field("gated", &self.can_execute.is_some())
            .finish()
    }
}

/// A signal with its declared group bindings, the unit [`bind`] and
/// [`override_bindings`] operate on.
///
/// [`bind`]: SignalController::bind
/// [`override_bindings`]: SignalController::override_bindings
#[derive(Clone, Debug)]
pub struct SignalBinding {
    /// The bound signal.
    pub signal: Signal,
    /// The groups to run on dispatch, in binding order.
    pub executions: Vec<BindingConfig>,
}

struct ControllerInner {
    systems: Arc<SystemCache>,
    entities: Arc<RwLock<EntityRegistry>>,
    services: Arc<ServiceContainer>,
    bindings: Mutex<Vec<(Signal, Vec<ExecutionItem>)>>,
    subscriptions: Mutex<Vec<Disposable>>,
    executors: Mutex<Vec<Arc<Executor>>>,
}

impl ControllerInner {
    async fn run_dispatch(self: Arc<Self>, signal_uuid: Uuid, payload: Payload) {
        let items: Vec<ExecutionItem> = self
            .bindings
            .lock()
            .iter()
            .find(|(signal, _)| signal.uuid() == signal_uuid)
            .map(|(_, items)| items.clone())
            .unwrap_or_default();

        let executor = Arc::new(Executor::new(
            Arc::clone(&self.systems),
            Arc::clone(&self.entities),
            Arc::clone(&self.services),
        ));
        self.executors.lock().push(Arc::clone(&executor));

        if let Err(err) = executor.execute(&payload, &items).await {
            error!(error = %err, signal = %signal_uuid, "dispatch aborted by system failure");
        }

        self.executors
            .lock()
            .retain(|live| !Arc::ptr_eq(live, &executor));
    }
}

/// Maintains signal → ordered-execution-plan bindings and drives their
/// subscription lifecycle.
pub struct SignalController {
    inner: Arc<ControllerInner>,
}

impl SignalController {
    /// Create a controller over the shared engine state.
    #[must_use]
    pub fn new(entities: Arc<RwLock<EntityRegistry>>, services: Arc<ServiceContainer>) -> Self {
        Self {
            inner: Arc::new(ControllerInner {
                systems: Arc::new(SystemCache::new()),
                entities,
                services,
                bindings: Mutex::new(Vec::new()),
                subscriptions: Mutex::new(Vec::new()),
                executors: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Bind a group to a signal.
    ///
    /// The group is instantiated now and its dependency providers registered
    /// under its private scope. The signal's whole item list is then
    /// re-normalized: items without a declared order take the positional
    /// slot `(index + 1) * 10_000` for their current position — so they may
    /// shift as further items are appended — and the list is stable-sorted
    /// by effective order.
    pub fn inject(&self, signal: &Signal, config: BindingConfig) {
        let group = Arc::new(GroupHandle::new((config.group)()));
        group.register_dependencies(&self.inner.services);

        let item = ExecutionItem {
            group,
            gate: config
                .can_execute
                .unwrap_or_else(|| Arc::new(|_| true)),
            order: config.order,
            effective_order: 0,
        };

        let mut bindings = self.inner.bindings.lock();
        let index = match bindings
            .iter()
            .position(|(bound, _)| bound.same_signal(signal))
        {
            Some(index) => index,
            None => {
                bindings.push((signal.clone(), Vec::new()));
                bindings.len() - 1
            }
        };
        let items = &mut bindings[index].1;

        items.push(item);
        for (index, item) in items.iter_mut().enumerate() {
            item.effective_order = item
                .order
                .unwrap_or((index as i64 + 1) * ORDER_STEP);
        }
        items.sort_by_key(|item| item.effective_order);

        debug!(signal = signal.name(), items = items.len(), "binding injected");
    }

    /// Apply a whole binding configuration, group by group.
    pub fn bind(&self, configs: Vec<SignalBinding>) {
        for config in configs {
            for execution in config.executions {
                self.inject(&config.signal, execution);
            }
        }
    }

    /// Merge an overriding binding set onto an original one.
    ///
    /// Signals present only in `overrides` are appended verbatim. For a
    /// shared signal, the original items are laid into an order-keyed map
    /// (an unset order takes `map size + 1` at insertion); an override item
    /// whose explicit order matches an existing key replaces that entry in
    /// place, any other lands under its own order or the next `size + 1`
    /// slot. A fallback slot that happens to equal an existing explicit
    /// order displaces that entry — accepted behavior, not defended against.
    #[must_use]
    pub fn override_bindings(
        original: &[SignalBinding],
        overrides: &[SignalBinding],
    ) -> Vec<SignalBinding> {
        let mut merged: Vec<SignalBinding> = original.to_vec();

        for override_binding in overrides {
            let Some(existing) = merged
                .iter_mut()
                .find(|binding| binding.signal.same_signal(&override_binding.signal))
            else {
                merged.push(override_binding.clone());
                continue;
            };

            // Insertion-ordered map from order to config; `set` replaces.
            let mut by_order: Vec<(i64, BindingConfig)> = Vec::new();
            let set = |map: &mut Vec<(i64, BindingConfig)>, key: i64, mut config: BindingConfig| {
                config.order = Some(key);
                if let Some(slot) = map.iter_mut().find(|(k, _)| *k == key) {
                    slot.1 = config;
                } else {
                    map.push((key, config));
                }
            };

            for config in &existing.executions {
                let key = config.order.unwrap_or(by_order.len() as i64 + 1);
                set(&mut by_order, key, config.clone());
            }

            for config in &override_binding.executions {
                let key = config.order.unwrap_or(by_order.len() as i64 + 1);
                set(&mut by_order, key, config.clone());
            }

            by_order.sort_by_key(|(key, _)| *key);
            existing.executions = by_order.into_iter().map(|(_, config)| config).collect();
        }

        merged
    }

    /// Attach a listener to every bound signal.
    ///
    /// Each dispatch runs a fresh executor over the signal's current item
    /// list; a system failure is logged and the dispatch ends there.
    pub fn subscribe(&self) {
        let signals: Vec<Signal> = self
            .inner
            .bindings
            .lock()
            .iter()
            .map(|(signal, _)| signal.clone())
            .collect();

        let mut subscriptions = self.inner.subscriptions.lock();
        for signal in signals {
            let inner = Arc::clone(&self.inner);
            let signal_uuid = signal.uuid();
            let disposable = signal.subscribe(move |payload| {
                let inner = Arc::clone(&inner);
                Box::pin(inner.run_dispatch(signal_uuid, payload))
            });
            subscriptions.push(disposable);
        }
    }

    /// Detach every listener, clear all bindings, and stop live executors.
    pub fn unsubscribe(&self) {
        for subscription in self.inner.subscriptions.lock().drain(..) {
            subscription.dispose();
        }
        self.inner.bindings.lock().clear();
        self.stop();
        self.inner.executors.lock().clear();
    }

    /// Publish a payload through a signal.
    pub async fn dispatch(&self, signal: &Signal, payload: Payload) {
        signal.dispatch(payload).await;
    }

    /// Stop every live executor, clearing their queues.
    pub fn stop(&self) {
        for executor in self.inner.executors.lock().iter() {
            executor.stop();
        }
    }

    /// Pause every live executor.
    pub fn pause(&self) {
        for executor in self.inner.executors.lock().iter() {
            executor.pause();
        }
    }

    /// Resume every live executor.
    pub fn resume(&self) {
        for executor in self.inner.executors.lock().iter() {
            executor.resume();
        }
    }

    /// The effective orders of a signal's current items, in execution order.
    #[must_use]
    pub fn execution_orders(&self, signal: &Signal) -> Vec<i64> {
        self.inner
            .bindings
            .lock()
            .iter()
            .find(|(bound, _)| bound.same_signal(signal))
            .map(|(_, items)| items.iter().map(ExecutionItem::effective_order).collect())
            .unwrap_or_default()
    }

    /// The number of executors currently draining a dispatch.
    #[must_use]
    pub fn live_executors(&self) -> usize {
        self.inner.executors.lock().len()
    }
}

impl std::fmt::Debug for SignalController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalController")
            .field("bindings", &self.inner.bindings.lock().len())
            .field("live_executors", &self.live_executors())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use anyhow::Result;
    use async_trait::async_trait;

    use crate::group::GroupOption;
    use crate::system::{System, SystemContext};

    use super::*;

    static TRACE: Mutex<Vec<&'static str>> = Mutex::new(Vec::new());

    fn take_trace() -> Vec<&'static str> {
        std::mem::take(&mut *TRACE.lock())
    }

    fn serial() -> parking_lot::MutexGuard<'static, ()> {
        static GUARD: Mutex<()> = Mutex::new(());
        GUARD.lock()
    }

    fn controller() -> SignalController {
        // First caller wins; later try_init failures are expected.
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        SignalController::new(
            Arc::new(RwLock::new(EntityRegistry::new())),
            ServiceContainer::shared(),
        )
    }

    #[derive(Default)]
    struct EarlySystem;

    #[async_trait]
    impl System for EarlySystem {
        async fn execute(&mut self, _ctx: &SystemContext) -> Result<()> {
            TRACE.lock().push("early");
            Ok(())
        }
    }

    #[derive(Default)]
    struct LateSystem;

    #[async_trait]
    impl System for LateSystem {
        async fn execute(&mut self, _ctx: &SystemContext) -> Result<()> {
            TRACE.lock().push("late");
            Ok(())
        }
    }

    #[derive(Default)]
    struct OrderedGroup;

    impl SystemGroup for OrderedGroup {
        fn setup(&self, _payload: &Payload) -> Vec<GroupOption> {
            vec![
                GroupOption::of::<LateSystem>().order(5),
                GroupOption::of::<EarlySystem>().order(1),
            ]
        }
    }

    #[derive(Default)]
    struct RepeatGroup;

    impl SystemGroup for RepeatGroup {
        fn setup(&self, _payload: &Payload) -> Vec<GroupOption> {
            vec![
                GroupOption::of::<EarlySystem>().repeat(3),
                GroupOption::of::<LateSystem>(),
            ]
        }
    }

    #[derive(Default)]
    struct EmptyGroup;

    impl SystemGroup for EmptyGroup {
        fn setup(&self, _payload: &Payload) -> Vec<GroupOption> {
            Vec::new()
        }
    }

    #[test]
    fn test_inject_reslots_unordered_items_on_every_append() {
        let ctl = controller();
        let signal = Signal::new("reslot");

        ctl.inject(&signal, BindingConfig::of::<EmptyGroup>());
        assert_eq!(ctl.execution_orders(&signal), vec![10_000]);

        ctl.inject(&signal, BindingConfig::of::<EmptyGroup>().order(5_000));
        assert_eq!(ctl.execution_orders(&signal), vec![5_000, 10_000]);

        // The unordered item now sits at index 1, so its slot shifts.
        ctl.inject(&signal, BindingConfig::of::<EmptyGroup>());
        assert_eq!(ctl.execution_orders(&signal), vec![5_000, 20_000, 30_000]);
    }

    #[test]
    fn test_override_replaces_on_matching_order() {
        let signal = Signal::new("override");
        let original = vec![SignalBinding {
            signal: signal.clone(),
            executions: vec![
                BindingConfig::of::<EmptyGroup>().order(1),
                BindingConfig::of::<EmptyGroup>().order(2).can_execute(|_| true),
            ],
        }];
        let overrides = vec![SignalBinding {
            signal: signal.clone(),
            executions: vec![BindingConfig::of::<OrderedGroup>().order(2)],
        }];

        let merged = SignalController::override_bindings(&original, &overrides);
        assert_eq!(merged.len(), 1);
        let executions = &merged[0].executions;
        assert_eq!(executions.len(), 2);
        assert_eq!(executions[0].order, Some(1));
        assert_eq!(executions[1].order, Some(2));
        // Replaced in place: the original order-2 item's gate is gone.
        assert!(executions[1].can_execute.is_none());
    }

    #[test]
    fn test_override_appends_on_fresh_order() {
        let signal = Signal::new("append");
        let original = vec![SignalBinding {
            signal: signal.clone(),
            executions: vec![BindingConfig::of::<EmptyGroup>().order(10)],
        }];
        let overrides = vec![SignalBinding {
            signal: signal.clone(),
            executions: vec![
                BindingConfig::of::<OrderedGroup>().order(5),
                BindingConfig::of::<RepeatGroup>(),
            ],
        }];

        let merged = SignalController::override_bindings(&original, &overrides);
        let orders: Vec<Option<i64>> = merged[0].executions.iter().map(|c| c.order).collect();
        // The unordered override landed at size + 1 = 3; explicit 5 and the
        // original 10 keep their slots.
        assert_eq!(orders, vec![Some(3), Some(5), Some(10)]);
    }

    #[test]
    fn test_override_unknown_signal_is_appended_verbatim() {
        let known = Signal::new("known");
        let fresh = Signal::new("fresh");

        let original = vec![SignalBinding {
            signal: known,
            executions: vec![BindingConfig::of::<EmptyGroup>()],
        }];
        let overrides = vec![SignalBinding {
            signal: fresh.clone(),
            executions: vec![BindingConfig::of::<OrderedGroup>()],
        }];

        let merged = SignalController::override_bindings(&original, &overrides);
        assert_eq!(merged.len(), 2);
        assert!(merged[1].signal.same_signal(&fresh));
    }

    #[test]
    fn test_override_fallback_slot_can_displace_an_explicit_order() {
        // One original at explicit order 2. The unordered override's
        // fallback slot is size + 1 = 2, which collides with that explicit
        // order and displaces the original item.
        let signal = Signal::new("collision");
        let original = vec![SignalBinding {
            signal: signal.clone(),
            executions: vec![
                BindingConfig::of::<EmptyGroup>()
                    .order(2)
                    .can_execute(|_| true),
            ],
        }];
        let overrides = vec![SignalBinding {
            signal: signal.clone(),
            executions: vec![BindingConfig::of::<RepeatGroup>()],
        }];

        let merged = SignalController::override_bindings(&original, &overrides);
        assert_eq!(merged[0].executions.len(), 1);
        assert_eq!(merged[0].executions[0].order, Some(2));
        // The surviving config is the override: the original's gate is gone.
        assert!(merged[0].executions[0].can_execute.is_none());
    }

    #[tokio::test]
    async fn test_dispatch_runs_systems_in_declared_order() {
        let _serial = serial();
        take_trace();

        let ctl = controller();
        let signal = Signal::new("frame");
        ctl.inject(&signal, BindingConfig::of::<OrderedGroup>());
        ctl.subscribe();

        ctl.dispatch(&signal, Payload::none()).await;
        assert_eq!(take_trace(), vec!["early", "late"]);
    }

    #[tokio::test]
    async fn test_dispatch_repeats_before_advancing() {
        let _serial = serial();
        take_trace();

        let ctl = controller();
        let signal = Signal::new("repeat");
        ctl.inject(&signal, BindingConfig::of::<RepeatGroup>());
        ctl.subscribe();

        ctl.dispatch(&signal, Payload::none()).await;
        assert_eq!(take_trace(), vec!["early", "early", "early", "late"]);
    }

    #[tokio::test]
    async fn test_system_failure_is_logged_not_propagated() {
        let _serial = serial();
        take_trace();

        #[derive(Default)]
        struct BrokenSystem;

        #[async_trait]
        impl System for BrokenSystem {
            async fn execute(&mut self, _ctx: &SystemContext) -> Result<()> {
                anyhow::bail!("broken")
            }
        }

        #[derive(Default)]
        struct BrokenGroup;

        impl SystemGroup for BrokenGroup {
            fn setup(&self, _payload: &Payload) -> Vec<GroupOption> {
                vec![
                    GroupOption::of::<BrokenSystem>(),
                    GroupOption::of::<EarlySystem>(),
                ]
            }
        }

        let ctl = controller();
        let signal = Signal::new("broken");
        ctl.inject(&signal, BindingConfig::of::<BrokenGroup>());
        ctl.subscribe();

        // The dispatch completes; the failure aborted the rest of the run.
        ctl.dispatch(&signal, Payload::none()).await;
        assert!(take_trace().is_empty());
        assert_eq!(ctl.live_executors(), 0);
    }

    #[tokio::test]
    async fn test_pause_and_resume_broadcast_to_live_executors() {
        let _serial = serial();
        take_trace();

        static STEPS: AtomicUsize = AtomicUsize::new(0);

        #[derive(Default)]
        struct SlowSystem;

        #[async_trait]
        impl System for SlowSystem {
            async fn execute(&mut self, _ctx: &SystemContext) -> Result<()> {
                STEPS.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                Ok(())
            }
        }

        #[derive(Default)]
        struct SlowGroup;

        impl SystemGroup for SlowGroup {
            fn setup(&self, _payload: &Payload) -> Vec<GroupOption> {
                vec![GroupOption::of::<SlowSystem>().repeat(5)]
            }
        }

        STEPS.store(0, Ordering::SeqCst);

        let ctl = controller();
        let signal = Signal::new("slow");
        ctl.inject(&signal, BindingConfig::of::<SlowGroup>());
        ctl.subscribe();

        let dispatching = {
            let signal = signal.clone();
            tokio::spawn(async move { signal.dispatch(Payload::none()).await })
        };

        // Let the run start, then freeze it.
        tokio::time::sleep(Duration::from_millis(5)).await;
        ctl.pause();
        let frozen_at = STEPS.load(Ordering::SeqCst);
        assert!(frozen_at < 5);

        // Nothing advances while paused.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(STEPS.load(Ordering::SeqCst) <= frozen_at + 1);

        ctl.resume();
        dispatching.await.unwrap();
        assert_eq!(STEPS.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_unsubscribe_detaches_listeners() {
        let _serial = serial();
        take_trace();

        let ctl = controller();
        let signal = Signal::new("detach");
        ctl.inject(&signal, BindingConfig::of::<OrderedGroup>());
        ctl.subscribe();

        ctl.dispatch(&signal, Payload::none()).await;
        assert_eq!(take_trace().len(), 2);

        ctl.unsubscribe();
        ctl.dispatch(&signal, Payload::none()).await;
        assert!(take_trace().is_empty());
        assert_eq!(signal.listener_count(), 0);
    }

    #[tokio::test]
    async fn test_binding_gate_selects_groups_per_payload() {
        let _serial = serial();
        take_trace();

        let ctl = controller();
        let signal = Signal::new("gated");
        ctl.inject(
            &signal,
            BindingConfig::of::<OrderedGroup>()
                .can_execute(|payload| payload.downcast_ref::<u32>().is_some()),
        );
        ctl.subscribe();

        ctl.dispatch(&signal, Payload::none()).await;
        assert!(take_trace().is_empty());

        ctl.dispatch(&signal, Payload::new(1u32)).await;
        assert_eq!(take_trace(), vec!["early", "late"]);
    }
}
