//! The per-dispatch run-queue drainer.
//!
//! One executor is created per signal dispatch. It flattens the accepted
//! bindings' group plans into a single queue and drains it sequentially:
//! one system invocation is awaited to completion before the next entry is
//! dequeued. Pause freezes the queue between entries; stop clears it (an
//! in-flight invocation is not interrupted). A system failure aborts the
//! whole run with the remaining entries unrun.

use std::collections::VecDeque;
use std::sync::Arc;

use anyhow::Result;
use parking_lot::{Mutex, RwLock};
use pulse_ecs::{ComponentFilter, EntityRegistry};
use pulse_service::{ScopeId, ServiceContainer};
use tokio::sync::watch;
use tracing::{debug, trace};
use uuid::Uuid;

use crate::controller::ExecutionItem;
use crate::group::{GroupHandle, SystemGate};
use crate::payload::Payload;
use crate::system::{SharedSystem, SystemCache, SystemContext};

/// One flattened queue entry: a resolved system plus its call options.
struct QueuedSystem {
    system: SharedSystem,
    type_id: std::any::TypeId,
    name: &'static str,
    data: Payload,
    group_id: Uuid,
    filter: ComponentFilter,
    with_disabled: bool,
    can_execute: SystemGate,
}

/// Drains one dispatch's flattened system queue.
pub struct Executor {
    systems: Arc<SystemCache>,
    entities: Arc<RwLock<EntityRegistry>>,
    services: Arc<ServiceContainer>,
    queue: Mutex<VecDeque<QueuedSystem>>,
    groups: Mutex<Vec<Arc<GroupHandle>>>,
    current_group: Mutex<Option<Uuid>>,
    paused: watch::Sender<bool>,
}

impl Executor {
    /// Create an idle executor over the shared engine state.
    #[must_use]
    pub fn new(
        systems: Arc<SystemCache>,
        entities: Arc<RwLock<EntityRegistry>>,
        services: Arc<ServiceContainer>,
    ) -> Self {
        let (paused, _) = watch::channel(false);
        Self {
            systems,
            entities,
            services,
            queue: Mutex::new(VecDeque::new()),
            groups: Mutex::new(Vec::new()),
            current_group: Mutex::new(None),
            paused,
        }
    }

    /// The groups accepted into the current run, for introspection.
    #[must_use]
    pub fn groups(&self) -> Vec<Arc<GroupHandle>> {
        self.groups.lock().clone()
    }

    /// The group the most recently dequeued entry belongs to.
    #[must_use]
    pub fn current_group(&self) -> Option<Uuid> {
        *self.current_group.lock()
    }

    /// Whether the drain loop is currently frozen.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        *self.paused.borrow()
    }

    /// Build the queue for a dispatch and drain it to completion.
    ///
    /// Bindings whose gate rejects the payload contribute nothing. Entries
    /// interleave strictly by binding order; only within one group's plan
    /// does `order` determine sequence, and each plan entry contributes one
    /// queue entry per repeat.
    ///
    /// # Errors
    ///
    /// A failure from a system's entry point aborts the run; remaining
    /// queued entries do not execute.
    pub async fn execute(&self, payload: &Payload, executions: &[ExecutionItem]) -> Result<()> {
        self.build_queue(payload, executions);

        // Queue emptiness is the loop condition and the pause wait sits
        // inside it, so a stopped executor settles without a resume.
        while !self.queue.lock().is_empty() {
            self.wait_while_paused().await;

            let Some(item) = self.queue.lock().pop_front() else {
                break;
            };

            {
                let mut current = self.current_group.lock();
                if *current != Some(item.group_id) {
                    *current = Some(item.group_id);
                }
            }

            if !(item.can_execute)() {
                trace!(system = item.name, "gate rejected, skipping");
                continue;
            }

            let ctx = SystemContext::new(
                item.group_id,
                Arc::clone(&self.entities),
                Arc::clone(&self.services),
                item.filter,
                item.with_disabled,
                item.data,
            );

            let mut system = item.system.lock().await;

            let mut memberships = vec![item.type_id];
            memberships.extend(system.injection_memberships());
            for (field, handle) in self
                .services
                .injections_for(ScopeId::Group(item.group_id), &memberships)
            {
                system.assign_dependency(field, handle);
            }

            trace!(system = item.name, group = %item.group_id, "executing");
            system.execute(&ctx).await?;
        }

        Ok(())
    }

    /// Freeze the drain loop before the next dequeue. Idempotent.
    pub fn pause(&self) {
        self.paused.send_replace(true);
    }

    /// Unfreeze the drain loop. Idempotent; wakes the current wait only.
    pub fn resume(&self) {
        self.paused.send_replace(false);
    }

    /// Clear the queue. The in-flight invocation, if any, is not
    /// interrupted, but no further entries run.
    pub fn stop(&self) {
        let dropped = {
            let mut queue = self.queue.lock();
            let dropped = queue.len();
            queue.clear();
            dropped
        };
        if dropped > 0 {
            debug!(dropped, "executor stopped with entries remaining");
        }
    }

    /// The number of entries still queued.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.queue.lock().len()
    }

    async fn wait_while_paused(&self) {
        let mut rx = self.paused.subscribe();
        while *rx.borrow_and_update() {
            if rx.changed().await.is_err() {
                break;
            }
        }
    }

    fn build_queue(&self, payload: &Payload, executions: &[ExecutionItem]) {
        let mut queue = self.queue.lock();
        let mut groups = self.groups.lock();

        for execution in executions {
            if !execution.accepts(payload) {
                continue;
            }

            let group = execution.group();
            let group_id = group.uuid();
            groups.push(Arc::clone(group));

            for option in group.sorted(payload) {
                let system = self.systems.get(&option.recipe);
                let filter = ComponentFilter {
                    includes: option.includes.clone(),
                    excludes: option.excludes.clone(),
                };
                for _ in 0..option.repeat {
                    queue.push_back(QueuedSystem {
                        system: Arc::clone(&system),
                        type_id: option.recipe.type_id(),
                        name: option.recipe.name(),
                        data: option.data.clone(),
                        group_id,
                        filter: filter.clone(),
                        with_disabled: option.with_disabled,
                        can_execute: Arc::clone(&option.can_execute),
                    });
                }
            }
        }
    }
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("queued", &self.queued())
            .field("paused", &self.is_paused())
            .finish()
    }
}
