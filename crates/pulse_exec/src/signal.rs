//! Publish/subscribe signals.
//!
//! A [`Signal`] is the channel through which the rest of the application
//! talks to the engine: bindings attach groups to a signal, an external
//! driver dispatches it with a payload, and every current listener is awaited
//! in subscription order. Cloning a signal clones a handle to the same
//! channel; identity is the signal's uuid.

use std::sync::{Arc, Weak};

use futures::future::BoxFuture;
use parking_lot::Mutex;
use tracing::trace;
use uuid::Uuid;

use crate::payload::Payload;

type ListenerFn = Arc<dyn Fn(Payload) -> BoxFuture<'static, ()> + Send + Sync>;

struct Listener {
    id: Uuid,
    callback: ListenerFn,
    once: bool,
}

struct SignalInner {
    uuid: Uuid,
    name: String,
    listeners: Mutex<Vec<Listener>>,
}

/// A named publish/subscribe channel carrying a [`Payload`].
///
/// # Examples
///
/// ```rust
/// use pulse_exec::{Payload, Signal};
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let on_tick = Signal::new("on_tick");
/// let _sub = on_tick.subscribe_fn(|payload| {
///     let delta = payload.downcast_ref::<f64>().copied().unwrap_or_default();
///     assert!(delta >= 0.0);
/// });
/// on_tick.dispatch(Payload::new(0.016f64)).await;
/// # });
/// ```
#[derive(Clone)]
pub struct Signal {
    inner: Arc<SignalInner>,
}

impl Signal {
    /// Create a named signal.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(SignalInner {
                uuid: Uuid::new_v4(),
                name: name.into(),
                listeners: Mutex::new(Vec::new()),
            }),
        }
    }

    /// The signal's identity.
    #[must_use]
    pub fn uuid(&self) -> Uuid {
        self.inner.uuid
    }

    /// The signal's display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Whether two handles refer to the same channel.
    #[must_use]
    pub fn same_signal(&self, other: &Signal) -> bool {
        self.inner.uuid == other.inner.uuid
    }

    /// Attach an async listener; it runs on every dispatch until disposed.
    pub fn subscribe<F>(&self, callback: F) -> Disposable
    where
        F: Fn(Payload) -> BoxFuture<'static, ()> + Send + Sync + 'static,
    {
        self.attach(Arc::new(callback), false)
    }

    /// Attach a synchronous listener; it runs on every dispatch until
    /// disposed.
    pub fn subscribe_fn<F>(&self, callback: F) -> Disposable
    where
        F: Fn(Payload) + Send + Sync + 'static,
    {
        let callback = Arc::new(callback);
        self.attach(
            Arc::new(move |payload| {
                let callback = Arc::clone(&callback);
                Box::pin(async move { callback(payload) })
            }),
            false,
        )
    }

    /// Attach an async listener that is removed after its first invocation.
    pub fn once<F>(&self, callback: F) -> Disposable
    where
        F: Fn(Payload) -> BoxFuture<'static, ()> + Send + Sync + 'static,
    {
        self.attach(Arc::new(callback), true)
    }

    /// Detach a listener by its subscription id. Unknown ids are ignored.
    pub fn unsubscribe(&self, id: Uuid) {
        self.inner.listeners.lock().retain(|l| l.id != id);
    }

    /// Publish a payload: every current listener is awaited in subscription
    /// order, then once-listeners that ran are removed.
    pub async fn dispatch(&self, payload: Payload) {
        trace!(signal = self.inner.name, "dispatch");

        // Snapshot under the lock so listeners may (un)subscribe mid-dispatch
        // without affecting this round.
        let snapshot: Vec<(Uuid, ListenerFn, bool)> = self
            .inner
            .listeners
            .lock()
            .iter()
            .map(|l| (l.id, Arc::clone(&l.callback), l.once))
            .collect();

        let mut spent = Vec::new();
        for (id, callback, once) in snapshot {
            callback(payload.clone()).await;
            if once {
                spent.push(id);
            }
        }

        if !spent.is_empty() {
            self.inner
                .listeners
                .lock()
                .retain(|l| !spent.contains(&l.id));
        }
    }

    /// The number of attached listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.lock().len()
    }

    fn attach(&self, callback: ListenerFn, once: bool) -> Disposable {
        let id = Uuid::new_v4();
        self.inner.listeners.lock().push(Listener { id, callback, once });
        Disposable {
            signal: Arc::downgrade(&self.inner),
            id,
        }
    }
}

impl std::fmt::Debug for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("uuid", &self.inner.uuid)
            .field("name", &self.inner.name)
            .finish()
    }
}

/// A handle detaching one subscription.
///
/// Disposal is idempotent, and holds only a weak reference: dropping the
/// signal first is fine.
#[derive(Debug)]
pub struct Disposable {
    signal: Weak<SignalInner>,
    id: Uuid,
}

impl Disposable {
    /// Detach the subscription.
    pub fn dispose(&self) {
        if let Some(inner) = self.signal.upgrade() {
            inner.listeners.lock().retain(|l| l.id != self.id);
        }
    }
}

impl std::fmt::Debug for SignalInner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalInner")
            .field("uuid", &self.uuid)
            .field("name", &self.name)
            .finish()
    }
}
