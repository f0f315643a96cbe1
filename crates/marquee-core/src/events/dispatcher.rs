//! Per-entity publish/subscribe registry
//!
//! Each addressable entity owns one dispatcher. Besides its own
//! subscriptions a dispatcher keeps a ledger of the subscriptions its entity
//! created on *other* dispatchers through `listen_to`, so a single
//! `stop_listening()` removes all of them without touching what other
//! entities registered.

use super::EventInfo;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::{Rc, Weak};
use tracing::{debug, error, trace};
use uuid::Uuid;

/// Handle returned by every subscription call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenId(Uuid);

impl ListenId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for ListenId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

type Callback = Rc<dyn Fn(&EventInfo)>;

struct Subscription {
    id: ListenId,
    callback: Callback,
    once: bool,
}

struct LedgerEntry {
    source: Weak<Inner>,
    id: ListenId,
}

struct Inner {
    /// Log scope, usually the entity or plugin name
    scope: RefCell<String>,
    handlers: RefCell<HashMap<String, Vec<Subscription>>>,
    /// Listen id -> event name, for O(1) lookup on `off`
    index: RefCell<HashMap<ListenId, String>>,
    ledger: RefCell<Vec<LedgerEntry>>,
    destroyed: Cell<bool>,
}

impl Inner {
    fn subscribe(&self, event: &str, callback: Callback, once: bool) -> ListenId {
        let id = ListenId::new();
        if self.destroyed.get() {
            trace!(scope = %self.scope.borrow(), event, "subscribe on destroyed dispatcher ignored");
            return id;
        }

        self.handlers
            .borrow_mut()
            .entry(event.to_string())
            .or_default()
            .push(Subscription { id, callback, once });
        self.index.borrow_mut().insert(id, event.to_string());
        id
    }

    /// Remove one subscription, returning whether it was still registered
    fn remove(&self, id: ListenId) -> bool {
        let Some(event) = self.index.borrow_mut().remove(&id) else {
            trace!(scope = %self.scope.borrow(), listen_id = %id, "no subscription to remove");
            return false;
        };

        // Dropped only after the borrow ends, a callback may own entities
        // whose teardown comes back here
        let removed = {
            let mut handlers = self.handlers.borrow_mut();
            let mut removed = None;
            if let Some(subscriptions) = handlers.get_mut(&event) {
                if let Some(position) = subscriptions.iter().position(|s| s.id == id) {
                    removed = Some(subscriptions.remove(position));
                }
                if subscriptions.is_empty() {
                    handlers.remove(&event);
                }
            }
            removed
        };
        removed.is_some()
    }

    fn is_registered(&self, id: ListenId) -> bool {
        self.index.borrow().contains_key(&id)
    }
}

/// Publish/subscribe registry owned by a single entity
pub struct EventDispatcher {
    inner: Rc<Inner>,
}

impl EventDispatcher {
    /// Create a dispatcher logging under `scope`
    pub fn new(scope: impl Into<String>) -> Self {
        Self {
            inner: Rc::new(Inner {
                scope: RefCell::new(scope.into()),
                handlers: RefCell::new(HashMap::new()),
                index: RefCell::new(HashMap::new()),
                ledger: RefCell::new(Vec::new()),
                destroyed: Cell::new(false),
            }),
        }
    }

    pub fn scope(&self) -> String {
        self.inner.scope.borrow().clone()
    }

    pub fn set_scope(&self, scope: impl Into<String>) {
        *self.inner.scope.borrow_mut() = scope.into();
    }

    /// Register a durable listener
    pub fn on<F>(&self, event: impl AsRef<str>, callback: F) -> ListenId
    where
        F: Fn(&EventInfo) + 'static,
    {
        self.inner.subscribe(event.as_ref(), Rc::new(callback), false)
    }

    /// Register a listener removed right before its first invocation
    pub fn once<F>(&self, event: impl AsRef<str>, callback: F) -> ListenId
    where
        F: Fn(&EventInfo) + 'static,
    {
        self.inner.subscribe(event.as_ref(), Rc::new(callback), true)
    }

    /// Remove a subscription registered on this dispatcher. Unknown ids are ignored.
    pub fn off(&self, id: ListenId) {
        self.inner.remove(id);
    }

    pub fn trigger(&self, event: impl AsRef<str>) {
        self.trigger_with(event, EventInfo::default());
    }

    /// Synchronously deliver `event` to every listener registered at call time.
    ///
    /// Delivery iterates a snapshot, so listeners added or removed by a
    /// callback only affect later triggers. The exception is `once`
    /// listeners, which are skipped if something already removed them, and
    /// `destroy()`, which stops delivery of whatever is left.
    pub fn trigger_with(&self, event: impl AsRef<str>, info: EventInfo) {
        let event = event.as_ref();
        if self.inner.destroyed.get() {
            trace!(scope = %self.inner.scope.borrow(), event, "trigger on destroyed dispatcher ignored");
            return;
        }

        let snapshot: Vec<(ListenId, Callback, bool)> = self
            .inner
            .handlers
            .borrow()
            .get(event)
            .map(|subscriptions| {
                subscriptions
                    .iter()
                    .map(|s| (s.id, Rc::clone(&s.callback), s.once))
                    .collect()
            })
            .unwrap_or_default();

        debug!(
            scope = %self.inner.scope.borrow(),
            event,
            listeners = snapshot.len(),
            "triggered"
        );

        for (id, callback, once) in snapshot {
            if self.inner.destroyed.get() {
                debug!(scope = %self.inner.scope.borrow(), event, "destroyed during dispatch");
                break;
            }
            if once && !self.inner.remove(id) {
                continue;
            }
            if catch_unwind(AssertUnwindSafe(|| callback(&info))).is_err() {
                error!(
                    scope = %self.inner.scope.borrow(),
                    event,
                    listen_id = %id,
                    "a plugin crashed during invocation of an event"
                );
            }
        }
    }

    /// Subscribe on `source` and record the id in this dispatcher's ledger
    pub fn listen_to<F>(&self, source: &EventDispatcher, event: impl AsRef<str>, callback: F) -> ListenId
    where
        F: Fn(&EventInfo) + 'static,
    {
        self.record(source, event.as_ref(), Rc::new(callback), false)
    }

    pub fn listen_to_once<F>(
        &self,
        source: &EventDispatcher,
        event: impl AsRef<str>,
        callback: F,
    ) -> ListenId
    where
        F: Fn(&EventInfo) + 'static,
    {
        self.record(source, event.as_ref(), Rc::new(callback), true)
    }

    fn record(&self, source: &EventDispatcher, event: &str, callback: Callback, once: bool) -> ListenId {
        if self.inner.destroyed.get() {
            trace!(scope = %self.inner.scope.borrow(), event, "listen_to from destroyed dispatcher ignored");
            return ListenId::new();
        }

        let id = source.inner.subscribe(event, callback, once);
        if !source.inner.is_registered(id) {
            return id;
        }

        let mut ledger = self.inner.ledger.borrow_mut();
        // Fired `once` entries and dropped sources have nothing left to remove
        ledger.retain(|entry| {
            entry
                .source
                .upgrade()
                .is_some_and(|source| source.is_registered(entry.id))
        });
        ledger.push(LedgerEntry {
            source: Rc::downgrade(&source.inner),
            id,
        });
        id
    }

    /// Remove every subscription this entity created on other entities
    pub fn stop_listening(&self) {
        let entries = std::mem::take(&mut *self.inner.ledger.borrow_mut());
        if !entries.is_empty() {
            debug!(scope = %self.inner.scope.borrow(), count = entries.len(), "stop listening");
        }
        for entry in entries {
            if let Some(source) = entry.source.upgrade() {
                source.remove(entry.id);
            }
        }
    }

    /// Remove a single ledger entry and its subscription
    pub fn stop_listening_to(&self, id: ListenId) {
        let entry = {
            let mut ledger = self.inner.ledger.borrow_mut();
            ledger
                .iter()
                .position(|entry| entry.id == id)
                .map(|position| ledger.remove(position))
        };

        if let Some(source) = entry.and_then(|entry| entry.source.upgrade()) {
            source.remove(id);
        }
    }

    /// Drop all subscriptions and the ledger; every later call is a no-op
    pub fn destroy(&self) {
        if self.inner.destroyed.replace(true) {
            return;
        }
        self.stop_listening();
        self.inner.index.borrow_mut().clear();
        let handlers = std::mem::take(&mut *self.inner.handlers.borrow_mut());
        drop(handlers);
        debug!(scope = %self.inner.scope.borrow(), "dispatcher destroyed");
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.get()
    }

    /// Number of listeners currently registered for `event`
    pub fn listener_count(&self, event: impl AsRef<str>) -> usize {
        self.inner
            .handlers
            .borrow()
            .get(event.as_ref())
            .map_or(0, Vec::len)
    }

    /// Number of live subscriptions this entity holds on other entities
    pub fn ledger_len(&self) -> usize {
        self.inner
            .ledger
            .borrow()
            .iter()
            .filter(|entry| {
                entry
                    .source
                    .upgrade()
                    .is_some_and(|source| source.is_registered(entry.id))
            })
            .count()
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("scope", &*self.inner.scope.borrow())
            .field("subscriptions", &self.inner.index.borrow().len())
            .field("ledger", &self.inner.ledger.borrow().len())
            .field("destroyed", &self.inner.destroyed.get())
            .finish()
    }
}

impl Drop for EventDispatcher {
    fn drop(&mut self) {
        self.stop_listening();
    }
}
