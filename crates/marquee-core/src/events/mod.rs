//! Hierarchical publish/subscribe event bus

mod dispatcher;
mod event;

pub use dispatcher::{EventDispatcher, ListenId};
pub use event::Event;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::rc::Rc;

/// Optional payload delivered with an event.
///
/// Absent keys mean "no such data"; accessors return `None` instead of failing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventInfo(Map<String, Value>);

impl EventInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn f64(&self, key: &str) -> Option<f64> {
        self.0.get(key).and_then(Value::as_f64)
    }

    pub fn bool(&self, key: &str) -> Option<bool> {
        self.0.get(key).and_then(Value::as_bool)
    }

    pub fn str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Event capability shared by every addressable entity.
///
/// Implementors only expose their dispatcher; subscription bookkeeping,
/// including the cross-entity ledger behind `listen_to`/`stop_listening`,
/// comes from the provided methods.
pub trait EventProtocol {
    fn events(&self) -> &EventDispatcher;

    fn on<F>(&self, event: impl AsRef<str>, callback: F) -> ListenId
    where
        Self: Sized,
        F: Fn(&EventInfo) + 'static,
    {
        self.events().on(event, callback)
    }

    fn once<F>(&self, event: impl AsRef<str>, callback: F) -> ListenId
    where
        Self: Sized,
        F: Fn(&EventInfo) + 'static,
    {
        self.events().once(event, callback)
    }

    fn off(&self, id: ListenId) {
        self.events().off(id);
    }

    fn trigger(&self, event: impl AsRef<str>)
    where
        Self: Sized,
    {
        self.events().trigger(event);
    }

    fn trigger_with(&self, event: impl AsRef<str>, info: EventInfo)
    where
        Self: Sized,
    {
        self.events().trigger_with(event, info);
    }

    fn listen_to<S, F>(&self, source: &S, event: impl AsRef<str>, callback: F) -> ListenId
    where
        Self: Sized,
        S: EventProtocol + ?Sized,
        F: Fn(&EventInfo) + 'static,
    {
        self.events().listen_to(source.events(), event, callback)
    }

    fn listen_to_once<S, F>(&self, source: &S, event: impl AsRef<str>, callback: F) -> ListenId
    where
        Self: Sized,
        S: EventProtocol + ?Sized,
        F: Fn(&EventInfo) + 'static,
    {
        self.events().listen_to_once(source.events(), event, callback)
    }

    fn stop_listening(&self) {
        self.events().stop_listening();
    }

    fn stop_listening_to(&self, id: ListenId) {
        self.events().stop_listening_to(id);
    }
}

impl<T: EventProtocol + ?Sized> EventProtocol for Rc<T> {
    fn events(&self) -> &EventDispatcher {
        (**self).events()
    }
}
