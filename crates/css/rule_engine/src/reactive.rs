//! Reactive style sources and their subscriptions.
//!
//! A rule bound to a [`ReactiveStyleSource`] is re-patched whenever the source
//! notifies. Bindings are owned by the engine; a [`Subscription`] detaches its
//! listener when disposed or dropped.

use crate::StyleError;
use core::fmt;
use css_style_attr::{StyleMap, StyleValue};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

/// Callback invoked with the source's snapshot after every change.
pub type ChangeListener = Rc<dyn Fn(&StyleMap)>;

/// A style mapping that can change over time.
pub trait ReactiveStyleSource {
    /// The current mapping.
    fn snapshot(&self) -> StyleMap;

    /// Register `listener` until the returned subscription is disposed.
    fn watch(&self, listener: ChangeListener) -> Subscription;
}

/// Handle to one registered listener.
pub struct Subscription {
    detach: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub fn new(detach: impl FnOnce() + 'static) -> Self {
        Self {
            detach: Some(Box::new(detach)),
        }
    }

    /// Detach the listener. Later calls do nothing.
    pub fn dispose(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }

    pub const fn is_active(&self) -> bool {
        self.detach.is_some()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

#[derive(Default)]
struct LiveInner {
    map: StyleMap,
    listeners: BTreeMap<u64, ChangeListener>,
    next_listener: u64,
}

/// A shared, observable [`StyleMap`].
///
/// Clones share state. Listeners run after the internal borrow is released, so
/// they may read or even mutate the map again.
#[derive(Clone, Default)]
pub struct LiveStyleMap {
    inner: Rc<RefCell<LiveInner>>,
}

impl LiveStyleMap {
    pub fn new(map: StyleMap) -> Self {
        Self {
            inner: Rc::new(RefCell::new(LiveInner {
                map,
                ..LiveInner::default()
            })),
        }
    }

    pub fn get(&self, property: &str) -> Option<StyleValue> {
        self.inner.borrow().map.get(property).cloned()
    }

    /// Set one property and notify.
    pub fn set(&self, property: impl Into<String>, value: impl Into<StyleValue>) {
        self.inner.borrow_mut().map.set(property, value);
        self.notify();
    }

    /// Remove one property, notifying only if it was present.
    pub fn remove(&self, property: &str) -> Option<StyleValue> {
        let removed = self.inner.borrow_mut().map.remove(property);
        if removed.is_some() {
            self.notify();
        }
        removed
    }

    /// Swap in a whole new mapping and notify.
    pub fn replace(&self, map: StyleMap) {
        self.inner.borrow_mut().map = map;
        self.notify();
    }

    /// Apply several edits with a single notification.
    pub fn update(&self, edit: impl FnOnce(&mut StyleMap)) {
        edit(&mut self.inner.borrow_mut().map);
        self.notify();
    }

    pub fn listener_count(&self) -> usize {
        self.inner.borrow().listeners.len()
    }

    fn notify(&self) {
        let (snapshot, listeners) = {
            let inner = self.inner.borrow();
            let listeners: Vec<ChangeListener> = inner.listeners.values().map(Rc::clone).collect();
            (inner.map.clone(), listeners)
        };
        for listener in listeners {
            listener(&snapshot);
        }
    }
}

impl ReactiveStyleSource for LiveStyleMap {
    fn snapshot(&self) -> StyleMap {
        self.inner.borrow().map.clone()
    }

    fn watch(&self, listener: ChangeListener) -> Subscription {
        let key = {
            let mut inner = self.inner.borrow_mut();
            let key = inner.next_listener;
            inner.next_listener = inner.next_listener.wrapping_add(1);
            inner.listeners.insert(key, listener);
            key
        };
        let weak = Rc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.borrow_mut().listeners.remove(&key);
            }
        })
    }
}

impl fmt::Debug for LiveStyleMap {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        formatter
            .debug_struct("LiveStyleMap")
            .field("map", &inner.map)
            .field("listeners", &inner.listeners.len())
            .finish()
    }
}

/// Anything `define` accepts as a style argument.
pub enum StyleInput {
    Map(StyleMap),
    Live(Rc<dyn ReactiveStyleSource>),
    /// Untyped input, validated when the define runs.
    Json(Value),
}

impl StyleInput {
    pub const fn is_reactive(&self) -> bool {
        matches!(self, Self::Live(_))
    }

    /// Validate the input and split it into a snapshot and an optional source.
    ///
    /// # Errors
    /// [`StyleError::InvalidStyleInput`] when JSON input is not an object.
    pub fn resolve(
        self,
    ) -> Result<(StyleMap, Option<Rc<dyn ReactiveStyleSource>>), StyleError> {
        match self {
            Self::Map(map) => Ok((map, None)),
            Self::Live(source) => Ok((source.snapshot(), Some(source))),
            Self::Json(value) => Ok((StyleMap::from_json(&value)?, None)),
        }
    }
}

impl fmt::Debug for StyleInput {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Map(map) => formatter.debug_tuple("Map").field(map).finish(),
            Self::Live(_) => formatter.write_str("Live(..)"),
            Self::Json(value) => formatter.debug_tuple("Json").field(value).finish(),
        }
    }
}

impl From<StyleMap> for StyleInput {
    fn from(map: StyleMap) -> Self {
        Self::Map(map)
    }
}

impl From<LiveStyleMap> for StyleInput {
    fn from(source: LiveStyleMap) -> Self {
        Self::Live(Rc::new(source))
    }
}

impl From<Rc<dyn ReactiveStyleSource>> for StyleInput {
    fn from(source: Rc<dyn ReactiveStyleSource>) -> Self {
        Self::Live(source)
    }
}

impl From<Value> for StyleInput {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}
