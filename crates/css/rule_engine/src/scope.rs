//! Owner scopes and the per-scope rule records used for teardown.

use crate::bucket::BucketKind;
use core::cell::{Cell, RefCell};
use core::fmt;
use core::mem;
use core::sync::atomic::{AtomicU64, Ordering};
use indexmap::IndexSet;
use std::collections::HashMap;

/// Identity of an owning scope.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(pub u64);

/// Callback run once when a scope ends.
pub type Teardown = Box<dyn FnOnce()>;

/// A lifecycle owner that rules can be tied to, such as a UI component.
pub trait OwnerScope {
    fn scope_id(&self) -> ScopeId;

    /// Run `teardown` when the scope ends.
    fn on_end(&self, teardown: Teardown);
}

static NEXT_SCOPE: AtomicU64 = AtomicU64::new(1);

/// A scope that ends on `end()` or when dropped.
pub struct ComponentScope {
    id: ScopeId,
    teardowns: RefCell<Vec<Teardown>>,
    ended: Cell<bool>,
}

impl Default for ComponentScope {
    fn default() -> Self {
        Self::new()
    }
}

impl ComponentScope {
    pub fn new() -> Self {
        Self {
            id: ScopeId(NEXT_SCOPE.fetch_add(1, Ordering::Relaxed)),
            teardowns: RefCell::new(Vec::new()),
            ended: Cell::new(false),
        }
    }

    /// Run every registered teardown, most recent first. Only the first call
    /// does anything.
    pub fn end(&self) {
        if self.ended.replace(true) {
            return;
        }
        let teardowns = mem::take(&mut *self.teardowns.borrow_mut());
        for teardown in teardowns.into_iter().rev() {
            teardown();
        }
    }

    pub fn is_ended(&self) -> bool {
        self.ended.get()
    }
}

impl OwnerScope for ComponentScope {
    fn scope_id(&self) -> ScopeId {
        self.id
    }

    fn on_end(&self, teardown: Teardown) {
        if self.ended.get() {
            teardown();
        } else {
            self.teardowns.borrow_mut().push(teardown);
        }
    }
}

impl Drop for ComponentScope {
    fn drop(&mut self) {
        self.end();
    }
}

impl fmt::Debug for ComponentScope {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ComponentScope")
            .field("id", &self.id)
            .field("ended", &self.ended.get())
            .finish()
    }
}

/// Rules attached to each live scope, in attach order.
#[derive(Debug, Default)]
pub struct ScopeTracker {
    records: HashMap<ScopeId, IndexSet<(BucketKind, String)>>,
}

impl ScopeTracker {
    /// Record a rule under `scope`. Returns true on the scope's first attach,
    /// when the caller must register the teardown.
    pub fn attach(&mut self, scope: ScopeId, bucket: BucketKind, selector_text: String) -> bool {
        let first = !self.records.contains_key(&scope);
        self.records
            .entry(scope)
            .or_default()
            .insert((bucket, selector_text));
        first
    }

    /// Take and clear everything recorded for `scope`.
    pub fn take(&mut self, scope: ScopeId) -> Vec<(BucketKind, String)> {
        self.records
            .remove(&scope)
            .map(|set| set.into_iter().collect())
            .unwrap_or_default()
    }

    /// Forget one rule, e.g. after it was removed explicitly.
    pub fn detach(&mut self, scope: ScopeId, bucket: &BucketKind, selector_text: &str) {
        if let Some(set) = self.records.get_mut(&scope) {
            set.shift_remove(&(bucket.clone(), selector_text.to_owned()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn teardowns_run_once_in_reverse_order() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let scope = ComponentScope::new();
        for step in 0..3u8 {
            let sink = Rc::clone(&order);
            scope.on_end(Box::new(move || sink.borrow_mut().push(step)));
        }
        scope.end();
        scope.end();
        assert_eq!(*order.borrow(), vec![2, 1, 0]);
        assert!(scope.is_ended());
    }

    #[test]
    fn late_teardown_runs_immediately() {
        let ran = Rc::new(Cell::new(false));
        let scope = ComponentScope::new();
        scope.end();
        let flag = Rc::clone(&ran);
        scope.on_end(Box::new(move || flag.set(true)));
        assert!(ran.get());
    }

    #[test]
    fn scope_ids_are_distinct() {
        assert_ne!(ComponentScope::new().scope_id(), ComponentScope::new().scope_id());
    }

    #[test]
    fn tracker_reports_first_attach() {
        let mut tracker = ScopeTracker::default();
        let scope = ScopeId(9);
        assert!(tracker.attach(scope, BucketKind::Dynamic, ".a".into()));
        assert!(!tracker.attach(scope, BucketKind::Dynamic, ".b".into()));
        assert!(!tracker.attach(scope, BucketKind::Dynamic, ".a".into()));
        tracker.detach(scope, &BucketKind::Dynamic, ".b");
        assert_eq!(tracker.take(scope), vec![(BucketKind::Dynamic, ".a".to_owned())]);
        assert!(tracker.take(scope).is_empty());
    }
}
