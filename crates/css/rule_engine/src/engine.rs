//! The style engine: defines, patches, and removes rules on a stylesheet backend.

use crate::bucket::{Bucket, BucketKind, BucketManager};
use crate::cache::RuleCache;
use crate::options::{DefineOptions, EngineOptions};
use crate::patch;
use crate::reactive::{ChangeListener, ReactiveStyleSource, StyleInput, Subscription};
use crate::scope::{ScopeId, ScopeTracker, Teardown};
use crate::StyleError;
use core::fmt;
use core::mem;
use css_cssom::{HeadlessBackend, StyleSheetBackend};
use css_selectors::{NameGenerator, resolve};
use css_style_attr::StyleMap;
use css_syntax::{Declaration, serialize_declarations};
use log::{debug, error, trace, warn};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Stable identity of a defined rule.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleId(pub u64);

/// What `define` hands back: the rule's identity and its DOM-facing name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuleHandle {
    id: RuleId,
    name: String,
    selector_text: String,
    bucket: BucketKind,
}

impl RuleHandle {
    pub const fn id(&self) -> RuleId {
        self.id
    }

    /// Class or id token to put on elements.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn selector_text(&self) -> &str {
        &self.selector_text
    }

    pub const fn bucket(&self) -> &BucketKind {
        &self.bucket
    }
}

impl fmt::Display for RuleHandle {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.name)
    }
}

/// Engine-side bookkeeping for one live rule.
struct RuleRecord {
    name: String,
    selector_text: String,
    bucket: Bucket,
    /// Last declaration text written to the backend.
    declaration_text: String,
    owner: Option<ScopeId>,
    subscription: Option<Subscription>,
}

impl RuleRecord {
    fn handle(&self, id: RuleId) -> RuleHandle {
        RuleHandle {
            id,
            name: self.name.clone(),
            selector_text: self.selector_text.clone(),
            bucket: self.bucket.kind.clone(),
        }
    }
}

struct EngineState<B> {
    backend: B,
    options: EngineOptions,
    names: NameGenerator,
    buckets: BucketManager,
    cache: RuleCache,
    rules: HashMap<RuleId, RuleRecord>,
    scopes: ScopeTracker,
    next_rule: u64,
}

/// Follow-up work a define leaves for after the state borrow is released.
struct DefineOutcome {
    handle: RuleHandle,
    /// A binding replaced or cleared by this define.
    released: Option<Subscription>,
    /// Set on a scope's first attach.
    register_teardown: Option<ScopeId>,
    /// The rule was returned as-is; no binding changes.
    dedupe_hit: bool,
}

impl<B: StyleSheetBackend> EngineState<B> {
    fn mint_rule_id(&mut self) -> RuleId {
        let id = RuleId(self.next_rule);
        self.next_rule = self.next_rule.wrapping_add(1);
        id
    }

    fn define(
        &mut self,
        map: &StyleMap,
        options: &DefineOptions<'_>,
        rebinding: bool,
    ) -> Result<DefineOutcome, StyleError> {
        let prefix = options
            .prefix
            .unwrap_or(self.options.prefix.as_str())
            .to_owned();
        let resolved = resolve(options.selector.unwrap_or_default(), &prefix, &mut self.names)?;
        let persistent = options.is_persistent(&self.options);
        let bucket = self.buckets.get_bucket(
            &mut self.backend,
            options.breakpoint,
            &self.options.breakpoints,
            persistent,
        )?;
        let declarations = map.to_declarations();
        let owner = options
            .scope
            .filter(|_| !bucket.kind.is_persistent())
            .map(|scope| scope.scope_id());

        if let Some(id) = self.cache.get(&bucket.kind, &resolved.selector_text) {
            if options.dedupe
                && let Some(record) = self.rules.get(&id)
            {
                trace!("dedupe hit for {}", record.selector_text);
                return Ok(DefineOutcome {
                    handle: record.handle(id),
                    released: None,
                    register_teardown: None,
                    dedupe_hit: true,
                });
            }
            self.patch_rule(id, &declarations)?;
            if let Some(record) = self.rules.get_mut(&id) {
                let released = record.subscription.take();
                if released.is_some() && !rebinding {
                    debug!("plain define on {} cleared its binding", record.selector_text);
                }
                let mut register_teardown = None;
                if record.owner.is_none()
                    && let Some(scope) = owner
                {
                    record.owner = Some(scope);
                    let selector_text = record.selector_text.clone();
                    if self.scopes.attach(scope, bucket.kind.clone(), selector_text) {
                        register_teardown = Some(scope);
                    }
                }
                return Ok(DefineOutcome {
                    handle: record.handle(id),
                    released,
                    register_teardown,
                    dedupe_hit: false,
                });
            }
        }

        let declaration_text = serialize_declarations(&declarations);
        self.insert_rule(&bucket, &resolved.selector_text, &declaration_text)?;
        let id = self.mint_rule_id();
        self.cache
            .insert(bucket.kind.clone(), resolved.selector_text.clone(), id);
        let register_teardown = owner.filter(|&scope| {
            self.scopes
                .attach(scope, bucket.kind.clone(), resolved.selector_text.clone())
        });
        let record = RuleRecord {
            name: resolved.name,
            selector_text: resolved.selector_text,
            bucket,
            declaration_text,
            owner,
            subscription: None,
        };
        let handle = record.handle(id);
        debug!("defined {} in {}", handle.selector_text, handle.bucket);
        self.rules.insert(id, record);
        Ok(DefineOutcome {
            handle,
            released: None,
            register_teardown,
            dedupe_hit: false,
        })
    }

    /// Append a style rule to `bucket`.
    fn insert_rule(
        &mut self,
        bucket: &Bucket,
        selector_text: &str,
        declaration_text: &str,
    ) -> Result<usize, StyleError> {
        let index = self.buckets.insert_index(&self.backend, bucket)?;
        let text = patch::rule_text(selector_text, declaration_text);
        trace!("insert `{text}` at {}[{index}]", bucket.kind);
        self.backend
            .insert_rule(bucket.list, &text, index)
            .map_err(|source| StyleError::insertion(&text, source))
    }

    /// Bring a live rule's declarations to `declarations`. Unknown ids are a no-op.
    fn patch_rule(&mut self, id: RuleId, declarations: &[Declaration]) -> Result<(), StyleError> {
        let Some(record) = self.rules.get(&id) else {
            trace!("patch for removed rule {id:?} ignored");
            return Ok(());
        };
        let declaration_text = serialize_declarations(declarations);
        if declaration_text == record.declaration_text {
            trace!("{} unchanged", record.selector_text);
            return Ok(());
        }
        let bucket = record.bucket.clone();
        let selector_text = record.selector_text.clone();
        let patched = patch::apply(&mut self.backend, &bucket, &selector_text, declarations)?;
        if !patched {
            warn!("{selector_text} was missing from {}; inserting it again", bucket.kind);
            self.insert_rule(&bucket, &selector_text, &declaration_text)?;
        }
        if let Some(record) = self.rules.get_mut(&id) {
            record.declaration_text = declaration_text;
        }
        Ok(())
    }

    /// Drop the rule's bookkeeping and delete it from its bucket.
    ///
    /// Returns the removed record, or `None` when the rule was already gone.
    /// The caller drops it once the state borrow is released, which disposes
    /// any binding.
    fn remove_rule(&mut self, id: RuleId) -> Result<Option<RuleRecord>, StyleError> {
        let Some(record) = self.rules.remove(&id) else {
            return Ok(None);
        };
        self.cache
            .remove(&record.bucket.kind, &record.selector_text, id);
        if let Some(owner) = record.owner {
            self.scopes
                .detach(owner, &record.bucket.kind, &record.selector_text);
        }
        let deleted = patch::delete(&mut self.backend, record.bucket.list, &record.selector_text)?;
        if !deleted {
            warn!("{} was already missing from {}", record.selector_text, record.bucket.kind);
        }
        debug!("removed {} from {}", record.selector_text, record.bucket.kind);
        Ok(Some(record))
    }
}

/// A stylesheet rule engine over a backend.
///
/// The engine is a cheap, cloneable handle; clones share the same state. It is
/// single-threaded: reactive notifications and scope teardowns re-enter it
/// through weak references.
pub struct StyleEngine<B: StyleSheetBackend + 'static> {
    state: Rc<RefCell<EngineState<B>>>,
    /// Scopes that ended while the state was borrowed.
    deferred: Rc<RefCell<Vec<ScopeId>>>,
}

impl<B: StyleSheetBackend + 'static> Clone for StyleEngine<B> {
    fn clone(&self) -> Self {
        Self {
            state: Rc::clone(&self.state),
            deferred: Rc::clone(&self.deferred),
        }
    }
}

impl<B: StyleSheetBackend + 'static> fmt::Debug for StyleEngine<B> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.state.try_borrow() {
            Ok(state) => formatter
                .debug_struct("StyleEngine")
                .field("options", &state.options)
                .field("rules", &state.rules.len())
                .field("cached", &state.cache.len())
                .finish(),
            Err(_) => formatter.write_str("StyleEngine { <busy> }"),
        }
    }
}

impl<B: StyleSheetBackend + 'static> StyleEngine<B> {
    /// Create the engine and its two top-level sheets.
    ///
    /// # Errors
    /// [`StyleError::UnsupportedEnvironment`] when the backend cannot host sheets.
    pub fn new(backend: B, options: EngineOptions) -> Result<Self, StyleError> {
        Self::with_name_generator(backend, options, NameGenerator::new())
    }

    /// Like [`StyleEngine::new`], minting names from `names`.
    ///
    /// # Errors
    /// [`StyleError::UnsupportedEnvironment`] when the backend cannot host sheets.
    pub fn with_name_generator(
        mut backend: B,
        options: EngineOptions,
        names: NameGenerator,
    ) -> Result<Self, StyleError> {
        let buckets = BucketManager::new(&mut backend)?;
        Ok(Self {
            state: Rc::new(RefCell::new(EngineState {
                backend,
                options,
                names,
                buckets,
                cache: RuleCache::default(),
                rules: HashMap::new(),
                scopes: ScopeTracker::default(),
                next_rule: 0,
            })),
            deferred: Rc::default(),
        })
    }

    /// Replace the engine options. Breakpoint shells created earlier keep
    /// their original condition.
    pub fn configure(&self, options: EngineOptions) {
        debug!("engine reconfigured with prefix `{}`", options.prefix);
        self.state.borrow_mut().options = options;
    }

    pub fn options(&self) -> EngineOptions {
        self.state.borrow().options.clone()
    }

    /// Define or update a rule.
    ///
    /// A live source binds the rule to it; a plain map clears any previous
    /// binding. A dedupe hit leaves the rule and its binding untouched.
    ///
    /// # Errors
    /// - [`StyleError::InvalidStyleInput`] when `style` is not a mapping; nothing
    ///   is touched.
    /// - [`StyleError::InvalidSelector`] for at-rule selectors.
    /// - [`StyleError::RuleInsertionFailed`] when the backend rejects the rule.
    pub fn define(
        &self,
        style: impl Into<StyleInput>,
        options: DefineOptions<'_>,
    ) -> Result<RuleHandle, StyleError> {
        let (map, source) = style.into().resolve()?;
        self.drain_deferred();
        let outcome = self
            .state
            .borrow_mut()
            .define(&map, &options, source.is_some())?;
        drop(outcome.released);
        if let (Some(scope_id), Some(scope)) = (outcome.register_teardown, options.scope) {
            debug!("registering teardown for scope {scope_id:?}");
            scope.on_end(self.teardown(scope_id));
        }
        if let Some(source) = source
            && !outcome.dedupe_hit
        {
            self.subscribe(outcome.handle.id, &source);
        }
        Ok(outcome.handle)
    }

    /// Remove a rule. Only the first call for a handle removes anything.
    ///
    /// # Errors
    /// [`StyleError::Backend`] when the backend fails to delete the rule.
    pub fn remove(&self, handle: &RuleHandle) -> Result<bool, StyleError> {
        self.drain_deferred();
        let removed = self.state.borrow_mut().remove_rule(handle.id)?;
        Ok(removed.is_some())
    }

    /// Mint a fresh class name without defining a rule.
    pub fn make_class_name(&self, prefix: Option<&str>) -> String {
        let mut state = self.state.borrow_mut();
        let prefix = prefix.map_or_else(|| state.options.prefix.clone(), str::to_owned);
        state.names.next_name(&prefix)
    }

    /// Remove every rule attached to `scope`. Returns how many were removed.
    ///
    /// # Errors
    /// The first backend failure; every other rule is still removed.
    pub fn end_scope(&self, scope: ScopeId) -> Result<usize, StyleError> {
        let mut released = Vec::new();
        let mut first_error = None;
        {
            let mut state = self.state.borrow_mut();
            let entries = state.scopes.take(scope);
            debug!("ending scope {scope:?} with {} rules", entries.len());
            for (kind, selector_text) in entries {
                let Some(id) = state.cache.get(&kind, &selector_text) else {
                    continue;
                };
                let owned = state
                    .rules
                    .get(&id)
                    .is_some_and(|record| record.owner == Some(scope));
                if !owned {
                    continue;
                }
                match state.remove_rule(id) {
                    Ok(Some(record)) => released.push(record),
                    Ok(None) => {}
                    Err(err) => {
                        error!("failed to remove {selector_text} for scope {scope:?}: {err}");
                        if first_error.is_none() {
                            first_error = Some(err);
                        }
                    }
                }
            }
        }
        let removed = released.len();
        drop(released);
        first_error.map_or(Ok(removed), Err)
    }

    /// Bind a live rule to `source`, syncing it to the current snapshot.
    /// Returns false when the rule is no longer live.
    ///
    /// # Errors
    /// As for patching the rule toward the snapshot.
    pub fn bind(
        &self,
        handle: &RuleHandle,
        source: &Rc<dyn ReactiveStyleSource>,
    ) -> Result<bool, StyleError> {
        let released = {
            let mut state = self.state.borrow_mut();
            if !state.rules.contains_key(&handle.id) {
                return Ok(false);
            }
            state.patch_rule(handle.id, &source.snapshot().to_declarations())?;
            state
                .rules
                .get_mut(&handle.id)
                .and_then(|record| record.subscription.take())
        };
        drop(released);
        self.subscribe(handle.id, source);
        Ok(true)
    }

    /// Dispose the rule's binding, if any.
    pub fn unbind(&self, handle: &RuleHandle) -> bool {
        let released = self
            .state
            .borrow_mut()
            .rules
            .get_mut(&handle.id)
            .and_then(|record| record.subscription.take());
        let had_binding = released.is_some();
        if had_binding {
            debug!("unbound {}", handle.selector_text);
        }
        drop(released);
        had_binding
    }

    fn subscribe(&self, id: RuleId, source: &Rc<dyn ReactiveStyleSource>) {
        let weak = Rc::downgrade(&self.state);
        let listener: ChangeListener = Rc::new(move |map: &StyleMap| {
            let Some(state) = weak.upgrade() else {
                return;
            };
            let Ok(mut state) = state.try_borrow_mut() else {
                warn!("style engine busy; dropped a change for rule {id:?}");
                return;
            };
            if let Err(err) = state.patch_rule(id, &map.to_declarations()) {
                error!("reactive patch of rule {id:?} failed: {err}");
            }
        });
        let subscription = source.watch(listener);
        let mut state = self.state.borrow_mut();
        if let Some(record) = state.rules.get_mut(&id) {
            debug!("bound {} to a live source", record.selector_text);
            record.subscription = Some(subscription);
        } else {
            drop(state);
            drop(subscription);
        }
    }

    fn teardown(&self, scope: ScopeId) -> Teardown {
        let weak = Rc::downgrade(&self.state);
        let deferred = Rc::downgrade(&self.deferred);
        Box::new(move || {
            let (Some(state), Some(deferred)) = (weak.upgrade(), deferred.upgrade()) else {
                return;
            };
            if state.try_borrow_mut().is_err() {
                debug!("style engine busy; scope {scope:?} teardown deferred");
                deferred.borrow_mut().push(scope);
                return;
            }
            let engine = Self { state, deferred };
            engine.end_scope_logged(scope);
        })
    }

    fn end_scope_logged(&self, scope: ScopeId) {
        if let Err(err) = self.end_scope(scope) {
            error!("teardown of scope {scope:?} failed: {err}");
        }
    }

    /// End scopes whose teardown ran while the state was borrowed.
    fn drain_deferred(&self) {
        let pending = mem::take(&mut *self.deferred.borrow_mut());
        for scope in pending {
            self.end_scope_logged(scope);
        }
    }

    /// Number of style rules directly in `bucket`; zero for buckets not yet created.
    ///
    /// # Errors
    /// [`StyleError::Backend`] when the backend cannot enumerate the bucket.
    pub fn rule_count(&self, bucket: &BucketKind) -> Result<usize, StyleError> {
        let state = self.state.borrow();
        let Some(bucket) = state.buckets.get(bucket) else {
            return Ok(0);
        };
        let total = state.backend.rule_count(bucket.list)?;
        let mut count = 0;
        for index in 0..total {
            if state.backend.selector_text_at(bucket.list, index)?.is_some() {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Declaration text last written for a live rule.
    pub fn declaration_text(&self, handle: &RuleHandle) -> Option<String> {
        self.state
            .borrow()
            .rules
            .get(&handle.id)
            .map(|record| record.declaration_text.clone())
    }

    pub fn is_live(&self, handle: &RuleHandle) -> bool {
        self.state.borrow().rules.contains_key(&handle.id)
    }

    pub fn is_bound(&self, handle: &RuleHandle) -> bool {
        self.state
            .borrow()
            .rules
            .get(&handle.id)
            .is_some_and(|record| record.subscription.is_some())
    }

    /// Every bucket created so far, in sorted order.
    pub fn bucket_kinds(&self) -> Vec<BucketKind> {
        let mut kinds: Vec<BucketKind> = self
            .state
            .borrow()
            .buckets
            .iter()
            .map(|bucket| bucket.kind.clone())
            .collect();
        kinds.sort();
        kinds
    }

    pub fn live_rule_count(&self) -> usize {
        self.state.borrow().rules.len()
    }

    /// Scopes ending inside `read` are torn down once it returns.
    pub fn with_backend<R>(&self, read: impl FnOnce(&B) -> R) -> R {
        let result = read(&self.state.borrow().backend);
        self.drain_deferred();
        result
    }

    /// Scopes ending inside `write` are torn down once it returns.
    pub fn with_backend_mut<R>(&self, write: impl FnOnce(&mut B) -> R) -> R {
        let result = write(&mut self.state.borrow_mut().backend);
        self.drain_deferred();
        result
    }
}

impl StyleEngine<HeadlessBackend> {
    /// Serialize every bucket: dynamic rules, then static rules followed by the
    /// breakpoint shells.
    pub fn collect_css(&self) -> String {
        self.with_backend(HeadlessBackend::to_css_text)
    }
}
