//! Engine configuration and per-define directives.

use crate::scope::OwnerScope;
use css_media_queries::Breakpoints;
use serde::{Deserialize, Serialize};

/// Prefix used for generated class names when none is configured.
pub const DEFAULT_PREFIX: &str = "css";

/// Engine-wide settings, applied at construction or through `configure`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    /// Prefix for generated class names.
    pub prefix: String,
    /// Named media conditions available to `DefineOptions::breakpoint`.
    pub breakpoints: Breakpoints,
    /// Whether a rule with an explicit selector and no owning scope goes to the
    /// persistent bucket. Generated selectors are never persisted by this switch.
    pub persist_unscoped_selectors: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_owned(),
            breakpoints: Breakpoints::default(),
            persist_unscoped_selectors: true,
        }
    }
}

impl EngineOptions {
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    #[must_use]
    pub fn with_breakpoints(mut self, breakpoints: Breakpoints) -> Self {
        self.breakpoints = breakpoints;
        self
    }

    #[must_use]
    pub fn with_persist_unscoped_selectors(mut self, persist: bool) -> Self {
        self.persist_unscoped_selectors = persist;
        self
    }
}

/// Directives for a single `define` call.
#[derive(Clone, Copy, Default)]
pub struct DefineOptions<'scope> {
    /// Raw selector fragment; empty or absent mints a class name.
    pub selector: Option<&'scope str>,
    /// Overrides the engine prefix for a minted name.
    pub prefix: Option<&'scope str>,
    /// Breakpoint name; known names nest the rule in that breakpoint's bucket.
    pub breakpoint: Option<&'scope str>,
    /// Define once: later identical defines return the existing rule untouched.
    pub dedupe: bool,
    /// Owning scope; non-persistent rules are removed when it ends.
    pub scope: Option<&'scope dyn OwnerScope>,
}

impl<'scope> DefineOptions<'scope> {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn selector(mut self, selector: &'scope str) -> Self {
        self.selector = Some(selector);
        self
    }

    #[must_use]
    pub fn prefix(mut self, prefix: &'scope str) -> Self {
        self.prefix = Some(prefix);
        self
    }

    #[must_use]
    pub fn breakpoint(mut self, breakpoint: &'scope str) -> Self {
        self.breakpoint = Some(breakpoint);
        self
    }

    #[must_use]
    pub fn dedupe(mut self, dedupe: bool) -> Self {
        self.dedupe = dedupe;
        self
    }

    #[must_use]
    pub fn scope(mut self, scope: &'scope dyn OwnerScope) -> Self {
        self.scope = Some(scope);
        self
    }

    /// Whether the rule belongs in the persistent bucket.
    pub fn is_persistent(&self, options: &EngineOptions) -> bool {
        let explicit_selector = self.selector.is_some_and(|sel| !sel.trim().is_empty());
        self.dedupe
            || self.breakpoint.is_some()
            || (explicit_selector && self.scope.is_none() && options.persist_unscoped_selectors)
    }
}
