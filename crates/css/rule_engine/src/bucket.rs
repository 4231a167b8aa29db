//! Backing stylesheet buckets.
//!
//! Two top-level sheets exist for the engine's lifetime: `dynamic` for
//! ephemeral rules and `static` for persistent ones. Each breakpoint gets a
//! `@media` shell inside the static sheet, created on first use; the shell's
//! body is that breakpoint's bucket. Shells stay at the tail of the static
//! sheet so breakpoint rules follow the base rules they override.

use crate::StyleError;
use css_cssom::{BackendCapabilities, BackendError, RuleListId, StyleSheetBackend};
use css_media_queries::Breakpoints;
use core::fmt;
use log::{debug, warn};
use std::collections::HashMap;

/// Which bucket a rule lives in.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BucketKind {
    /// Ephemeral rules, typically bound to a scope.
    Dynamic,
    /// Persistent rules, removed only on request.
    Static,
    /// Rules nested in the named breakpoint's `@media` shell.
    Screen(String),
}

impl BucketKind {
    /// Whether rules in this bucket survive their defining scope.
    pub const fn is_persistent(&self) -> bool {
        !matches!(self, Self::Dynamic)
    }
}

impl fmt::Display for BucketKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dynamic => formatter.write_str("dynamic"),
            Self::Static => formatter.write_str("static"),
            Self::Screen(name) => write!(formatter, "screen:{name}"),
        }
    }
}

/// How live rules in a bucket are patched.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PatchStrategy {
    /// Set and remove single declarations.
    Incremental,
    /// Replace the whole rule text in place.
    AtomicReplace,
    /// Delete the rule and insert the new text at the same position.
    Reinsert,
}

impl PatchStrategy {
    /// Prefer incremental edits, then atomic replacement, then reinsertion.
    pub const fn for_capabilities(capabilities: BackendCapabilities) -> Self {
        if capabilities.incremental_properties {
            Self::Incremental
        } else if capabilities.atomic_replace {
            Self::AtomicReplace
        } else {
            Self::Reinsert
        }
    }
}

/// One backing rule list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bucket {
    pub kind: BucketKind,
    pub list: RuleListId,
    pub strategy: PatchStrategy,
}

impl Bucket {
    fn create(backend: &dyn StyleSheetBackend, kind: BucketKind, list: RuleListId) -> Self {
        let strategy = PatchStrategy::for_capabilities(backend.capabilities());
        debug!("bucket {kind} on {list:?} patches with {strategy:?}");
        Self {
            kind,
            list,
            strategy,
        }
    }
}

/// Owns the dynamic, static, and per-breakpoint buckets.
#[derive(Debug)]
pub struct BucketManager {
    dynamic: Bucket,
    persistent: Bucket,
    /// Breakpoint buckets keyed by breakpoint name.
    screens: HashMap<String, Bucket>,
}

impl BucketManager {
    /// Create the two top-level sheets.
    pub fn new(backend: &mut dyn StyleSheetBackend) -> Result<Self, StyleError> {
        if !backend.capabilities().stylesheets {
            return Err(StyleError::UnsupportedEnvironment(
                "stylesheet backend cannot create sheets".to_owned(),
            ));
        }
        let dynamic_list = backend.create_sheet().map_err(unsupported)?;
        let static_list = backend.create_sheet().map_err(unsupported)?;
        Ok(Self {
            dynamic: Bucket::create(backend, BucketKind::Dynamic, dynamic_list),
            persistent: Bucket::create(backend, BucketKind::Static, static_list),
            screens: HashMap::new(),
        })
    }

    /// An existing bucket, without creating anything.
    pub fn get(&self, kind: &BucketKind) -> Option<&Bucket> {
        match kind {
            BucketKind::Dynamic => Some(&self.dynamic),
            BucketKind::Static => Some(&self.persistent),
            BucketKind::Screen(name) => self.screens.get(name),
        }
    }

    /// Every bucket created so far.
    pub fn iter(&self) -> impl Iterator<Item = &Bucket> {
        [&self.dynamic, &self.persistent]
            .into_iter()
            .chain(self.screens.values())
    }

    /// Select the bucket for a define, creating a breakpoint shell on first use.
    ///
    /// A known breakpoint always resolves through the persistent sheet; an
    /// unknown one falls back to the top-level bucket chosen by `persistent`.
    pub fn get_bucket(
        &mut self,
        backend: &mut dyn StyleSheetBackend,
        breakpoint: Option<&str>,
        breakpoints: &Breakpoints,
        persistent: bool,
    ) -> Result<Bucket, StyleError> {
        if let Some(name) = breakpoint {
            if let Some(condition) = breakpoints.condition(name) {
                return self.screen_bucket(backend, name, condition);
            }
            warn!("unknown breakpoint `{name}`; using the top-level bucket");
        }
        Ok(if persistent {
            self.persistent.clone()
        } else {
            self.dynamic.clone()
        })
    }

    fn screen_bucket(
        &mut self,
        backend: &mut dyn StyleSheetBackend,
        name: &str,
        condition: &str,
    ) -> Result<Bucket, StyleError> {
        if let Some(bucket) = self.screens.get(name) {
            return Ok(bucket.clone());
        }
        let host = self.persistent.list;
        let shell_text = format!("@media {condition} {{}}");
        let index = backend.rule_count(host)?;
        let index = backend
            .insert_rule(host, &shell_text, index)
            .map_err(|source| StyleError::insertion(&shell_text, source))?;
        let inner = backend.group_rules_at(host, index)?;
        let bucket = Bucket::create(backend, BucketKind::Screen(name.to_owned()), inner);
        debug!("created breakpoint shell `{shell_text}` for {name}");
        self.screens.insert(name.to_owned(), bucket.clone());
        Ok(bucket)
    }

    /// Position for a new rule: the end of the bucket, except that the static
    /// sheet keeps its breakpoint shells last.
    pub fn insert_index(
        &self,
        backend: &dyn StyleSheetBackend,
        bucket: &Bucket,
    ) -> Result<usize, BackendError> {
        let count = backend.rule_count(bucket.list)?;
        Ok(match bucket.kind {
            BucketKind::Static => count.saturating_sub(self.screens.len()),
            BucketKind::Dynamic | BucketKind::Screen(_) => count,
        })
    }
}

fn unsupported(error: BackendError) -> StyleError {
    StyleError::UnsupportedEnvironment(error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use css_cssom::HeadlessBackend;

    #[test]
    fn strategy_prefers_incremental_edits() {
        assert_eq!(
            PatchStrategy::for_capabilities(BackendCapabilities::FULL),
            PatchStrategy::Incremental
        );
        let atomic_only = BackendCapabilities {
            incremental_properties: false,
            ..BackendCapabilities::FULL
        };
        assert_eq!(
            PatchStrategy::for_capabilities(atomic_only),
            PatchStrategy::AtomicReplace
        );
        let neither = BackendCapabilities {
            atomic_replace: false,
            ..atomic_only
        };
        assert_eq!(PatchStrategy::for_capabilities(neither), PatchStrategy::Reinsert);
    }

    #[test]
    fn breakpoint_shells_are_created_once() -> Result<(), StyleError> {
        let mut backend = HeadlessBackend::new();
        let mut buckets = BucketManager::new(&mut backend)?;
        let breakpoints = Breakpoints::default();

        let phone = buckets.get_bucket(&mut backend, Some("phone"), &breakpoints, false)?;
        let again = buckets.get_bucket(&mut backend, Some("phone"), &breakpoints, false)?;
        let tablet = buckets.get_bucket(&mut backend, Some("tablet"), &breakpoints, true)?;

        assert_eq!(phone, again);
        assert_ne!(phone.list, tablet.list);
        assert_eq!(phone.kind, BucketKind::Screen("phone".into()));
        assert_eq!(backend.rule_count(buckets.persistent.list)?, 2);
        assert_eq!(backend.rule_count(buckets.dynamic.list)?, 0);
        Ok(())
    }

    #[test]
    fn unknown_breakpoint_falls_back_to_top_level() -> Result<(), StyleError> {
        let mut backend = HeadlessBackend::new();
        let mut buckets = BucketManager::new(&mut backend)?;
        let breakpoints = Breakpoints::default();
        let bucket = buckets.get_bucket(&mut backend, Some("watch"), &breakpoints, false)?;
        assert_eq!(bucket.kind, BucketKind::Dynamic);
        Ok(())
    }

    #[test]
    fn static_rules_go_before_shells() -> Result<(), StyleError> {
        let mut backend = HeadlessBackend::new();
        let mut buckets = BucketManager::new(&mut backend)?;
        let breakpoints = Breakpoints::default();
        buckets.get_bucket(&mut backend, Some("phone"), &breakpoints, true)?;
        let persistent = buckets.get_bucket(&mut backend, None, &breakpoints, true)?;
        assert_eq!(buckets.insert_index(&backend, &persistent)?, 0);
        Ok(())
    }

    #[test]
    fn hosts_without_sheets_are_unsupported() {
        let mut backend = HeadlessBackend::with_capabilities(BackendCapabilities {
            stylesheets: false,
            ..BackendCapabilities::FULL
        });
        assert!(matches!(
            BucketManager::new(&mut backend),
            Err(StyleError::UnsupportedEnvironment(_))
        ));
    }
}
