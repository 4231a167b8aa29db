//! Runtime rule engine for CSS-in-code styling.
//! See: <https://www.w3.org/TR/cssom-1/#dom-cssstylesheet-insertrule>
//!
//! [`StyleEngine`] turns style maps into live stylesheet rules:
//! - rules land in a `dynamic`, `static`, or per-breakpoint bucket,
//! - defining the same selector again patches the existing rule in place,
//! - rules tied to an [`OwnerScope`] are removed when the scope ends,
//! - rules bound to a [`ReactiveStyleSource`] follow its changes.
//!
//! The engine talks to the host only through [`css_cssom::StyleSheetBackend`].

#![forbid(unsafe_code)]

mod bucket;
mod cache;
mod engine;
mod error;
mod options;
mod patch;
mod reactive;
mod scope;

pub use bucket::{Bucket, BucketKind, PatchStrategy};
pub use engine::{RuleHandle, RuleId, StyleEngine};
pub use error::StyleError;
pub use options::{DEFAULT_PREFIX, DefineOptions, EngineOptions};
pub use reactive::{ChangeListener, LiveStyleMap, ReactiveStyleSource, StyleInput, Subscription};
pub use scope::{ComponentScope, OwnerScope, ScopeId, Teardown};
