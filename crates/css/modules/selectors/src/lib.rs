//! Selectors — canonical rule identities and generated class names.
//! See: <https://www.w3.org/TR/selectors-4/#class-html>
//!
//! This crate turns the selector fragment a caller passes alongside a style map
//! into a stable `(name, selector_text)` pair:
//! - `name` is the DOM-facing class or id token,
//! - `selector_text` is the full selector the rule is rendered with.
//!
//! Names that are not supplied are minted by [`NameGenerator`].

mod names;
mod resolver;

pub use names::NameGenerator;
pub use resolver::{ResolvedSelector, SelectorError, resolve};
