//! Selector fragment resolution.

use crate::NameGenerator;
use log::trace;
use thiserror::Error;

/// Raised for fragments that cannot name a style rule.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SelectorError {
    /// At-rules are expressed through breakpoints, never through the selector.
    #[error("selector `{0}` starts with an at-rule marker")]
    AtRule(String),
}

/// The canonical identity of a rule.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ResolvedSelector {
    /// DOM-facing class or id token.
    pub name: String,
    /// Full selector the rule is rendered with, starting with `.` or `#`.
    pub selector_text: String,
}

/// Resolve a raw selector fragment into a `(name, selector_text)` pair.
///
/// - `""` mints a fresh name: `.{prefix}-{token}`.
/// - `:hover` / `[data-x]` (a bare suffix) mints a fresh name and appends the suffix.
/// - `btn:hover` uses `btn` as the name and renders `.btn:hover`.
/// - `.btn:hover` / `#main` are used verbatim; the name drops the leading symbol.
///
/// # Errors
/// Returns [`SelectorError::AtRule`] when the fragment starts with `@`.
pub fn resolve(
    raw: &str,
    prefix: &str,
    names: &mut NameGenerator,
) -> Result<ResolvedSelector, SelectorError> {
    let fragment = raw.trim();
    if fragment.starts_with('@') {
        return Err(SelectorError::AtRule(fragment.to_owned()));
    }

    let resolved = if let Some(rest) = fragment.strip_prefix('.') {
        ResolvedSelector {
            name: head_of(rest).to_owned(),
            selector_text: fragment.to_owned(),
        }
    } else if let Some(rest) = fragment.strip_prefix('#') {
        ResolvedSelector {
            name: head_of(rest).to_owned(),
            selector_text: fragment.to_owned(),
        }
    } else {
        let head = head_of(fragment);
        if head.is_empty() {
            // Empty fragment, or only a pseudo-class / attribute suffix.
            let name = names.next_name(prefix);
            let selector_text = format!(".{name}{fragment}");
            ResolvedSelector {
                name,
                selector_text,
            }
        } else {
            ResolvedSelector {
                name: head.to_owned(),
                selector_text: format!(".{fragment}"),
            }
        }
    };
    trace!(
        "resolved selector {raw:?} to name={} text={}",
        resolved.name, resolved.selector_text
    );
    Ok(resolved)
}

/// The identifier at the start of `fragment`, up to the first pseudo-class,
/// attribute, compound, or combinator boundary.
fn head_of(fragment: &str) -> &str {
    let end = fragment
        .find(|ch: char| {
            matches!(ch, ':' | '[' | '.' | '#' | '>' | '+' | '~' | ',') || ch.is_whitespace()
        })
        .unwrap_or(fragment.len());
    fragment.get(..end).unwrap_or(fragment)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names() -> NameGenerator {
        NameGenerator::with_epoch(0)
    }

    #[test]
    fn empty_fragment_mints_a_prefixed_class() {
        let mut gen_names = names();
        let resolved = resolve("", "ui", &mut gen_names);
        assert_eq!(
            resolved,
            Ok(ResolvedSelector {
                name: "ui-aaaa0".into(),
                selector_text: ".ui-aaaa0".into(),
            })
        );
    }

    #[test]
    fn bare_suffix_is_appended_to_a_fresh_name() {
        let mut gen_names = names();
        let hover = resolve(":hover", "ui", &mut gen_names);
        assert_eq!(
            hover.map(|sel| (sel.name, sel.selector_text)),
            Ok(("ui-aaaa0".to_owned(), ".ui-aaaa0:hover".to_owned()))
        );
        let attr = resolve("[data-open]", "ui", &mut gen_names);
        assert_eq!(
            attr.map(|sel| sel.selector_text),
            Ok(".ui-aaaa1[data-open]".to_owned())
        );
    }

    #[test]
    fn plain_head_becomes_a_class() {
        let mut gen_names = names();
        let resolved = resolve("button:hover", "ui", &mut gen_names);
        assert_eq!(
            resolved.map(|sel| (sel.name, sel.selector_text)),
            Ok(("button".to_owned(), ".button:hover".to_owned()))
        );
    }

    #[test]
    fn explicit_class_and_id_are_verbatim() {
        let mut gen_names = names();
        let class = resolve(".card[data-x] > span", "ui", &mut gen_names);
        assert_eq!(
            class,
            Ok(ResolvedSelector {
                name: "card".into(),
                selector_text: ".card[data-x] > span".into(),
            })
        );
        let id = resolve("#main:focus", "ui", &mut gen_names);
        assert_eq!(
            id.map(|sel| (sel.name, sel.selector_text)),
            Ok(("main".to_owned(), "#main:focus".to_owned()))
        );
        // Nothing was minted.
        assert_eq!(gen_names.next_token(), "aaaa0");
    }

    #[test]
    fn at_rules_are_rejected() {
        let mut gen_names = names();
        assert_eq!(
            resolve("@media print", "ui", &mut gen_names),
            Err(SelectorError::AtRule("@media print".into()))
        );
    }
}
