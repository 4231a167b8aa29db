//! Declaration diffing and in-place rule patching.

use crate::StyleError;
use crate::bucket::{Bucket, PatchStrategy};
use css_cssom::{BackendError, RuleListId, StyleSheetBackend};
use css_syntax::{Declaration, parse_declaration_list, serialize_declarations};
use log::{trace, warn};

/// One incremental edit against a live rule.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PatchOp {
    Remove(String),
    Set(Declaration),
}

/// Minimal edits turning `current` into `target`.
///
/// Removals come first so a property that moved between hyphenated spellings
/// never ends up deleted after being set.
pub fn diff(current: &[Declaration], target: &[Declaration]) -> Vec<PatchOp> {
    let mut ops: Vec<PatchOp> = current
        .iter()
        .filter(|live| !target.iter().any(|decl| decl.name == live.name))
        .map(|live| PatchOp::Remove(live.name.clone()))
        .collect();
    for decl in target {
        let unchanged = current.iter().any(|live| live == decl);
        if !unchanged {
            ops.push(PatchOp::Set(decl.clone()));
        }
    }
    ops
}

/// Text accepted by `insert_rule` for a style rule.
pub fn rule_text(selector_text: &str, declaration_text: &str) -> String {
    if declaration_text.is_empty() {
        format!("{selector_text} {{ }}")
    } else {
        format!("{selector_text} {{ {declaration_text} }}")
    }
}

/// Position of the last rule in `list` whose selector is exactly `selector_text`.
pub fn locate(
    backend: &dyn StyleSheetBackend,
    list: RuleListId,
    selector_text: &str,
) -> Result<Option<usize>, BackendError> {
    let count = backend.rule_count(list)?;
    for index in (0..count).rev() {
        if backend.selector_text_at(list, index)?.as_deref() == Some(selector_text) {
            return Ok(Some(index));
        }
    }
    Ok(None)
}

/// Delete the last rule matching `selector_text`. Returns whether one was found.
pub fn delete(
    backend: &mut dyn StyleSheetBackend,
    list: RuleListId,
    selector_text: &str,
) -> Result<bool, BackendError> {
    let Some(index) = locate(backend, list, selector_text)? else {
        return Ok(false);
    };
    backend.delete_rule(list, index)?;
    trace!("deleted `{selector_text}` at {list:?}[{index}]");
    Ok(true)
}

/// Patch the live rule for `selector_text` toward `target`.
///
/// Returns `Ok(false)` when the rule is no longer in the bucket; the caller
/// decides whether to insert it again.
pub fn apply(
    backend: &mut dyn StyleSheetBackend,
    bucket: &Bucket,
    selector_text: &str,
    target: &[Declaration],
) -> Result<bool, StyleError> {
    let declaration_text = serialize_declarations(target);
    let new_text = rule_text(selector_text, &declaration_text);
    // Reject text the host would refuse before touching the live rule.
    if let Err(source) = parse_declaration_list(&declaration_text) {
        return Err(StyleError::insertion(
            &new_text,
            BackendError::InvalidRule {
                text: new_text.clone(),
                source,
            },
        ));
    }
    let Some(index) = locate(backend, bucket.list, selector_text)? else {
        return Ok(false);
    };
    match bucket.strategy {
        PatchStrategy::Incremental => {
            let current = backend.declarations_at(bucket.list, index)?;
            for op in diff(&current, target) {
                trace!("patch `{selector_text}`: {op:?}");
                match op {
                    PatchOp::Remove(name) => backend.remove_property(bucket.list, index, &name)?,
                    PatchOp::Set(decl) => backend.set_property(bucket.list, index, &decl)?,
                }
            }
        }
        PatchStrategy::AtomicReplace => {
            trace!("replace `{selector_text}` with `{new_text}`");
            backend
                .replace_rule_text(bucket.list, index, &new_text)
                .map_err(|source| StyleError::insertion(&new_text, source))?;
        }
        PatchStrategy::Reinsert => reinsert(backend, bucket.list, index, selector_text, &new_text)?,
    }
    Ok(true)
}

fn reinsert(
    backend: &mut dyn StyleSheetBackend,
    list: RuleListId,
    index: usize,
    selector_text: &str,
    new_text: &str,
) -> Result<(), StyleError> {
    let previous = rule_text(
        selector_text,
        &serialize_declarations(&backend.declarations_at(list, index)?),
    );
    backend.delete_rule(list, index)?;
    trace!("reinsert `{new_text}` at {list:?}[{index}]");
    if let Err(source) = backend.insert_rule(list, new_text, index) {
        if backend.insert_rule(list, &previous, index).is_err() {
            warn!("could not restore `{previous}` after a failed reinsert");
        }
        return Err(StyleError::insertion(new_text, source));
    }
    Ok(())
}
