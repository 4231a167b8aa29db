//! Rule cache keyed by `(bucket, selector_text)`.

use crate::bucket::BucketKind;
use crate::engine::RuleId;
use log::trace;
use std::collections::HashMap;

/// Maps each live rule's canonical position to its id.
///
/// Entries are written only after the backend accepted the rule, so a failed
/// insertion never leaves a stale entry behind.
#[derive(Debug, Default)]
pub struct RuleCache {
    entries: HashMap<(BucketKind, String), RuleId>,
}

impl RuleCache {
    pub fn get(&self, bucket: &BucketKind, selector_text: &str) -> Option<RuleId> {
        // Tuple keys cannot be borrowed piecewise, so build a lookup key.
        let hit = self
            .entries
            .get(&(bucket.clone(), selector_text.to_owned()))
            .copied();
        trace!(
            "rule cache {} for {bucket} {selector_text}",
            if hit.is_some() { "hit" } else { "miss" }
        );
        hit
    }

    pub fn insert(&mut self, bucket: BucketKind, selector_text: String, id: RuleId) {
        self.entries.insert((bucket, selector_text), id);
    }

    /// Forget an entry, but only while it still points at `id`.
    pub fn remove(&mut self, bucket: &BucketKind, selector_text: &str, id: RuleId) {
        let key = (bucket.clone(), selector_text.to_owned());
        if self.entries.get(&key) == Some(&id) {
            self.entries.remove(&key);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
