//! Media Queries — named screen breakpoints.
//! See: <https://www.w3.org/TR/mediaqueries-4/>
//!
//! A breakpoint is a name (`phone`, `tablet`, ...) bound to a media query list.
//! Style rules targeted at a breakpoint are nested in a `@media` group built from
//! that query list.

#![forbid(unsafe_code)]

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Built-in breakpoints, narrowest first.
pub const DEFAULT_BREAKPOINTS: [(&str, &str); 6] = [
    ("phone", "screen and (max-width: 599px)"),
    ("small-tablet", "screen and (min-width: 600px) and (max-width: 767px)"),
    ("tablet", "screen and (min-width: 768px) and (max-width: 1023px)"),
    ("large-tablet", "screen and (min-width: 1024px) and (max-width: 1279px)"),
    ("desktop", "screen and (min-width: 1280px)"),
    ("large-desktop", "screen and (min-width: 1600px)"),
];

/// An ordered set of named media conditions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Breakpoints {
    conditions: IndexMap<String, String>,
}

impl Breakpoints {
    /// A set with no breakpoints at all.
    pub fn empty() -> Self {
        Self {
            conditions: IndexMap::new(),
        }
    }

    /// Builder-style insert; redefining a name replaces its condition.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, condition: impl Into<String>) -> Self {
        self.insert(name, condition);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, condition: impl Into<String>) {
        self.conditions.insert(name.into(), condition.into());
    }

    /// Media query list for `name`, if known.
    pub fn condition(&self, name: &str) -> Option<&str> {
        self.conditions.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.conditions.contains_key(name)
    }

    /// Breakpoint names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.conditions.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}

impl Default for Breakpoints {
    fn default() -> Self {
        DEFAULT_BREAKPOINTS.into_iter().collect()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Breakpoints {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut set = Self::empty();
        for (name, condition) in iter {
            set.insert(name, condition);
        }
        set
    }
}
