//! CSS Object Model — the stylesheet backend seam.
//! See: <https://www.w3.org/TR/cssom-1/#the-cssstylesheet-interface>
//!
//! [`StyleSheetBackend`] is the small set of stylesheet primitives the rule
//! engine needs from its host: create a sheet, insert and delete rules by
//! position, enumerate selectors, and patch declarations. A browser host maps it
//! onto `CSSStyleSheet`; [`HeadlessBackend`] keeps everything in memory for
//! server-side style collection and tests.

#![forbid(unsafe_code)]

mod headless;

use css_syntax::{Declaration, SyntaxError};
use thiserror::Error;

pub use headless::{BackendOp, HeadlessBackend};

/// Opaque handle to an ordered rule list: a sheet, or the body of a group rule.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleListId(pub u64);

/// What the host stylesheet API supports.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BackendCapabilities {
    /// Stylesheets can be created at all.
    pub stylesheets: bool,
    /// Single declarations can be set and removed on a live rule.
    pub incremental_properties: bool,
    /// A live rule's text can be replaced in one step.
    pub atomic_replace: bool,
}

impl BackendCapabilities {
    /// Everything supported.
    pub const FULL: Self = Self {
        stylesheets: true,
        incremental_properties: true,
        atomic_replace: true,
    };
}

impl Default for BackendCapabilities {
    fn default() -> Self {
        Self::FULL
    }
}

/// Failures reported by a stylesheet backend.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum BackendError {
    /// The host does not offer the requested primitive.
    #[error("backend does not support {0}")]
    Unsupported(&'static str),
    /// Rule text was rejected by the host parser.
    #[error("rule text rejected: {text}")]
    InvalidRule {
        /// The rejected text.
        text: String,
        #[source]
        source: SyntaxError,
    },
    /// The handle does not name a live rule list.
    #[error("unknown rule list {0:?}")]
    UnknownList(RuleListId),
    /// A position past the end of a rule list.
    #[error("index {index} out of range for {list:?} of length {len}")]
    IndexOutOfRange {
        list: RuleListId,
        index: usize,
        len: usize,
    },
    /// The rule at this position is not of the kind the call requires.
    #[error("rule {index} in {list:?} is not a {expected}")]
    WrongRuleKind {
        list: RuleListId,
        index: usize,
        expected: &'static str,
    },
}

/// Stylesheet primitives consumed by the rule engine.
///
/// All positions are indices into a rule list at the time of the call; deleting
/// a rule shifts every later index down by one.
pub trait StyleSheetBackend {
    /// Report host support; queried once per bucket.
    fn capabilities(&self) -> BackendCapabilities;

    /// Create a new, empty stylesheet and return its top-level rule list.
    ///
    /// # Errors
    /// [`BackendError::Unsupported`] when the host cannot create sheets.
    fn create_sheet(&mut self) -> Result<RuleListId, BackendError>;

    /// Parse and insert `rule_text` at `index`, returning the position it landed at.
    ///
    /// # Errors
    /// [`BackendError::InvalidRule`] for malformed text, or an addressing error.
    fn insert_rule(
        &mut self,
        list: RuleListId,
        rule_text: &str,
        index: usize,
    ) -> Result<usize, BackendError>;

    /// Delete the rule at `index`.
    ///
    /// # Errors
    /// Addressing errors for unknown lists or positions.
    fn delete_rule(&mut self, list: RuleListId, index: usize) -> Result<(), BackendError>;

    /// Number of rules in `list`.
    ///
    /// # Errors
    /// [`BackendError::UnknownList`] for stale handles.
    fn rule_count(&self, list: RuleListId) -> Result<usize, BackendError>;

    /// Selector text of the style rule at `index`; `None` for group rules.
    ///
    /// # Errors
    /// Addressing errors for unknown lists or positions.
    fn selector_text_at(&self, list: RuleListId, index: usize)
    -> Result<Option<String>, BackendError>;

    /// Current declarations of the style rule at `index`.
    ///
    /// # Errors
    /// Addressing errors, or [`BackendError::WrongRuleKind`] for group rules.
    fn declarations_at(
        &self,
        list: RuleListId,
        index: usize,
    ) -> Result<Vec<Declaration>, BackendError>;

    /// Rule list nested inside the group rule at `index`.
    ///
    /// # Errors
    /// Addressing errors, or [`BackendError::WrongRuleKind`] for style rules.
    fn group_rules_at(&self, list: RuleListId, index: usize) -> Result<RuleListId, BackendError>;

    /// Set or overwrite one declaration on the style rule at `index`.
    ///
    /// # Errors
    /// [`BackendError::Unsupported`] without incremental support, or addressing errors.
    fn set_property(
        &mut self,
        list: RuleListId,
        index: usize,
        declaration: &Declaration,
    ) -> Result<(), BackendError>;

    /// Remove one declaration from the style rule at `index`; absent names are ignored.
    ///
    /// # Errors
    /// [`BackendError::Unsupported`] without incremental support, or addressing errors.
    fn remove_property(
        &mut self,
        list: RuleListId,
        index: usize,
        name: &str,
    ) -> Result<(), BackendError>;

    /// Replace the whole style rule at `index` with `rule_text`, keeping its position.
    ///
    /// # Errors
    /// [`BackendError::Unsupported`] without atomic replacement, or as for `insert_rule`.
    fn replace_rule_text(
        &mut self,
        list: RuleListId,
        index: usize,
        rule_text: &str,
    ) -> Result<(), BackendError>;
}
