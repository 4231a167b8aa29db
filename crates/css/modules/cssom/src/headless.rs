//! In-memory stylesheet backend used for server-side collection and tests.

use crate::{BackendCapabilities, BackendError, RuleListId, StyleSheetBackend};
use core::mem;
use css_syntax::{CssRule, Declaration, MediaRule, StyleRule, parse_rule};
use log::trace;
use std::collections::HashMap;

/// One mutation performed on a [`HeadlessBackend`], recorded in call order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BackendOp {
    CreateSheet(RuleListId),
    Insert {
        list: RuleListId,
        index: usize,
        text: String,
    },
    Delete {
        list: RuleListId,
        index: usize,
    },
    SetProperty {
        list: RuleListId,
        index: usize,
        name: String,
    },
    RemoveProperty {
        list: RuleListId,
        index: usize,
        name: String,
    },
    Replace {
        list: RuleListId,
        index: usize,
    },
}

/// A rule as stored in a headless rule list.
#[derive(Clone, Debug)]
enum HeadlessRule {
    Style(StyleRule),
    Group { condition: String, list: RuleListId },
}

/// Stylesheets kept entirely in memory.
///
/// Rule text is parsed with `css_syntax`, so malformed text is rejected exactly
/// where a browser's `insertRule` would throw.
#[derive(Debug)]
pub struct HeadlessBackend {
    capabilities: BackendCapabilities,
    /// Every live rule list, top-level sheets and group bodies alike.
    lists: HashMap<RuleListId, Vec<HeadlessRule>>,
    /// Top-level sheets in creation order.
    sheets: Vec<RuleListId>,
    next_list: u64,
    /// Mutation log, drained by `take_operations`.
    operations: Vec<BackendOp>,
}

impl Default for HeadlessBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessBackend {
    /// A backend supporting every primitive.
    pub fn new() -> Self {
        Self::with_capabilities(BackendCapabilities::FULL)
    }

    /// A backend that emulates a host with reduced support.
    pub fn with_capabilities(capabilities: BackendCapabilities) -> Self {
        Self {
            capabilities,
            lists: HashMap::new(),
            sheets: Vec::new(),
            next_list: 0,
            operations: Vec::new(),
        }
    }

    /// Top-level sheets in creation order.
    pub fn sheets(&self) -> &[RuleListId] {
        &self.sheets
    }

    /// Drain the mutation log.
    pub fn take_operations(&mut self) -> Vec<BackendOp> {
        mem::take(&mut self.operations)
    }

    /// Count style rules across every sheet, including those nested in groups.
    pub fn style_rule_count(&self) -> usize {
        self.sheets
            .iter()
            .map(|&list| self.style_rules_in(list))
            .sum()
    }

    /// Serialize one rule list, one rule per line.
    ///
    /// # Errors
    /// [`BackendError::UnknownList`] for stale handles.
    pub fn list_text(&self, list: RuleListId) -> Result<String, BackendError> {
        let rules = self.list(list)?;
        let lines: Vec<String> = rules
            .iter()
            .map(|rule| self.to_css_rule(rule).to_string())
            .collect();
        Ok(lines.join("\n"))
    }

    /// Serialize every sheet in creation order, skipping empty ones.
    pub fn to_css_text(&self) -> String {
        let mut sheets: Vec<String> = Vec::new();
        for &list in &self.sheets {
            match self.list_text(list) {
                Ok(text) if !text.is_empty() => sheets.push(text),
                Ok(_) | Err(_) => {}
            }
        }
        sheets.join("\n")
    }

    fn style_rules_in(&self, list: RuleListId) -> usize {
        self.lists.get(&list).map_or(0, |rules| {
            rules
                .iter()
                .map(|rule| match rule {
                    HeadlessRule::Style(_) => 1,
                    HeadlessRule::Group { list: inner, .. } => self.style_rules_in(*inner),
                })
                .sum()
        })
    }

    fn alloc_list(&mut self) -> RuleListId {
        let id = RuleListId(self.next_list);
        self.next_list = self.next_list.wrapping_add(1);
        id
    }

    fn list(&self, list: RuleListId) -> Result<&Vec<HeadlessRule>, BackendError> {
        self.lists.get(&list).ok_or(BackendError::UnknownList(list))
    }

    fn list_mut(&mut self, list: RuleListId) -> Result<&mut Vec<HeadlessRule>, BackendError> {
        self.lists
            .get_mut(&list)
            .ok_or(BackendError::UnknownList(list))
    }

    fn rule_at(&self, list: RuleListId, index: usize) -> Result<&HeadlessRule, BackendError> {
        let rules = self.list(list)?;
        rules.get(index).ok_or(BackendError::IndexOutOfRange {
            list,
            index,
            len: rules.len(),
        })
    }

    fn style_at_mut(
        &mut self,
        list: RuleListId,
        index: usize,
    ) -> Result<&mut StyleRule, BackendError> {
        let rules = self.list_mut(list)?;
        let len = rules.len();
        match rules.get_mut(index) {
            Some(HeadlessRule::Style(style)) => Ok(style),
            Some(HeadlessRule::Group { .. }) => Err(BackendError::WrongRuleKind {
                list,
                index,
                expected: "style rule",
            }),
            None => Err(BackendError::IndexOutOfRange { list, index, len }),
        }
    }

    /// Store a parsed rule, allocating lists for any nested groups.
    fn materialize(&mut self, rule: CssRule) -> HeadlessRule {
        match rule {
            CssRule::Style(style) => HeadlessRule::Style(style),
            CssRule::Media(media) => {
                let list = self.alloc_list();
                let nested: Vec<HeadlessRule> = media
                    .rules
                    .into_iter()
                    .map(|inner| self.materialize(inner))
                    .collect();
                self.lists.insert(list, nested);
                HeadlessRule::Group {
                    condition: media.condition,
                    list,
                }
            }
        }
    }

    /// Drop a rule list and everything nested inside it.
    fn release_list(&mut self, list: RuleListId) {
        if let Some(rules) = self.lists.remove(&list) {
            for rule in rules {
                if let HeadlessRule::Group { list: inner, .. } = rule {
                    self.release_list(inner);
                }
            }
        }
    }

    fn to_css_rule(&self, rule: &HeadlessRule) -> CssRule {
        match rule {
            HeadlessRule::Style(style) => CssRule::Style(style.clone()),
            HeadlessRule::Group { condition, list } => CssRule::Media(MediaRule {
                condition: condition.clone(),
                rules: self.lists.get(list).map_or_else(Vec::new, |rules| {
                    rules.iter().map(|inner| self.to_css_rule(inner)).collect()
                }),
            }),
        }
    }
}

/// Parse rule text the way a host `insertRule` would.
fn parse_rule_text(rule_text: &str) -> Result<CssRule, BackendError> {
    parse_rule(rule_text).map_err(|source| BackendError::InvalidRule {
        text: rule_text.to_owned(),
        source,
    })
}

impl StyleSheetBackend for HeadlessBackend {
    fn capabilities(&self) -> BackendCapabilities {
        self.capabilities
    }

    fn create_sheet(&mut self) -> Result<RuleListId, BackendError> {
        if !self.capabilities.stylesheets {
            return Err(BackendError::Unsupported("stylesheets"));
        }
        let list = self.alloc_list();
        self.lists.insert(list, Vec::new());
        self.sheets.push(list);
        self.operations.push(BackendOp::CreateSheet(list));
        trace!("headless: created sheet {list:?}");
        Ok(list)
    }

    fn insert_rule(
        &mut self,
        list: RuleListId,
        rule_text: &str,
        index: usize,
    ) -> Result<usize, BackendError> {
        let len = self.list(list)?.len();
        if index > len {
            return Err(BackendError::IndexOutOfRange { list, index, len });
        }
        let parsed = parse_rule_text(rule_text)?;
        let rule = self.materialize(parsed);
        self.list_mut(list)?.insert(index, rule);
        self.operations.push(BackendOp::Insert {
            list,
            index,
            text: rule_text.to_owned(),
        });
        trace!("headless: inserted {rule_text:?} at {list:?}[{index}]");
        Ok(index)
    }

    fn delete_rule(&mut self, list: RuleListId, index: usize) -> Result<(), BackendError> {
        let rules = self.list_mut(list)?;
        if index >= rules.len() {
            return Err(BackendError::IndexOutOfRange {
                list,
                index,
                len: rules.len(),
            });
        }
        if let HeadlessRule::Group { list: inner, .. } = rules.remove(index) {
            self.release_list(inner);
        }
        self.operations.push(BackendOp::Delete { list, index });
        trace!("headless: deleted {list:?}[{index}]");
        Ok(())
    }

    fn rule_count(&self, list: RuleListId) -> Result<usize, BackendError> {
        Ok(self.list(list)?.len())
    }

    fn selector_text_at(
        &self,
        list: RuleListId,
        index: usize,
    ) -> Result<Option<String>, BackendError> {
        Ok(match self.rule_at(list, index)? {
            HeadlessRule::Style(style) => Some(style.prelude.clone()),
            HeadlessRule::Group { .. } => None,
        })
    }

    fn declarations_at(
        &self,
        list: RuleListId,
        index: usize,
    ) -> Result<Vec<Declaration>, BackendError> {
        match self.rule_at(list, index)? {
            HeadlessRule::Style(style) => Ok(style.declarations.clone()),
            HeadlessRule::Group { .. } => Err(BackendError::WrongRuleKind {
                list,
                index,
                expected: "style rule",
            }),
        }
    }

    fn group_rules_at(&self, list: RuleListId, index: usize) -> Result<RuleListId, BackendError> {
        match self.rule_at(list, index)? {
            HeadlessRule::Group { list: inner, .. } => Ok(*inner),
            HeadlessRule::Style(_) => Err(BackendError::WrongRuleKind {
                list,
                index,
                expected: "group rule",
            }),
        }
    }

    fn set_property(
        &mut self,
        list: RuleListId,
        index: usize,
        declaration: &Declaration,
    ) -> Result<(), BackendError> {
        if !self.capabilities.incremental_properties {
            return Err(BackendError::Unsupported("incremental property edits"));
        }
        let style = self.style_at_mut(list, index)?;
        if let Some(existing) = style
            .declarations
            .iter_mut()
            .find(|decl| decl.name == declaration.name)
        {
            existing.clone_from(declaration);
        } else {
            style.declarations.push(declaration.clone());
        }
        self.operations.push(BackendOp::SetProperty {
            list,
            index,
            name: declaration.name.clone(),
        });
        Ok(())
    }

    fn remove_property(
        &mut self,
        list: RuleListId,
        index: usize,
        name: &str,
    ) -> Result<(), BackendError> {
        if !self.capabilities.incremental_properties {
            return Err(BackendError::Unsupported("incremental property edits"));
        }
        let style = self.style_at_mut(list, index)?;
        style.declarations.retain(|decl| decl.name != name);
        self.operations.push(BackendOp::RemoveProperty {
            list,
            index,
            name: name.to_owned(),
        });
        Ok(())
    }

    fn replace_rule_text(
        &mut self,
        list: RuleListId,
        index: usize,
        rule_text: &str,
    ) -> Result<(), BackendError> {
        if !self.capabilities.atomic_replace {
            return Err(BackendError::Unsupported("atomic rule replacement"));
        }
        let CssRule::Style(replacement) = parse_rule_text(rule_text)? else {
            return Err(BackendError::WrongRuleKind {
                list,
                index,
                expected: "style rule",
            });
        };
        let style = self.style_at_mut(list, index)?;
        *style = replacement;
        self.operations.push(BackendOp::Replace { list, index });
        Ok(())
    }
}
