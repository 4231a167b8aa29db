//! CSS Syntax Module Level 3 — Parsing of single rules and declaration blocks.
//! See: <https://www.w3.org/TR/css-syntax-3/>
//!
//! Parsing here is strict: stylesheet backends use it to reject malformed rule
//! text instead of silently dropping it.
use core::fmt;
use cssparser::AtRuleParser as CssAtRuleParser;
use cssparser::BasicParseErrorKind;
use cssparser::CowRcStr;
use cssparser::DeclarationParser as CssDeclarationParser;
use cssparser::ParseError;
use cssparser::Parser;
use cssparser::ParserInput;
use cssparser::ParserState;
use cssparser::QualifiedRuleParser as CssQualifiedRuleParser;
use cssparser::RuleBodyItemParser as CssRuleBodyItemParser;
use cssparser::RuleBodyParser as CssRuleBodyParser;
use cssparser::StyleSheetParser;
use thiserror::Error;

/// Errors produced when rule or declaration text is not well formed.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SyntaxError {
    /// The input contained no rule at all.
    #[error("no rule found in input")]
    Empty,
    /// The input contained more than one top-level rule.
    #[error("expected a single rule, found several")]
    MultipleRules,
    /// A rule could not be parsed.
    #[error("invalid rule `{text}`: {reason}")]
    InvalidRule {
        /// Source slice the parser gave up on.
        text: String,
        /// Parser diagnostic.
        reason: String,
    },
    /// A declaration inside a block could not be parsed.
    #[error("invalid declaration `{text}`: {reason}")]
    InvalidDeclaration {
        /// Source slice the parser gave up on.
        text: String,
        /// Parser diagnostic.
        reason: String,
    },
}

/// A single CSS declaration (property: value [!important]).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Declaration {
    /// Property name; lowercased unless it is a custom property.
    pub name: String,
    /// Raw value text (without trailing !important).
    pub value: String,
    /// Whether the declaration was marked as `!important`.
    pub important: bool,
}

impl Declaration {
    /// Build a declaration, splitting a trailing `!important` off `value`.
    pub fn new(name: impl Into<String>, value: &str) -> Self {
        let (bare, important) = split_important_tail(value);
        Self {
            name: name.into(),
            value: bare,
            important,
        }
    }
}

impl fmt::Display for Declaration {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.important {
            write!(formatter, "{}: {} !important", self.name, self.value)
        } else {
            write!(formatter, "{}: {}", self.name, self.value)
        }
    }
}

/// A single style rule with a raw prelude and parsed declarations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StyleRule {
    /// Raw prelude text (typically the selector list).
    pub prelude: String,
    /// Declarations within the rule block.
    pub declarations: Vec<Declaration>,
}

/// A `@media` group rule and the rules nested inside it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MediaRule {
    /// Raw media query list, e.g. `screen and (max-width: 599px)`.
    pub condition: String,
    /// Nested rules in source order.
    pub rules: Vec<CssRule>,
}

/// Any rule this crate understands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CssRule {
    /// A qualified style rule.
    Style(StyleRule),
    /// A `@media` grouping rule.
    Media(MediaRule),
}

impl fmt::Display for CssRule {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Style(rule) => {
                let body = serialize_declarations(&rule.declarations);
                if body.is_empty() {
                    write!(formatter, "{} {{ }}", rule.prelude)
                } else {
                    write!(formatter, "{} {{ {body} }}", rule.prelude)
                }
            }
            Self::Media(rule) => {
                write!(formatter, "@media {} {{", rule.condition)?;
                for nested in &rule.rules {
                    write!(formatter, " {nested}")?;
                }
                write!(formatter, " }}")
            }
        }
    }
}

/// Parse `!important` at the end of a value, returning (`value_without_important`, `important_flag`).
pub fn split_important_tail(value: &str) -> (String, bool) {
    let trimmed = value.trim();
    if let Some(pos) = trimmed.rfind("!important")
        && trimmed.get(pos..).is_some_and(|tail| tail == "!important")
        && let Some(prefix) = trimmed.get(..pos)
    {
        let head = prefix.trim_end();
        return (head.to_owned(), true);
    }
    (trimmed.to_owned(), false)
}

/// Serialize declarations as `name: value;` items joined by a single space.
pub fn serialize_declarations(declarations: &[Declaration]) -> String {
    let mut out = String::new();
    for decl in declarations {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(&decl.to_string());
        out.push(';');
    }
    out
}

/// Property names are ASCII case-insensitive, custom properties are not.
fn normalize_property_name(name: &str) -> String {
    if name.starts_with("--") {
        name.to_owned()
    } else {
        name.to_ascii_lowercase()
    }
}

/// A declaration parser that records property name and its raw value.
struct BodyDeclParser;

impl<'i> CssDeclarationParser<'i> for BodyDeclParser {
    type Declaration = Declaration;
    type Error = ();

    fn parse_value<'t>(
        &mut self,
        name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
        _decl_start: &ParserState,
    ) -> Result<Self::Declaration, ParseError<'i, Self::Error>> {
        let start = input.position();
        // Consume until end of the declaration item.
        while input.next_including_whitespace_and_comments().is_ok() {}
        let raw = input.slice_from(start);
        let (value, important) = split_important_tail(raw);
        if value.is_empty() {
            return Err(input.new_custom_error(()));
        }
        Ok(Declaration {
            name: normalize_property_name(&name),
            value,
            important,
        })
    }
}

impl<'i> CssAtRuleParser<'i> for BodyDeclParser {
    type Prelude = ();
    type AtRule = Declaration; // Not produced
    type Error = ();

    #[inline]
    fn parse_prelude<'t>(
        &mut self,
        name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::Prelude, ParseError<'i, Self::Error>> {
        Err(input.new_error(BasicParseErrorKind::AtRuleInvalid(name)))
    }

    #[inline]
    fn parse_block<'t>(
        &mut self,
        _prelude: Self::Prelude,
        _state: &ParserState,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::AtRule, ParseError<'i, Self::Error>> {
        Err(input.new_error(BasicParseErrorKind::AtRuleBodyInvalid))
    }

    #[inline]
    fn rule_without_block(
        &mut self,
        _prelude: Self::Prelude,
        _state: &ParserState,
    ) -> Result<Self::AtRule, ()> {
        Err(())
    }
}

impl<'i> CssQualifiedRuleParser<'i> for BodyDeclParser {
    type Prelude = ();
    type QualifiedRule = Declaration; // Not produced
    type Error = ();

    #[inline]
    fn parse_prelude<'t>(
        &mut self,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::Prelude, ParseError<'i, Self::Error>> {
        Err(input.new_error(BasicParseErrorKind::QualifiedRuleInvalid))
    }

    #[inline]
    fn parse_block<'t>(
        &mut self,
        _prelude: Self::Prelude,
        _state: &ParserState,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::QualifiedRule, ParseError<'i, Self::Error>> {
        Err(input.new_error(BasicParseErrorKind::QualifiedRuleInvalid))
    }
}

impl<'i> CssRuleBodyItemParser<'i, Declaration, ()> for BodyDeclParser {
    fn parse_declarations(&self) -> bool {
        true
    }
    fn parse_qualified(&self) -> bool {
        false
    }
}

/// Top-level parser that builds style rules and `@media` groups.
struct TopLevelParser;

impl<'i> CssAtRuleParser<'i> for TopLevelParser {
    type Prelude = String; // raw media query list
    type AtRule = CssRule;
    type Error = ();

    #[inline]
    fn parse_prelude<'t>(
        &mut self,
        name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::Prelude, ParseError<'i, Self::Error>> {
        if !name.eq_ignore_ascii_case("media") {
            return Err(input.new_error(BasicParseErrorKind::AtRuleInvalid(name)));
        }
        let start = input.position();
        while input.next_including_whitespace_and_comments().is_ok() {}
        Ok(input.slice_from(start).trim().to_owned())
    }

    #[inline]
    fn parse_block<'t>(
        &mut self,
        prelude: Self::Prelude,
        _state: &ParserState,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::AtRule, ParseError<'i, Self::Error>> {
        let mut nested = Self;
        let mut rules = Vec::new();
        for item in StyleSheetParser::new(input, &mut nested) {
            let rule = item.map_err(|(error, _slice)| error)?;
            rules.push(rule);
        }
        Ok(CssRule::Media(MediaRule {
            condition: prelude,
            rules,
        }))
    }

    #[inline]
    fn rule_without_block(
        &mut self,
        _prelude: Self::Prelude,
        _state: &ParserState,
    ) -> Result<Self::AtRule, ()> {
        // `@media` without a block is meaningless.
        Err(())
    }
}

impl<'i> CssQualifiedRuleParser<'i> for TopLevelParser {
    type Prelude = String; // raw selector/prelude
    type QualifiedRule = CssRule;
    type Error = ();

    #[inline]
    fn parse_prelude<'t>(
        &mut self,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::Prelude, ParseError<'i, Self::Error>> {
        let start = input.state();
        while input.next_including_whitespace_and_comments().is_ok() {}
        let prelude = input.slice_from(start.position()).trim().to_owned();
        if prelude.is_empty() {
            return Err(input.new_error(BasicParseErrorKind::QualifiedRuleInvalid));
        }
        Ok(prelude)
    }

    #[inline]
    fn parse_block<'t>(
        &mut self,
        prelude: Self::Prelude,
        _state: &ParserState,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::QualifiedRule, ParseError<'i, Self::Error>> {
        let declarations = parse_declarations_from_block(input)?;
        Ok(CssRule::Style(StyleRule {
            prelude,
            declarations,
        }))
    }
}

/// Parse declarations from a rule block, failing on the first malformed item.
fn parse_declarations_from_block<'i>(
    block: &mut Parser<'i, '_>,
) -> Result<Vec<Declaration>, ParseError<'i, ()>> {
    let mut out: Vec<Declaration> = Vec::new();
    let mut body = BodyDeclParser;
    for item in CssRuleBodyParser::new(block, &mut body) {
        let decl = item.map_err(|(error, _slice)| error)?;
        out.push(decl);
    }
    Ok(out)
}

/// Parse exactly one rule (a style rule or a `@media` group).
///
/// # Errors
/// Returns [`SyntaxError`] when the text is empty, holds more than one rule, or is malformed.
pub fn parse_rule(css: &str) -> Result<CssRule, SyntaxError> {
    let mut input = ParserInput::new(css);
    let mut parser = Parser::new(&mut input);
    let mut top = TopLevelParser;
    let mut rules = StyleSheetParser::new(&mut parser, &mut top);
    let first = match rules.next() {
        None => return Err(SyntaxError::Empty),
        Some(Err((error, slice))) => {
            return Err(SyntaxError::InvalidRule {
                text: slice.to_owned(),
                reason: format!("{:?}", error.kind),
            });
        }
        Some(Ok(rule)) => rule,
    };
    if rules.next().is_some() {
        return Err(SyntaxError::MultipleRules);
    }
    Ok(first)
}

/// Parse a bare declaration list such as `color: red; font-size: 12px;`.
///
/// # Errors
/// Returns [`SyntaxError::InvalidDeclaration`] on the first malformed declaration.
pub fn parse_declaration_list(css: &str) -> Result<Vec<Declaration>, SyntaxError> {
    let mut input = ParserInput::new(css);
    let mut parser = Parser::new(&mut input);
    let mut out: Vec<Declaration> = Vec::new();
    let mut body = BodyDeclParser;
    for item in CssRuleBodyParser::new(&mut parser, &mut body) {
        match item {
            Ok(decl) => out.push(decl),
            Err((error, slice)) => {
                return Err(SyntaxError::InvalidDeclaration {
                    text: slice.to_owned(),
                    reason: format!("{:?}", error.kind),
                });
            }
        }
    }
    Ok(out)
}
