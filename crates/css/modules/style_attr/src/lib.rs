//! Style maps — property/value data declared by application code.
//! See: <https://www.w3.org/TR/css-style-attr/>
//!
//! A [`StyleMap`] is an ordered mapping from camel-style or hyphenated property
//! names to values. Serialization turns it into a declaration block, dropping
//! pairs whose value is empty, null, or not representable.

#![forbid(unsafe_code)]

use css_syntax::{Declaration, serialize_declarations};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Raised when data handed in as a style map is not a mapping.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StyleInputError {
    /// The value was some other JSON kind.
    #[error("expected a style map, found {found}")]
    NotAMap {
        /// JSON kind that was supplied instead.
        found: &'static str,
    },
}

/// A single property value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StyleValue {
    /// Absent value; always dropped on serialization.
    Null,
    /// Numeric value, serialized without a unit.
    Number(f64),
    /// Raw value text, optionally ending in `!important`.
    Text(String),
}

impl StyleValue {
    /// CSS text for this value, or `None` if it must be dropped.
    pub fn to_css(&self) -> Option<String> {
        match self {
            Self::Null => None,
            Self::Number(number) => number.is_finite().then(|| format!("{number}")),
            Self::Text(text) => {
                let trimmed = text.trim();
                let (bare, _important) = css_syntax::split_important_tail(trimmed);
                (!bare.is_empty()).then(|| trimmed.to_owned())
            }
        }
    }

    /// Convert a JSON value; kinds with no CSS meaning become [`StyleValue::Null`].
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::String(text) => Self::Text(text.clone()),
            Value::Number(number) => number.as_f64().map_or(Self::Null, Self::Number),
            Value::Null | Value::Bool(_) | Value::Array(_) | Value::Object(_) => Self::Null,
        }
    }
}

impl From<&str> for StyleValue {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<String> for StyleValue {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<f64> for StyleValue {
    fn from(number: f64) -> Self {
        Self::Number(number)
    }
}

impl From<i32> for StyleValue {
    fn from(number: i32) -> Self {
        Self::Number(f64::from(number))
    }
}

impl<T: Into<Self>> From<Option<T>> for StyleValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Ordered property-name to value mapping.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StyleMap {
    /// Properties in declaration order.
    entries: IndexMap<String, StyleValue>,
}

impl StyleMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, property: impl Into<String>, value: impl Into<StyleValue>) -> Self {
        self.set(property, value);
        self
    }

    /// Insert or overwrite a property, keeping its original position.
    pub fn set(&mut self, property: impl Into<String>, value: impl Into<StyleValue>) {
        self.entries.insert(property.into(), value.into());
    }

    /// Remove a property, preserving the order of the rest.
    pub fn remove(&mut self, property: &str) -> Option<StyleValue> {
        self.entries.shift_remove(property)
    }

    /// Look up a property by the name it was declared with.
    pub fn get(&self, property: &str) -> Option<&StyleValue> {
        self.entries.get(property)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &StyleValue)> {
        self.entries
            .iter()
            .map(|(property, value)| (property.as_str(), value))
    }

    /// Build a map from a JSON object.
    ///
    /// # Errors
    /// Returns [`StyleInputError::NotAMap`] for anything but a JSON object.
    pub fn from_json(value: &Value) -> Result<Self, StyleInputError> {
        let Value::Object(object) = value else {
            return Err(StyleInputError::NotAMap {
                found: json_kind(value),
            });
        };
        Ok(object
            .iter()
            .map(|(property, raw)| (property.clone(), StyleValue::from_json(raw)))
            .collect())
    }

    /// Serializable declarations, in map order, with hyphenated names.
    ///
    /// Later entries that hyphenate to an already seen name overwrite it in place.
    pub fn to_declarations(&self) -> Vec<Declaration> {
        let mut out: IndexMap<String, Declaration> = IndexMap::new();
        for (property, value) in &self.entries {
            let Some(text) = value.to_css() else {
                continue;
            };
            let name = hyphenate(property);
            out.insert(name.clone(), Declaration::new(name, &text));
        }
        out.into_values().collect()
    }

    /// The declaration block text, e.g. `background-color: red; font-size: 12px;`.
    pub fn to_declaration_text(&self) -> String {
        serialize_declarations(&self.to_declarations())
    }
}

impl<K: Into<String>, V: Into<StyleValue>> FromIterator<(K, V)> for StyleMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (property, value) in iter {
            map.set(property, value);
        }
        map
    }
}

/// Name of a JSON value's kind, for diagnostics.
const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Convert a camel-style property name to its hyphenated CSS form.
///
/// `backgroundColor` becomes `background-color`, vendor names such as
/// `WebkitTransition` and `msTransform` gain a leading hyphen, and custom
/// properties (`--accent`) are returned unchanged.
pub fn hyphenate(property: &str) -> String {
    if property.starts_with("--") {
        return property.to_owned();
    }
    let mut out = String::with_capacity(property.len() + 4);
    if property.starts_with("ms")
        && property.chars().nth(2).is_some_and(|ch| ch.is_ascii_uppercase())
    {
        out.push('-');
    }
    for character in property.chars() {
        if character.is_ascii_uppercase() {
            out.push('-');
            out.push(character.to_ascii_lowercase());
        } else {
            out.push(character);
        }
    }
    out
}
