//! Option schema type definitions.
//!
//! This module defines the data model a sub-command front-end declares its
//! options with. The types are designed for serialization with [`serde`] so
//! an effective schema can be dumped as JSON for inspection, with the single
//! exception of coercion functions, which are skipped.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Value type of an option.
///
/// # Examples
///
/// ```
/// use command_dispatch_core::ValueType;
///
/// assert_eq!(ValueType::Bool.to_string(), "boolean");
/// assert_eq!(ValueType::Number.to_string(), "number");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    /// Flag without a value (`--verbose`).
    #[serde(rename = "boolean")]
    Bool,
    /// Single string value.
    String,
    /// Numeric value.
    Number,
    /// Repeatable string value (`--ignore-files a b`).
    Array,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => write!(f, "boolean"),
            Self::String => write!(f, "string"),
            Self::Number => write!(f, "number"),
            Self::Array => write!(f, "array"),
        }
    }
}

/// A typed option value.
///
/// Serializes untagged, so a map of values renders as plain JSON.
///
/// # Examples
///
/// ```
/// use command_dispatch_core::{OptionValue, ValueType};
///
/// let value = OptionValue::from("text");
/// assert_eq!(value.as_str(), Some("text"));
/// assert_eq!(value.value_type(), ValueType::String);
///
/// assert_eq!(OptionValue::from(3.0).to_string(), "3");
/// assert_eq!(OptionValue::from(true).as_bool(), Some(true));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<String>),
}

impl OptionValue {
    /// Returns the [`ValueType`] this value belongs to.
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Bool(_) => ValueType::Bool,
            Self::Number(_) => ValueType::Number,
            Self::String(_) => ValueType::String,
            Self::Array(_) => ValueType::Array,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[String]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s}"),
            Self::Array(items) => write!(f, "{}", items.join(",")),
        }
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for OptionValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Vec<String>> for OptionValue {
    fn from(value: Vec<String>) -> Self {
        Self::Array(value)
    }
}

/// Error returned by a [`Coercion`] that rejects its input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct CoerceError(pub String);

/// Pure conversion applied to an option value after extraction.
///
/// Coercions must be deterministic: the same input always yields the same
/// output. They are shared between clones of a schema.
///
/// # Examples
///
/// ```
/// use command_dispatch_core::{CoerceError, Coercion, OptionValue};
///
/// let upper = Coercion::new(|value| match value {
///     OptionValue::String(s) => Ok(OptionValue::String(s.to_uppercase())),
///     other => Err(CoerceError(format!("expected a string, got {other}"))),
/// });
/// assert_eq!(upper.apply("abc".into()), Ok(OptionValue::from("ABC")));
/// assert!(upper.apply(true.into()).is_err());
/// ```
#[derive(Clone)]
pub struct Coercion(Arc<dyn Fn(OptionValue) -> Result<OptionValue, CoerceError> + Send + Sync>);

impl Coercion {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(OptionValue) -> Result<OptionValue, CoerceError> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn apply(&self, value: OptionValue) -> Result<OptionValue, CoerceError> {
        (self.0)(value)
    }
}

impl fmt::Debug for Coercion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Coercion(..)")
    }
}

/// Declaration of a single option.
///
/// Use the typed constructors ([`boolean`](OptionSpec::boolean),
/// [`string`](OptionSpec::string), [`number`](OptionSpec::number),
/// [`array`](OptionSpec::array)) and chain builder methods.
///
/// `required` is tri-state: `None` means the caller did not decide, which
/// the merge step resolves before an option reaches a command's effective
/// schema.
///
/// # Examples
///
/// ```
/// use command_dispatch_core::{OptionSpec, ValueType};
///
/// let output = OptionSpec::string("The type of output to generate")
///     .with_alias('o')
///     .with_default("text")
///     .with_choices(&["json", "text"]);
///
/// assert_eq!(output.value_type, ValueType::String);
/// assert_eq!(output.alias, Some('o'));
/// assert!(output.takes_value());
/// assert!(output.required.is_none());
/// assert!(output.allows("json"));
/// assert!(!output.allows("xml"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionSpec {
    /// Single-letter shorthand (`-o`).
    pub alias: Option<char>,
    /// Help text.
    pub description: String,
    pub value_type: ValueType,
    /// Value used when no other source supplies one.
    pub default: Option<OptionValue>,
    /// `None` until resolved by the merge step.
    pub required: Option<bool>,
    /// Reject the flag when it is given without a value.
    pub requires_arg: bool,
    /// Allowed values for string and array options.
    pub choices: Option<Vec<String>>,
    #[serde(skip)]
    pub coerce: Option<Coercion>,
    /// Visible to every command.
    pub global: bool,
    /// Lexically normalize the value as a filesystem path.
    pub normalize: bool,
    /// Keep the option out of help output.
    pub hidden: bool,
}

impl OptionSpec {
    /// Creates an option of the given type with every flag unset.
    pub fn new(value_type: ValueType, description: &str) -> Self {
        Self {
            alias: None,
            description: description.to_string(),
            value_type,
            default: None,
            required: None,
            requires_arg: false,
            choices: None,
            coerce: None,
            global: false,
            normalize: false,
            hidden: false,
        }
    }

    pub fn boolean(description: &str) -> Self {
        Self::new(ValueType::Bool, description)
    }

    pub fn string(description: &str) -> Self {
        Self::new(ValueType::String, description)
    }

    pub fn number(description: &str) -> Self {
        Self::new(ValueType::Number, description)
    }

    pub fn array(description: &str) -> Self {
        Self::new(ValueType::Array, description)
    }

    pub fn with_alias(mut self, alias: char) -> Self {
        self.alias = Some(alias);
        self
    }

    pub fn with_default(mut self, value: impl Into<OptionValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Sets `required` explicitly.
    pub fn with_required(mut self, required: bool) -> Self {
        self.required = Some(required);
        self
    }

    pub fn requires_arg(mut self) -> Self {
        self.requires_arg = true;
        self
    }

    pub fn with_choices(mut self, choices: &[&str]) -> Self {
        self.choices = Some(choices.iter().map(|c| c.to_string()).collect());
        self
    }

    pub fn with_coerce<F>(mut self, f: F) -> Self
    where
        F: Fn(OptionValue) -> Result<OptionValue, CoerceError> + Send + Sync + 'static,
    {
        self.coerce = Some(Coercion::new(f));
        self
    }

    pub fn global(mut self) -> Self {
        self.global = true;
        self
    }

    pub fn normalized(mut self) -> Self {
        self.normalize = true;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// Returns `true` unless `required` was explicitly set to `false`.
    pub fn is_required(&self) -> bool {
        self.required != Some(false)
    }

    /// Returns `true` for every type except [`ValueType::Bool`].
    pub fn takes_value(&self) -> bool {
        self.value_type != ValueType::Bool
    }

    /// Checks `value` against `choices`. Options without choices allow
    /// anything.
    pub fn allows(&self, value: &str) -> bool {
        self.choices
            .as_ref()
            .is_none_or(|choices| choices.iter().any(|c| c == value))
    }
}

/// A set of option declarations keyed by option name.
///
/// Names are long-flag names without leading dashes (`source-dir`). Keys
/// iterate in sorted order.
///
/// # Examples
///
/// ```
/// use command_dispatch_core::{OptionSchema, OptionSpec};
///
/// let schema = OptionSchema::new()
///     .with_option("verbose", OptionSpec::boolean("Show verbose output").with_alias('v'))
///     .with_option("config", OptionSpec::string("Path to a config file"));
///
/// assert_eq!(schema.names(), vec!["config", "verbose"]);
/// assert_eq!(schema.find_alias('v').map(|(name, _)| name), Some("verbose"));
/// assert!(schema.get("missing").is_none());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OptionSchema {
    options: BTreeMap<String, OptionSpec>,
}

impl OptionSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an option, replacing any previous declaration of the same name.
    pub fn with_option(mut self, name: &str, spec: OptionSpec) -> Self {
        self.insert(name, spec);
        self
    }

    pub fn insert(&mut self, name: &str, spec: OptionSpec) -> Option<OptionSpec> {
        self.options.insert(name.to_string(), spec)
    }

    pub fn get(&self, name: &str) -> Option<&OptionSpec> {
        self.options.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut OptionSpec> {
        self.options.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.options.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.options.keys().map(String::as_str).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionSpec)> {
        self.options.iter().map(|(name, spec)| (name.as_str(), spec))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut OptionSpec)> {
        self.options
            .iter_mut()
            .map(|(name, spec)| (name.as_str(), spec))
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    /// Finds the option declaring `alias` as its shorthand.
    pub fn find_alias(&self, alias: char) -> Option<(&str, &OptionSpec)> {
        self.iter().find(|(_, spec)| spec.alias == Some(alias))
    }
}

impl FromIterator<(String, OptionSpec)> for OptionSchema {
    fn from_iter<I: IntoIterator<Item = (String, OptionSpec)>>(iter: I) -> Self {
        Self {
            options: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for OptionSchema {
    type Item = (String, OptionSpec);
    type IntoIter = std::collections::btree_map::IntoIter<String, OptionSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.options.into_iter()
    }
}
