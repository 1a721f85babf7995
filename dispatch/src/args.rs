//! Parsed argument values handed to executors.

use std::collections::BTreeMap;

use command_dispatch_core::OptionValue;
use serde::Serialize;

/// Where an option value came from. Variants are ordered from highest to
/// lowest precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueSource {
    CommandLine,
    Environment,
    ConfigFile,
    Default,
}

/// The structured result of parsing one invocation.
///
/// Holds the positional tokens (the command name first), every declared
/// option that resolved to a value, and the source of each value.
///
/// # Examples
///
/// ```
/// use command_dispatch::{ParsedArgs, ValueSource};
///
/// let mut args = ParsedArgs::new(vec!["lint".into()]);
/// args.insert("output", "json".into(), ValueSource::Environment);
///
/// assert_eq!(args.command(), Some("lint"));
/// assert_eq!(args.get_str("output"), Some("json"));
/// assert_eq!(args.source("output"), Some(ValueSource::Environment));
/// assert!(!args.get_bool("verbose"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParsedArgs {
    positionals: Vec<String>,
    options: BTreeMap<String, OptionValue>,
    sources: BTreeMap<String, ValueSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<String>,
}

impl ParsedArgs {
    pub fn new(positionals: Vec<String>) -> Self {
        Self {
            positionals,
            ..Default::default()
        }
    }

    /// The invoked command name, if any.
    pub fn command(&self) -> Option<&str> {
        self.positionals.first().map(String::as_str)
    }

    pub fn positionals(&self) -> &[String] {
        &self.positionals
    }

    pub(crate) fn set_positionals(&mut self, positionals: Vec<String>) {
        self.positionals = positionals;
    }

    pub fn insert(&mut self, name: &str, value: OptionValue, source: ValueSource) {
        self.options.insert(name.to_string(), value);
        self.sources.insert(name.to_string(), source);
    }

    pub fn get(&self, name: &str) -> Option<&OptionValue> {
        self.options.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(OptionValue::as_str)
    }

    /// Returns the flag value, `false` when unset or not a boolean.
    pub fn get_bool(&self, name: &str) -> bool {
        self.get(name)
            .and_then(OptionValue::as_bool)
            .unwrap_or(false)
    }

    pub fn get_number(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(OptionValue::as_number)
    }

    pub fn get_array(&self, name: &str) -> Option<&[String]> {
        self.get(name).and_then(OptionValue::as_array)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.options.contains_key(name)
    }

    pub fn source(&self, name: &str) -> Option<ValueSource> {
        self.sources.get(name).copied()
    }

    pub fn options(&self) -> &BTreeMap<String, OptionValue> {
        &self.options
    }

    /// Version string of the running program, set by the dispatcher.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub(crate) fn set_version(&mut self, version: &str) {
        self.version = Some(version.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_source_precedence_order() {
        let mut sources = vec![
            ValueSource::Default,
            ValueSource::CommandLine,
            ValueSource::ConfigFile,
            ValueSource::Environment,
        ];
        sources.sort();

        assert_eq!(
            sources,
            vec![
                ValueSource::CommandLine,
                ValueSource::Environment,
                ValueSource::ConfigFile,
                ValueSource::Default,
            ]
        );
    }

    #[test]
    fn test_serializes_options_and_sources() {
        let mut args = ParsedArgs::new(vec!["build".into()]);
        args.insert("overwrite-dest", true.into(), ValueSource::CommandLine);
        args.set_version("1.2.3");

        let json = serde_json::to_value(&args).unwrap();
        assert_eq!(json["positionals"][0], "build");
        assert_eq!(json["options"]["overwrite-dest"], true);
        assert_eq!(json["sources"]["overwrite-dest"], "command_line");
        assert_eq!(json["version"], "1.2.3");
    }

    #[test]
    fn test_missing_command() {
        assert!(ParsedArgs::default().command().is_none());
    }
}
