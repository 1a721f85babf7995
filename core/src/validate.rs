//! Command name and option schema validation.
//!
//! Catches structural problems such as invalid names, clashing aliases and
//! defaults that contradict their own declaration before a schema reaches
//! the argument parser.
//!
//! # Examples
//!
//! ```
//! use command_dispatch_core::*;
//!
//! let schema = OptionSchema::new()
//!     .with_option("verbose", OptionSpec::boolean("Verbose").with_alias('v'));
//! assert!(validate_option_schema(&schema).is_empty());
//!
//! // Invalid: default outside of the declared choices
//! let bad = OptionSchema::new().with_option(
//!     "output",
//!     OptionSpec::string("Output").with_default("xml").with_choices(&["json", "text"]),
//! );
//! assert!(!validate_option_schema(&bad).is_empty());
//! ```

use std::collections::HashMap;

use thiserror::Error;

use crate::{OptionSchema, OptionSpec, OptionValue, ValueType};

/// Option names the argument parser reserves for itself.
pub const RESERVED_OPTION_NAMES: &[&str] = &["help", "version"];

/// Schema validation errors.
///
/// Each variant describes one structural problem. The `Display` impl
/// provides a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Command name is empty or whitespace-only.
    #[error("command name cannot be empty")]
    EmptyCommandName,
    /// Command name contains whitespace or starts with a dash.
    #[error("invalid command name: {0}")]
    InvalidCommandName(String),
    /// A command with this name is already registered.
    #[error("duplicate command: {0}")]
    DuplicateCommand(String),
    /// Option name is empty.
    #[error("option name cannot be empty")]
    EmptyOptionName,
    /// Option name is not lowercase kebab-case.
    #[error("invalid option name: {0}")]
    InvalidOptionName(String),
    /// Option name clashes with a parser-reserved flag.
    #[error("option name is reserved: {0}")]
    ReservedOptionName(String),
    /// Alias is not a single ASCII letter or digit.
    #[error("invalid alias for {option}: {alias:?}")]
    InvalidAlias { option: String, alias: char },
    /// Two options in the same scope share the same alias.
    #[error("alias -{alias} is declared by both {first} and {second}")]
    DuplicateAlias {
        alias: char,
        first: String,
        second: String,
    },
    /// Default value type does not match the declared value type.
    #[error("default for {option} is a {found}, expected a {expected}")]
    DefaultTypeMismatch {
        option: String,
        expected: ValueType,
        found: ValueType,
    },
    /// Default value is not one of the declared choices.
    #[error("default for {option} is not one of its choices: {value}")]
    DefaultNotInChoices { option: String, value: String },
    /// Choices declared on an option that cannot hold strings.
    #[error("choices are only supported on string and array options: {0}")]
    ChoicesOnNonString(String),
    /// Effective schema entry whose `required` flag was never resolved.
    #[error("required is unresolved for option: {0}")]
    UnresolvedRequired(String),
}

/// Validates a command name.
///
/// # Examples
///
/// ```
/// use command_dispatch_core::*;
///
/// assert!(validate_command_name("lint").is_empty());
/// assert_eq!(validate_command_name(" "), vec![ValidationError::EmptyCommandName]);
/// assert!(!validate_command_name("--lint").is_empty());
/// ```
pub fn validate_command_name(name: &str) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if name.trim().is_empty() {
        errors.push(ValidationError::EmptyCommandName);
        return errors;
    }

    if name.starts_with('-') || name.chars().any(char::is_whitespace) {
        errors.push(ValidationError::InvalidCommandName(name.to_string()));
    }

    errors
}

/// Validates an option schema.
///
/// Checks names, aliases, defaults and choices. Stops at the first problem.
pub fn validate_option_schema(schema: &OptionSchema) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut aliases: HashMap<char, &str> = HashMap::new();

    for (name, spec) in schema.iter() {
        errors.extend(validate_option(name, spec));
        if !errors.is_empty() {
            return errors;
        }

        if let Some(alias) = spec.alias {
            if let Some(first) = aliases.insert(alias, name) {
                errors.push(ValidationError::DuplicateAlias {
                    alias,
                    first: first.to_string(),
                    second: name.to_string(),
                });
                return errors;
            }
        }
    }

    errors
}

/// Validates a merged schema: structural checks plus the requirement that
/// every entry has `required` resolved.
///
/// # Examples
///
/// ```
/// use command_dispatch_core::*;
///
/// let unresolved = OptionSchema::new().with_option("output", OptionSpec::string("Output"));
/// assert_eq!(
///     validate_effective_schema(&unresolved),
///     vec![ValidationError::UnresolvedRequired("output".into())]
/// );
///
/// let effective = effective_command_schema(&OptionSchema::new(), &unresolved);
/// assert!(validate_effective_schema(&effective).is_empty());
/// ```
pub fn validate_effective_schema(schema: &OptionSchema) -> Vec<ValidationError> {
    let errors = validate_option_schema(schema);
    if !errors.is_empty() {
        return errors;
    }

    schema
        .iter()
        .find(|(_, spec)| spec.required.is_none())
        .map(|(name, _)| vec![ValidationError::UnresolvedRequired(name.to_string())])
        .unwrap_or_default()
}

fn validate_option(name: &str, spec: &OptionSpec) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if name.is_empty() {
        errors.push(ValidationError::EmptyOptionName);
        return errors;
    }

    let well_formed = name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && !name.starts_with('-')
        && !name.ends_with('-');
    if !well_formed {
        errors.push(ValidationError::InvalidOptionName(name.to_string()));
        return errors;
    }

    if RESERVED_OPTION_NAMES.contains(&name) {
        errors.push(ValidationError::ReservedOptionName(name.to_string()));
        return errors;
    }

    if let Some(alias) = spec.alias {
        if !alias.is_ascii_alphanumeric() || alias == 'h' || alias == 'V' {
            errors.push(ValidationError::InvalidAlias {
                option: name.to_string(),
                alias,
            });
            return errors;
        }
    }

    if spec.choices.is_some() && !matches!(spec.value_type, ValueType::String | ValueType::Array)
    {
        errors.push(ValidationError::ChoicesOnNonString(name.to_string()));
        return errors;
    }

    if let Some(default) = &spec.default {
        if default.value_type() != spec.value_type {
            errors.push(ValidationError::DefaultTypeMismatch {
                option: name.to_string(),
                expected: spec.value_type,
                found: default.value_type(),
            });
            return errors;
        }

        let outside = match default {
            OptionValue::String(value) => (!spec.allows(value)).then(|| value.clone()),
            OptionValue::Array(items) => items.iter().find(|item| !spec.allows(item)).cloned(),
            _ => None,
        };
        if let Some(value) = outside {
            errors.push(ValidationError::DefaultNotInChoices {
                option: name.to_string(),
                value,
            });
        }
    }

    errors
}
