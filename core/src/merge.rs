//! Option schema merging.
//!
//! A program declares a set of global options once and every command adds
//! its own. Before a command's arguments are parsed the two sets are merged
//! into one effective schema where:
//!
//! - every global option is marked `global` and defaults to `required`,
//! - a command-local declaration wins over a global one of the same name,
//! - every entry has `required` resolved to a boolean.
//!
//! # Example
//!
//! ```
//! use command_dispatch_core::*;
//!
//! let globals = prepare_global_options(
//!     OptionSchema::new().with_option("verbose", OptionSpec::boolean("Verbose output")),
//! );
//! let local = OptionSchema::new().with_option(
//!     "output",
//!     OptionSpec::string("Output type").with_default("text"),
//! );
//!
//! let effective = effective_command_schema(&globals, &local);
//! assert_eq!(effective.names(), vec!["output", "verbose"]);
//! assert!(effective.get("verbose").unwrap().global);
//! assert_eq!(effective.get("output").unwrap().required, Some(true));
//! ```

use crate::OptionSchema;

/// Marks every option as global and defaults `required` to `true` where the
/// caller left it unset.
///
/// Applying it twice yields the same schema.
///
/// # Examples
///
/// ```
/// use command_dispatch_core::*;
///
/// let schema = OptionSchema::new()
///     .with_option("config", OptionSpec::string("Config file").with_required(false))
///     .with_option("source-dir", OptionSpec::string("Source directory"));
///
/// let prepared = prepare_global_options(schema);
/// assert_eq!(prepared.get("config").unwrap().required, Some(false));
/// assert_eq!(prepared.get("source-dir").unwrap().required, Some(true));
/// assert!(prepared.iter().all(|(_, spec)| spec.global));
/// ```
pub fn prepare_global_options(mut options: OptionSchema) -> OptionSchema {
    for (_, spec) in options.iter_mut() {
        spec.global = true;
        spec.required.get_or_insert(true);
    }
    options
}

/// Merges two schemas key by key. `overlay` wins when both declare the same
/// option name.
///
/// # Examples
///
/// ```
/// use command_dispatch_core::*;
///
/// let base = OptionSchema::new().with_option("timeout", OptionSpec::number("Timeout"));
/// let overlay = OptionSchema::new().with_option("timeout", OptionSpec::string("Timeout"));
///
/// let merged = merge_option_schemas(&base, &overlay);
/// assert_eq!(merged.get("timeout").unwrap().value_type, ValueType::String);
/// ```
pub fn merge_option_schemas(base: &OptionSchema, overlay: &OptionSchema) -> OptionSchema {
    let mut merged = base.clone();
    for (name, spec) in overlay.iter() {
        merged.insert(name, spec.clone());
    }
    merged
}

/// Builds a command's effective schema from the program globals and the
/// command's own options.
///
/// Command-local declarations take precedence over globals, but an option
/// whose name is global stays marked `global`. Every entry leaves with
/// `required` resolved.
///
/// # Examples
///
/// ```
/// use command_dispatch_core::*;
///
/// let globals = prepare_global_options(
///     OptionSchema::new().with_option("channel", OptionSpec::string("Channel")),
/// );
/// let local = OptionSchema::new().with_option(
///     "channel",
///     OptionSpec::string("Channel").with_default("listed").with_required(false),
/// );
///
/// let effective = effective_command_schema(&globals, &local);
/// let channel = effective.get("channel").unwrap();
/// assert_eq!(channel.required, Some(false));
/// assert_eq!(channel.default, Some(OptionValue::from("listed")));
/// assert!(channel.global);
/// ```
pub fn effective_command_schema(globals: &OptionSchema, local: &OptionSchema) -> OptionSchema {
    let mut merged = merge_option_schemas(globals, local);
    for (name, spec) in merged.iter_mut() {
        if globals.contains(name) {
            spec.global = true;
        }
        spec.required.get_or_insert(true);
    }
    merged
}
