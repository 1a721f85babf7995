//! Option schema types shared by sub-command front-ends.
//!
//! This crate defines the data model a program uses to declare the options
//! of its sub-commands:
//!
//! - [`OptionSpec`]: one option with its type, alias, default, choices,
//!   requiredness and an optional [`Coercion`].
//! - [`OptionSchema`]: a set of options keyed by long name.
//! - [`OptionValue`]: a typed value produced by parsing.
//!
//! Merging ([`prepare_global_options`], [`effective_command_schema`]) turns
//! the program-wide globals and a command's own options into the single
//! schema its arguments are parsed against.
//!
//! Validation ([`validate_option_schema`], [`validate_command_name`]) catches
//! structural errors such as clashing aliases or defaults outside their
//! choices.
//!
//! # Example
//!
//! ```
//! use command_dispatch_core::*;
//!
//! let globals = prepare_global_options(
//!     OptionSchema::new()
//!         .with_option("verbose", OptionSpec::boolean("Show verbose output").with_alias('v'))
//!         .with_option("config", OptionSpec::string("Config file").with_required(false)),
//! );
//! let lint = OptionSchema::new().with_option(
//!     "output",
//!     OptionSpec::string("The type of output to generate")
//!         .with_alias('o')
//!         .with_default("text")
//!         .with_choices(&["json", "text"]),
//! );
//!
//! let effective = effective_command_schema(&globals, &lint);
//! assert_eq!(effective.len(), 3);
//! assert!(validate_effective_schema(&effective).is_empty());
//! ```

mod merge;
mod types;
mod validate;

pub use merge::{effective_command_schema, merge_option_schemas, prepare_global_options};
pub use types::*;
pub use validate::{
    RESERVED_OPTION_NAMES, ValidationError, validate_command_name, validate_effective_schema,
    validate_option_schema,
};
