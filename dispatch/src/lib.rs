//! Sub-command dispatch for command-line programs.
//!
//! A [`Program`] owns a set of global options and a [`CommandRegistry`].
//! [`Program::run`] parses an argument vector against the selected
//! command's effective schema, layers in environment variables, config
//! files and defaults, invokes the command's [`Executor`] and turns any
//! failure into a single report and exit policy.
//!
//! # Example
//!
//! ```no_run
//! use command_dispatch::{OptionSchema, OptionSpec, ParsedArgs, Program};
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut program = Program::new("extool");
//!     program
//!         .set_global_options(
//!             OptionSchema::new()
//!                 .with_option("verbose", OptionSpec::boolean("Show verbose output").with_alias('v')),
//!         )
//!         .unwrap()
//!         .command(
//!             "lint",
//!             "Validate the extension source",
//!             |args: ParsedArgs| async move {
//!                 println!("output format: {:?}", args.get_str("output"));
//!                 anyhow::Ok(())
//!             },
//!             OptionSchema::new().with_option(
//!                 "output",
//!                 OptionSpec::string("The type of output to generate")
//!                     .with_default("text")
//!                     .with_choices(&["json", "text"]),
//!             ),
//!         )
//!         .unwrap();
//!
//!     // Exits the process with status 1 on failure.
//!     let _ = program.run(std::env::args().skip(1)).await;
//! }
//! ```

pub mod args;
pub mod config;
pub mod error;
pub mod logging;
pub mod parser;
pub mod program;
pub mod registry;
pub mod report;
pub mod version;

pub use args::{ParsedArgs, ValueSource};
pub use command_dispatch_core::{
    CoerceError, OptionSchema, OptionSpec, OptionValue, ValidationError, ValueType,
};
pub use config::{ConfigValue, ConfigValues, discover_config_files, load_config_file};
pub use error::{NO_ARGUMENTS, NO_SUB_COMMAND, OperationalError, RegistrationError, UsageError};
pub use logging::{LogHandle, LoggingError};
pub use parser::{ArgumentParser, ParseOutcome};
pub use program::{CONFIG_DISCOVERY_OPTION, CONFIG_OPTION, Program, UNKNOWN_VERSION, VERBOSE_OPTION};
pub use registry::{Command, CommandRegistry, Executor, ExecutorFuture, Lookup};
pub use report::{DispatchError, Failure, FailureKind};
pub use version::{VersionError, read_manifest_version};
