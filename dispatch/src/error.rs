//! Error types for registration, parsing and command execution.
//!
//! Two kinds of failure reach the dispatch boundary:
//!
//! - [`UsageError`]: the user invoked the program incorrectly (bad flag,
//!   unknown command, missing value). Reported with its short message.
//! - everything else: an executor failed for operational reasons.
//!   [`OperationalError`] is a convenient carrier for a message and a
//!   machine-readable code, but any [`anyhow::Error`] qualifies.

use command_dispatch_core::ValidationError;
use thiserror::Error;

/// Message used when the argument vector names no command.
pub const NO_SUB_COMMAND: &str = "No sub-command was specified in the args";

/// Message used when a command receives stray arguments.
pub const NO_ARGUMENTS: &str = "This command does not take any arguments";

/// A user-facing input problem.
///
/// # Examples
///
/// ```
/// use command_dispatch::UsageError;
///
/// let err = UsageError::new("Unknown command: frobnicate").with_hint("Did you mean `lint`?");
/// assert_eq!(err.to_string(), "Unknown command: frobnicate");
/// assert_eq!(err.hint(), Some("Did you mean `lint`?"));
/// assert!(err.code().is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct UsageError {
    message: String,
    code: Option<String>,
    hint: Option<String>,
}

impl UsageError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
            hint: None,
        }
    }

    /// Attaches a machine-readable error code.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Attaches a follow-up line shown after the message.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    pub fn hint(&self) -> Option<&str> {
        self.hint.as_deref()
    }
}

/// An operational failure raised by an executor.
///
/// # Examples
///
/// ```
/// use command_dispatch::OperationalError;
///
/// let err = OperationalError::new("signing service unreachable").with_code("E_NET");
/// assert_eq!(err.code(), Some("E_NET"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct OperationalError {
    message: String,
    code: Option<String>,
}

impl OperationalError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }
}

/// Setup-time failure: the program declared something it cannot dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    /// A command could not be registered.
    #[error("cannot register command `{command}`: {error}")]
    Command {
        command: String,
        #[source]
        error: ValidationError,
    },

    /// The global option set is invalid.
    #[error("invalid global options: {0}")]
    GlobalOptions(#[source] ValidationError),
}
