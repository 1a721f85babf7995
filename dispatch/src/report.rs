//! Failure classification and the user-facing error report.

use std::fmt;
use std::io;

use thiserror::Error;

use crate::error::{OperationalError, UsageError};

/// How a failure is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Bad invocation: short message unless verbose.
    Usage,
    /// Anything else: full diagnostic.
    Operational,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Usage => write!(f, "usage"),
            Self::Operational => write!(f, "operational"),
        }
    }
}

/// A classified failure waiting to be reported.
#[derive(Debug)]
pub struct Failure {
    kind: FailureKind,
    command: Option<String>,
    code: Option<String>,
    hint: Option<String>,
    error: anyhow::Error,
}

impl Failure {
    /// Classifies `error` raised while running `command` (when resolved).
    ///
    /// A [`UsageError`] anywhere in the chain makes the failure a usage
    /// failure. The code comes from the first coded error in the chain.
    pub fn classify(error: anyhow::Error, command: Option<String>) -> Self {
        let usage = error
            .chain()
            .find_map(|cause| cause.downcast_ref::<UsageError>());
        let kind = if usage.is_some() {
            FailureKind::Usage
        } else {
            FailureKind::Operational
        };
        let hint = usage.and_then(|usage| usage.hint().map(str::to_string));
        let code = error.chain().find_map(error_code);

        Self {
            kind,
            command,
            code,
            hint,
            error,
        }
    }

    pub fn kind(&self) -> FailureKind {
        self.kind
    }

    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    /// Renders the report.
    ///
    /// Usage failures print their message alone unless `verbose`; every
    /// other failure prints the error with its `Caused by:` chain. In
    /// verbose mode the error's debug structure follows. Lines are
    /// prefixed with the command name when one was resolved.
    pub fn report(&self, verbose: bool) -> String {
        let prefix = self
            .command
            .as_deref()
            .map(|command| format!("{command}: "))
            .unwrap_or_default();

        let body = match self.kind {
            _ if verbose => format!("{:?}\n\n{:#?}", self.error, self.error),
            FailureKind::Usage => format!("{}", self.error),
            FailureKind::Operational => format!("{:?}", self.error),
        };

        let mut report = format!("{prefix}{body}");
        if let Some(hint) = &self.hint {
            report.push('\n');
            report.push_str(hint);
        }
        if let Some(code) = &self.code {
            report.push_str(&format!("\n{prefix}Error code: {code}"));
        }
        report
    }

    pub(crate) fn into_dispatch_error(self, verbose: bool) -> DispatchError {
        let report = self.report(verbose);
        DispatchError {
            kind: self.kind,
            command: self.command,
            code: self.code,
            report,
            error: self.error,
        }
    }
}

/// The failure of one program run, returned when the program does not own
/// the process.
#[derive(Debug, Error)]
#[error("{report}")]
pub struct DispatchError {
    kind: FailureKind,
    command: Option<String>,
    code: Option<String>,
    report: String,
    error: anyhow::Error,
}

impl DispatchError {
    pub fn kind(&self) -> FailureKind {
        self.kind
    }

    pub fn is_usage(&self) -> bool {
        self.kind == FailureKind::Usage
    }

    /// The resolved command, if the failure happened after resolution.
    pub fn command(&self) -> Option<&str> {
        self.command.as_deref()
    }

    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    /// The rendered report, as written to stderr.
    pub fn report(&self) -> &str {
        &self.report
    }

    /// The underlying error.
    pub fn error(&self) -> &anyhow::Error {
        &self.error
    }
}

fn error_code(cause: &(dyn std::error::Error + 'static)) -> Option<String> {
    if let Some(usage) = cause.downcast_ref::<UsageError>() {
        return usage.code().map(str::to_string);
    }
    if let Some(operational) = cause.downcast_ref::<OperationalError>() {
        return operational.code().map(str::to_string);
    }
    cause
        .downcast_ref::<io::Error>()
        .and_then(|err| io_error_code(err.kind()))
        .map(str::to_string)
}

fn io_error_code(kind: io::ErrorKind) -> Option<&'static str> {
    match kind {
        io::ErrorKind::NotFound => Some("ENOENT"),
        io::ErrorKind::PermissionDenied => Some("EACCES"),
        io::ErrorKind::AlreadyExists => Some("EEXIST"),
        io::ErrorKind::ConnectionRefused => Some("ECONNREFUSED"),
        io::ErrorKind::ConnectionReset => Some("ECONNRESET"),
        io::ErrorKind::TimedOut => Some("ETIMEDOUT"),
        io::ErrorKind::AddrInUse => Some("EADDRINUSE"),
        io::ErrorKind::BrokenPipe => Some("EPIPE"),
        _ => None,
    }
}
