//! Command registry.
//!
//! Maps command names to their description, option schemas and executor.
//! Lookups are exact string matches; a miss returns [`Lookup::NotFound`]
//! with the closest registered name as a suggestion.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use command_dispatch_core::{
    OptionSchema, ValidationError, effective_command_schema, validate_command_name,
    validate_effective_schema, validate_option_schema,
};
use futures::FutureExt;
use futures::future::BoxFuture;

use crate::args::ParsedArgs;
use crate::error::RegistrationError;

/// Minimum Jaro-Winkler similarity for a "did you mean" suggestion.
const SUGGESTION_THRESHOLD: f64 = 0.8;

/// Pending result of an executor.
pub type ExecutorFuture = BoxFuture<'static, anyhow::Result<()>>;

/// The behavior behind a command.
///
/// Any `Fn(ParsedArgs) -> impl Future<Output = anyhow::Result<()>>` closure
/// is an executor:
///
/// ```
/// use command_dispatch::{Executor, ParsedArgs};
///
/// let executor = |args: ParsedArgs| async move {
///     println!("running {:?}", args.command());
///     anyhow::Ok(())
/// };
/// let _pending = executor.execute(ParsedArgs::new(vec!["run".into()]));
/// ```
pub trait Executor: Send + Sync {
    fn execute(&self, args: ParsedArgs) -> ExecutorFuture;
}

impl<F, Fut> Executor for F
where
    F: Fn(ParsedArgs) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    fn execute(&self, args: ParsedArgs) -> ExecutorFuture {
        self(args).boxed()
    }
}

/// A registered command.
#[derive(Clone)]
pub struct Command {
    name: String,
    description: String,
    local: OptionSchema,
    effective: OptionSchema,
    executor: Arc<dyn Executor>,
}

impl Command {
    /// Builds a command whose effective schema merges `globals` with its own
    /// `options`. Fails on an invalid name or schema.
    pub fn new(
        name: &str,
        description: &str,
        executor: Arc<dyn Executor>,
        options: OptionSchema,
        globals: &OptionSchema,
    ) -> Result<Self, RegistrationError> {
        let reject = |error: ValidationError| RegistrationError::Command {
            command: name.to_string(),
            error,
        };

        if let Some(error) = validate_command_name(name).into_iter().next() {
            return Err(reject(error));
        }
        if let Some(error) = validate_option_schema(&options).into_iter().next() {
            return Err(reject(error));
        }

        let effective = effective_command_schema(globals, &options);
        if let Some(error) = validate_effective_schema(&effective).into_iter().next() {
            return Err(reject(error));
        }

        Ok(Self {
            name: name.to_string(),
            description: description.to_string(),
            local: options,
            effective,
            executor,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// The merged schema arguments are parsed against.
    pub fn options(&self) -> &OptionSchema {
        &self.effective
    }

    /// The options declared by the command itself.
    pub fn local_options(&self) -> &OptionSchema {
        &self.local
    }

    /// Whether the command declares options of its own.
    pub fn takes_options(&self) -> bool {
        !self.local.is_empty()
    }

    pub fn execute(&self, args: ParsedArgs) -> ExecutorFuture {
        self.executor.execute(args)
    }

    fn rebase(&self, globals: &OptionSchema) -> Result<Self, RegistrationError> {
        Self::new(
            &self.name,
            &self.description,
            Arc::clone(&self.executor),
            self.local.clone(),
            globals,
        )
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("options", &self.effective.names())
            .finish_non_exhaustive()
    }
}

/// Result of resolving a command name.
#[derive(Debug)]
pub enum Lookup<'a> {
    Found(&'a Command),
    NotFound { suggestion: Option<&'a str> },
}

/// Registered commands keyed by name.
#[derive(Debug, Clone, Default)]
pub struct CommandRegistry {
    commands: BTreeMap<String, Command>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a command. A second registration under the same name is
    /// rejected.
    pub fn register(&mut self, command: Command) -> Result<(), RegistrationError> {
        if self.commands.contains_key(command.name()) {
            return Err(RegistrationError::Command {
                command: command.name().to_string(),
                error: ValidationError::DuplicateCommand(command.name().to_string()),
            });
        }
        self.commands.insert(command.name.clone(), command);
        Ok(())
    }

    /// Resolves `name` by exact match.
    pub fn lookup(&self, name: &str) -> Lookup<'_> {
        match self.commands.get(name) {
            Some(command) => Lookup::Found(command),
            None => Lookup::NotFound {
                suggestion: self.suggest(name),
            },
        }
    }

    pub fn get(&self, name: &str) -> Option<&Command> {
        self.commands.get(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.commands.keys().map(String::as_str).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Command> {
        self.commands.values()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Every option name declared by any command, globals included.
    pub fn known_option_names(&self) -> BTreeSet<&str> {
        self.commands
            .values()
            .flat_map(|command| command.effective.names())
            .collect()
    }

    /// Re-derives every effective schema after the globals changed.
    ///
    /// Leaves the registry untouched when any command no longer validates.
    pub(crate) fn rebase(&mut self, globals: &OptionSchema) -> Result<(), RegistrationError> {
        let rebased = self
            .commands
            .iter()
            .map(|(name, command)| Ok((name.clone(), command.rebase(globals)?)))
            .collect::<Result<BTreeMap<_, _>, RegistrationError>>()?;
        self.commands = rebased;
        Ok(())
    }

    fn suggest(&self, name: &str) -> Option<&str> {
        self.commands
            .keys()
            .map(|candidate| (candidate, strsim::jaro_winkler(name, candidate)))
            .filter(|(_, score)| *score >= SUGGESTION_THRESHOLD)
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(candidate, _)| candidate.as_str())
    }
}
