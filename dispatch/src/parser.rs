//! Argument parsing on top of [`clap`].
//!
//! Parsing runs in two phases:
//!
//! 1. the program-level argument vector is matched against the global
//!    options, with any first positional token treated as an external
//!    sub-command whose remaining arguments are captured verbatim;
//! 2. once the dispatcher has resolved that token to a [`Command`], the
//!    captured tail is matched against the command's effective schema.
//!
//! clap handles tokenization, aliases, environment bindings and
//! `requires_arg`. Everything that must also apply to config-file and
//! default values (typing, path normalization, choices, coercion and the
//! required check) happens afterwards in [`resolve_values`] and
//! [`check_required`], so an executor never sees a value that skipped
//! validation.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use clap::builder::BoolishValueParser;
use clap::error::{ContextKind, ContextValue, ErrorKind};
use clap::parser::ValueSource as ClapSource;
use clap::{Arg, ArgAction, ArgMatches, value_parser};
use command_dispatch_core::{OptionSchema, OptionSpec, OptionValue, ValueType};
use heck::ToShoutySnakeCase;
use tracing::debug;

use crate::args::{ParsedArgs, ValueSource};
use crate::config::ConfigValues;
use crate::error::{NO_ARGUMENTS, UsageError};
use crate::registry::{Command, CommandRegistry};

/// Hidden positional collecting stray arguments. Not a valid option name,
/// so it cannot clash with a declared option.
const EXTRA_ARGS: &str = "__extra_args";

const NEGATION_PREFIX: &str = "no-";

/// Result of a parse that may have short-circuited into help or version
/// output.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome<T> {
    Parsed(T),
    /// Rendered `--help` or `--version` text for standard output.
    Info(String),
}

#[derive(Debug, Clone, PartialEq)]
enum RawValue {
    Flag(bool),
    Single(String),
    Multiple(Vec<String>),
}

impl RawValue {
    fn text(&self) -> String {
        match self {
            Self::Flag(b) => b.to_string(),
            Self::Single(s) => s.clone(),
            Self::Multiple(items) => items.last().cloned().unwrap_or_default(),
        }
    }
}

/// Untyped values taken from the command line or the environment.
#[derive(Debug, Clone, Default)]
pub(crate) struct RawValues {
    values: BTreeMap<String, (RawValue, ValueSource)>,
}

impl RawValues {
    fn insert(&mut self, name: &str, value: RawValue, source: ValueSource) {
        self.values.insert(name.to_string(), (value, source));
    }

    fn get(&self, name: &str) -> Option<&(RawValue, ValueSource)> {
        self.values.get(name)
    }

    /// Layers program-level values under command-level ones. A command-line
    /// value beats an environment value whichever phase saw it; on a tie
    /// the command-level value stays.
    pub(crate) fn merged_with(mut self, program: &RawValues) -> Self {
        for (name, (value, source)) in &program.values {
            let replace = self
                .values
                .get(name)
                .is_none_or(|(_, existing)| source < existing);
            if replace {
                self.values.insert(name.clone(), (value.clone(), *source));
            }
        }
        self
    }

    /// Whether the flag `name` was switched on.
    pub(crate) fn flag(&self, name: &str) -> bool {
        self.switch(name) == Some(true)
    }

    /// The explicit state of the flag `name`, if it was given.
    pub(crate) fn switch(&self, name: &str) -> Option<bool> {
        match self.values.get(name) {
            Some((RawValue::Flag(on), _)) => Some(*on),
            _ => None,
        }
    }

    /// The last value given for `name`, as text.
    pub(crate) fn text(&self, name: &str) -> Option<String> {
        self.values.get(name).map(|(value, _)| value.text())
    }
}

/// Outcome of the program-level phase.
#[derive(Debug, Clone)]
pub(crate) struct Invocation {
    /// First positional token, if any.
    pub(crate) command: Option<String>,
    /// Arguments following the command token.
    pub(crate) tail: Vec<String>,
    /// Global option values given before the command token.
    pub(crate) values: RawValues,
}

/// Builds clap commands from option schemas and turns matches into
/// [`ParsedArgs`].
#[derive(Debug, Clone, Copy)]
pub struct ArgumentParser<'a> {
    program: &'a str,
    version: &'a str,
    env_prefix: &'a str,
}

impl<'a> ArgumentParser<'a> {
    pub fn new(program: &'a str, version: &'a str, env_prefix: &'a str) -> Self {
        Self {
            program,
            version,
            env_prefix,
        }
    }

    /// Environment variable bound to `option`: `<PREFIX>_<OPTION_UPPER_SNAKE>`.
    ///
    /// # Examples
    ///
    /// ```
    /// use command_dispatch::ArgumentParser;
    ///
    /// let parser = ArgumentParser::new("extool", "1.0.0", "EXTOOL");
    /// assert_eq!(parser.env_var("source-dir"), "EXTOOL_SOURCE_DIR");
    /// ```
    pub fn env_var(&self, option: &str) -> String {
        env_var_name(self.env_prefix, option)
    }

    /// Parses `argv` against a single command's effective schema and
    /// resolves defaults, environment values, coercions and required
    /// options. Config files are not consulted.
    pub fn parse(
        &self,
        command: &Command,
        argv: &[String],
    ) -> Result<ParseOutcome<ParsedArgs>, UsageError> {
        let raw = match self.parse_command(command, argv)? {
            ParseOutcome::Parsed(raw) => raw,
            ParseOutcome::Info(text) => return Ok(ParseOutcome::Info(text)),
        };

        let mut args = resolve_values(command.options(), &raw, &ConfigValues::default())?;
        check_required(command.options(), &args)?;
        args.set_positionals(vec![command.name().to_string()]);
        args.set_version(self.version);
        Ok(ParseOutcome::Parsed(args))
    }

    pub(crate) fn parse_program(
        &self,
        globals: &OptionSchema,
        registry: &CommandRegistry,
        argv: &[String],
    ) -> Result<ParseOutcome<Invocation>, UsageError> {
        let matches = match self.program_command(globals, registry).try_get_matches_from(argv) {
            Ok(matches) => matches,
            Err(err) => return clap_outcome(err, true),
        };

        let values = extract_values(&matches, globals);
        let (command, tail) = match matches.subcommand() {
            Some((name, sub)) => (
                Some(name.to_string()),
                sub.get_many::<String>("")
                    .map(|tail| tail.cloned().collect())
                    .unwrap_or_default(),
            ),
            None => (None, Vec::new()),
        };
        debug!(?command, ?tail, "parsed program arguments");

        Ok(ParseOutcome::Parsed(Invocation {
            command,
            tail,
            values,
        }))
    }

    pub(crate) fn parse_command(
        &self,
        command: &Command,
        argv: &[String],
    ) -> Result<ParseOutcome<RawValues>, UsageError> {
        let matches = match self.command_command(command).try_get_matches_from(argv) {
            Ok(matches) => matches,
            Err(err) => return clap_outcome(err, command.takes_options()),
        };

        if let Some(extra) = matches.get_many::<String>(EXTRA_ARGS) {
            let extra: Vec<&String> = extra.collect();
            if !extra.is_empty() {
                debug!(command = command.name(), ?extra, "rejecting stray arguments");
                return Err(UsageError::new(NO_ARGUMENTS));
            }
        }

        Ok(ParseOutcome::Parsed(extract_values(&matches, command.options())))
    }

    fn program_command(&self, globals: &OptionSchema, registry: &CommandRegistry) -> clap::Command {
        clap::Command::new(self.program.to_string())
            .version(self.version.to_string())
            .no_binary_name(true)
            .allow_external_subcommands(true)
            .external_subcommand_value_parser(value_parser!(String))
            .override_usage(format!("{} <command> [options]", self.program))
            .after_help(command_listing(registry))
            .args_override_self(true)
            .args(option_args(globals, self.env_prefix))
    }

    fn command_command(&self, command: &Command) -> clap::Command {
        clap::Command::new(command.name().to_string())
            .bin_name(format!("{} {}", self.program, command.name()))
            .about(command.description().to_string())
            .no_binary_name(true)
            .disable_version_flag(true)
            .args_override_self(true)
            .args(option_args(command.options(), self.env_prefix))
            .arg(
                Arg::new(EXTRA_ARGS)
                    .num_args(1..)
                    .action(ArgAction::Append)
                    .value_parser(value_parser!(String))
                    .hide(true),
            )
    }
}

/// Converts raw values into typed option values, falling back to config
/// files and then to schema defaults. Boolean options always resolve.
pub(crate) fn resolve_values(
    schema: &OptionSchema,
    raw: &RawValues,
    config: &ConfigValues,
) -> Result<ParsedArgs, UsageError> {
    let mut args = ParsedArgs::default();

    for (name, spec) in schema.iter() {
        let candidate = match raw.get(name) {
            Some((value, source)) => Some((typed_value(name, spec, value)?, *source)),
            None => match config.get(name) {
                Some(entry) => Some((entry.value.clone(), ValueSource::ConfigFile)),
                None => spec
                    .default
                    .clone()
                    .or_else(|| (spec.value_type == ValueType::Bool).then_some(false.into()))
                    .map(|value| (value, ValueSource::Default)),
            },
        };

        if let Some((value, source)) = candidate {
            args.insert(name, finish_value(name, spec, value)?, source);
        }
    }

    Ok(args)
}

/// Fails when a required option resolved to no value.
pub(crate) fn check_required(schema: &OptionSchema, args: &ParsedArgs) -> Result<(), UsageError> {
    let missing: Vec<&str> = schema
        .iter()
        .filter(|(name, spec)| spec.is_required() && !args.contains(name))
        .map(|(name, _)| name)
        .collect();

    match missing.as_slice() {
        [] => Ok(()),
        [name] => Err(UsageError::new(format!("Missing required argument: {name}"))),
        names => Err(UsageError::new(format!(
            "Missing required arguments: {}",
            names.join(", ")
        ))),
    }
}

/// Last setting of boolean option `name` found in `argv` without a full
/// parse, so a flag is known even when the rest of the arguments are bad.
pub(crate) fn scan_flag(schema: &OptionSchema, name: &str, argv: &[String]) -> Option<bool> {
    let spec = schema.get(name)?;
    let negation = has_negation(schema, name).then(|| negation_name(name));
    let mut found = None;

    for token in argv.iter().take_while(|token| *token != "--") {
        if let Some(long) = token.strip_prefix("--") {
            let (flag, value) = match long.split_once('=') {
                Some((flag, value)) => (flag, Some(value)),
                None => (long, None),
            };
            if flag == name {
                found = match value {
                    Some(value) => parse_bool(name, value).ok().and_then(|v| v.as_bool()),
                    None => Some(true),
                }
                .or(found);
            } else if negation.as_deref() == Some(flag) && value.is_none() {
                found = Some(false);
            }
        } else if let Some(cluster) = token.strip_prefix('-') {
            for short in cluster.chars() {
                if Some(short) == spec.alias {
                    found = Some(true);
                    continue;
                }
                // Anything after a value-taking short option is its value.
                let takes_value = schema
                    .iter()
                    .any(|(_, other)| other.alias == Some(short) && other.value_type != ValueType::Bool);
                if takes_value {
                    break;
                }
            }
        }
    }

    found
}

pub(crate) fn env_var_name(prefix: &str, option: &str) -> String {
    let option = option.to_shouty_snake_case();
    if prefix.is_empty() {
        option
    } else {
        format!("{prefix}_{option}")
    }
}

fn option_args(schema: &OptionSchema, env_prefix: &str) -> Vec<Arg> {
    let mut args = Vec::with_capacity(schema.len());

    for (name, spec) in schema.iter() {
        let mut arg = Arg::new(name.to_string())
            .long(name.to_string())
            .env(env_var_name(env_prefix, name))
            .help(help_text(spec))
            .hide(spec.hidden);
        if let Some(alias) = spec.alias {
            arg = arg.short(alias);
        }

        let arg = match spec.value_type {
            ValueType::Bool => {
                let arg = arg
                    .action(ArgAction::SetTrue)
                    .value_parser(BoolishValueParser::new());
                if has_negation(schema, name) {
                    let negation = negation_name(name);
                    args.push(
                        Arg::new(negation.clone())
                            .long(negation.clone())
                            .action(ArgAction::SetTrue)
                            .overrides_with(name.to_string())
                            .hide(true),
                    );
                    arg.overrides_with(negation)
                } else {
                    arg
                }
            }
            ValueType::String | ValueType::Number => {
                let arg = arg
                    .action(ArgAction::Set)
                    .value_parser(value_parser!(String))
                    .value_name(name.to_shouty_snake_case());
                if spec.requires_arg {
                    arg.num_args(1)
                } else {
                    arg.num_args(0..=1).default_missing_value("")
                }
            }
            ValueType::Array => {
                let arg = arg
                    .action(ArgAction::Append)
                    .value_parser(value_parser!(String))
                    .value_name(name.to_shouty_snake_case());
                if spec.requires_arg {
                    arg.num_args(1..)
                } else {
                    arg.num_args(0..)
                }
            }
        };
        args.push(arg);
    }

    args
}

fn help_text(spec: &OptionSpec) -> String {
    let mut help = spec.description.clone();
    if let Some(choices) = &spec.choices {
        help.push_str(&format!(" [choices: {}]", choices.join(", ")));
    }
    match &spec.default {
        None | Some(OptionValue::Bool(false)) => {}
        Some(default) => help.push_str(&format!(" [default: {default}]")),
    }
    help
}

fn negation_name(name: &str) -> String {
    format!("{NEGATION_PREFIX}{name}")
}

/// Boolean options get a generated `--no-<name>` unless they already start
/// with the prefix or the schema declares that name itself.
fn has_negation(schema: &OptionSchema, name: &str) -> bool {
    schema
        .get(name)
        .is_some_and(|spec| spec.value_type == ValueType::Bool)
        && !name.starts_with(NEGATION_PREFIX)
        && !schema.contains(&negation_name(name))
}

fn command_listing(registry: &CommandRegistry) -> String {
    let width = registry.names().iter().map(|name| name.len()).max().unwrap_or(0);
    let mut listing = String::from("Commands:\n");
    for command in registry.iter() {
        listing.push_str(&format!(
            "  {:width$}  {}\n",
            command.name(),
            command.description(),
        ));
    }
    listing
}

fn extract_values(matches: &ArgMatches, schema: &OptionSchema) -> RawValues {
    let mut values = RawValues::default();
    for (name, spec) in schema.iter() {
        if let Some((value, source)) = extract_value(matches, schema, name, spec) {
            values.insert(name, value, source);
        }
    }
    values
}

fn extract_value(
    matches: &ArgMatches,
    schema: &OptionSchema,
    name: &str,
    spec: &OptionSpec,
) -> Option<(RawValue, ValueSource)> {
    if spec.value_type == ValueType::Bool {
        if has_negation(schema, name) {
            let negation = negation_name(name);
            if explicit_source(matches, &negation) == Some(ValueSource::CommandLine)
                && matches.get_flag(&negation)
            {
                return Some((RawValue::Flag(false), ValueSource::CommandLine));
            }
        }
        let source = explicit_source(matches, name)?;
        return Some((RawValue::Flag(matches.get_flag(name)), source));
    }

    let source = explicit_source(matches, name)?;
    let value = match spec.value_type {
        ValueType::Array => RawValue::Multiple(
            matches
                .get_many::<String>(name)
                .map(|items| items.cloned().collect())
                .unwrap_or_default(),
        ),
        _ => RawValue::Single(matches.get_one::<String>(name)?.clone()),
    };
    Some((value, source))
}

/// Source of a value the user supplied; clap defaults count as absent.
fn explicit_source(matches: &ArgMatches, id: &str) -> Option<ValueSource> {
    match matches.value_source(id)? {
        ClapSource::CommandLine => Some(ValueSource::CommandLine),
        ClapSource::EnvVariable => Some(ValueSource::Environment),
        _ => None,
    }
}

fn typed_value(name: &str, spec: &OptionSpec, raw: &RawValue) -> Result<OptionValue, UsageError> {
    match (spec.value_type, raw) {
        (ValueType::Bool, RawValue::Flag(b)) => Ok(OptionValue::Bool(*b)),
        (ValueType::Bool, other) => parse_bool(name, &other.text()),
        (ValueType::Array, RawValue::Multiple(items)) => Ok(OptionValue::Array(items.clone())),
        (ValueType::Array, other) => Ok(OptionValue::Array(vec![other.text()])),
        (ValueType::String, other) => Ok(OptionValue::String(other.text())),
        (ValueType::Number, other) => parse_number(name, &other.text()),
    }
}

fn parse_bool(name: &str, text: &str) -> Result<OptionValue, UsageError> {
    match text.trim().to_ascii_lowercase().as_str() {
        "" | "true" | "1" | "yes" | "y" | "on" => Ok(OptionValue::Bool(true)),
        "false" | "0" | "no" | "n" | "off" => Ok(OptionValue::Bool(false)),
        _ => Err(UsageError::new(format!(
            "Invalid boolean for --{name}: \"{text}\""
        ))),
    }
}

fn parse_number(name: &str, text: &str) -> Result<OptionValue, UsageError> {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .map(OptionValue::Number)
        .ok_or_else(|| UsageError::new(format!("Invalid number for --{name}: \"{text}\"")))
}

/// Normalizes, checks choices, then coerces.
fn finish_value(
    name: &str,
    spec: &OptionSpec,
    value: OptionValue,
) -> Result<OptionValue, UsageError> {
    let value = if spec.normalize {
        normalize_value(value)
    } else {
        value
    };

    let rejected = match &value {
        OptionValue::String(s) => (!spec.allows(s)).then_some(s.as_str()),
        OptionValue::Array(items) => items
            .iter()
            .find(|item| !spec.allows(item))
            .map(String::as_str),
        _ => None,
    };
    if let (Some(given), Some(choices)) = (rejected, &spec.choices) {
        let choices: Vec<String> = choices.iter().map(|c| format!("\"{c}\"")).collect();
        return Err(UsageError::new(format!(
            "Invalid values:\n  Argument: {name}, Given: \"{given}\", Choices: {}",
            choices.join(", ")
        )));
    }

    match &spec.coerce {
        Some(coercion) => coercion
            .apply(value)
            .map_err(|err| UsageError::new(err.to_string())),
        None => Ok(value),
    }
}

fn normalize_value(value: OptionValue) -> OptionValue {
    match value {
        OptionValue::String(s) => OptionValue::String(normalize_path(&s)),
        OptionValue::Array(items) => {
            OptionValue::Array(items.iter().map(|item| normalize_path(item)).collect())
        }
        other => other,
    }
}

/// Lexically resolves `.` and `..` without touching the filesystem.
fn normalize_path(raw: &str) -> String {
    let mut parts: Vec<Component<'_>> = Vec::new();
    for component in Path::new(raw).components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => parts.push(component),
            },
            other => parts.push(other),
        }
    }

    if parts.is_empty() {
        return ".".to_string();
    }
    parts
        .iter()
        .collect::<PathBuf>()
        .to_string_lossy()
        .into_owned()
}

/// Maps a clap error onto help/version output or a [`UsageError`].
fn clap_outcome<T>(err: clap::Error, takes_options: bool) -> Result<ParseOutcome<T>, UsageError> {
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
            Ok(ParseOutcome::Info(err.render().to_string()))
        }
        ErrorKind::UnknownArgument if !takes_options => Err(UsageError::new(NO_ARGUMENTS)),
        ErrorKind::UnknownArgument => Err(UsageError::new(format!(
            "Unknown argument: {}",
            invalid_arg(&err).unwrap_or_default()
        ))),
        _ => Err(UsageError::new(clap_message(&err))),
    }
}

fn invalid_arg(err: &clap::Error) -> Option<String> {
    match err.get(ContextKind::InvalidArg)? {
        ContextValue::String(arg) => arg
            .trim_start_matches('-')
            .split('=')
            .next()
            .map(str::to_string),
        _ => None,
    }
}

/// First line of clap's rendering without the `error: ` prefix.
fn clap_message(err: &clap::Error) -> String {
    let rendered = err.render().to_string();
    rendered
        .lines()
        .find(|line| !line.trim().is_empty())
        .unwrap_or_default()
        .trim_start_matches("error: ")
        .trim()
        .to_string()
}
