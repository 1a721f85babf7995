//! The program: registry, global options and the dispatch loop.
//!
//! A run moves through `Idle -> Parsed -> Resolved -> Succeeded | Failed`.
//! Every failure, whatever its origin, is classified once in
//! [`Program::run`] and either ends the process or comes back as a
//! [`DispatchError`].

use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use anyhow::Context;
use command_dispatch_core::{
    OptionSchema, OptionValue, merge_option_schemas, prepare_global_options, validate_option_schema,
};
use heck::ToShoutySnakeCase;
use tracing::{debug, info, warn};

use crate::config::{ConfigValues, discover_config_files, load_config_values};
use crate::error::{NO_SUB_COMMAND, RegistrationError, UsageError};
use crate::logging::LogHandle;
use crate::parser::{
    ArgumentParser, ParseOutcome, RawValues, check_required, resolve_values, scan_flag,
};
use crate::registry::{Command, CommandRegistry, Executor, Lookup};
use crate::report::{DispatchError, Failure};
use crate::version::read_manifest_version;

/// Global option that turns on verbose reporting and debug logging.
pub const VERBOSE_OPTION: &str = "verbose";

/// Global option naming an explicit config file.
pub const CONFIG_OPTION: &str = "config";

/// Global boolean option toggling config file discovery.
pub const CONFIG_DISCOVERY_OPTION: &str = "config-discovery";

/// Version reported when the version getter fails.
pub const UNKNOWN_VERSION: &str = "unknown";

type VersionGetter = Arc<dyn Fn(&Path) -> anyhow::Result<String> + Send + Sync>;

/// Failure context gathered while a run progresses.
#[derive(Debug, Default)]
struct RunState {
    command: Option<String>,
    verbose: bool,
}

/// A sub-command program.
///
/// # Examples
///
/// ```
/// use command_dispatch::{OptionSchema, OptionSpec, ParsedArgs, Program};
///
/// # futures::executor::block_on(async {
/// let mut program = Program::new("extool")
///     .exit_on_error(false)
///     .with_version_getter(|_| Ok("1.0.0".to_string()));
/// program
///     .set_global_options(
///         OptionSchema::new().with_option("verbose", OptionSpec::boolean("Verbose").with_alias('v')),
///     )
///     .unwrap();
/// program
///     .command("docs", "Open the documentation", |_args: ParsedArgs| async { anyhow::Ok(()) }, OptionSchema::new())
///     .unwrap();
///
/// program.run(["docs"]).await.unwrap();
/// let err = program.run(["frobnicate"]).await.unwrap_err();
/// assert_eq!(err.to_string(), "Unknown command: frobnicate");
/// # });
/// ```
pub struct Program {
    name: String,
    env_prefix: String,
    exit_on_error: bool,
    config_discovery: bool,
    base_dir: Option<PathBuf>,
    working_dir: Option<PathBuf>,
    home_dir: Option<PathBuf>,
    version_getter: VersionGetter,
    fallback_version: String,
    log_handle: Option<LogHandle>,
    globals: OptionSchema,
    registry: CommandRegistry,
}

impl Program {
    /// A program named `name`, with environment variables prefixed by the
    /// upper snake case name.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            env_prefix: name.to_shouty_snake_case(),
            exit_on_error: true,
            config_discovery: true,
            base_dir: None,
            working_dir: None,
            home_dir: None,
            version_getter: Arc::new(manifest_version),
            fallback_version: UNKNOWN_VERSION.to_string(),
            log_handle: None,
            globals: OptionSchema::new(),
            registry: CommandRegistry::new(),
        }
    }

    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = prefix.to_string();
        self
    }

    /// Whether a failed run reports and exits the process with status 1.
    /// When disabled the failure is returned instead.
    pub fn exit_on_error(mut self, exit: bool) -> Self {
        self.exit_on_error = exit;
        self
    }

    /// Default for config file discovery when the `config-discovery`
    /// option is not declared or not given.
    pub fn with_config_discovery(mut self, enabled: bool) -> Self {
        self.config_discovery = enabled;
        self
    }

    /// Directory handed to the version getter. Defaults to the working
    /// directory.
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    pub fn with_version_getter<F>(mut self, getter: F) -> Self
    where
        F: Fn(&Path) -> anyhow::Result<String> + Send + Sync + 'static,
    {
        self.version_getter = Arc::new(getter);
        self
    }

    /// Version used when the getter fails, typically the caller's
    /// `env!("CARGO_PKG_VERSION")`.
    pub fn with_fallback_version(mut self, version: &str) -> Self {
        self.fallback_version = version.to_string();
        self
    }

    /// Log filter raised to debug in verbose mode.
    pub fn with_log_handle(mut self, handle: LogHandle) -> Self {
        self.log_handle = Some(handle);
        self
    }

    /// Directory searched for `./<name>-config.yml` and against which an
    /// explicit config path is resolved. Defaults to the process working
    /// directory.
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Directory searched for `~/.<name>-config.yml`. Defaults to the
    /// user's home directory.
    pub fn with_home_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.home_dir = Some(dir.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn env_prefix(&self) -> &str {
        &self.env_prefix
    }

    /// Declares options visible to every command.
    ///
    /// Options become global and required unless they say otherwise.
    /// Repeated calls merge, later declarations winning per name, and every
    /// registered command picks up the new set.
    pub fn set_global_options(
        &mut self,
        options: OptionSchema,
    ) -> Result<&mut Self, RegistrationError> {
        let globals = merge_option_schemas(&self.globals, &prepare_global_options(options));
        if let Some(error) = validate_option_schema(&globals).into_iter().next() {
            return Err(RegistrationError::GlobalOptions(error));
        }

        self.registry.rebase(&globals)?;
        self.globals = globals;
        Ok(self)
    }

    /// Registers a command.
    pub fn command<E>(
        &mut self,
        name: &str,
        description: &str,
        executor: E,
        options: OptionSchema,
    ) -> Result<&mut Self, RegistrationError>
    where
        E: Executor + 'static,
    {
        let command = Command::new(name, description, Arc::new(executor), options, &self.globals)?;
        self.registry.register(command)?;
        Ok(self)
    }

    pub fn global_options(&self) -> &OptionSchema {
        &self.globals
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    /// Parses `argv` (without the binary name), runs the selected command
    /// and applies the exit policy to any failure.
    pub async fn run<I, S>(&self, argv: I) -> Result<(), DispatchError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let argv: Vec<String> = argv.into_iter().map(Into::into).collect();
        let mut state = RunState::default();

        match self.dispatch(&argv, &mut state).await {
            Ok(()) => {
                debug!(command = ?state.command, "Succeeded");
                Ok(())
            }
            Err(error) => {
                let failure = Failure::classify(error, state.command.clone());
                debug!(command = ?state.command, kind = %failure.kind(), "Failed");
                let error = failure.into_dispatch_error(state.verbose);
                eprintln!("{error}");
                if self.exit_on_error {
                    process::exit(1);
                }
                Err(error)
            }
        }
    }

    async fn dispatch(&self, argv: &[String], state: &mut RunState) -> anyhow::Result<()> {
        debug!(program = %self.name, ?argv, "Idle");
        let version = self.version();
        let parser = ArgumentParser::new(&self.name, &version, &self.env_prefix);

        let invocation = match parser.parse_program(&self.globals, &self.registry, argv)? {
            ParseOutcome::Parsed(invocation) => invocation,
            ParseOutcome::Info(text) => {
                println!("{}", text.trim_end());
                return Ok(());
            }
        };
        state.verbose = invocation.values.flag(VERBOSE_OPTION);
        debug!(command = ?invocation.command, "Parsed");

        let Some(name) = invocation.command else {
            return Err(UsageError::new(NO_SUB_COMMAND).into());
        };
        let command = match self.registry.lookup(&name) {
            Lookup::Found(command) => command,
            Lookup::NotFound { suggestion } => {
                let mut error = UsageError::new(format!("Unknown command: {name}"));
                if let Some(suggestion) = suggestion {
                    error = error.with_hint(format!("Did you mean `{suggestion}`?"));
                }
                return Err(error.into());
            }
        };
        state.command = Some(name.clone());
        debug!(command = %name, "Resolved");
        if let Some(verbose) = scan_flag(command.options(), VERBOSE_OPTION, &invocation.tail) {
            state.verbose = verbose;
        }

        let raw = match parser.parse_command(command, &invocation.tail)? {
            ParseOutcome::Parsed(raw) => raw.merged_with(&invocation.values),
            ParseOutcome::Info(text) => {
                println!("{}", text.trim_end());
                return Ok(());
            }
        };
        state.verbose = raw.flag(VERBOSE_OPTION);

        let config = self.config_values(command, &raw)?;
        let mut args = resolve_values(command.options(), &raw, &config)?;
        check_required(command.options(), &args)?;
        args.set_positionals(vec![name]);
        args.set_version(&version);

        if args.get_bool(VERBOSE_OPTION) {
            state.verbose = true;
            self.enable_verbose(&version);
        }

        command.execute(args).await
    }

    /// Result of the version getter, or the fallback version when it fails.
    fn version(&self) -> String {
        let version = match &self.base_dir {
            Some(dir) => (self.version_getter)(dir.as_path()),
            None => self
                .working_dir()
                .and_then(|dir| (self.version_getter)(dir.as_path())),
        };
        version.unwrap_or_else(|err| {
            warn!("cannot determine the program version: {err:#}");
            self.fallback_version.clone()
        })
    }

    fn enable_verbose(&self, version: &str) {
        if let Some(handle) = &self.log_handle {
            if let Err(err) = handle.enable_verbose() {
                warn!("{err}");
            }
        }
        info!("Version: {version}");
    }

    fn working_dir(&self) -> anyhow::Result<PathBuf> {
        match &self.working_dir {
            Some(dir) => Ok(dir.clone()),
            None => std::env::current_dir().context("cannot determine the working directory"),
        }
    }

    fn home_dir(&self) -> Option<PathBuf> {
        self.home_dir.clone().or_else(|| {
            directories::BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf())
        })
    }

    /// Loads discovered and explicit config files for `command`.
    fn config_values(&self, command: &Command, raw: &RawValues) -> anyhow::Result<ConfigValues> {
        let schema = command.options();
        let discovery = schema.contains(CONFIG_DISCOVERY_OPTION).then(|| {
            raw.switch(CONFIG_DISCOVERY_OPTION).or_else(|| {
                schema
                    .get(CONFIG_DISCOVERY_OPTION)
                    .and_then(|spec| spec.default.as_ref())
                    .and_then(OptionValue::as_bool)
            })
        });
        let discovery = discovery.flatten().unwrap_or(self.config_discovery);

        let explicit = schema
            .contains(CONFIG_OPTION)
            .then(|| {
                raw.text(CONFIG_OPTION).or_else(|| {
                    schema
                        .get(CONFIG_OPTION)
                        .and_then(|spec| spec.default.as_ref())
                        .and_then(|value| value.as_str().map(str::to_string))
                })
            })
            .flatten()
            .filter(|path| !path.is_empty());

        if !discovery && explicit.is_none() {
            return Ok(ConfigValues::default());
        }

        let working_dir = self.working_dir()?;
        let home_dir = self.home_dir();
        let mut files = if discovery {
            discover_config_files(&self.name, &working_dir, home_dir.as_deref())
        } else {
            Vec::new()
        };
        if let Some(path) = explicit {
            files.push(working_dir.join(path));
        }

        Ok(load_config_values(
            &files,
            schema,
            command.name(),
            &self.registry,
            &working_dir,
            home_dir.as_deref(),
        )?)
    }
}

fn manifest_version(base_dir: &Path) -> anyhow::Result<String> {
    Ok(read_manifest_version(base_dir)?)
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    use command_dispatch_core::{CoerceError, OptionSpec};
    use serial_test::serial;
    use tempfile::TempDir;

    use super::*;
    use crate::args::{ParsedArgs, ValueSource};
    use crate::error::{NO_ARGUMENTS, OperationalError};
    use crate::report::FailureKind;

    type Seen = Arc<Mutex<Option<ParsedArgs>>>;

    struct Fixture {
        program: Program,
        seen: Seen,
        _home: TempDir,
        cwd: TempDir,
    }

    fn recorder(seen: &Seen) -> impl Executor + 'static {
        let seen = Arc::clone(seen);
        move |args: ParsedArgs| {
            let seen = Arc::clone(&seen);
            async move {
                *seen.lock().unwrap() = Some(args);
                anyhow::Ok(())
            }
        }
    }

    fn fixture() -> Fixture {
        fixture_with_prefix("DISPATCH_PROGRAM_TEST")
    }

    fn fixture_with_prefix(prefix: &str) -> Fixture {
        let home = TempDir::new().unwrap();
        let cwd = TempDir::new().unwrap();
        let seen: Seen = Arc::new(Mutex::new(None));

        let mut program = Program::new("extool")
            .with_env_prefix(prefix)
            .exit_on_error(false)
            .with_version_getter(|_| Ok("1.2.3".to_string()))
            .with_working_dir(cwd.path())
            .with_home_dir(home.path());
        program
            .set_global_options(
                OptionSchema::new()
                    .with_option(
                        "verbose",
                        OptionSpec::boolean("Show verbose output").with_alias('v'),
                    )
                    .with_option(
                        "config",
                        OptionSpec::string("Config file")
                            .with_alias('c')
                            .requires_arg()
                            .with_required(false),
                    )
                    .with_option(
                        "config-discovery",
                        OptionSpec::boolean("Discover config files").with_default(true),
                    )
                    .with_option(
                        "artifacts-dir",
                        OptionSpec::string("Artifacts directory")
                            .with_alias('a')
                            .with_default("./web-ext-artifacts")
                            .normalized(),
                    ),
            )
            .unwrap();
        program
            .command(
                "lint",
                "Validate the extension source",
                recorder(&seen),
                OptionSchema::new()
                    .with_option(
                        "output",
                        OptionSpec::string("The type of output to generate")
                            .with_alias('o')
                            .with_default("text")
                            .with_choices(&["json", "text"]),
                    )
                    .with_option(
                        "warnings-as-errors",
                        OptionSpec::boolean("Treat warnings as errors").with_alias('w'),
                    ),
            )
            .unwrap()
            .command("docs", "Open the documentation", recorder(&seen), OptionSchema::new())
            .unwrap();

        Fixture {
            program,
            seen,
            _home: home,
            cwd,
        }
    }

    fn seen(fixture: &Fixture) -> Option<ParsedArgs> {
        fixture.seen.lock().unwrap().clone()
    }

    #[tokio::test]
    async fn test_dispatches_with_defaults() {
        let fixture = fixture();
        fixture.program.run(["lint"]).await.unwrap();

        let args = seen(&fixture).unwrap();
        assert_eq!(args.command(), Some("lint"));
        assert_eq!(args.get_str("output"), Some("text"));
        assert_eq!(args.get_str("artifacts-dir"), Some("web-ext-artifacts"));
        assert!(!args.get_bool("verbose"));
        assert_eq!(args.version(), Some("1.2.3"));
    }

    #[tokio::test]
    async fn test_global_before_and_after_command() {
        let fixture = fixture();

        fixture.program.run(["-v", "lint"]).await.unwrap();
        assert!(seen(&fixture).unwrap().get_bool("verbose"));

        fixture.program.run(["lint", "--verbose"]).await.unwrap();
        assert!(seen(&fixture).unwrap().get_bool("verbose"));
    }

    #[tokio::test]
    async fn test_unknown_command() {
        let fixture = fixture();
        let err = fixture.program.run(["frobnicate"]).await.unwrap_err();

        assert!(err.is_usage());
        assert_eq!(err.command(), None);
        assert_eq!(err.to_string(), "Unknown command: frobnicate");
        assert!(seen(&fixture).is_none());
    }

    #[tokio::test]
    async fn test_unknown_command_suggestion() {
        let fixture = fixture();
        let err = fixture.program.run(["lnit"]).await.unwrap_err();
        assert_eq!(err.to_string(), "Unknown command: lnit\nDid you mean `lint`?");
    }

    #[tokio::test]
    async fn test_no_sub_command() {
        let fixture = fixture();
        let err = fixture.program.run(Vec::<String>::new()).await.unwrap_err();

        assert!(err.is_usage());
        assert_eq!(err.to_string(), NO_SUB_COMMAND);
    }

    #[tokio::test]
    async fn test_invalid_choice_never_reaches_executor() {
        let fixture = fixture();
        let err = fixture.program.run(["lint", "--output=xml"]).await.unwrap_err();

        assert!(err.is_usage());
        assert_eq!(err.command(), Some("lint"));
        assert!(err.to_string().starts_with("lint: Invalid values:"));
        assert!(seen(&fixture).is_none());
    }

    #[tokio::test]
    async fn test_unknown_flag() {
        let fixture = fixture();
        let err = fixture.program.run(["lint", "--bogus"]).await.unwrap_err();
        assert_eq!(err.to_string(), "lint: Unknown argument: bogus");
    }

    #[tokio::test]
    async fn test_command_without_options_rejects_arguments() {
        let fixture = fixture();
        let err = fixture.program.run(["docs", "extra"]).await.unwrap_err();
        assert_eq!(err.to_string(), format!("docs: {NO_ARGUMENTS}"));

        fixture.program.run(["docs", "-v"]).await.unwrap();
        assert!(seen(&fixture).unwrap().get_bool("verbose"));
    }

    #[tokio::test]
    async fn test_help_is_not_a_failure() {
        let fixture = fixture();
        fixture.program.run(["--help"]).await.unwrap();
        fixture.program.run(["lint", "--help"]).await.unwrap();
        fixture.program.run(["--version"]).await.unwrap();
        assert!(seen(&fixture).is_none());
    }

    #[tokio::test]
    #[serial]
    async fn test_environment_fills_unset_option() {
        let fixture = fixture_with_prefix("DISPATCH_PROGRAM_ENV_TEST");
        // SAFETY: serialized with every other test touching the environment.
        unsafe { std::env::set_var("DISPATCH_PROGRAM_ENV_TEST_OUTPUT", "json") };

        let from_env = fixture.program.run(["lint"]).await;
        let args = seen(&fixture);
        let from_cli = fixture.program.run(["lint", "--output", "text"]).await;
        let cli_args = seen(&fixture);

        unsafe { std::env::remove_var("DISPATCH_PROGRAM_ENV_TEST_OUTPUT") };

        from_env.unwrap();
        let args = args.unwrap();
        assert_eq!(args.get_str("output"), Some("json"));
        assert_eq!(args.source("output"), Some(ValueSource::Environment));

        from_cli.unwrap();
        assert_eq!(cli_args.unwrap().get_str("output"), Some("text"));
    }

    #[tokio::test]
    async fn test_operational_error_code() {
        let mut fixture = fixture();
        fixture
            .program
            .command(
                "sign",
                "Sign the extension",
                |_args: ParsedArgs| async {
                    Err::<(), _>(anyhow::Error::from(
                        OperationalError::new("signing service unreachable").with_code("E_NET"),
                    ))
                },
                OptionSchema::new().with_option("channel", OptionSpec::string("Channel").with_default("listed")),
            )
            .unwrap();

        let err = fixture.program.run(["sign"]).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::Operational);
        assert_eq!(err.code(), Some("E_NET"));
        assert!(err.to_string().contains("Error code: E_NET"));
        assert!(err.to_string().starts_with("sign: signing service unreachable"));
    }

    #[tokio::test]
    async fn test_usage_error_from_executor_is_short() {
        let mut fixture = fixture();
        fixture
            .program
            .command(
                "run",
                "Run the extension",
                |_args: ParsedArgs| async {
                    Err::<(), _>(anyhow::Error::from(UsageError::new("No target browser found")))
                },
                OptionSchema::new().with_option("target", OptionSpec::array("Targets").with_required(false)),
            )
            .unwrap();

        let err = fixture.program.run(["run"]).await.unwrap_err();
        assert!(err.is_usage());
        assert_eq!(err.to_string(), "run: No target browser found");
    }

    #[tokio::test]
    async fn test_coercion_failure_never_reaches_executor() {
        let mut fixture = fixture();
        let called = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&called);
        fixture
            .program
            .command(
                "build",
                "Build the extension",
                move |_args: ParsedArgs| {
                    flag.store(true, Ordering::SeqCst);
                    async { anyhow::Ok(()) }
                },
                OptionSchema::new().with_option(
                    "filename",
                    OptionSpec::string("Artifact name")
                        .with_required(false)
                        .with_coerce(|_| Err(CoerceError("Invalid filename".to_string()))),
                ),
            )
            .unwrap();

        let err = fixture.program.run(["build", "--filename", "x"]).await.unwrap_err();
        assert!(err.is_usage());
        assert_eq!(err.to_string(), "build: Invalid filename");
        assert!(!called.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_required_global_reported() {
        let mut fixture = fixture();
        fixture
            .program
            .set_global_options(OptionSchema::new().with_option("source-dir", OptionSpec::string("Source")))
            .unwrap();

        let err = fixture.program.run(["lint"]).await.unwrap_err();
        assert_eq!(err.to_string(), "lint: Missing required argument: source-dir");

        fixture.program.run(["lint", "--source-dir", "ext"]).await.unwrap();
        assert_eq!(seen(&fixture).unwrap().get_str("source-dir"), Some("ext"));
    }

    #[tokio::test]
    async fn test_later_globals_override_earlier() {
        let mut fixture = fixture();
        fixture
            .program
            .set_global_options(OptionSchema::new().with_option(
                "artifacts-dir",
                OptionSpec::string("Artifacts").with_default("dist"),
            ))
            .unwrap();

        fixture.program.run(["lint"]).await.unwrap();
        assert_eq!(seen(&fixture).unwrap().get_str("artifacts-dir"), Some("dist"));
    }

    #[tokio::test]
    async fn test_duplicate_command_rejected() {
        let mut fixture = fixture();
        let seen = Arc::clone(&fixture.seen);
        let err = fixture
            .program
            .command("lint", "again", recorder(&seen), OptionSchema::new())
            .err();
        assert!(err.is_some());
    }

    #[tokio::test]
    async fn test_discovered_config_applies() {
        let fixture = fixture();
        fs::write(
            fixture.cwd.path().join("extool-config.yml"),
            "verbose: true\nlint:\n  output: json\n",
        )
        .unwrap();

        fixture.program.run(["lint"]).await.unwrap();
        let args = seen(&fixture).unwrap();
        assert_eq!(args.get_str("output"), Some("json"));
        assert_eq!(args.source("output"), Some(ValueSource::ConfigFile));
        assert!(args.get_bool("verbose"));

        fixture.program.run(["lint", "-o", "text"]).await.unwrap();
        assert_eq!(seen(&fixture).unwrap().get_str("output"), Some("text"));

        fixture.program.run(["lint", "--no-config-discovery"]).await.unwrap();
        assert_eq!(seen(&fixture).unwrap().get_str("output"), Some("text"));
        assert_eq!(
            seen(&fixture).unwrap().source("output"),
            Some(ValueSource::Default)
        );
    }

    #[tokio::test]
    async fn test_explicit_config_errors_are_usage_errors() {
        let fixture = fixture();
        fs::write(fixture.cwd.path().join("custom.yml"), "lint:\n  output: xml\n").unwrap();

        let err = fixture
            .program
            .run(["lint", "--config", "custom.yml"])
            .await
            .unwrap_err();
        assert!(err.is_usage());
        assert!(err.to_string().contains("Invalid values:"));

        let err = fixture
            .program
            .run(["lint", "-c", "missing.yml"])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Cannot read config file"));
    }

    #[tokio::test]
    async fn test_version_getter_failure_uses_fallback() {
        let seen: Seen = Arc::new(Mutex::new(None));
        let cwd = TempDir::new().unwrap();
        let mut program = Program::new("extool")
            .exit_on_error(false)
            .with_working_dir(cwd.path())
            .with_home_dir(cwd.path())
            .with_version_getter(|_| Err(anyhow::anyhow!("no manifest")))
            .with_fallback_version("9.9.9");
        program
            .command("docs", "Open the documentation", recorder(&seen), OptionSchema::new())
            .unwrap();

        program.run(["docs"]).await.unwrap();
        assert_eq!(seen.lock().unwrap().as_ref().unwrap().version(), Some("9.9.9"));
    }

    #[tokio::test]
    async fn test_default_version_getter_without_manifest() {
        let seen: Seen = Arc::new(Mutex::new(None));
        let cwd = TempDir::new().unwrap();
        let mut program = Program::new("extool")
            .exit_on_error(false)
            .with_working_dir(cwd.path())
            .with_home_dir(cwd.path());
        program
            .command("docs", "Open the documentation", recorder(&seen), OptionSchema::new())
            .unwrap();

        program.run(["docs"]).await.unwrap();
        program.run(["--help"]).await.unwrap();
        assert_eq!(
            seen.lock().unwrap().as_ref().unwrap().version(),
            Some(UNKNOWN_VERSION)
        );
    }

    #[tokio::test]
    async fn test_verbose_report_is_full_even_when_parsing_fails() {
        let fixture = fixture();

        let short = fixture.program.run(["lint", "--output=xml"]).await.unwrap_err();
        let verbose = fixture
            .program
            .run(["-v", "lint", "--output=xml"])
            .await
            .unwrap_err();
        assert_ne!(verbose.report(), short.report());
        assert!(verbose.report().contains("UsageError"));

        let err = fixture.program.run(["lint", "-v", "--bogus"]).await.unwrap_err();
        assert!(err.report().starts_with("lint: Unknown argument: bogus"));
        assert!(err.report().contains("UsageError"));

        let err = fixture.program.run(["lint", "--bogus"]).await.unwrap_err();
        assert_eq!(err.report(), "lint: Unknown argument: bogus");
    }
}
