use std::fs;

use anyhow::Context;
use command_dispatch::{
    CoerceError, LogHandle, OptionSchema, OptionSpec, OptionValue, ParsedArgs, Program,
    RegistrationError, UsageError, read_manifest_version,
};
use tracing::level_filters::LevelFilter;

const PACKAGE_VERSION: &str = env!("CARGO_PKG_VERSION");
const PROGRAM_NAME: &str = "extool";

#[tokio::main]
async fn main() {
    let log_handle = match LogHandle::init(LevelFilter::WARN) {
        Ok(handle) => Some(handle),
        Err(err) => {
            eprintln!("warning: {err}");
            None
        }
    };

    let program = match build_program(log_handle) {
        Ok(program) => program,
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    };

    if program.run(std::env::args().skip(1)).await.is_err() {
        std::process::exit(1);
    }
}

fn build_program(log_handle: Option<LogHandle>) -> Result<Program, RegistrationError> {
    let mut program = Program::new(PROGRAM_NAME)
        .with_base_dir(env!("CARGO_MANIFEST_DIR"))
        .with_version_getter(|base_dir| Ok(read_manifest_version(base_dir)?))
        .with_fallback_version(PACKAGE_VERSION);
    if let Some(handle) = log_handle {
        program = program.with_log_handle(handle);
    }

    program
        .set_global_options(global_options())?
        .command(
            "build",
            "Create an extension package from source",
            build,
            build_options(),
        )?
        .command(
            "sign",
            "Sign the extension so it can be installed in Firefox",
            print_args,
            sign_options(),
        )?
        .command("run", "Run the extension", print_args, run_options())?
        .command("lint", "Validate the extension source", print_args, lint_options())?
        .command(
            "docs",
            "Open the documentation in a browser",
            print_args,
            OptionSchema::new(),
        )?;

    Ok(program)
}

fn global_options() -> OptionSchema {
    OptionSchema::new()
        .with_option(
            "source-dir",
            OptionSpec::string("Web extension source directory")
                .with_alias('s')
                .with_default(".")
                .requires_arg()
                .with_coerce(absolute_path),
        )
        .with_option(
            "artifacts-dir",
            OptionSpec::string("Directory where artifacts will be saved")
                .with_alias('a')
                .with_default("./web-ext-artifacts")
                .requires_arg()
                .normalized(),
        )
        .with_option(
            "verbose",
            OptionSpec::boolean("Show verbose output").with_alias('v'),
        )
        .with_option(
            "ignore-files",
            OptionSpec::array(
                "A list of glob patterns to define which files should be ignored",
            )
            .with_alias('i')
            .with_required(false),
        )
        .with_option(
            "no-input",
            OptionSpec::boolean("Disable all features that require standard input"),
        )
        .with_option(
            "config",
            OptionSpec::string("Path to a config file")
                .with_alias('c')
                .requires_arg()
                .with_required(false),
        )
        .with_option(
            "config-discovery",
            OptionSpec::boolean(
                "Discover config files in home directory and working directory",
            )
            .with_default(true),
        )
}

fn build_options() -> OptionSchema {
    OptionSchema::new()
        .with_option(
            "overwrite-dest",
            OptionSpec::boolean("Overwrite destination package if it exists").with_alias('o'),
        )
        .with_option(
            "filename",
            OptionSpec::string("Name of the created extension package file")
                .with_alias('n')
                .requires_arg()
                .with_required(false)
                .normalized(),
        )
}

fn sign_options() -> OptionSchema {
    OptionSchema::new()
        .with_option("api-key", OptionSpec::string("API key (JWT issuer)"))
        .with_option("api-secret", OptionSpec::string("API secret (JWT secret)"))
        .with_option(
            "amo-base-url",
            OptionSpec::string("Signing API URL prefix")
                .with_default("https://addons.mozilla.org/api/v5/")
                .requires_arg(),
        )
        .with_option(
            "channel",
            OptionSpec::string("The channel for which to sign the addon")
                .with_choices(&["listed", "unlisted"])
                .with_required(false),
        )
        .with_option(
            "timeout",
            OptionSpec::number("Number of milliseconds to wait before giving up")
                .with_default(900000.0),
        )
}

fn run_options() -> OptionSchema {
    OptionSchema::new()
        .with_option(
            "target",
            OptionSpec::array("The extensions runners to enable")
                .with_alias('t')
                .with_default(vec!["firefox-desktop".to_string()])
                .with_choices(&["firefox-desktop", "firefox-android", "chromium"]),
        )
        .with_option(
            "firefox",
            OptionSpec::string("Path or alias to a Firefox executable")
                .with_alias('f')
                .requires_arg()
                .with_required(false),
        )
        .with_option(
            "pref",
            OptionSpec::array("Launch firefox with a custom preference")
                .requires_arg()
                .with_required(false),
        )
        .with_option(
            "start-url",
            OptionSpec::array("Launch firefox at specified page")
                .with_alias('u')
                .with_required(false),
        )
        .with_option(
            "reload",
            OptionSpec::boolean("Reload the extension when source files change")
                .with_default(true),
        )
}

fn lint_options() -> OptionSchema {
    OptionSchema::new()
        .with_option(
            "output",
            OptionSpec::string("The type of output to generate")
                .with_alias('o')
                .with_default("text")
                .with_choices(&["json", "text"]),
        )
        .with_option(
            "metadata",
            OptionSpec::boolean("Output only metadata as JSON"),
        )
        .with_option(
            "warnings-as-errors",
            OptionSpec::boolean("Treat warnings as errors").with_alias('w'),
        )
        .with_option(
            "pretty",
            OptionSpec::boolean("Prettify JSON output"),
        )
        .with_option(
            "self-hosted",
            OptionSpec::boolean("Your extension will be self-hosted"),
        )
}

fn absolute_path(value: OptionValue) -> Result<OptionValue, CoerceError> {
    match value {
        OptionValue::String(path) => std::path::absolute(&path)
            .map(|absolute| OptionValue::String(absolute.to_string_lossy().into_owned()))
            .map_err(|err| CoerceError(format!("Cannot resolve path {path}: {err}"))),
        other => Ok(other),
    }
}

async fn build(args: ParsedArgs) -> anyhow::Result<()> {
    let source_dir = args.get_str("source-dir").unwrap_or(".");
    let metadata = fs::metadata(source_dir)
        .with_context(|| format!("cannot read source directory {source_dir}"))?;
    if !metadata.is_dir() {
        return Err(UsageError::new(format!("Source is not a directory: {source_dir}")).into());
    }
    print_args(args).await
}

async fn print_args(args: ParsedArgs) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(&args)?);
    Ok(())
}
