//! YAML config files.
//!
//! Top-level keys name global options. A key naming a registered command
//! holds a mapping of that command's options and only applies when that
//! command runs. Keys may be kebab-case (`source-dir`) or camelCase
//! (`sourceDir`).

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use command_dispatch_core::{OptionSchema, OptionSpec, OptionValue, ValueType};
use heck::ToKebabCase;
use serde_yaml::{Mapping, Value};
use tracing::{debug, info};

use crate::error::UsageError;
use crate::registry::CommandRegistry;

/// A value read from a config file.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigValue {
    pub value: OptionValue,
    pub file: PathBuf,
}

/// Option values gathered from every applied config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigValues {
    values: BTreeMap<String, ConfigValue>,
}

impl ConfigValues {
    pub fn get(&self, name: &str) -> Option<&ConfigValue> {
        self.values.get(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Applies one file's mapping. Values from later files replace earlier
    /// ones.
    pub(crate) fn apply(
        &mut self,
        file: &Path,
        mapping: &Mapping,
        schema: &OptionSchema,
        command: &str,
        registry: &CommandRegistry,
    ) -> Result<(), UsageError> {
        self.apply_section(file, mapping, schema, command, registry, true)
    }

    fn apply_section(
        &mut self,
        file: &Path,
        mapping: &Mapping,
        schema: &OptionSchema,
        command: &str,
        registry: &CommandRegistry,
        top_level: bool,
    ) -> Result<(), UsageError> {
        for (key, value) in mapping {
            let Some(key) = key.as_str() else {
                return Err(UsageError::new(format!(
                    "The config file at {} contains a non-string key",
                    file.display()
                )));
            };
            if value.is_null() {
                continue;
            }
            let name = key.to_kebab_case();

            if top_level && registry.get(&name).is_some() {
                let Value::Mapping(section) = value else {
                    return Err(UsageError::new(format!(
                        "The config file at {} must define \"{key}\" as a mapping of options",
                        file.display()
                    )));
                };
                if name == command {
                    self.apply_section(file, section, schema, command, registry, false)?;
                }
                continue;
            }

            match schema.get(&name) {
                Some(spec) => {
                    let value = config_value(file, key, spec, value)?;
                    debug!(option = %name, file = %file.display(), "config value");
                    self.values.insert(
                        name,
                        ConfigValue {
                            value,
                            file: file.to_path_buf(),
                        },
                    );
                }
                None if registry.known_option_names().contains(name.as_str()) => {}
                None => {
                    return Err(UsageError::new(format!(
                        "The config file at {} specified an unknown option: \"{key}\"",
                        file.display()
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Config files found by discovery, in application order: the home
/// directory file first, then the working directory file.
pub fn discover_config_files(
    program: &str,
    working_dir: &Path,
    home_dir: Option<&Path>,
) -> Vec<PathBuf> {
    let file_name = format!("{program}-config.yml");
    let candidates = [
        home_dir.map(|home| home.join(format!(".{file_name}"))),
        Some(working_dir.join(&file_name)),
    ];

    candidates
        .into_iter()
        .flatten()
        .filter(|path| path.is_file())
        .collect()
}

/// Reads and parses one config file. An empty file is an empty mapping.
pub fn load_config_file(path: &Path) -> Result<Mapping, UsageError> {
    let text = fs::read_to_string(path).map_err(|err| {
        UsageError::new(format!("Cannot read config file {}: {err}", path.display()))
    })?;

    match serde_yaml::from_str::<Value>(&text) {
        Ok(Value::Mapping(mapping)) => Ok(mapping),
        Ok(Value::Null) => Ok(Mapping::new()),
        Ok(_) => Err(UsageError::new(format!(
            "The config file at {} must contain a mapping of options",
            path.display()
        ))),
        Err(err) => Err(UsageError::new(format!(
            "Cannot parse config file {}: {err}",
            path.display()
        ))),
    }
}

/// Loads `files` in order for `command`.
pub(crate) fn load_config_values(
    files: &[PathBuf],
    schema: &OptionSchema,
    command: &str,
    registry: &CommandRegistry,
    working_dir: &Path,
    home_dir: Option<&Path>,
) -> Result<ConfigValues, UsageError> {
    let mut values = ConfigValues::default();
    if files.is_empty() {
        return Ok(values);
    }

    let shown: Vec<String> = files
        .iter()
        .map(|file| display_path(file, working_dir, home_dir))
        .collect();
    info!("Applying config files: {}", shown.join(", "));

    for file in files {
        let mapping = load_config_file(file)?;
        values.apply(file, &mapping, schema, command, registry)?;
    }
    Ok(values)
}

/// Shortens `path` relative to the working directory (`./`) or the home
/// directory (`~/`).
pub(crate) fn display_path(path: &Path, working_dir: &Path, home_dir: Option<&Path>) -> String {
    if let Ok(relative) = path.strip_prefix(working_dir) {
        return format!("./{}", relative.display());
    }
    if let Some(relative) = home_dir.and_then(|home| path.strip_prefix(home).ok()) {
        return format!("~/{}", relative.display());
    }
    path.display().to_string()
}

fn config_value(
    file: &Path,
    key: &str,
    spec: &OptionSpec,
    value: &Value,
) -> Result<OptionValue, UsageError> {
    let converted = match (spec.value_type, value) {
        (ValueType::Bool, Value::Bool(b)) => Some(OptionValue::Bool(*b)),
        (ValueType::String, Value::String(s)) => Some(OptionValue::String(s.clone())),
        (ValueType::Number, Value::Number(n)) => n.as_f64().map(OptionValue::Number),
        (ValueType::Array, Value::Sequence(items)) => items
            .iter()
            .map(|item| item.as_str().map(str::to_string))
            .collect::<Option<Vec<_>>>()
            .map(OptionValue::Array),
        _ => None,
    };

    converted.ok_or_else(|| {
        UsageError::new(format!(
            "The config file at {} specified the type of \"{key}\" incorrectly as \"{}\" (expected type \"{}\")",
            file.display(),
            yaml_type(value),
            spec.value_type
        ))
    })
}

fn yaml_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "array",
        Value::Mapping(_) => "object",
        Value::Tagged(_) => "tagged",
    }
}
