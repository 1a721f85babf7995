//! Reads the program version from a Cargo manifest.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

const MANIFEST: &str = "Cargo.toml";

#[derive(Debug, Error)]
pub enum VersionError {
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("{} declares no package version", path.display())]
    Missing { path: PathBuf },
}

#[derive(Debug, Deserialize)]
struct Manifest {
    package: Option<Package>,
    workspace: Option<Workspace>,
}

#[derive(Debug, Deserialize)]
struct Package {
    version: Option<toml::Value>,
}

#[derive(Debug, Deserialize)]
struct Workspace {
    package: Option<WorkspacePackage>,
}

#[derive(Debug, Deserialize)]
struct WorkspacePackage {
    version: Option<String>,
}

/// Returns the version declared by `base_dir/Cargo.toml`.
///
/// A `version.workspace = true` package inherits from the nearest ancestor
/// manifest carrying `[workspace.package] version`.
pub fn read_manifest_version(base_dir: &Path) -> Result<String, VersionError> {
    let path = base_dir.join(MANIFEST);
    let manifest = read_manifest(&path)?;

    if let Some(version) = manifest
        .package
        .as_ref()
        .and_then(|package| package.version.as_ref())
        .and_then(toml::Value::as_str)
    {
        return Ok(version.to_string());
    }
    if let Some(version) = workspace_version(&manifest) {
        return Ok(version);
    }

    for ancestor in base_dir.ancestors().skip(1) {
        let candidate = ancestor.join(MANIFEST);
        if !candidate.is_file() {
            continue;
        }
        if let Some(version) = workspace_version(&read_manifest(&candidate)?) {
            return Ok(version);
        }
    }

    Err(VersionError::Missing { path })
}

fn read_manifest(path: &Path) -> Result<Manifest, VersionError> {
    let text = fs::read_to_string(path).map_err(|source| VersionError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&text).map_err(|source| VersionError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn workspace_version(manifest: &Manifest) -> Option<String> {
    manifest
        .workspace
        .as_ref()?
        .package
        .as_ref()?
        .version
        .clone()
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_package_version() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(MANIFEST),
            "[package]\nname = \"extool\"\nversion = \"2.3.4\"\n",
        )
        .unwrap();

        assert_eq!(read_manifest_version(dir.path()).unwrap(), "2.3.4");
    }

    #[test]
    fn test_inherited_workspace_version() {
        let root = TempDir::new().unwrap();
        fs::write(
            root.path().join(MANIFEST),
            "[workspace]\nmembers = [\"cli\"]\n\n[workspace.package]\nversion = \"0.9.0\"\n",
        )
        .unwrap();
        let member = root.path().join("cli");
        fs::create_dir(&member).unwrap();
        fs::write(
            member.join(MANIFEST),
            "[package]\nname = \"cli\"\nversion.workspace = true\n",
        )
        .unwrap();

        assert_eq!(read_manifest_version(&member).unwrap(), "0.9.0");
    }

    #[test]
    fn test_missing_manifest() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            read_manifest_version(dir.path()),
            Err(VersionError::Read { .. })
        ));
    }

    #[test]
    fn test_invalid_manifest() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(MANIFEST), "[package\n").unwrap();
        assert!(matches!(
            read_manifest_version(dir.path()),
            Err(VersionError::Parse { .. })
        ));
    }
}
