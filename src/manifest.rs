use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_MANIFEST: &str = "environment.yml";
pub const PIP_INSTALLER: &str = "pip";

#[derive(Debug, Error, PartialEq)]
pub enum ManifestError {
    #[error("not a valid conda yaml: missing `dependencies` list")]
    MissingDependencies,
    #[error("did not find a `pip` entry under `dependencies`")]
    MissingPip,
}

/// Raw `environment.yml` as written on disk.
#[derive(Debug, Clone, Deserialize)]
struct RawManifest {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    channels: Vec<String>,
    #[serde(default)]
    dependencies: Option<Vec<Dependency>>,
}

/// One entry of the `dependencies` list: either a conda spec such as
/// `python=3.7` or a mapping from installer to its own package list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Dependency {
    Package(String),
    Installer(BTreeMap<String, Option<Vec<String>>>),
}

#[derive(Debug, Clone, Serialize)]
pub struct EnvironmentManifest {
    pub name: Option<String>,
    pub channels: Vec<String>,
    pub dependencies: Vec<Dependency>,
}

impl EnvironmentManifest {
    /// Packages listed under the `pip` installer. The last `pip` entry wins
    /// and a null list counts as absent.
    pub fn pip_packages(&self) -> Result<&[String], ManifestError> {
        self.installer_packages(PIP_INSTALLER)
            .ok_or(ManifestError::MissingPip)
    }

    fn installer_packages(&self, installer: &str) -> Option<&[String]> {
        self.dependencies
            .iter()
            .filter_map(|dep| match dep {
                Dependency::Installer(map) => map.get(installer)?.as_deref(),
                Dependency::Package(_) => None,
            })
            .last()
    }

    pub fn conda_packages(&self) -> Vec<&str> {
        self.dependencies
            .iter()
            .filter_map(|dep| match dep {
                Dependency::Package(package) => Some(package.as_str()),
                Dependency::Installer(_) => None,
            })
            .collect()
    }
}

pub fn load_manifest(path: &Path) -> Result<EnvironmentManifest> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read manifest from {}", path.display()))?;
    parse_manifest(&contents).with_context(|| format!("invalid manifest {}", path.display()))
}

pub fn parse_manifest(contents: &str) -> Result<EnvironmentManifest> {
    let raw: RawManifest =
        serde_yaml::from_str(contents).context("failed to parse manifest YAML")?;

    let dependencies = raw.dependencies.ok_or(ManifestError::MissingDependencies)?;

    Ok(EnvironmentManifest {
        name: raw.name,
        channels: raw.channels,
        dependencies,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
name: chem
channels:
  - conda-forge
  - defaults
dependencies:
  - python=3.7
  - numpy
  - pip:
    - seaborn
    - git+https://github.com/example/tool.git
"#;

    #[test]
    fn parse_full_manifest() {
        let manifest = parse_manifest(FULL).unwrap();
        assert_eq!(manifest.name.as_deref(), Some("chem"));
        assert_eq!(manifest.channels, vec!["conda-forge", "defaults"]);
        assert_eq!(manifest.conda_packages(), vec!["python=3.7", "numpy"]);
        assert_eq!(
            manifest.pip_packages().unwrap(),
            ["seaborn", "git+https://github.com/example/tool.git"]
        );
    }

    #[test]
    fn missing_dependencies_is_error() {
        let err = parse_manifest("name: chem\n").unwrap_err();
        assert_eq!(
            err.downcast_ref::<ManifestError>(),
            Some(&ManifestError::MissingDependencies)
        );
    }

    #[test]
    fn missing_pip_entry_is_error() {
        let manifest = parse_manifest("dependencies:\n  - python=3.7\n").unwrap();
        assert_eq!(manifest.pip_packages(), Err(ManifestError::MissingPip));
    }

    #[test]
    fn null_pip_list_counts_as_missing() {
        let manifest = parse_manifest("dependencies:\n  - pip:\n").unwrap();
        assert_eq!(manifest.pip_packages(), Err(ManifestError::MissingPip));
    }

    #[test]
    fn other_installers_are_ignored() {
        let yaml = "dependencies:\n  - conda: [rdkit]\n  - pip: [x]\n";
        let manifest = parse_manifest(yaml).unwrap();
        assert_eq!(manifest.pip_packages().unwrap(), ["x"]);
    }

    #[test]
    fn last_pip_entry_wins() {
        let yaml = "dependencies:\n  - pip: [a]\n  - pip: [b, c]\n";
        let manifest = parse_manifest(yaml).unwrap();
        assert_eq!(manifest.pip_packages().unwrap(), ["b", "c"]);
    }

    #[test]
    fn malformed_yaml_is_error() {
        assert!(parse_manifest("dependencies: [unclosed").is_err());
    }

    #[test]
    fn load_manifest_names_the_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(DEFAULT_MANIFEST);
        std::fs::write(&path, "channels: []\n").unwrap();

        let err = load_manifest(&path).unwrap_err();
        let msg = format!("{:#}", err);
        assert!(msg.contains("environment.yml"), "unexpected error: {}", msg);
        assert!(msg.contains("dependencies"), "unexpected error: {}", msg);
    }

    #[test]
    fn load_manifest_missing_file_is_error() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(load_manifest(&tmp.path().join("nope.yml")).is_err());
    }
}
