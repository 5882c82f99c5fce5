use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::paths::{expand_tilde, url_file_name};
use crate::runner::DEFAULT_SHELL;

pub const CONDA_SITE_PACKAGES: &str = "/usr/local/lib/python3.7/site-packages/";
pub const CONDA_INSTALLER_URL: &str =
    "https://repo.continuum.io/miniconda/Miniconda3-latest-Linux-x86_64.sh";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub runner: RunnerConfig,
    #[serde(default)]
    pub python: PythonConfig,
    #[serde(default)]
    pub ssh: SshConfig,
    #[serde(default)]
    pub bootstrap: BootstrapConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Interpreter used for commands run with `--shell`.
    #[serde(default = "default_shell")]
    pub shell: String,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            shell: default_shell(),
        }
    }
}

fn default_shell() -> String {
    DEFAULT_SHELL.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PythonConfig {
    #[serde(default = "default_site_packages")]
    pub site_packages: PathBuf,
    #[serde(default)]
    pub search_paths: Vec<PathBuf>,
    /// Forces hosted-kernel detection on or off.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hosted: Option<bool>,
}

impl Default for PythonConfig {
    fn default() -> Self {
        Self {
            site_packages: default_site_packages(),
            search_paths: Vec::new(),
            hosted: None,
        }
    }
}

fn default_site_packages() -> PathBuf {
    PathBuf::from(CONDA_SITE_PACKAGES)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SshConfig {
    #[serde(default = "default_key_dir")]
    pub key_dir: PathBuf,
    #[serde(default = "default_known_hosts")]
    pub hosts: Vec<String>,
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            key_dir: default_key_dir(),
            hosts: default_known_hosts(),
        }
    }
}

fn default_key_dir() -> PathBuf {
    PathBuf::from("/root/.ssh")
}

fn default_known_hosts() -> Vec<String> {
    vec!["github.com".to_string()]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BootstrapConfig {
    #[serde(default = "default_installer_url")]
    pub installer_url: String,
    #[serde(default = "default_prefix")]
    pub prefix: PathBuf,
    #[serde(default = "default_channel")]
    pub channel: String,
    #[serde(default = "default_packages")]
    pub packages: Vec<String>,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            installer_url: default_installer_url(),
            prefix: default_prefix(),
            channel: default_channel(),
            packages: default_packages(),
        }
    }
}

fn default_installer_url() -> String {
    CONDA_INSTALLER_URL.to_string()
}

fn default_prefix() -> PathBuf {
    PathBuf::from("/usr/local")
}

fn default_channel() -> String {
    "conda-forge".to_string()
}

fn default_packages() -> Vec<String> {
    vec!["rdkit".to_string()]
}

pub fn default_config_path() -> Result<PathBuf> {
    let proj = directories::ProjectDirs::from("", "", "kernel-prep")
        .context("could not determine config directory")?;
    Ok(proj.config_dir().join("config.toml"))
}

/// Loads `path`, or the built-in defaults when the file does not exist.
pub fn load_config_or_default(path: &Path) -> Result<Config> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no config file, using defaults");
        return Ok(Config::default());
    }
    load_config(path)
}

pub fn load_config(path: &Path) -> Result<Config> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config from {}", path.display()))?;
    parse_config(&contents)
}

pub fn parse_config(contents: &str) -> Result<Config> {
    let mut config: Config = toml::from_str(contents).context("failed to parse config TOML")?;

    if config.runner.shell.trim().is_empty() {
        bail!("runner.shell must not be empty");
    }
    if config.bootstrap.packages.is_empty() {
        bail!("bootstrap.packages must list at least one package");
    }
    let installer_url = &config.bootstrap.installer_url;
    if installer_url.ends_with('/') || url_file_name(installer_url).is_empty() {
        bail!(
            "bootstrap.installer_url must end in a file name: {}",
            config.bootstrap.installer_url
        );
    }

    config.python.site_packages = expand(&config.python.site_packages);
    config.python.search_paths = config.python.search_paths.iter().map(|p| expand(p)).collect();
    config.ssh.key_dir = expand(&config.ssh.key_dir);
    config.bootstrap.prefix = expand(&config.bootstrap.prefix);

    Ok(config)
}

fn expand(path: &Path) -> PathBuf {
    expand_tilde(path.to_str().unwrap_or(""))
}

pub fn write_config_atomic(path: &Path, config: &Config, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "config already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create config directory {}", parent.display()))?;
    }

    let content = toml::to_string_pretty(config).context("failed to serialize config")?;

    let tmp_path = path.with_extension("toml.tmp");
    std::fs::write(&tmp_path, &content)
        .with_context(|| format!("failed to write temp config to {}", tmp_path.display()))?;
    std::fs::rename(&tmp_path, path)
        .with_context(|| format!("failed to rename config to {}", path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_config() {
        let toml = r#"
[runner]
shell = "/bin/bash"

[python]
site_packages = "/opt/conda/lib/python3.10/site-packages"
search_paths = ["/content/lib"]
hosted = true

[ssh]
key_dir = "/tmp/keys"
hosts = ["github.com", "gitlab.com"]

[bootstrap]
installer_url = "https://example.com/Miniforge3-Linux-x86_64.sh"
prefix = "/opt/conda"
channel = "bioconda"
packages = ["rdkit", "openbabel"]
"#;
        let config = parse_config(toml).unwrap();
        assert_eq!(config.runner.shell, "/bin/bash");
        assert_eq!(
            config.python.site_packages,
            PathBuf::from("/opt/conda/lib/python3.10/site-packages")
        );
        assert_eq!(config.python.search_paths, vec![PathBuf::from("/content/lib")]);
        assert_eq!(config.python.hosted, Some(true));
        assert_eq!(config.ssh.hosts, vec!["github.com", "gitlab.com"]);
        assert_eq!(config.bootstrap.channel, "bioconda");
        assert_eq!(config.bootstrap.packages, vec!["rdkit", "openbabel"]);
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.runner.shell, "/bin/sh");
        assert_eq!(config.ssh.key_dir, PathBuf::from("/root/.ssh"));
        assert_eq!(config.bootstrap.packages, vec!["rdkit"]);
        assert_eq!(config.python.hosted, None);
    }

    #[test]
    fn partial_section_fills_missing_fields() {
        let config = parse_config("[bootstrap]\nchannel = \"defaults\"\n").unwrap();
        assert_eq!(config.bootstrap.channel, "defaults");
        assert_eq!(config.bootstrap.installer_url, CONDA_INSTALLER_URL);
        assert_eq!(config.bootstrap.prefix, PathBuf::from("/usr/local"));
    }

    #[test]
    fn tilde_expansion_on_paths() {
        let home = std::env::var("HOME").unwrap();
        let config = parse_config("[ssh]\nkey_dir = \"~/.ssh\"\n").unwrap();
        assert_eq!(config.ssh.key_dir, PathBuf::from(&home).join(".ssh"));
    }

    #[test]
    fn empty_shell_errors() {
        let result = parse_config("[runner]\nshell = \"\"\n");
        assert!(result.unwrap_err().to_string().contains("runner.shell"));
    }

    #[test]
    fn empty_bootstrap_packages_errors() {
        let result = parse_config("[bootstrap]\npackages = []\n");
        assert!(result.unwrap_err().to_string().contains("bootstrap.packages"));
    }

    #[test]
    fn installer_url_without_file_name_errors() {
        let result = parse_config("[bootstrap]\ninstaller_url = \"https://example.com/\"\n");
        assert!(result.unwrap_err().to_string().contains("installer_url"));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let config = load_config_or_default(&tmp.path().join("config.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn write_then_load_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.ssh.hosts.push("bitbucket.org".to_string());
        write_config_atomic(&path, &config, false).unwrap();

        assert_eq!(load_config(&path).unwrap(), config);
        assert!(!path.with_extension("toml.tmp").exists());
    }

    #[test]
    fn write_refuses_to_overwrite_without_force() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        write_config_atomic(&path, &Config::default(), false).unwrap();

        let err = write_config_atomic(&path, &Config::default(), false).unwrap_err();
        assert!(err.to_string().contains("--force"));
        write_config_atomic(&path, &Config::default(), true).unwrap();
    }
}
