use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use ureq::Agent;

use crate::runner::{CommandSpec, Runner};

pub const KEY_FILE: &str = "id_rsa";
pub const KNOWN_HOSTS_FILE: &str = "known_hosts";

#[derive(Debug, Serialize)]
pub struct SshKeyResult {
    pub key_path: PathBuf,
    pub known_hosts_path: PathBuf,
    pub hosts: Vec<String>,
}

/// Installs a private key fetched from `url` and records host keys for
/// `hosts`, so private repositories can be cloned over SSH.
pub fn cmd_copy_ssh_key<R: Runner + ?Sized>(
    runner: &mut R,
    agent: &Agent,
    url: &str,
    key_dir: &Path,
    hosts: &[String],
) -> Result<SshKeyResult> {
    std::fs::create_dir_all(key_dir)
        .with_context(|| format!("failed to create key directory {}", key_dir.display()))?;

    let key = download(agent, url)?;
    let key_path = key_dir.join(KEY_FILE);
    install_key(&key_path, &key)?;
    tracing::info!(path = %key_path.display(), "installed private key");

    let mut args = vec!["ssh-keyscan".to_string()];
    args.extend(hosts.iter().cloned());
    let scanned = runner.capture(&CommandSpec::argv(args).verbose(false))?;

    let known_hosts_path = key_dir.join(KNOWN_HOSTS_FILE);
    std::fs::write(&known_hosts_path, scanned)
        .with_context(|| format!("failed to write {}", known_hosts_path.display()))?;

    Ok(SshKeyResult {
        key_path,
        known_hosts_path,
        hosts: hosts.to_vec(),
    })
}

fn download(agent: &Agent, url: &str) -> Result<Vec<u8>> {
    tracing::debug!(url, "downloading key");
    agent
        .get(url)
        .call()
        .with_context(|| format!("failed to download {}", url))?
        .body_mut()
        .read_to_vec()
        .with_context(|| format!("failed to read response body from {}", url))
}

/// Writes the key and leaves it readable by the owner only. An existing
/// read-only key is replaced.
fn install_key(path: &Path, key: &[u8]) -> Result<()> {
    if path.exists() {
        set_mode(path, 0o600)?;
    }
    std::fs::write(path, key).with_context(|| format!("failed to write {}", path.display()))?;
    set_mode(path, 0o400)
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
        .with_context(|| format!("failed to set permissions on {}", path.display()))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}

pub fn format_ssh_key_human(result: &SshKeyResult) -> String {
    format!(
        "Key written to {}\nKnown hosts ({}) written to {}",
        result.key_path.display(),
        result.hosts.join(", "),
        result.known_hosts_path.display()
    )
}
