use anyhow::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::config::BootstrapConfig;
use crate::environment::Environment;
use crate::paths::url_file_name;
use crate::runner::{run_cmd_list, CommandSpec, Runner};

/// Download the installer, install conda under the prefix, install the
/// requested packages, then remove the installer script.
pub fn bootstrap_commands(cfg: &BootstrapConfig, workdir: &Path) -> Vec<CommandSpec> {
    let script = url_file_name(&cfg.installer_url).to_string();
    let prefix = cfg.prefix.display().to_string();

    let mut conda_install = vec![
        "conda".to_string(),
        "install".to_string(),
        "-q".to_string(),
        "-y".to_string(),
        "-c".to_string(),
        cfg.channel.clone(),
    ];
    conda_install.extend(cfg.packages.iter().cloned());

    vec![
        CommandSpec::argv(["wget", "-c", cfg.installer_url.as_str()]),
        CommandSpec::argv(["chmod", "+x", script.as_str()]),
        CommandSpec::argv([
            "bash".to_string(),
            format!("./{}", script),
            "-b".to_string(),
            "-f".to_string(),
            "-p".to_string(),
            prefix,
        ]),
        CommandSpec::argv(conda_install),
        CommandSpec::argv(["rm", "-rf", script.as_str()]),
    ]
    .into_iter()
    .map(|cmd| cmd.in_dir(workdir))
    .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    NotHosted,
    AlreadyInstalled,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub enum BootstrapOutcome {
    Installed { notice: String },
    Skipped { reason: SkipReason },
}

#[derive(Debug, Serialize)]
pub struct BootstrapResult {
    pub site_packages: PathBuf,
    pub packages: Vec<String>,
    pub outcome: BootstrapOutcome,
}

pub fn should_bootstrap(env: &Environment, force: bool) -> Result<(), SkipReason> {
    if !env.hosted {
        return Err(SkipReason::NotHosted);
    }
    if env.site_packages_present() && !force {
        return Err(SkipReason::AlreadyInstalled);
    }
    Ok(())
}

pub fn restart_notice(site_packages: &Path) -> String {
    format!(
        "Restart your runtime and append \"{}\" to sys.path!",
        site_packages.display()
    )
}

pub fn cmd_bootstrap<R: Runner + ?Sized>(
    runner: &mut R,
    env: &Environment,
    cfg: &BootstrapConfig,
    workdir: &Path,
    force: bool,
) -> Result<BootstrapResult> {
    let outcome = match should_bootstrap(env, force) {
        Err(reason) => {
            tracing::info!(?reason, "skipping conda bootstrap");
            BootstrapOutcome::Skipped { reason }
        }
        Ok(()) => {
            run_cmd_list(runner, &bootstrap_commands(cfg, workdir))?;
            BootstrapOutcome::Installed {
                notice: restart_notice(&env.site_packages),
            }
        }
    };

    Ok(BootstrapResult {
        site_packages: env.site_packages.clone(),
        packages: cfg.packages.clone(),
        outcome,
    })
}

pub fn format_bootstrap_human(result: &BootstrapResult) -> String {
    match &result.outcome {
        BootstrapOutcome::Installed { notice } => notice.clone(),
        BootstrapOutcome::Skipped {
            reason: SkipReason::NotHosted,
        } => "Skipped: not running in a hosted notebook kernel".to_string(),
        BootstrapOutcome::Skipped {
            reason: SkipReason::AlreadyInstalled,
        } => format!(
            "Skipped: {} already exists (use --force to reinstall)",
            result.site_packages.display()
        ),
    }
}
