use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::manifest::load_manifest;
use crate::runner::{CommandSpec, Runner};

pub fn pip_install_commands(packages: &[String], force: bool) -> Vec<CommandSpec> {
    packages
        .iter()
        .map(|package| {
            let mut args = vec!["pip", "install"];
            if force {
                args.extend(["--upgrade", "--force-reinstall"]);
            }
            args.push(package.as_str());
            CommandSpec::argv(args)
        })
        .collect()
}

#[derive(Debug, Serialize)]
pub struct PackageInstall {
    pub package: String,
    pub code: i32,
}

#[derive(Debug, Serialize)]
pub struct PipInstallResult {
    pub manifest: Option<PathBuf>,
    pub packages: Vec<PackageInstall>,
}

impl PipInstallResult {
    pub fn failures(&self) -> Vec<&str> {
        self.packages
            .iter()
            .filter(|p| p.code != 0)
            .map(|p| p.package.as_str())
            .collect()
    }
}

pub fn cmd_pip_install<R: Runner + ?Sized>(
    runner: &mut R,
    packages: &[String],
    force: bool,
) -> Result<PipInstallResult> {
    // Same contract as `run_cmd_list`, keeping each exit code for the report.
    let mut installs = Vec::with_capacity(packages.len());
    for (package, cmd) in packages.iter().zip(pip_install_commands(packages, force)) {
        let code = runner.run(&cmd)?;
        installs.push(PackageInstall {
            package: package.clone(),
            code,
        });
    }

    Ok(PipInstallResult {
        manifest: None,
        packages: installs,
    })
}

/// Installs the `pip` section of a conda manifest. A manifest without one is
/// a hard error raised before anything is installed.
pub fn cmd_pip_install_from_manifest<R: Runner + ?Sized>(
    runner: &mut R,
    manifest_path: &Path,
    force: bool,
) -> Result<PipInstallResult> {
    let manifest = load_manifest(manifest_path)?;
    let packages = manifest
        .pip_packages()
        .with_context(|| format!("invalid manifest {}", manifest_path.display()))?
        .to_vec();

    tracing::info!(
        manifest = %manifest_path.display(),
        count = packages.len(),
        "installing pip packages from manifest"
    );
    tracing::debug!(conda = ?manifest.conda_packages(), "conda dependencies are left to conda");

    let mut result = cmd_pip_install(runner, &packages, force)?;
    result.manifest = Some(manifest_path.to_path_buf());
    Ok(result)
}

pub fn format_pip_install_human(result: &PipInstallResult) -> String {
    let mut text = format!("Processed {} package(s)", result.packages.len());
    if let Some(manifest) = &result.manifest {
        text.push_str(&format!(" from {}", manifest.display()));
    }
    let failures = result.failures();
    if !failures.is_empty() {
        text.push_str(&format!("\nFailed: {}", failures.join(", ")));
    }
    text
}
