use anyhow::Result;
use serde::Serialize;
use std::path::PathBuf;

use crate::environment::Environment;

#[derive(Debug, Serialize)]
pub struct EnvResult {
    pub hosted: bool,
    pub site_packages: PathBuf,
    pub site_packages_present: bool,
    pub python_path: String,
}

pub fn cmd_env(env: &Environment) -> Result<EnvResult> {
    let python_path = env.python_path()?.to_string_lossy().to_string();
    Ok(EnvResult {
        hosted: env.hosted,
        site_packages: env.site_packages.clone(),
        site_packages_present: env.site_packages_present(),
        python_path,
    })
}

/// Comment lines plus an `export`, so the output can be passed to `eval`.
pub fn format_env_human(result: &EnvResult) -> String {
    let quoted = shlex::try_quote(&result.python_path)
        .map(|q| q.to_string())
        .unwrap_or_else(|_| format!("'{}'", result.python_path));
    [
        format!(
            "# hosted kernel: {}",
            if result.hosted { "yes" } else { "no" }
        ),
        format!(
            "# site-packages: {}{}",
            result.site_packages.display(),
            if result.site_packages_present { "" } else { " (missing)" }
        ),
        format!("export PYTHONPATH={}", quoted),
    ]
    .join("\n")
}
