use anyhow::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::config::{write_config_atomic, Config};

#[derive(Debug, Serialize)]
pub struct ConfigInitResult {
    pub config_path: PathBuf,
}

pub fn cmd_config_init(config_path: &Path, force: bool) -> Result<ConfigInitResult> {
    write_config_atomic(config_path, &Config::default(), force)?;
    Ok(ConfigInitResult {
        config_path: config_path.to_path_buf(),
    })
}

pub fn format_config_init_human(result: &ConfigInitResult) -> String {
    format!("Config written to {}", result.config_path.display())
}

pub fn format_config_show_human(config: &Config) -> String {
    toml::to_string_pretty(config).unwrap_or_else(|e| format!("<unprintable config: {}>", e))
}
