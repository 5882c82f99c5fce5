use anyhow::{Context, Result};
use serde::Serialize;
use std::ffi::OsString;
use std::path::PathBuf;

use crate::config::PythonConfig;

/// Variables set inside a hosted notebook kernel.
pub const HOSTED_MARKERS: &[&str] = &["COLAB_RELEASE_TAG", "COLAB_GPU", "COLAB_BACKEND_VERSION"];

/// What the current host looks like, computed once at startup and passed to
/// the routines that care instead of being read from ambient state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Environment {
    pub hosted: bool,
    pub search_paths: Vec<PathBuf>,
    pub site_packages: PathBuf,
}

impl Environment {
    pub fn detect(python: &PythonConfig) -> Self {
        Self::from_lookup(python, |key| std::env::var_os(key))
    }

    pub fn from_lookup<F>(python: &PythonConfig, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<OsString>,
    {
        let hosted = python
            .hosted
            .unwrap_or_else(|| HOSTED_MARKERS.iter().any(|key| lookup(key).is_some()));

        Self {
            hosted,
            search_paths: python.search_paths.clone(),
            site_packages: python.site_packages.clone(),
        }
    }

    /// Import search path for a Python started after setup: the configured
    /// entries followed by the conda site-packages directory.
    pub fn python_path(&self) -> Result<OsString> {
        let mut paths = self.search_paths.clone();
        if !paths.contains(&self.site_packages) {
            paths.push(self.site_packages.clone());
        }
        std::env::join_paths(paths).context("search path contains a path separator")
    }

    pub fn site_packages_present(&self) -> bool {
        self.site_packages.is_dir()
    }
}
