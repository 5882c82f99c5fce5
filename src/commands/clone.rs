use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::paths::url_file_name;
use crate::runner::{CommandSpec, Runner};

/// Directory `git clone` creates for `url`: the last path segment without a
/// trailing `.git`.
pub fn repo_dir_name(url: &str) -> Result<String> {
    let last = url_file_name(url);
    let name = last.strip_suffix(".git").unwrap_or(last);
    if name.is_empty() || name == "." || name == ".." {
        bail!("cannot derive a directory name from repository URL {:?}", url);
    }
    Ok(name.to_string())
}

#[derive(Debug, Serialize)]
pub struct CloneResult {
    pub url: String,
    pub workdir: PathBuf,
    pub git_code: i32,
    pub moved: Vec<String>,
}

/// Clones `url` into `workdir` and lifts its contents up into `workdir`
/// itself, removing the clone directory afterwards.
///
/// Only a directory created by this clone is ever flattened: an existing
/// `workdir/<name>` aborts before git runs, and a failed clone aborts before
/// anything moves.
pub fn cmd_clone<R: Runner + ?Sized>(runner: &mut R, url: &str, workdir: &Path) -> Result<CloneResult> {
    let name = repo_dir_name(url)?;
    let clone_dir = workdir.join(&name);
    // Holds the fresh clone so a top-level entry named like the repo can move up.
    let staging_dir = workdir.join(format!(".{}.clone", name));

    for dir in [&clone_dir, &staging_dir] {
        if path_taken(dir) {
            bail!("refusing to clone over existing {}", dir.display());
        }
    }

    let git_code = runner.run(&CommandSpec::argv(["git", "clone", url]).in_dir(workdir))?;
    if git_code != 0 {
        bail!("git clone of {} failed (git exit code: {})", url, git_code);
    }

    std::fs::rename(&clone_dir, &staging_dir)
        .with_context(|| format!("failed to stage clone {}", clone_dir.display()))?;

    let moved = flatten_into(&staging_dir, workdir)
        .with_context(|| format!("failed to flatten clone of {}", url))?;

    Ok(CloneResult {
        url: url.to_string(),
        workdir: workdir.to_path_buf(),
        git_code,
        moved,
    })
}

/// Moves every non-hidden entry of `src` into `dest`, then deletes `src`.
/// Hidden entries such as `.git` are removed along with `src`.
pub fn flatten_into(src: &Path, dest: &Path) -> Result<Vec<String>> {
    if !src.is_dir() {
        bail!("directory not found: {}", src.display());
    }

    let mut names = Vec::new();
    for entry in std::fs::read_dir(src)
        .with_context(|| format!("failed to read directory {}", src.display()))?
    {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('.') {
            continue;
        }
        names.push(name);
    }
    names.sort();

    for name in &names {
        let target = dest.join(name);
        if path_taken(&target) {
            bail!("refusing to overwrite existing {}", target.display());
        }
    }

    for name in &names {
        let target = dest.join(name);
        std::fs::rename(src.join(name), &target)
            .with_context(|| format!("failed to move {} into {}", name, dest.display()))?;
    }

    std::fs::remove_dir_all(src)
        .with_context(|| format!("failed to remove {}", src.display()))?;

    Ok(names)
}

/// True for any existing entry, including a dangling symlink.
fn path_taken(path: &Path) -> bool {
    std::fs::symlink_metadata(path).is_ok()
}

pub fn format_clone_human(result: &CloneResult) -> String {
    format!(
        "Cloned {} into {} ({} entries)",
        result.url,
        result.workdir.display(),
        result.moved.len()
    )
}
