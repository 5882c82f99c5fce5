#![cfg(test)]

use anyhow::Result;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

use crate::runner::{CommandSpec, Runner};

/// Records every invocation instead of spawning processes.
#[derive(Default)]
pub struct RecordingRunner {
    pub calls: Vec<CommandSpec>,
    pub captures: Vec<CommandSpec>,
    codes: VecDeque<i32>,
    capture_output: String,
}

impl RecordingRunner {
    /// Exit codes handed out in order; once exhausted every run returns 0.
    pub fn with_codes(codes: &[i32]) -> Self {
        Self {
            codes: codes.iter().copied().collect(),
            ..Self::default()
        }
    }

    pub fn with_capture_output(output: &str) -> Self {
        Self {
            capture_output: output.to_string(),
            ..Self::default()
        }
    }

    pub fn displayed(&self) -> Vec<String> {
        self.calls.iter().map(CommandSpec::display).collect()
    }
}

impl Runner for RecordingRunner {
    fn run(&mut self, cmd: &CommandSpec) -> Result<i32> {
        self.calls.push(cmd.clone());
        Ok(self.codes.pop_front().unwrap_or(0))
    }

    fn capture(&mut self, cmd: &CommandSpec) -> Result<String> {
        self.captures.push(cmd.clone());
        Ok(self.capture_output.clone())
    }
}

pub struct TestEnv {
    dir: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::create_dir_all(dir.path().join("work")).unwrap();
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn workdir(&self) -> PathBuf {
        self.dir.path().join("work")
    }

    /// Creates a committed git repository under `src/<name>` holding `files`.
    pub fn create_repo(&self, name: &str, files: &[(&str, &str)]) -> PathBuf {
        let repo_path = self.dir.path().join("src").join(name);
        std::fs::create_dir_all(&repo_path).unwrap();

        for (rel, contents) in files {
            let path = repo_path.join(rel);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).unwrap();
            }
            std::fs::write(path, contents).unwrap();
        }

        let run = |args: &[&str]| {
            let output = Command::new("git")
                .args(args)
                .current_dir(&repo_path)
                .env("GIT_AUTHOR_NAME", "Test")
                .env("GIT_AUTHOR_EMAIL", "test@test.com")
                .env("GIT_COMMITTER_NAME", "Test")
                .env("GIT_COMMITTER_EMAIL", "test@test.com")
                .output()
                .expect("failed to run git");
            assert!(
                output.status.success(),
                "git {:?} failed: {}",
                args,
                String::from_utf8_lossy(&output.stderr)
            );
        };

        run(&["init"]);
        run(&["add", "-A"]);
        run(&["commit", "--allow-empty", "-m", "initial"]);

        repo_path
    }
}
