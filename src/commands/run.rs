use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::path::Path;

use crate::runner::{run_cmd_list, CommandSpec, Runner};

#[derive(Debug, Serialize)]
pub struct RunResult {
    pub command: String,
    pub code: i32,
}

pub fn cmd_run<R: Runner + ?Sized>(runner: &mut R, cmd: &CommandSpec) -> Result<RunResult> {
    let code = runner.run(cmd)?;
    Ok(RunResult {
        command: cmd.display(),
        code,
    })
}

pub fn format_run_human(_result: &RunResult) -> String {
    // Output and any error notice were already streamed by the runner.
    String::new()
}

#[derive(Debug, Serialize)]
pub struct RunListResult {
    pub commands: Vec<String>,
}

pub fn cmd_run_list<R: Runner + ?Sized>(
    runner: &mut R,
    cmds: &[CommandSpec],
) -> Result<RunListResult> {
    if cmds.is_empty() {
        bail!("no commands given\nHint: pass commands as arguments or use --file");
    }
    run_cmd_list(runner, cmds)?;
    Ok(RunListResult {
        commands: cmds.iter().map(CommandSpec::display).collect(),
    })
}

pub fn format_run_list_human(result: &RunListResult) -> String {
    format!("Ran {} command(s)", result.commands.len())
}

/// Reads one command per line. Blank lines and `#` comments are skipped.
pub fn read_command_file(path: &Path) -> Result<Vec<String>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read command file {}", path.display()))?;
    Ok(parse_command_lines(&contents))
}

fn parse_command_lines(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}
