use anyhow::{bail, Context, Result};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Command, ExitStatus, Stdio};

pub const DEFAULT_SHELL: &str = "/bin/sh";

#[derive(Debug, Clone, PartialEq)]
pub enum Program {
    Line(String),
    Argv(Vec<String>),
}

/// One external program invocation plus the flags that control how it runs.
///
/// Commands are executed directly by default. Going through a shell is opt-in
/// via [`CommandSpec::shell`].
#[derive(Debug, Clone, PartialEq)]
pub struct CommandSpec {
    pub program: Program,
    pub split: bool,
    pub shell: bool,
    pub verbose: bool,
    pub current_dir: Option<PathBuf>,
}

impl CommandSpec {
    pub fn line(text: impl Into<String>) -> Self {
        Self::new(Program::Line(text.into()))
    }

    pub fn argv<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(Program::Argv(args.into_iter().map(Into::into).collect()))
    }

    fn new(program: Program) -> Self {
        Self {
            program,
            split: true,
            shell: false,
            verbose: true,
            current_dir: None,
        }
    }

    pub fn split(mut self, split: bool) -> Self {
        self.split = split;
        self
    }

    pub fn shell(mut self, shell: bool) -> Self {
        self.shell = shell;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Human-readable form used for the `CMD:` echo and in error messages.
    pub fn display(&self) -> String {
        match &self.program {
            Program::Line(text) => text.clone(),
            Program::Argv(args) => join_words(args),
        }
    }

    /// Resolves the argument vector handed to the OS.
    pub fn resolve_argv(&self, shell_program: &str) -> Result<Vec<String>> {
        let argv = if self.shell {
            vec![
                shell_program.to_string(),
                "-c".to_string(),
                self.display(),
            ]
        } else {
            match &self.program {
                Program::Line(text) if self.split => match shlex::split(text) {
                    Some(words) => words,
                    None => bail!("cannot split command (unbalanced quotes?): {}", text),
                },
                Program::Line(text) => vec![text.clone()],
                Program::Argv(args) => args.clone(),
            }
        };

        if argv.first().map_or(true, |p| p.is_empty()) {
            bail!("empty command");
        }
        Ok(argv)
    }
}

fn join_words(args: &[String]) -> String {
    shlex::try_join(args.iter().map(String::as_str)).unwrap_or_else(|_| args.join(" "))
}

/// Something that can launch commands. Helpers are written against this so
/// their invocations can be observed without spawning processes.
pub trait Runner {
    /// Runs to completion, streaming stdout. A non-zero exit is `Ok(code)`.
    fn run(&mut self, cmd: &CommandSpec) -> Result<i32>;

    /// Runs to completion and returns stdout. A non-zero exit is an error.
    fn capture(&mut self, cmd: &CommandSpec) -> Result<String>;
}

pub struct SystemRunner<W: Write> {
    console: W,
    shell: String,
}

impl<W: Write> SystemRunner<W> {
    pub fn new(console: W, shell: impl Into<String>) -> Self {
        Self {
            console,
            shell: shell.into(),
        }
    }

    #[cfg(test)]
    pub fn into_console(self) -> W {
        self.console
    }

    fn command(&self, cmd: &CommandSpec) -> Result<Command> {
        let argv = cmd.resolve_argv(&self.shell)?;
        let mut command = Command::new(&argv[0]);
        command.args(&argv[1..]);
        if let Some(dir) = &cmd.current_dir {
            command.current_dir(dir);
        }
        tracing::debug!(argv = ?argv, cwd = ?cmd.current_dir, "spawning command");
        Ok(command)
    }

    fn echo(&mut self, line: &str) -> Result<()> {
        writeln!(self.console, "{}", line).context("failed to write to console")?;
        self.console.flush().context("failed to flush console")?;
        Ok(())
    }
}

impl<W: Write> Runner for SystemRunner<W> {
    fn run(&mut self, cmd: &CommandSpec) -> Result<i32> {
        self.echo(&format!("CMD: {}", cmd.display()))?;

        let mut child = self
            .command(cmd)?
            .stdout(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to run {}", cmd.display()))?;

        // Output ends only once the pipe is closed; the exit status is read after.
        if let Some(stdout) = child.stdout.take() {
            for line in BufReader::new(stdout).split(b'\n') {
                let line = line
                    .with_context(|| format!("failed to read output of {}", cmd.display()))?;
                let text = String::from_utf8_lossy(&line);
                let text = text.trim();
                if !text.is_empty() && cmd.verbose {
                    self.echo(text)?;
                }
            }
        }

        let status = child
            .wait()
            .with_context(|| format!("failed to wait for {}", cmd.display()))?;
        let code = exit_code(status);

        if code != 0 {
            tracing::warn!(code, command = %cmd.display(), "command exited with non-zero status");
            self.echo(&format!("\tERROR ({}) running command!", code))?;
        }
        Ok(code)
    }

    fn capture(&mut self, cmd: &CommandSpec) -> Result<String> {
        let output = self
            .command(cmd)?
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .with_context(|| format!("failed to run {}", cmd.display()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "{} failed (exit code: {})\nstderr: {}",
                cmd.display(),
                exit_code(output.status),
                stderr.trim()
            );
        }

        String::from_utf8(output.stdout)
            .with_context(|| format!("output of {} was not valid UTF-8", cmd.display()))
    }
}

/// Runs every command in order. A failing command never stops the sequence.
pub fn run_cmd_list<R: Runner + ?Sized>(runner: &mut R, cmds: &[CommandSpec]) -> Result<()> {
    for cmd in cmds {
        runner.run(cmd)?;
    }
    Ok(())
}

#[cfg(unix)]
fn exit_code(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status
        .code()
        .or_else(|| status.signal().map(|s| -s))
        .unwrap_or(-1)
}

#[cfg(not(unix))]
fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}
