mod cli;
mod commands;
mod config;
mod environment;
mod manifest;
mod paths;
mod runner;
mod testutil;

use anyhow::{bail, Context, Result};
use clap::Parser;
use cli::{Cli, Command, ConfigCommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::environment::Environment;
use crate::runner::{CommandSpec, SystemRunner};

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    if let Err(e) = run(cli) {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_tracing(debug: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if debug { "debug" } else { "warn" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => config::default_config_path()?,
    };
    let json = cli.json;

    match cli.command {
        Command::Run {
            command,
            no_split,
            shell,
            quiet,
        } => {
            let config = config::load_config_or_default(&config_path)?;
            let cmd = match <[String; 1]>::try_from(command) {
                Ok([line]) => CommandSpec::line(line),
                Err(_) if no_split => {
                    bail!("--no-split takes a single command string, not separate arguments")
                }
                Err(args) => CommandSpec::argv(args),
            }
            .split(!no_split)
            .shell(shell)
            .verbose(!quiet);
            let result = commands::cmd_run(&mut system_runner(&config, json), &cmd)?;
            output(&result, json, commands::format_run_human)?;
        }
        Command::RunList {
            commands: mut lines,
            file,
            shell,
            quiet,
        } => {
            let config = config::load_config_or_default(&config_path)?;
            if let Some(file) = file {
                lines.extend(commands::read_command_file(&file)?);
            }
            let cmds: Vec<CommandSpec> = lines
                .into_iter()
                .map(|line| CommandSpec::line(line).shell(shell).verbose(!quiet))
                .collect();
            let result = commands::cmd_run_list(&mut system_runner(&config, json), &cmds)?;
            output(&result, json, commands::format_run_list_human)?;
        }
        Command::PipInstall { packages, force } => {
            let config = config::load_config_or_default(&config_path)?;
            let result =
                commands::cmd_pip_install(&mut system_runner(&config, json), &packages, force)?;
            output(&result, json, commands::format_pip_install_human)?;
        }
        Command::PipInstallManifest { file, force } => {
            let config = config::load_config_or_default(&config_path)?;
            let result = commands::cmd_pip_install_from_manifest(
                &mut system_runner(&config, json),
                &file,
                force,
            )?;
            output(&result, json, commands::format_pip_install_human)?;
        }
        Command::Clone { url, dir } => {
            let config = config::load_config_or_default(&config_path)?;
            let workdir = workdir_or_current(dir)?;
            let result = commands::cmd_clone(&mut system_runner(&config, json), &url, &workdir)?;
            output(&result, json, commands::format_clone_human)?;
        }
        Command::CopySshKey {
            url,
            key_dir,
            hosts,
        } => {
            let config = config::load_config_or_default(&config_path)?;
            let mut runner = system_runner(&config, json);
            let key_dir = key_dir.unwrap_or(config.ssh.key_dir);
            let hosts = if hosts.is_empty() {
                config.ssh.hosts
            } else {
                hosts
            };
            let agent = ureq::Agent::new_with_defaults();
            let result =
                commands::cmd_copy_ssh_key(&mut runner, &agent, &url, &key_dir, &hosts)?;
            output(&result, json, commands::format_ssh_key_human)?;
        }
        Command::Bootstrap { force, dir } => {
            let config = config::load_config_or_default(&config_path)?;
            let env = Environment::detect(&config.python);
            let workdir = workdir_or_current(dir)?;
            let result = commands::cmd_bootstrap(
                &mut system_runner(&config, json),
                &env,
                &config.bootstrap,
                &workdir,
                force,
            )?;
            output(&result, json, commands::format_bootstrap_human)?;
        }
        Command::Style { dir, force } => {
            let result = commands::cmd_style(&dir, &commands::PlotStyle::default(), force)?;
            output(&result, json, commands::format_style_human)?;
        }
        Command::Env => {
            let config = config::load_config_or_default(&config_path)?;
            let env = Environment::detect(&config.python);
            let result = commands::cmd_env(&env)?;
            output(&result, json, commands::format_env_human)?;
        }
        Command::Config { command } => run_config(&command, &config_path, json)?,
    }
    Ok(())
}

/// Child output is echoed to stdout, or to stderr when stdout carries JSON.
fn system_runner(config: &Config, json: bool) -> SystemRunner<Box<dyn Write>> {
    let console: Box<dyn Write> = if json {
        Box::new(std::io::stderr())
    } else {
        Box::new(std::io::stdout())
    };
    SystemRunner::new(console, config.runner.shell.clone())
}

fn run_config(command: &ConfigCommand, config_path: &Path, json: bool) -> Result<()> {
    match command {
        ConfigCommand::Init { force } => {
            let result = commands::cmd_config_init(config_path, *force)?;
            output(&result, json, commands::format_config_init_human)?;
        }
        ConfigCommand::Path => {
            println!("{}", config_path.display());
        }
        ConfigCommand::Show => {
            let config = config::load_config_or_default(config_path)?;
            output(&config, json, commands::format_config_show_human)?;
        }
    }
    Ok(())
}

fn workdir_or_current(dir: Option<PathBuf>) -> Result<PathBuf> {
    match dir {
        Some(dir) => Ok(dir),
        None => std::env::current_dir().context("failed to determine current directory"),
    }
}

fn output<T: serde::Serialize>(result: &T, json: bool, human_fn: fn(&T) -> String) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
    } else {
        let text = human_fn(result);
        if !text.is_empty() {
            println!("{}", text);
        }
    }
    Ok(())
}
