use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "kernel-prep",
    about = "Prepare a hosted notebook kernel: packages, repos, keys and plot style"
)]
pub struct Cli {
    /// Print results as JSON (command output goes to stderr)
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(long, global = true)]
    pub debug: bool,

    /// Config file to use instead of the default location
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run one command, echoing its output
    Run {
        /// A single command string, or a program followed by its arguments
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
        /// Treat a single command string as the program name instead of splitting it
        #[arg(long)]
        no_split: bool,
        /// Run through the configured shell
        #[arg(long)]
        shell: bool,
        /// Do not echo the command's output
        #[arg(long, short)]
        quiet: bool,
    },
    /// Run several commands in order, continuing past failures
    RunList {
        /// Command strings
        commands: Vec<String>,
        /// Read commands from a file, one per line
        #[arg(long, short)]
        file: Option<PathBuf>,
        /// Run each command through the configured shell
        #[arg(long)]
        shell: bool,
        /// Do not echo command output
        #[arg(long, short)]
        quiet: bool,
    },
    /// pip install each package in turn
    PipInstall {
        #[arg(required = true)]
        packages: Vec<String>,
        /// Reinstall even if already present
        #[arg(long)]
        force: bool,
    },
    /// pip install the `pip` section of a conda environment file
    PipInstallManifest {
        #[arg(default_value = crate::manifest::DEFAULT_MANIFEST)]
        file: PathBuf,
        /// Reinstall even if already present
        #[arg(long)]
        force: bool,
    },
    /// Clone a repository and move its contents into the working directory
    Clone {
        url: String,
        /// Working directory (defaults to the current directory)
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Install a private SSH key from a URL and scan host keys
    CopySshKey {
        url: String,
        /// Key directory (defaults to ssh.key_dir)
        #[arg(long)]
        key_dir: Option<PathBuf>,
        /// Host to scan (repeatable; defaults to ssh.hosts)
        #[arg(long = "host")]
        hosts: Vec<String>,
    },
    /// Install conda and the configured packages on a hosted kernel
    Bootstrap {
        /// Install even if the site-packages directory already exists
        #[arg(long)]
        force: bool,
        /// Directory the installer is downloaded to (defaults to the current directory)
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Write matplotlibrc and IPython settings for the plotting theme
    Style {
        /// Output directory
        #[arg(long, default_value = ".")]
        dir: PathBuf,
        /// Overwrite existing files
        #[arg(long)]
        force: bool,
    },
    /// Show the detected environment and the PYTHONPATH to use
    Env,
    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Write the default configuration
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
    /// Print the config file path
    Path,
    /// Print the effective configuration
    Show,
}
