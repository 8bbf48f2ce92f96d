use ccr_install::Profile;
use clap::{ArgAction, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "ccr-installer",
    author,
    version,
    about = "Install and uninstall claude-code-router from GitHub releases",
    long_about = None,
    disable_version_flag = true
)]
pub struct Cli {
    /// Print version
    #[arg(short = 'v', long = "version", action = ArgAction::SetTrue)]
    pub version: bool,

    /// Installer config file (default: <config dir>/ccr-installer/installer.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Release flavour: macos or main
    #[arg(long, global = true)]
    pub profile: Option<Profile>,

    /// Never run sudo; fail if the bin directory is not writable
    #[arg(long, global = true)]
    pub no_elevate: bool,

    /// Set the logging level
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: tracing::Level,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download a release and link its command into the bin directory
    Install {
        /// Release tag, or "latest"
        #[arg(default_value = "latest")]
        version: String,
    },
    /// Stop the service and remove the installation
    Uninstall {
        /// Also remove the configuration directory without asking
        #[arg(long)]
        purge: bool,
    },
    /// Show what is currently installed
    Status,
    /// Print the installer version
    Version,
    /// Generate shell completion scripts
    Completions {
        /// Shell type
        #[arg(value_enum)]
        shell: Shell,
        /// Write output to a file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

pub fn build_cli_command() -> clap::Command {
    Cli::command()
}
