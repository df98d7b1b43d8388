use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::runner::{Channel, UpdateMode};

#[derive(Debug, Parser)]
#[command(
    name = "mupdater",
    version,
    about = "Check, download and install MCreator releases"
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Use a specific config file
    #[arg(short = 'c', long = "config", global = true, env = "MUPDATER_CONFIG")]
    pub config_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ChannelArg {
    /// Stable releases
    Release,
    /// Prereleases (snapshots)
    Snapshot,
}

impl From<ChannelArg> for Channel {
    fn from(value: ChannelArg) -> Self {
        match value {
            ChannelArg::Release => Channel::Release,
            ChannelArg::Snapshot => Channel::Snapshot,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    /// Download and replace the installed app
    Full,
    /// Only download the disk image
    DownloadOnly,
}

impl From<ModeArg> for UpdateMode {
    fn from(value: ModeArg) -> Self {
        match value {
            ModeArg::Full => UpdateMode::FullUpdate,
            ModeArg::DownloadOnly => UpdateMode::DownloadOnly,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Compare the installed version with the latest release
    Check {
        #[arg(long, value_enum, default_value_t = ChannelArg::Release)]
        channel: ChannelArg,
    },
    /// Download, and optionally install, the latest release
    Update {
        #[arg(long, value_enum, default_value_t = ChannelArg::Release)]
        channel: ChannelArg,
        /// Skip the interactive choice
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,
        /// Ask the release feed before running the update script
        #[arg(long)]
        check_first: bool,
        /// Read the administrator password from the first line of stdin
        #[arg(long)]
        password_stdin: bool,
    },
    /// Periodically check for updates in the background
    Watch {
        /// Time between checks (e.g. "10m", "1h"); defaults to the agent setting
        #[arg(long, value_parser = humantime::parse_duration)]
        interval: Option<Duration>,
    },
    /// Manage the background check preference
    Agent {
        #[command(subcommand)]
        command: AgentCommands,
    },
    /// Check that the tools the update scripts use are installed
    Doctor,
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

#[derive(Debug, Subcommand)]
pub enum AgentCommands {
    /// Allow `watch` to run
    Enable,
    /// Stop `watch` from running
    Disable,
    /// Show the current preference
    Status,
}
