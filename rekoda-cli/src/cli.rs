use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "rekoda",
    version,
    about = "Rekoda - automatic live stream recorder",
    long_about = "Rekoda - automatic live stream recorder.\n\nWatches the channels listed in rekoda.toml and records every live broadcast to a single .ts file per session."
)]
pub struct Args {
    /// Set log level: trace, debug, info (default is 'info')
    #[arg(short, long, global = true, env = "REKODA_LOG_LEVEL", value_name = "LEVEL")]
    pub verbose: Option<String>,

    /// Custom config file (default is $HOME/rekoda/rekoda.toml)
    #[arg(short, long, global = true, env = "REKODA_CONF_FILE", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Custom stream directory to download (default is $HOME/rekoda/streams)
    #[arg(short, long, global = true, env = "REKODA_STREAMS_DIR", value_name = "DIR")]
    pub output: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start recording streams
    Rec,

    /// Manage your channels: list, add, remove, disable or enable
    #[command(subcommand)]
    Channel(ChannelCommand),

    /// Prints version
    Version,
}

#[derive(Subcommand, Debug)]
pub enum ChannelCommand {
    /// Add channels to record
    Add {
        #[arg(required = true, value_name = "CHANNEL")]
        names: Vec<String>,
    },

    /// Remove channels from config
    Remove {
        #[arg(value_name = "CHANNEL")]
        names: Vec<String>,
    },

    /// List all channels listed in config file
    List,

    /// Enables channels for recording
    Enable {
        #[arg(required = true, value_name = "CHANNEL")]
        names: Vec<String>,
    },

    /// Disables channels from recording
    Disable {
        #[arg(required = true, value_name = "CHANNEL")]
        names: Vec<String>,
    },
}
