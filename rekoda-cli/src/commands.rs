use std::sync::Arc;

use anyhow::Context;
use rekoda_platforms::{Twitch, default_client};
use rekoda_recorder::{Recorder, RecorderConfig};
use tracing::info;

use crate::cli::{Args, ChannelCommand, Commands};
use crate::config::{AppConfig, ConfigPaths, FileChannelSource};

pub const APP: &str = env!("CARGO_PKG_NAME");
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub async fn run(args: Args) -> anyhow::Result<()> {
    match args.command {
        Commands::Version => {
            println!("{APP} v{VERSION}");
            Ok(())
        }
        Commands::Rec => {
            let paths = ConfigPaths::resolve(args.config, args.output)?;
            record(paths).await
        }
        Commands::Channel(command) => {
            let paths = ConfigPaths::resolve(args.config, args.output)?;
            manage_channels(command, &paths)
        }
    }
}

async fn record(paths: ConfigPaths) -> anyhow::Result<()> {
    let config = AppConfig::load(&paths)?;
    let (all, enabled) = config.channel_list();
    info!(
        "{APP} v{VERSION}: {} channel(s) in config, {} enabled",
        all.len(),
        enabled.len()
    );
    info!("Streams directory: {}", config.streams_dir.display());

    let client = default_client().context("Failed to build HTTP client")?;
    let resolver = Arc::new(Twitch::new(client));
    let source = Arc::new(FileChannelSource::new(paths));
    let recorder = Recorder::new(RecorderConfig::default(), source, resolver)?;
    recorder.start().await?;
    Ok(())
}

fn manage_channels(command: ChannelCommand, paths: &ConfigPaths) -> anyhow::Result<()> {
    let mut config = AppConfig::load(paths)?;
    match command {
        ChannelCommand::List => {
            let (all, enabled) = config.channel_list();
            info!("{} channel(s) total in config: {}", all.len(), all.join(" "));
            info!(
                "{} channel(s) watching for recording: {}",
                enabled.len(),
                enabled.join(" ")
            );
            return Ok(());
        }
        ChannelCommand::Add { names } => {
            config.add_channels(&names);
        }
        ChannelCommand::Remove { names } => {
            config.remove_channels(&names);
        }
        ChannelCommand::Enable { names } => {
            config.set_enabled(&names, true);
        }
        ChannelCommand::Disable { names } => {
            config.set_enabled(&names, false);
        }
    }
    config.save()?;
    Ok(())
}
