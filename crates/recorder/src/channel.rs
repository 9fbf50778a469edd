use std::path::PathBuf;

use async_trait::async_trait;
use rekoda_platforms::Quality;

use crate::error::Result;

/// A channel entry as supplied by the configuration. The engine never mutates it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    /// Channel handle, also used for the output directory and file names.
    pub name: String,
    /// Platform-side numeric id. Opaque to the engine.
    pub id: i64,
    /// Configured quality tier, kept raw so a typo can be reported instead of failing the load.
    pub quality: String,
    pub enabled: bool,
}

impl Channel {
    pub fn new(name: impl Into<String>, quality: Quality) -> Self {
        Self {
            name: name.into(),
            id: 0,
            quality: quality.to_string(),
            enabled: true,
        }
    }

    /// The configured tier, or `None` when it is not one of the recognized names.
    pub fn quality(&self) -> Option<Quality> {
        self.quality.parse().ok()
    }
}

/// Everything the scheduler needs for one scan.
#[derive(Debug, Clone, Default)]
pub struct ChannelSnapshot {
    pub streams_dir: PathBuf,
    pub channels: Vec<Channel>,
}

impl ChannelSnapshot {
    pub fn enabled(&self) -> impl Iterator<Item = &Channel> {
        self.channels.iter().filter(|c| c.enabled)
    }
}

/// Configuration provider, read once per scheduler cycle.
#[async_trait]
pub trait ChannelSource: Send + Sync {
    async fn load(&self) -> Result<ChannelSnapshot>;
}

/// A fixed channel list.
#[derive(Debug, Clone)]
pub struct StaticChannels(pub ChannelSnapshot);

#[async_trait]
impl ChannelSource for StaticChannels {
    async fn load(&self) -> Result<ChannelSnapshot> {
        Ok(self.0.clone())
    }
}
