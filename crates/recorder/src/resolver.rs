use async_trait::async_trait;
use rekoda_platforms::{Quality, Twitch};
use tracing::debug;

use crate::error::{RecorderError, Result};

/// Maps a channel handle to a directly fetchable media playlist URL.
///
/// An error means the channel is offline, unknown, banned or unreachable.
#[async_trait]
pub trait ChannelResolver: Send + Sync {
    async fn resolve(&self, channel: &str, quality: Quality) -> Result<String>;
}

#[async_trait]
impl ChannelResolver for Twitch {
    async fn resolve(&self, channel: &str, quality: Quality) -> Result<String> {
        let url = Twitch::resolve(self, channel, quality)
            .await
            .map_err(|e| RecorderError::resolve(channel, e))?;
        debug!(channel, %quality, "resolved playlist url");
        Ok(url)
    }
}
