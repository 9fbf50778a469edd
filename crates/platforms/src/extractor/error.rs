use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractorError {
    #[error("invalid channel name: {0}")]
    InvalidChannel(String),
    #[error("http error: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("json error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("hls playlist error: {0}")]
    HlsPlaylistError(String),
    #[error("streamer is offline")]
    StreamerOffline,
    #[error("no streams found")]
    NoStreamsFound,
    #[error("validation error: {0}")]
    ValidationError(String),
}

impl ExtractorError {
    /// Whether the error means the channel simply is not broadcasting right now.
    pub fn is_offline(&self) -> bool {
        matches!(self, Self::StreamerOffline | Self::NoStreamsFound)
    }
}
