use reqwest::StatusCode;

use rekoda_platforms::ExtractorError;

pub type Result<T> = std::result::Result<T, RecorderError>;

#[derive(Debug, thiserror::Error)]
pub enum RecorderError {
    #[error("HTTP request failed: {source}")]
    Network {
        #[from]
        source: reqwest::Error,
    },

    #[error("request failed with HTTP {status} for {url}")]
    HttpStatus { status: StatusCode, url: String },

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("playlist error: {reason}")]
    Playlist { reason: String },

    #[error("expected a media playlist, got a master playlist")]
    NotMediaPlaylist,

    #[error("invalid URL `{input}`: {reason}")]
    InvalidUrl { input: String, reason: String },

    #[error("failed to resolve channel {channel}: {source}")]
    Resolve {
        channel: String,
        #[source]
        source: ExtractorError,
    },

    #[error("configuration error: {reason}")]
    Config { reason: String },

    #[error("there is nothing to record, add and enable channels first")]
    NothingToRecord,

    #[error("segment queue closed")]
    QueueClosed,
}

impl RecorderError {
    pub fn playlist(reason: impl Into<String>) -> Self {
        Self::Playlist {
            reason: reason.into(),
        }
    }

    pub fn invalid_url(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            input: input.into(),
            reason: reason.into(),
        }
    }

    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }

    pub fn resolve(channel: impl Into<String>, source: ExtractorError) -> Self {
        Self::Resolve {
            channel: channel.into(),
            source,
        }
    }

    /// Errors that must stop the affected loop instead of being retried.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::NotMediaPlaylist | Self::NothingToRecord | Self::Config { .. }
        )
    }
}
