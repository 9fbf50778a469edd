// Playlist parsing seam and segment URI resolution.

use std::time::Duration;

use m3u8_rs::Playlist;
use url::Url;

use crate::error::{RecorderError, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct PlaylistSegment {
    pub uri: String,
    pub duration: Duration,
    pub is_relative: bool,
}

/// One refresh of a live media playlist.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedPlaylist {
    /// Segments in playlist order.
    pub segments: Vec<PlaylistSegment>,
    /// How long to wait before polling again.
    pub target_duration: Duration,
    /// `#EXT-X-ENDLIST` was present.
    pub closed: bool,
}

pub trait PlaylistParser: Send + Sync {
    /// Parses a raw playlist document. Anything but a media playlist is an error.
    fn parse(&self, raw: &[u8]) -> Result<ParsedPlaylist>;
}

/// [`PlaylistParser`] backed by `m3u8-rs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct M3u8Parser;

fn secs_f64(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs).unwrap_or_default()
}

fn is_absolute(uri: &str) -> bool {
    uri.starts_with("http://") || uri.starts_with("https://")
}

impl PlaylistParser for M3u8Parser {
    fn parse(&self, raw: &[u8]) -> Result<ParsedPlaylist> {
        let playlist = m3u8_rs::parse_playlist_res(raw)
            .map_err(|e| RecorderError::playlist(format!("failed to parse playlist: {e}")))?;

        let media = match playlist {
            Playlist::MediaPlaylist(pl) => pl,
            Playlist::MasterPlaylist(_) => return Err(RecorderError::NotMediaPlaylist),
        };

        let segments = media
            .segments
            .into_iter()
            .map(|s| PlaylistSegment {
                is_relative: !is_absolute(&s.uri),
                duration: secs_f64(s.duration as f64),
                uri: s.uri,
            })
            .collect();

        Ok(ParsedPlaylist {
            segments,
            target_duration: secs_f64(media.target_duration as f64),
            closed: media.end_list,
        })
    }
}

/// Turns a playlist entry into the absolute, unescaped URI used for fetching and deduplication.
pub fn resolve_segment_uri(base: &Url, segment: &PlaylistSegment) -> Result<String> {
    let absolute = if segment.is_relative {
        base.join(&segment.uri)
            .map_err(|e| RecorderError::invalid_url(&segment.uri, e.to_string()))?
            .to_string()
    } else {
        segment.uri.clone()
    };

    urlencoding::decode(&absolute)
        .map(|decoded| decoded.into_owned())
        .map_err(|e| RecorderError::invalid_url(absolute.as_str(), e.to_string()))
}
