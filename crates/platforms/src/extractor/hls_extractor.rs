use async_trait::async_trait;
use m3u8_rs::{MasterPlaylist, Playlist, VariantStream};
use reqwest::Client;
use tracing::debug;
use url::Url;

use super::error::ExtractorError;
use crate::media::Quality;

/// Fetches a master playlist and resolves it to a single media playlist URL.
#[async_trait]
pub trait HlsExtractor {
    async fn extract_hls_stream_with_params(
        &self,
        client: &Client,
        headers: Option<reqwest::header::HeaderMap>,
        params: Option<&[(&str, &str)]>,
        m3u8_url: &str,
        quality: Quality,
    ) -> Result<String, ExtractorError> {
        let response = client
            .get(m3u8_url)
            .headers(headers.unwrap_or_default())
            .query(params.unwrap_or_default())
            .send()
            .await?;

        if !response.status().is_success() {
            debug!(status = %response.status(), "master playlist unavailable");
            return Err(ExtractorError::StreamerOffline);
        }

        // Query parameters end up in the final URL, which is also the base for variant URIs.
        let base_url = response.url().clone();
        let body = response.bytes().await?;
        let playlist = m3u8_rs::parse_playlist_res(&body)
            .map_err(|e| ExtractorError::HlsPlaylistError(e.to_string()))?;

        match playlist {
            Playlist::MasterPlaylist(pl) => select_variant(&pl, &base_url, quality)
                .map(|u| u.to_string())
                .ok_or(ExtractorError::NoStreamsFound),
            Playlist::MediaPlaylist(_) => Ok(base_url.to_string()),
        }
    }
}

fn is_audio_only(variant: &VariantStream) -> bool {
    if variant.video.as_deref() == Some("audio_only") {
        return true;
    }
    variant.codecs.as_deref().is_some_and(|codecs| {
        codecs
            .split(',')
            .map(str::trim)
            .all(|codec| codec.starts_with("mp4a"))
    })
}

/// Picks the variant matching `quality` and joins its URI against `base_url`.
///
/// This is the only place a quality tier is mapped to a rendition.
pub fn select_variant(playlist: &MasterPlaylist, base_url: &Url, quality: Quality) -> Option<Url> {
    let mut candidates = playlist.variants.iter().filter(|v| !v.is_i_frame);

    let selected = match quality {
        Quality::Best => candidates
            .filter(|v| !is_audio_only(v))
            .max_by_key(|v| v.bandwidth),
        Quality::Worst => candidates
            .filter(|v| !is_audio_only(v))
            .min_by_key(|v| v.bandwidth),
        Quality::AudioOnly => candidates.find(|v| is_audio_only(v)),
    }?;

    base_url.join(&selected.uri).ok()
}
