use std::sync::LazyLock;

use regex::Regex;
use reqwest::Client;
use tracing::debug;

use super::models::{PlaybackAccessToken, PlaybackAccessTokenResponse};
use crate::extractor::error::ExtractorError;
use crate::extractor::hls_extractor::HlsExtractor;
use crate::extractor::utils::capture_group_1;
use crate::media::Quality;

pub static CHANNEL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([a-zA-Z0-9_]{1,25})$").unwrap());

/// Resolves Twitch channel logins to live media playlist URLs.
#[derive(Debug, Clone)]
pub struct Twitch {
    client: Client,
}

impl Twitch {
    const GQL_API_URL: &str = "https://gql.twitch.tv/gql";
    const USHER_URL: &str = "https://usher.ttvnw.net/api/channel/hls";
    const CLIENT_ID: &str = "kimne78kx3ncx6brgo4mv6wki5h1ko";
    const PLAYBACK_ACCESS_TOKEN_HASH: &str =
        "ed230aa1e33e07eebb8928504583da78a5173989fadfb1ac94be06a04f3cdbe9";

    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Cache buster for the usher request: a random number of up to seven digits.
    fn player_nonce() -> String {
        (rand::random::<u32>() % 10_000_000).to_string()
    }

    fn validate_channel(channel: &str) -> Result<String, ExtractorError> {
        capture_group_1(&CHANNEL_REGEX, channel)
            .map(str::to_ascii_lowercase)
            .ok_or_else(|| ExtractorError::InvalidChannel(channel.to_string()))
    }

    fn build_persisted_query_request(
        operation_name: &str,
        sha256_hash: &str,
        variables: serde_json::Value,
    ) -> serde_json::Value {
        serde_json::json!({
            "operationName": operation_name,
            "extensions": {
                "persistedQuery": {
                    "version": 1,
                    "sha256Hash": sha256_hash,
                }
            },
            "variables": variables,
        })
    }

    async fn playback_access_token(
        &self,
        login: &str,
    ) -> Result<PlaybackAccessToken, ExtractorError> {
        let query = Self::build_persisted_query_request(
            "PlaybackAccessToken",
            Self::PLAYBACK_ACCESS_TOKEN_HASH,
            serde_json::json!({
                "isLive": true,
                "login": login,
                "isVod": false,
                "vodID": "",
                "playerType": "site",
            }),
        );

        let body = self
            .client
            .post(Self::GQL_API_URL)
            .header("Client-Id", Self::CLIENT_ID)
            .json(&query)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        debug!(channel = %login, "playback access token response: {body}");

        let response: PlaybackAccessTokenResponse = serde_json::from_str(&body)?;
        response
            .data
            .and_then(|d| d.stream_playback_access_token)
            .ok_or_else(|| {
                ExtractorError::ValidationError(format!(
                    "no playback access token for channel {login}"
                ))
            })
    }

    /// Returns a media playlist URL for `channel` at `quality`.
    ///
    /// The URL carries a signed token and stops working after roughly a day.
    pub async fn resolve(&self, channel: &str, quality: Quality) -> Result<String, ExtractorError> {
        let login = Self::validate_channel(channel)?;
        let token = self.playback_access_token(&login).await?;

        let m3u8_url = format!("{}/{login}.m3u8", Self::USHER_URL);
        let p = Self::player_nonce();

        self.extract_hls_stream_with_params(
            &self.client,
            None,
            Some(&[
                ("player", "twitchweb"),
                ("p", &p),
                ("allow_source", "true"),
                ("allow_audio_only", "true"),
                ("fast_bread", "true"),
                ("token", &token.value),
                ("sig", &token.signature),
            ]),
            &m3u8_url,
            quality,
        )
        .await
    }
}

impl HlsExtractor for Twitch {}
