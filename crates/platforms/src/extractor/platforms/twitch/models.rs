use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct PlaybackAccessTokenResponse {
    pub data: Option<PlaybackAccessTokenData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackAccessTokenData {
    pub stream_playback_access_token: Option<PlaybackAccessToken>,
}

#[derive(Debug, Deserialize)]
pub struct PlaybackAccessToken {
    pub value: String,
    pub signature: String,
}
