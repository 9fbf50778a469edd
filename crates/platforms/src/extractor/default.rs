use reqwest::Client;
use std::time::Duration;

pub(crate) const DEFAULT_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:86.0) Gecko/20100101 Firefox/86.0";

/// Client used for platform API calls. Playlist and segment traffic goes through the recorder's own client.
pub fn default_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(DEFAULT_UA)
        .timeout(Duration::from_secs(30))
        .build()
}
