// HTTP Fetcher: one shared client, every GET wrapped in the fixed backoff schedule.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, StatusCode};
use tracing::trace;
use url::Url;

use crate::config::HttpConfig;
use crate::error::{RecorderError, Result};
use crate::retry::retry_with_schedule;

/// A fully read response. Status handling is left to the caller.
#[derive(Debug, Clone)]
pub struct FetchedResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

impl FetchedResponse {
    pub fn is_ok(&self) -> bool {
        self.status == StatusCode::OK
    }
}

#[async_trait]
pub trait HttpFetch: Send + Sync {
    /// GET `url`, retrying transport failures. Non-success statuses are returned as-is.
    async fn get(&self, url: &str) -> Result<FetchedResponse>;
}

pub struct HttpFetcher {
    client: Client,
    backoff_schedule: Vec<Duration>,
}

impl HttpFetcher {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.request_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .pool_idle_timeout(config.pool_idle_timeout)
            .build()?;

        Ok(Self {
            client,
            backoff_schedule: config.backoff_schedule.clone(),
        })
    }

    async fn get_once(&self, url: &Url) -> reqwest::Result<FetchedResponse> {
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        // A broken body is a transport failure too, so it is read inside the attempt.
        let body = response.bytes().await?;
        trace!(%url, %status, bytes = body.len(), "GET finished");
        Ok(FetchedResponse { status, body })
    }
}

#[async_trait]
impl HttpFetch for HttpFetcher {
    async fn get(&self, url: &str) -> Result<FetchedResponse> {
        let parsed = Url::parse(url).map_err(|e| RecorderError::invalid_url(url, e.to_string()))?;
        retry_with_schedule(&self.backoff_schedule, |_| self.get_once(&parsed))
            .await
            .map_err(RecorderError::from)
    }
}
