// In-memory fakes for the fetch and resolve seams.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use rekoda_platforms::{ExtractorError, Quality};
use reqwest::StatusCode;

use crate::error::{RecorderError, Result};
use crate::fetcher::{FetchedResponse, HttpFetch};
use crate::resolver::ChannelResolver;

/// Serves canned responses per URL. The last response of a script repeats forever.
#[derive(Default)]
pub struct ScriptedFetcher {
    scripts: Mutex<HashMap<String, VecDeque<FetchedResponse>>>,
    hits: Mutex<HashMap<String, usize>>,
}

impl ScriptedFetcher {
    pub fn script(&self, url: &str, responses: Vec<FetchedResponse>) {
        self.scripts
            .lock()
            .insert(url.to_owned(), responses.into_iter().collect());
    }

    pub fn hits(&self, url: &str) -> usize {
        self.hits.lock().get(url).copied().unwrap_or(0)
    }

    pub fn ok(body: impl Into<String>) -> FetchedResponse {
        FetchedResponse {
            status: StatusCode::OK,
            body: Bytes::from(body.into()),
        }
    }

    pub fn status(code: u16) -> FetchedResponse {
        FetchedResponse {
            status: StatusCode::from_u16(code).unwrap(),
            body: Bytes::new(),
        }
    }
}

#[async_trait]
impl HttpFetch for ScriptedFetcher {
    async fn get(&self, url: &str) -> Result<FetchedResponse> {
        *self.hits.lock().entry(url.to_owned()).or_default() += 1;
        let mut scripts = self.scripts.lock();
        let response = match scripts.get_mut(url) {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().cloned(),
            None => None,
        };
        Ok(response.unwrap_or_else(|| Self::status(404)))
    }
}

/// Hands out scripted URLs in order; `Err(())` and an exhausted script mean offline.
#[derive(Default)]
pub struct ScriptedResolver {
    script: Mutex<VecDeque<std::result::Result<String, ()>>>,
    calls: AtomicUsize,
}

impl ScriptedResolver {
    pub fn script(&self, results: Vec<std::result::Result<String, ()>>) {
        self.script.lock().extend(results);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChannelResolver for ScriptedResolver {
    async fn resolve(&self, channel: &str, _quality: Quality) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.script.lock().pop_front() {
            Some(Ok(url)) => Ok(url),
            _ => Err(RecorderError::resolve(
                channel,
                ExtractorError::StreamerOffline,
            )),
        }
    }
}

/// A media playlist with a two second target duration.
pub fn media_playlist(segments: &[(&str, f64)], ended: bool) -> FetchedResponse {
    let mut body = String::from(
        "#EXTM3U\n#EXT-X-VERSION:3\n#EXT-X-TARGETDURATION:2\n#EXT-X-MEDIA-SEQUENCE:0\n",
    );
    for (uri, duration) in segments {
        body.push_str(&format!("#EXTINF:{duration:.3},\n{uri}\n"));
    }
    if ended {
        body.push_str("#EXT-X-ENDLIST\n");
    }
    ScriptedFetcher::ok(body)
}
