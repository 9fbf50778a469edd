//! Shared fixtures: an in-process HLS origin and a scripted channel resolver.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header::USER_AGENT};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use parking_lot::Mutex;
use rekoda_platforms::ExtractorError;
use rekoda_recorder::{ChannelResolver, Quality, RecorderConfig, RecorderError};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

#[derive(Default)]
struct Origin {
    playlists: HashMap<String, VecDeque<String>>,
    segments: HashMap<String, (StatusCode, Vec<u8>)>,
    hits: HashMap<String, usize>,
    user_agents: Vec<String>,
}

type Shared = Arc<Mutex<Origin>>;

/// Serves playlists (each request takes the next body, the last one repeats) and static segments.
pub struct TestServer {
    addr: String,
    origin: Shared,
    task: JoinHandle<()>,
}

impl TestServer {
    pub async fn start() -> Self {
        let origin = Shared::default();
        let app = Router::new()
            .route("/{*path}", get(serve))
            .with_state(origin.clone());
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test server");
        let addr = listener.local_addr().expect("Failed to read local addr");
        let task = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Test server failed");
        });
        Self {
            addr: format!("http://{addr}"),
            origin,
            task,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.addr)
    }

    pub fn playlist(&self, path: &str, bodies: Vec<String>) {
        self.origin
            .lock()
            .playlists
            .insert(path.to_owned(), bodies.into_iter().collect());
    }

    pub fn segment(&self, path: &str, status: u16, body: &[u8]) {
        let status = StatusCode::from_u16(status).expect("valid status");
        self.origin
            .lock()
            .segments
            .insert(path.to_owned(), (status, body.to_vec()));
    }

    pub fn hits(&self, path: &str) -> usize {
        self.origin.lock().hits.get(path).copied().unwrap_or(0)
    }

    pub fn user_agents(&self) -> Vec<String> {
        self.origin.lock().user_agents.clone()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve(
    State(origin): State<Shared>,
    Path(path): Path<String>,
    headers: HeaderMap,
) -> Response {
    let path = format!("/{path}");
    let mut origin = origin.lock();
    *origin.hits.entry(path.clone()).or_default() += 1;
    if let Some(ua) = headers.get(USER_AGENT).and_then(|v| v.to_str().ok()) {
        origin.user_agents.push(ua.to_owned());
    }

    if let Some(queue) = origin.playlists.get_mut(&path) {
        let body = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };
        return (StatusCode::OK, body.unwrap_or_default()).into_response();
    }
    match origin.segments.get(&path) {
        Some((status, body)) => (*status, body.clone()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Media playlist with a zero target duration, so pollers refresh as fast as allowed.
pub fn media_playlist(segments: &[(&str, f64)], ended: bool) -> String {
    let mut body =
        String::from("#EXTM3U\n#EXT-X-VERSION:3\n#EXT-X-TARGETDURATION:0\n#EXT-X-MEDIA-SEQUENCE:0\n");
    for (uri, duration) in segments {
        body.push_str(&format!("#EXTINF:{duration:.3},\n{uri}\n"));
    }
    if ended {
        body.push_str("#EXT-X-ENDLIST\n");
    }
    body
}

/// Hands out URLs in order. `None` or an exhausted script means offline,
/// unless a fallback URL was set with [`ScriptResolver::always`].
#[derive(Default)]
pub struct ScriptResolver {
    script: Mutex<VecDeque<Option<String>>>,
    fallback: Option<String>,
    calls: AtomicUsize,
}

impl ScriptResolver {
    pub fn new(script: Vec<Option<String>>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            ..Default::default()
        }
    }

    pub fn always(url: String) -> Self {
        Self {
            fallback: Some(url),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChannelResolver for ScriptResolver {
    async fn resolve(&self, channel: &str, _quality: Quality) -> rekoda_recorder::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().pop_front();
        match next.unwrap_or_else(|| self.fallback.clone()) {
            Some(url) => Ok(url),
            None => Err(RecorderError::resolve(channel, ExtractorError::StreamerOffline)),
        }
    }
}

/// Default engine settings with every delay shrunk to milliseconds.
pub fn fast_config() -> RecorderConfig {
    let mut config = RecorderConfig::default();
    config.http.request_timeout = Duration::from_secs(2);
    config.http.backoff_schedule = vec![Duration::from_millis(10); 3];
    config.poller.refresh_delay = Duration::from_millis(20);
    config.poller.restart_attempts = 3;
    config.poller.restart_delay = Duration::from_millis(50);
    config.poller.min_poll_interval = Duration::from_millis(20);
    config.scheduler.scan_interval = Duration::from_millis(50);
    config.scheduler.channel_delay = Duration::from_millis(5);
    config
}

/// Polls `condition` until it holds, failing the test after ten seconds.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(10), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("Condition not met in time");
}
