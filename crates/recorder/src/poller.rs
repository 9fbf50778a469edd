// Playlist Poller: per-session state machine that turns playlist refreshes into queued segments.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use rekoda_platforms::Quality;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};
use url::Url;

use crate::cache::SegmentCache;
use crate::config::PollerConfig;
use crate::error::{RecorderError, Result};
use crate::fetcher::HttpFetch;
use crate::online::OnlineGuard;
use crate::playlist::{ParsedPlaylist, PlaylistParser, resolve_segment_uri};
use crate::resolver::ChannelResolver;
use crate::session::{Segment, SessionDeps};

/// Why a poller stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerOutcome {
    /// The playlist ended and the channel did not come back within the grace window.
    StreamEnded,
    /// The playlist URL served a master playlist.
    NotMediaPlaylist,
    /// The downloader went away, nothing can be recorded anymore.
    DownloaderGone,
    Cancelled,
}

impl fmt::Display for PollerOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::StreamEnded => "stream ended",
            Self::NotMediaPlaylist => "not a media playlist",
            Self::DownloaderGone => "downloader gone",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

#[derive(Debug)]
enum PollerState {
    Polling,
    Refreshing,
    StreamEndedWaiting,
    Terminated(PollerOutcome),
}

/// Deduplicates playlist entries and keeps the session's running duration.
pub struct SegmentTracker {
    cache: SegmentCache,
    recorded: Duration,
}

impl SegmentTracker {
    pub fn new(capacity: u64) -> Self {
        Self {
            cache: SegmentCache::new(capacity),
            recorded: Duration::ZERO,
        }
    }

    /// Stream time covered by every segment handed out so far.
    pub fn recorded(&self) -> Duration {
        self.recorded
    }

    /// Returns the segments of `playlist` not seen before in this session, in playlist order.
    ///
    /// Entries whose URI cannot be resolved are logged and left out.
    pub fn track(&mut self, base: &Url, playlist: &ParsedPlaylist) -> Vec<Segment> {
        let mut fresh = Vec::new();
        for entry in &playlist.segments {
            let uri = match resolve_segment_uri(base, entry) {
                Ok(uri) => uri,
                Err(e) => {
                    warn!(uri = %entry.uri, error = %e, "Skipping segment with unusable URI");
                    continue;
                }
            };
            if !self.cache.insert_if_absent(&uri) {
                continue;
            }
            self.recorded += entry.duration;
            fresh.push(Segment {
                uri,
                total_duration: self.recorded,
            });
        }
        fresh
    }
}

struct Polled {
    new_segments: usize,
    target_duration: Duration,
    closed: bool,
}

enum RestartCheck {
    Back(String),
    StillOffline,
    Cancelled,
}

pub struct PlaylistPoller {
    fetcher: Arc<dyn HttpFetch>,
    parser: Arc<dyn PlaylistParser>,
    resolver: Arc<dyn ChannelResolver>,
    config: PollerConfig,
    quality: Quality,
    playlist_url: String,
    tracker: SegmentTracker,
    segments: mpsc::Sender<Segment>,
    online: OnlineGuard,
    token: CancellationToken,
}

impl PlaylistPoller {
    pub fn new(
        deps: &SessionDeps,
        online: OnlineGuard,
        quality: Quality,
        playlist_url: String,
        segments: mpsc::Sender<Segment>,
        token: CancellationToken,
    ) -> Self {
        let config = deps.config.poller.clone();
        Self {
            fetcher: Arc::clone(&deps.fetcher),
            parser: Arc::clone(&deps.parser),
            resolver: Arc::clone(&deps.resolver),
            tracker: SegmentTracker::new(config.segment_cache_capacity),
            config,
            quality,
            playlist_url,
            segments,
            online,
            token,
        }
    }

    fn channel(&self) -> &str {
        self.online.channel()
    }

    /// Drives the state machine until it terminates.
    ///
    /// Dropping the poller at the end closes the segment queue and takes the
    /// channel out of the online set.
    pub async fn run(mut self) -> PollerOutcome {
        let token = self.token.clone();
        let mut state = PollerState::Polling;

        let outcome = loop {
            state = match state {
                PollerState::Polling => {
                    if self.segments.is_closed() {
                        PollerState::Terminated(PollerOutcome::DownloaderGone)
                    } else {
                        let polled = tokio::select! {
                            biased;
                            _ = token.cancelled() => None,
                            polled = self.poll() => Some(polled),
                        };
                        match polled {
                            None => PollerState::Terminated(PollerOutcome::Cancelled),
                            Some(polled) => self.after_poll(polled).await,
                        }
                    }
                }
                PollerState::Refreshing => {
                    let url = tokio::select! {
                        biased;
                        _ = token.cancelled() => None,
                        url = self.resolver.resolve(self.online.channel(), self.quality) => Some(url),
                    };
                    match url {
                        None => PollerState::Terminated(PollerOutcome::Cancelled),
                        Some(url) => {
                            match url {
                                Ok(url) => {
                                    debug!(url = %url, "Got a fresh playlist url");
                                    self.playlist_url = url;
                                }
                                Err(e) => warn!(error = %e, "Failed to refresh playlist url"),
                            }
                            if self.pause(self.config.refresh_delay).await {
                                PollerState::Polling
                            } else {
                                PollerState::Terminated(PollerOutcome::Cancelled)
                            }
                        }
                    }
                }
                PollerState::StreamEndedWaiting => match self.wait_for_restart().await {
                    RestartCheck::Back(url) => {
                        info!(channel = self.channel(), "Went online again, resuming the same file");
                        self.playlist_url = url;
                        PollerState::Polling
                    }
                    RestartCheck::StillOffline => {
                        PollerState::Terminated(PollerOutcome::StreamEnded)
                    }
                    RestartCheck::Cancelled => PollerState::Terminated(PollerOutcome::Cancelled),
                },
                PollerState::Terminated(outcome) => break outcome,
            };
        };

        let Self {
            segments, online, tracker, ..
        } = self;
        drop(segments);
        info!(
            channel = online.channel(),
            %outcome,
            recorded_secs = tracker.recorded().as_secs(),
            "Stopped polling"
        );
        drop(online);
        outcome
    }

    async fn after_poll(&mut self, polled: Result<Polled>) -> PollerState {
        match polled {
            Ok(polled) if polled.closed => {
                info!(
                    new_segments = polled.new_segments,
                    "Playlist has ended, waiting for the stream to come back"
                );
                PollerState::StreamEndedWaiting
            }
            Ok(polled) => {
                let wait = polled.target_duration.max(self.config.min_poll_interval);
                trace!(
                    new_segments = polled.new_segments,
                    wait_ms = wait.as_millis() as u64,
                    "Playlist polled"
                );
                if self.pause(wait).await {
                    PollerState::Polling
                } else {
                    PollerState::Terminated(PollerOutcome::Cancelled)
                }
            }
            Err(RecorderError::QueueClosed) => {
                warn!("Segment queue closed, stopping");
                PollerState::Terminated(PollerOutcome::DownloaderGone)
            }
            Err(e) if e.is_fatal() => {
                error!(url = %self.playlist_url, error = %e, "Can not record from this playlist");
                PollerState::Terminated(PollerOutcome::NotMediaPlaylist)
            }
            Err(e) => {
                warn!(error = %e, "Failed to poll playlist, refreshing playlist url");
                PollerState::Refreshing
            }
        }
    }

    /// One refresh: fetch, parse, enqueue everything new.
    async fn poll(&mut self) -> Result<Polled> {
        let response = self.fetcher.get(&self.playlist_url).await?;
        if !response.status.is_success() {
            return Err(RecorderError::HttpStatus {
                status: response.status,
                url: self.playlist_url.clone(),
            });
        }

        let playlist = self.parser.parse(&response.body)?;
        let base = Url::parse(&self.playlist_url)
            .map_err(|e| RecorderError::invalid_url(self.playlist_url.as_str(), e.to_string()))?;

        let fresh = self.tracker.track(&base, &playlist);
        let new_segments = fresh.len();
        for segment in fresh {
            trace!(uri = %segment.uri, "Queueing segment");
            self.segments
                .send(segment)
                .await
                .map_err(|_| RecorderError::QueueClosed)?;
        }

        Ok(Polled {
            new_segments,
            target_duration: playlist.target_duration,
            closed: playlist.closed,
        })
    }

    async fn wait_for_restart(&self) -> RestartCheck {
        let attempts = self.config.restart_attempts;
        for attempt in 1..=attempts {
            info!(
                attempt,
                max = attempts,
                "Checking again in {}s whether the stream is back",
                self.config.restart_delay.as_secs()
            );
            if !self.pause(self.config.restart_delay).await {
                return RestartCheck::Cancelled;
            }
            if self.segments.is_closed() {
                return RestartCheck::StillOffline;
            }
            match self.resolver.resolve(self.channel(), self.quality).await {
                Ok(url) => return RestartCheck::Back(url),
                Err(e) => debug!(attempt, error = %e, "Still offline"),
            }
        }
        RestartCheck::StillOffline
    }

    /// Sleeps for `duration`. Returns `false` when cancelled first.
    async fn pause(&self, duration: Duration) -> bool {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => false,
            _ = tokio::time::sleep(duration) => true,
        }
    }
}
