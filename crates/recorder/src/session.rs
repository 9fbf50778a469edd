// Recording Session: one poller/downloader pair wired by a bounded queue.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};
use indicatif::{HumanBytes, HumanDuration};
use rekoda_platforms::Quality;
use tokio::fs::{File, OpenOptions};
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, error, info, info_span, warn};

use crate::config::RecorderConfig;
use crate::downloader::SegmentDownloader;
use crate::error::Result;
use crate::fetcher::HttpFetch;
use crate::online::OnlineGuard;
use crate::playlist::PlaylistParser;
use crate::poller::{PlaylistPoller, PollerOutcome};
use crate::resolver::ChannelResolver;

/// A segment queued for download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Absolute, unescaped URI.
    pub uri: String,
    /// Recorded stream time up to and including this segment.
    pub total_duration: Duration,
}

/// Running totals of a session's downloader.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Progress {
    pub total_bytes: u64,
    pub total_duration: Duration,
    pub segments_written: u64,
    pub segments_skipped: u64,
}

/// Collaborators shared by every session of a recorder.
#[derive(Clone)]
pub struct SessionDeps {
    pub fetcher: Arc<dyn HttpFetch>,
    pub parser: Arc<dyn PlaylistParser>,
    pub resolver: Arc<dyn ChannelResolver>,
    pub config: Arc<RecorderConfig>,
}

/// `<streams-dir>/<channel>/<channel>_<local-timestamp>.<ext>`
pub fn output_path(
    streams_dir: &Path,
    channel: &str,
    started_at: &DateTime<Local>,
    extension: &str,
) -> PathBuf {
    let stamp = started_at.format("%Y-%m-%d_%H-%M-%S");
    streams_dir
        .join(channel)
        .join(format!("{channel}_{stamp}.{extension}"))
}

/// Creates the output file, never reusing an existing path.
async fn create_output_file(path: PathBuf) -> Result<(File, PathBuf)> {
    let mut candidate = path.clone();
    let mut suffix = 1u32;
    loop {
        match OpenOptions::new()
            .write(true)
            .append(true)
            .create_new(true)
            .open(&candidate)
            .await
        {
            Ok(file) => return Ok((file, candidate)),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("stream");
                let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("ts");
                candidate = path.with_file_name(format!("{stem}_{suffix}.{ext}"));
                suffix += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }
}

/// What the scheduler keeps for each session it started.
pub struct SessionHandle {
    channel: String,
    path: PathBuf,
    started_at: DateTime<Local>,
    progress: watch::Receiver<Progress>,
    poller: JoinHandle<PollerOutcome>,
    downloader: JoinHandle<Progress>,
}

impl SessionHandle {
    /// Creates the output file and spawns the poller and downloader.
    ///
    /// `online` is handed to the poller, which releases it when the session ends.
    pub async fn start(
        deps: &SessionDeps,
        online: OnlineGuard,
        quality: Quality,
        playlist_url: String,
        streams_dir: &Path,
        token: CancellationToken,
    ) -> Result<Self> {
        let channel = online.channel().to_owned();
        let started_at = Local::now();

        let channel_dir = streams_dir.join(&channel);
        tokio::fs::create_dir_all(&channel_dir).await?;
        let (file, path) = create_output_file(output_path(
            streams_dir,
            &channel,
            &started_at,
            &deps.config.scheduler.file_extension,
        ))
        .await?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        info!(channel = %channel, file = %path.display(), "Writing stream to file");

        let (segment_tx, segment_rx) = mpsc::channel(deps.config.scheduler.queue_capacity);
        let (progress_tx, progress_rx) = watch::channel(Progress::default());

        let poller = PlaylistPoller::new(
            deps,
            online,
            quality,
            playlist_url,
            segment_tx,
            token,
        );
        let downloader =
            SegmentDownloader::new(Arc::clone(&deps.fetcher), segment_rx, file, progress_tx);

        let span = info_span!("session", channel = %channel, file = %file_name);
        let poller = tokio::spawn(
            poller
                .run()
                .instrument(info_span!(parent: &span, "poller", status = "GET")),
        );
        let downloader = tokio::spawn(
            downloader
                .run()
                .instrument(info_span!(parent: &span, "downloader", status = "DOWNLOAD")),
        );

        Ok(Self {
            channel,
            path,
            started_at,
            progress: progress_rx,
            poller,
            downloader,
        })
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn started_at(&self) -> DateTime<Local> {
        self.started_at
    }

    /// Latest progress reported by the downloader.
    pub fn progress(&self) -> Progress {
        *self.progress.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Progress> {
        self.progress.clone()
    }

    /// Both tasks have exited.
    pub fn is_finished(&self) -> bool {
        self.poller.is_finished() && self.downloader.is_finished()
    }

    /// Waits for both tasks. A panic in either is captured in the report.
    pub async fn join(self) -> SessionReport {
        let poller = self.poller.await;
        let downloader = self.downloader.await;
        SessionReport {
            channel: self.channel,
            path: self.path,
            poller,
            downloader,
        }
    }
}

/// How a session ended.
#[derive(Debug)]
pub struct SessionReport {
    pub channel: String,
    pub path: PathBuf,
    pub poller: std::result::Result<PollerOutcome, JoinError>,
    pub downloader: std::result::Result<Progress, JoinError>,
}

impl SessionReport {
    /// A task of the session panicked or was aborted.
    pub fn crashed(&self) -> bool {
        self.poller.is_err() || self.downloader.is_err()
    }

    pub fn log(&self) {
        let file = self.path.display();
        match &self.poller {
            Ok(outcome) => info!(channel = %self.channel, %file, %outcome, "Playlist poller finished"),
            Err(e) => error!(channel = %self.channel, %file, error = %e, "Playlist poller crashed"),
        }
        match &self.downloader {
            Ok(progress) => info!(
                channel = %self.channel,
                %file,
                skipped = progress.segments_skipped,
                "Recorded {} ({})",
                HumanBytes(progress.total_bytes),
                HumanDuration(progress.total_duration)
            ),
            Err(e) => warn!(channel = %self.channel, %file, error = %e, "Segment downloader crashed"),
        }
    }
}
