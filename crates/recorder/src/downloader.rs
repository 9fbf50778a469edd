// Segment Downloader: drains a session's queue in order and appends each segment to the output file.

use std::sync::Arc;

use indicatif::{HumanBytes, HumanDuration};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info};

use crate::error::Result;
use crate::fetcher::HttpFetch;
use crate::session::{Progress, Segment};

pub struct SegmentDownloader {
    fetcher: Arc<dyn HttpFetch>,
    segments: mpsc::Receiver<Segment>,
    file: File,
    progress_tx: watch::Sender<Progress>,
}

impl SegmentDownloader {
    pub fn new(
        fetcher: Arc<dyn HttpFetch>,
        segments: mpsc::Receiver<Segment>,
        file: File,
        progress_tx: watch::Sender<Progress>,
    ) -> Self {
        Self {
            fetcher,
            segments,
            file,
            progress_tx,
        }
    }

    /// Runs until the queue is closed and drained, then returns the final totals.
    pub async fn run(mut self) -> Progress {
        let mut progress = Progress::default();

        while let Some(segment) = self.segments.recv().await {
            match self.download(&segment).await {
                Ok(Some(written)) => {
                    progress.total_bytes += written;
                    progress.total_duration = segment.total_duration;
                    progress.segments_written += 1;
                    info!(
                        "Written {} ({})",
                        HumanBytes(progress.total_bytes),
                        HumanDuration(progress.total_duration)
                    );
                }
                Ok(None) => progress.segments_skipped += 1,
                Err(e) => {
                    error!(uri = %segment.uri, error = %e, "Failed to download segment");
                    progress.segments_skipped += 1;
                }
            }
            self.progress_tx.send_replace(progress);
        }

        if let Err(e) = self.file.flush().await {
            error!(error = %e, "Failed to flush output file");
        }
        debug!(
            written = progress.segments_written,
            skipped = progress.segments_skipped,
            "Segment queue drained"
        );
        progress
    }

    /// Appends one segment. `Ok(None)` means the server answered with something other than 200.
    async fn download(&mut self, segment: &Segment) -> Result<Option<u64>> {
        let response = self.fetcher.get(&segment.uri).await?;
        if !response.is_ok() {
            error!(uri = %segment.uri, status = %response.status, "Skipping segment");
            return Ok(None);
        }

        self.file.write_all(&response.body).await?;
        // Segments must be on disk before the next one is fetched.
        self.file.flush().await?;
        Ok(Some(response.body.len() as u64))
    }
}
