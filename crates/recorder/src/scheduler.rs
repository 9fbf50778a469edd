// Scheduler: periodic scan of the configured channels, one recording session per live channel.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::channel::{Channel, ChannelSource};
use crate::config::RecorderConfig;
use crate::error::{RecorderError, Result};
use crate::fetcher::HttpFetcher;
use crate::online::OnlineSet;
use crate::playlist::M3u8Parser;
use crate::resolver::ChannelResolver;
use crate::session::{SessionDeps, SessionHandle, SessionReport};

pub struct Recorder {
    source: Arc<dyn ChannelSource>,
    deps: SessionDeps,
    online: OnlineSet,
    sessions: Vec<SessionHandle>,
}

impl Recorder {
    /// Builds a recorder with the shared HTTP client and the `m3u8-rs` parser.
    pub fn new(
        config: RecorderConfig,
        source: Arc<dyn ChannelSource>,
        resolver: Arc<dyn ChannelResolver>,
    ) -> Result<Self> {
        let fetcher = HttpFetcher::new(&config.http)?;
        Ok(Self::with_deps(
            source,
            SessionDeps {
                fetcher: Arc::new(fetcher),
                parser: Arc::new(M3u8Parser),
                resolver,
                config: Arc::new(config),
            },
        ))
    }

    pub fn with_deps(source: Arc<dyn ChannelSource>, deps: SessionDeps) -> Self {
        Self {
            source,
            deps,
            online: OnlineSet::new(),
            sessions: Vec::new(),
        }
    }

    pub fn online(&self) -> &OnlineSet {
        &self.online
    }

    /// Sessions started and not reaped yet.
    pub fn sessions(&self) -> &[SessionHandle] {
        &self.sessions
    }

    /// Runs until Ctrl-C or SIGTERM.
    ///
    /// Sessions still running at that point are abandoned with the runtime.
    pub async fn start(mut self) -> Result<()> {
        info!("Starting recorder");
        let token = CancellationToken::new();
        let signals = tokio::spawn(cancel_on_signal(
            shutdown_signal(),
            tokio::signal::ctrl_c(),
            token.clone(),
        ));

        let result = self.run_until(token).await;
        signals.abort();
        result
    }

    /// Scans every `scan_interval` until `token` is cancelled.
    ///
    /// The first scan must succeed. Later failures are logged, except for having nothing left to record.
    pub async fn run_until(&mut self, token: CancellationToken) -> Result<()> {
        let scan_interval = self.deps.config.scheduler.scan_interval;
        let mut first = true;

        loop {
            match self.scan(&token).await {
                Ok(started) => debug!(started, online = ?self.online.snapshot(), "Scan finished"),
                Err(e @ RecorderError::NothingToRecord) => {
                    error!("{e}");
                    return Err(e);
                }
                Err(e) if first => return Err(e),
                Err(e) => warn!(error = %e, "Scan failed, trying again next cycle"),
            }
            first = false;

            info!("Sleep for {} seconds", scan_interval.as_secs());
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(scan_interval) => {}
            }
        }

        info!(sessions = self.sessions.len(), "Recorder stopped");
        Ok(())
    }

    /// One pass over the channel list. Returns how many sessions were started.
    pub async fn scan(&mut self, token: &CancellationToken) -> Result<usize> {
        self.reap_finished().await;

        let snapshot = self.source.load().await?;
        let enabled: Vec<&Channel> = snapshot.enabled().collect();
        if enabled.is_empty() {
            if self.sessions.is_empty() {
                return Err(RecorderError::NothingToRecord);
            }
            warn!("No channel is enabled, waiting for running sessions");
            return Ok(0);
        }

        let channel_delay = self.deps.config.scheduler.channel_delay;
        let mut started = 0;
        for (i, channel) in enabled.into_iter().enumerate() {
            if i > 0 {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(channel_delay) => {}
                }
            }
            if token.is_cancelled() {
                break;
            }
            if self.check_channel(channel, &snapshot.streams_dir, token).await {
                started += 1;
            }
        }
        Ok(started)
    }

    async fn check_channel(
        &mut self,
        channel: &Channel,
        streams_dir: &std::path::Path,
        token: &CancellationToken,
    ) -> bool {
        let name = channel.name.as_str();
        if self.online.contains(name) {
            debug!(channel = name, "Already recording");
            return false;
        }
        let Some(quality) = channel.quality() else {
            warn!(channel = name, quality = %channel.quality, "Unrecognized quality, skipping channel");
            return false;
        };

        info!(channel = name, "Trying to get m3u8 live playlist");
        let url = match self.deps.resolver.resolve(name, quality).await {
            Ok(url) => url,
            Err(e) => {
                info!(channel = name, "Channel is offline or banned");
                debug!(channel = name, error = %e, "Resolve failed");
                return false;
            }
        };

        let Some(guard) = self.online.try_register(name) else {
            return false;
        };
        info!(channel = name, "Went online!");

        match SessionHandle::start(
            &self.deps,
            guard,
            quality,
            url,
            streams_dir,
            token.child_token(),
        )
        .await
        {
            Ok(handle) => {
                self.sessions.push(handle);
                true
            }
            Err(e) => {
                error!(channel = name, error = %e, "Failed to start recording session");
                false
            }
        }
    }

    /// Collects sessions whose tasks have all exited and logs how they ended.
    async fn reap_finished(&mut self) -> Vec<SessionReport> {
        let (finished, running): (Vec<_>, Vec<_>) = std::mem::take(&mut self.sessions)
            .into_iter()
            .partition(SessionHandle::is_finished);
        self.sessions = running;

        let mut reports = Vec::with_capacity(finished.len());
        for handle in finished {
            let report = handle.join().await;
            report.log();
            reports.push(report);
        }
        reports
    }

    /// Waits for every session to wind down. Pair with cancelling the token given to [`Self::run_until`].
    pub async fn shutdown(self) -> Vec<SessionReport> {
        let mut reports = Vec::with_capacity(self.sessions.len());
        for handle in self.sessions {
            let report = handle.join().await;
            report.log();
            reports.push(report);
        }
        reports
    }
}

/// Cancels `token` once `signal` fires.
///
/// When `signal` can not be listened for, `fallback` is awaited instead so a
/// registration failure never stops the recorder by itself.
async fn cancel_on_signal<S, F>(signal: S, fallback: F, token: CancellationToken)
where
    S: Future<Output = std::io::Result<()>>,
    F: Future<Output = std::io::Result<()>>,
{
    let received = match signal.await {
        Ok(()) => Ok(()),
        Err(e) => {
            warn!(error = %e, "Failed to listen for shutdown signals, falling back to Ctrl-C");
            fallback.await
        }
    };
    match received {
        Ok(()) => {
            info!("Interrupted, exiting");
            token.cancel();
        }
        Err(e) => error!(
            error = %e,
            "Failed to listen for Ctrl-C, the recorder can not be interrupted"
        ),
    }
}

async fn shutdown_signal() -> std::io::Result<()> {
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let mut term = signal(SignalKind::terminate())?;
        tokio::select! {
            res = &mut ctrl_c => res?,
            _ = term.recv() => {},
        }
        return Ok(());
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;

    use rekoda_platforms::Quality;

    use crate::channel::{ChannelSnapshot, StaticChannels};
    use crate::testing::{ScriptedFetcher, ScriptedResolver, media_playlist};

    fn recorder(
        channels: Vec<Channel>,
        streams_dir: PathBuf,
        fetcher: Arc<ScriptedFetcher>,
        resolver: Arc<ScriptedResolver>,
    ) -> Recorder {
        let source = StaticChannels(ChannelSnapshot {
            streams_dir,
            channels,
        });
        Recorder::with_deps(
            Arc::new(source),
            SessionDeps {
                fetcher,
                parser: Arc::new(M3u8Parser),
                resolver,
                config: Arc::new(RecorderConfig::default()),
            },
        )
    }

    fn refused() -> std::io::Result<()> {
        Err(std::io::Error::other("signal registration refused"))
    }

    #[tokio::test(start_paused = true)]
    async fn failed_signal_registration_does_not_stop_recorder() {
        let token = CancellationToken::new();
        let listener = tokio::spawn(cancel_on_signal(
            async { refused() },
            std::future::pending(),
            token.clone(),
        ));

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(!token.is_cancelled());
        assert!(!listener.is_finished());
        listener.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn fallback_signal_cancels_after_failed_registration() {
        let token = CancellationToken::new();
        cancel_on_signal(
            async { refused() },
            async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            },
            token.clone(),
        )
        .await;
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn broken_fallback_leaves_token_alone() {
        let token = CancellationToken::new();
        cancel_on_signal(async { refused() }, async { refused() }, token.clone()).await;
        assert!(!token.is_cancelled());
    }

    #[tokio::test]
    async fn signal_cancels_token() {
        let token = CancellationToken::new();
        cancel_on_signal(async { Ok(()) }, std::future::pending(), token.clone()).await;
        assert!(token.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn nothing_enabled_is_fatal() {
        let mut off = Channel::new("foo", Quality::Best);
        off.enabled = false;
        let dir = tempfile::tempdir().unwrap();
        let mut rec = recorder(
            vec![off],
            dir.path().to_path_buf(),
            Arc::default(),
            Arc::default(),
        );
        let err = rec.run_until(CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, RecorderError::NothingToRecord));
    }

    #[tokio::test(start_paused = true)]
    async fn offline_and_misconfigured_channels_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let mut typo = Channel::new("typo", Quality::Best);
        typo.quality = "1080p60".into();
        let resolver = Arc::new(ScriptedResolver::default());
        let mut rec = recorder(
            vec![typo, Channel::new("sleepy", Quality::Best)],
            dir.path().to_path_buf(),
            Arc::default(),
            resolver.clone(),
        );

        let started = rec.scan(&CancellationToken::new()).await.unwrap();
        assert_eq!(started, 0);
        assert_eq!(resolver.calls(), 1, "only the valid channel is resolved");
        assert!(rec.online().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn live_channel_gets_exactly_one_session() {
        let dir = tempfile::tempdir().unwrap();
        let url = "https://edge.example.net/foo/index.m3u8";
        let fetcher = Arc::new(ScriptedFetcher::default());
        fetcher.script(url, vec![media_playlist(&[("1.ts", 2.0)], false)]);
        fetcher.script(
            "https://edge.example.net/foo/1.ts",
            vec![ScriptedFetcher::ok("data")],
        );
        let resolver = Arc::new(ScriptedResolver::default());
        resolver.script(vec![Ok(url.to_owned()), Ok(url.to_owned())]);
        let mut rec = recorder(
            vec![Channel::new("foo", Quality::Best)],
            dir.path().to_path_buf(),
            fetcher,
            resolver.clone(),
        );

        let token = CancellationToken::new();
        assert_eq!(rec.scan(&token).await.unwrap(), 1);
        assert!(rec.online().contains("foo"));
        assert_eq!(rec.scan(&token).await.unwrap(), 0);
        assert_eq!(resolver.calls(), 1, "online channels are not resolved again");
        assert_eq!(rec.sessions().len(), 1);

        let path = rec.sessions()[0].path().to_path_buf();
        assert!(path.starts_with(dir.path().join("foo")));
        assert_eq!(path.extension().unwrap(), "ts");

        let mut progress = rec.sessions()[0].subscribe();
        progress
            .wait_for(|p| p.segments_written == 1)
            .await
            .unwrap();

        token.cancel();
        let reports = rec.shutdown().await;
        assert_eq!(reports.len(), 1);
        assert!(!reports[0].crashed());
        assert_eq!(std::fs::read(&path).unwrap(), b"data");
    }

    #[tokio::test(start_paused = true)]
    async fn finished_sessions_are_reaped_and_channel_can_restart() {
        let dir = tempfile::tempdir().unwrap();
        let url = "https://edge.example.net/foo/index.m3u8";
        let fetcher = Arc::new(ScriptedFetcher::default());
        fetcher.script(url, vec![ScriptedFetcher::ok(
            "#EXTM3U\n#EXT-X-STREAM-INF:BANDWIDTH=1\nlow.m3u8\n",
        )]);
        let resolver = Arc::new(ScriptedResolver::default());
        resolver.script(vec![Ok(url.to_owned()), Ok(url.to_owned())]);
        let mut rec = recorder(
            vec![Channel::new("foo", Quality::Best)],
            dir.path().to_path_buf(),
            fetcher,
            resolver,
        );
        let token = CancellationToken::new();

        assert_eq!(rec.scan(&token).await.unwrap(), 1);
        while !rec.sessions()[0].is_finished() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(!rec.online().contains("foo"));

        assert_eq!(rec.scan(&token).await.unwrap(), 1);
        assert_eq!(rec.sessions().len(), 1);
        token.cancel();
        rec.shutdown().await;
    }
}
