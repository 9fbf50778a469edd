use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:86.0) Gecko/20100101 Firefox/86.0";

// --- HTTP ---

/// Settings for the shared HTTP client and its retry schedule.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Per-request timeout, covering connect, headers and body.
    pub request_timeout: Duration,
    /// Maximum idle connections kept per host.
    pub pool_max_idle_per_host: usize,
    /// How long an idle pooled connection is kept before closing.
    pub pool_idle_timeout: Duration,
    /// User agent sent with every request.
    pub user_agent: String,
    /// Delay after each failed attempt. Its length is the total number of attempts.
    pub backoff_schedule: Vec<Duration>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(5),
            pool_max_idle_per_host: 100,
            pool_idle_timeout: Duration::from_secs(90),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            backoff_schedule: vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(4),
                Duration::from_secs(10),
            ],
        }
    }
}

// --- Playlist polling ---

/// Playlist poller timings.
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Pause before polling again after a failed fetch, with or without a fresh URL.
    pub refresh_delay: Duration,
    /// How many times to look for the channel again after an end-of-playlist marker.
    pub restart_attempts: u32,
    /// Pause before each restart check.
    pub restart_delay: Duration,
    /// Capacity of the per-session seen-segment cache.
    pub segment_cache_capacity: u64,
    /// Lower bound for the playlist re-poll interval, guards against `#EXT-X-TARGETDURATION:0`.
    pub min_poll_interval: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            refresh_delay: Duration::from_secs(1),
            restart_attempts: 20,
            restart_delay: Duration::from_secs(30),
            segment_cache_capacity: 1024,
            min_poll_interval: Duration::from_millis(500),
        }
    }
}

// --- Scheduling ---

/// Scheduler loop timings and session sizing.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Pause between two full scans of the channel list.
    pub scan_interval: Duration,
    /// Pause between two channel checks within a scan.
    pub channel_delay: Duration,
    /// Capacity of the queue between a session's poller and downloader.
    pub queue_capacity: usize,
    /// Extension of recorded files.
    pub file_extension: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            scan_interval: Duration::from_secs(60),
            channel_delay: Duration::from_secs(1),
            queue_capacity: 1024,
            file_extension: "ts".to_owned(),
        }
    }
}

/// Aggregated engine configuration.
#[derive(Debug, Clone, Default)]
pub struct RecorderConfig {
    pub http: HttpConfig,
    pub poller: PollerConfig,
    pub scheduler: SchedulerConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_constants() {
        let config = RecorderConfig::default();
        assert_eq!(config.http.backoff_schedule.len(), 4);
        assert_eq!(config.http.request_timeout, Duration::from_secs(5));
        assert_eq!(config.poller.restart_attempts, 20);
        assert_eq!(
            config.poller.restart_delay * config.poller.restart_attempts,
            Duration::from_secs(600)
        );
        assert_eq!(config.poller.segment_cache_capacity, 1024);
        assert_eq!(config.scheduler.queue_capacity, 1024);
        assert_eq!(config.scheduler.scan_interval, Duration::from_secs(60));
    }
}
