//! # Rekoda Recorder
//!
//! Records live HLS channels to disk. A scheduler scans the configured channels
//! once per cycle and starts one recording session for every channel that went
//! live. Each session pairs a playlist poller with a segment downloader:
//!
//! - the poller refreshes the media playlist, deduplicates segments and queues new ones
//! - the downloader fetches queued segments in order and appends them to a single file
//!
//! A stream that ends and comes back within the grace window keeps appending to
//! the same file.
//!
//! ## Component Overview
//!
//! - `scheduler`: the scan loop, see [`Recorder`]
//! - `session`: wiring of one poller/downloader pair
//! - `poller`: playlist state machine
//! - `downloader`: ordered segment writer
//! - `fetcher`: shared HTTP client with fixed-schedule retries

pub mod cache;
pub mod channel;
pub mod config;
pub mod downloader;
pub mod error;
pub mod fetcher;
pub mod online;
pub mod playlist;
pub mod poller;
pub mod resolver;
mod retry;
pub mod scheduler;
pub mod session;

#[cfg(test)]
mod testing;

pub use channel::{Channel, ChannelSnapshot, ChannelSource, StaticChannels};
pub use config::{HttpConfig, PollerConfig, RecorderConfig, SchedulerConfig};
pub use error::{RecorderError, Result};
pub use fetcher::{FetchedResponse, HttpFetch, HttpFetcher};
pub use online::{OnlineGuard, OnlineSet};
pub use playlist::{M3u8Parser, ParsedPlaylist, PlaylistParser, PlaylistSegment};
pub use poller::PollerOutcome;
pub use resolver::ChannelResolver;
pub use scheduler::Recorder;
pub use session::{Progress, Segment, SessionDeps, SessionHandle, SessionReport};

pub use rekoda_platforms::Quality;
