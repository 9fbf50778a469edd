// Online-Set: channels that currently have an active recording session.

use std::sync::Arc;

use dashmap::DashSet;
use tracing::debug;

/// Process-wide set of channels being recorded. Cheap to clone; clones share state.
#[derive(Debug, Clone, Default)]
pub struct OnlineSet {
    inner: Arc<DashSet<String>>,
}

impl OnlineSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, channel: &str) -> bool {
        self.inner.contains(channel)
    }

    /// Atomically marks `channel` online.
    ///
    /// Returns `None` if it already is. The returned guard takes the channel
    /// offline again when dropped, including when its owner unwinds.
    pub fn try_register(&self, channel: &str) -> Option<OnlineGuard> {
        if !self.inner.insert(channel.to_owned()) {
            return None;
        }
        debug!(channel, "marked online");
        Some(OnlineGuard {
            set: self.clone(),
            channel: channel.to_owned(),
        })
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Sorted copy of the current members, for logging.
    pub fn snapshot(&self) -> Vec<String> {
        let mut channels: Vec<String> = self.inner.iter().map(|c| c.key().clone()).collect();
        channels.sort();
        channels
    }

    fn remove(&self, channel: &str) {
        if self.inner.remove(channel).is_some() {
            debug!(channel, "marked offline");
        }
    }
}

/// Membership token for one channel in an [`OnlineSet`].
#[derive(Debug)]
pub struct OnlineGuard {
    set: OnlineSet,
    channel: String,
}

impl OnlineGuard {
    pub fn channel(&self) -> &str {
        &self.channel
    }
}

impl Drop for OnlineGuard {
    fn drop(&mut self) {
        self.set.remove(&self.channel);
    }
}
