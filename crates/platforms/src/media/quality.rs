use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Rendition selector for a recorded channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quality {
    /// Highest bandwidth video rendition.
    Best,
    /// Lowest bandwidth video rendition.
    Worst,
    /// The audio-only rendition.
    AudioOnly,
}

impl Quality {
    pub const ALL: [Quality; 3] = [Quality::Best, Quality::Worst, Quality::AudioOnly];

    pub fn as_str(&self) -> &'static str {
        match self {
            Quality::Best => "best",
            Quality::Worst => "worst",
            Quality::AudioOnly => "audio_only",
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownQuality(pub String);

impl fmt::Display for UnknownQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown quality `{}` (expected one of: best, worst, audio_only)",
            self.0
        )
    }
}

impl std::error::Error for UnknownQuality {}

impl FromStr for Quality {
    type Err = UnknownQuality;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Quality::ALL
            .into_iter()
            .find(|q| q.as_str() == s)
            .ok_or_else(|| UnknownQuality(s.to_string()))
    }
}
