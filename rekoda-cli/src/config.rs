//! `rekoda.toml`: location rules, default file creation and channel list edits.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use rekoda_recorder::{Channel, ChannelSnapshot, ChannelSource, Quality, RecorderError};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use crate::error::ConfigError;

pub const CONFIG_FILE_NAME: &str = "rekoda.toml";
const APP_DIR: &str = "rekoda";
const STREAMS_DIR: &str = "streams";

/// Where the config file lives and what overrides apply to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigPaths {
    pub config_file: PathBuf,
    /// Named by `--config` or `REKODA_CONF_FILE`. Such a file must already exist.
    pub explicit: bool,
    pub streams_dir_override: Option<PathBuf>,
}

impl ConfigPaths {
    pub fn resolve(config: Option<PathBuf>, output: Option<PathBuf>) -> Result<Self, ConfigError> {
        match config {
            Some(config_file) => Ok(Self {
                config_file,
                explicit: true,
                streams_dir_override: output,
            }),
            None => {
                let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
                Ok(Self::in_home(&home, output))
            }
        }
    }

    /// `<home>/rekoda/rekoda.toml`
    pub fn in_home(home: &Path, output: Option<PathBuf>) -> Self {
        Self {
            config_file: home.join(APP_DIR).join(CONFIG_FILE_NAME),
            explicit: false,
            streams_dir_override: output,
        }
    }

    fn config_dir(&self) -> PathBuf {
        self.config_file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelEntry {
    pub enabled: bool,
    pub user: String,
    pub id: i64,
    pub quality: String,
}

impl ChannelEntry {
    fn new(user: &str) -> Self {
        Self {
            enabled: true,
            user: user.to_owned(),
            id: 0,
            quality: Quality::Best.to_string(),
        }
    }
}

impl From<&ChannelEntry> for Channel {
    fn from(entry: &ChannelEntry) -> Self {
        Channel {
            name: entry.user.clone(),
            id: entry.id,
            quality: entry.quality.clone(),
            enabled: entry.enabled,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub version: i64,
    #[serde(default)]
    pub config_dir: PathBuf,
    #[serde(default)]
    pub config_file: PathBuf,
    #[serde(default)]
    pub streams_dir: PathBuf,
    #[serde(default)]
    pub channels: Vec<ChannelEntry>,
}

impl AppConfig {
    /// The file written on first run: one disabled sample channel.
    pub fn sample(paths: &ConfigPaths) -> Self {
        let config_dir = paths.config_dir();
        Self {
            title: "Rekoda configuration file".to_owned(),
            version: 1,
            streams_dir: config_dir.join(STREAMS_DIR),
            config_dir,
            config_file: paths.config_file.clone(),
            channels: vec![ChannelEntry {
                enabled: false,
                user: "test".to_owned(),
                id: 999_999_999_999,
                quality: Quality::Best.to_string(),
            }],
        }
    }

    /// Loads the config file, creating the default one on first run.
    pub fn load(paths: &ConfigPaths) -> Result<Self, ConfigError> {
        let path = &paths.config_file;
        if !path.exists() {
            if paths.explicit {
                return Err(ConfigError::NotFound(path.clone()));
            }
            info!(
                "Config file {} not found. First time running? Creating the default one",
                path.display()
            );
            Self::sample(paths).save()?;
            info!("Config file {} created", path.display());
        }

        debug!("Using config file {}", path.display());
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        Self::parse(&contents, paths)
    }

    /// Parses `contents` and applies the location rules of `paths`.
    pub fn parse(contents: &str, paths: &ConfigPaths) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: paths.config_file.clone(),
            source,
        })?;

        config.config_file = paths.config_file.clone();
        if config.config_dir.as_os_str().is_empty() {
            config.config_dir = paths.config_dir();
        }
        if let Some(dir) = &paths.streams_dir_override {
            config.streams_dir = dir.clone();
        } else if config.streams_dir.as_os_str().is_empty() {
            config.streams_dir = config.config_dir.join(STREAMS_DIR);
        }
        trace!(?config, "Config loaded");
        Ok(config)
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        let path = &self.config_file;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents).map_err(|source| ConfigError::Write {
            path: path.clone(),
            source,
        })
    }

    pub fn contains(&self, user: &str) -> bool {
        self.channels.iter().any(|c| c.user == user)
    }

    /// Adds each new name as an enabled `best` channel. Returns the names actually added.
    pub fn add_channels<'a>(&mut self, names: &'a [String]) -> Vec<&'a str> {
        let mut added = Vec::new();
        for name in names {
            if self.contains(name) {
                warn!("Skip! '{name}' is already added in config");
                continue;
            }
            self.channels.push(ChannelEntry::new(name));
            info!("Channel '{name}' added in config file");
            added.push(name.as_str());
        }
        added
    }

    /// Removes every entry named in `names`. Returns how many entries were removed.
    pub fn remove_channels(&mut self, names: &[String]) -> usize {
        let before = self.channels.len();
        self.channels.retain(|c| !names.contains(&c.user));
        for name in names {
            info!("Channel '{name}' removed from config file");
        }
        before - self.channels.len()
    }

    /// Returns how many entries matched.
    pub fn set_enabled(&mut self, names: &[String], enabled: bool) -> usize {
        let mut matched = 0;
        for channel in self.channels.iter_mut().filter(|c| names.contains(&c.user)) {
            info!(
                "Found! '{}', {} it",
                channel.user,
                if enabled { "enabling" } else { "disabling" }
            );
            channel.enabled = enabled;
            matched += 1;
        }
        matched
    }

    /// All channel names, and the enabled subset.
    pub fn channel_list(&self) -> (Vec<&str>, Vec<&str>) {
        let all = self.channels.iter().map(|c| c.user.as_str()).collect();
        let enabled = self
            .channels
            .iter()
            .filter(|c| c.enabled)
            .map(|c| c.user.as_str())
            .collect();
        (all, enabled)
    }

    pub fn snapshot(&self) -> ChannelSnapshot {
        ChannelSnapshot {
            streams_dir: self.streams_dir.clone(),
            channels: self.channels.iter().map(Channel::from).collect(),
        }
    }
}

/// Channel source that re-reads `rekoda.toml` on every scan, so edits apply without a restart.
pub struct FileChannelSource {
    paths: ConfigPaths,
}

impl FileChannelSource {
    pub fn new(paths: ConfigPaths) -> Self {
        Self { paths }
    }
}

#[async_trait]
impl ChannelSource for FileChannelSource {
    async fn load(&self) -> rekoda_recorder::Result<ChannelSnapshot> {
        let path = &self.paths.config_file;
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| RecorderError::config(format!("failed to read {}: {e}", path.display())))?;
        let config = AppConfig::parse(&contents, &self.paths)
            .map_err(|e| RecorderError::config(e.to_string()))?;
        Ok(config.snapshot())
    }
}
