use miette::Result;
use miette::miette;
use serde::{Deserialize, Serialize};

use std::future::Future;
use std::path::Path;
use std::path::PathBuf;

/// Output granularity: one file per post, or all of a calendar day's posts
/// grouped into a single file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Granularity {
    #[default]
    PerPost,
    GroupedByDay,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Blog name or full hostname to back up.
    pub blog_identifier: String,
    /// API consumer key.
    pub api_key: String,
    /// Root directory for the archive.
    pub output_dir: PathBuf,
    pub download_images: bool,
    pub download_videos: bool,
    pub download_audio: bool,
    /// Attachments larger than this stay remote links.
    pub size_ceiling_bytes: Option<u64>,
    /// Only fetch posts from the last N hours. `None` means a full backup.
    pub incremental_hours: Option<u64>,
    pub granularity: Granularity,
    /// Fixed offset applied when rendering local times and deriving day
    /// paths. Kept as a plain offset so output is reproducible.
    pub utc_offset_minutes: i32,
    /// Where to append external video URLs for the playlist collaborator.
    pub playlist_queue: Option<PathBuf>,
}

impl Config {
    /// Loads the configuration from the provided loader.
    pub async fn load(loader: &impl Loader) -> Result<Self> {
        loader
            .load()
            .await
            .map_err(|e| miette!("Failed to load configuration: {e}"))
    }

    /// Saves the configuration using the provided saver.
    pub async fn save(&self, saver: &impl Saver) -> Result<()> {
        saver
            .save(self)
            .await
            .map_err(|e| miette!("Failed to save configuration: {e}"))
    }

    pub fn validate(&self) -> crate::Result<()> {
        if self.blog_identifier.is_empty() {
            return Err(crate::ArchiveError::Config(
                "blog_identifier is required".into(),
            ));
        }
        if self.api_key.is_empty() {
            return Err(crate::ArchiveError::Config("api_key is required".into()));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            blog_identifier: String::new(),
            api_key: String::new(),
            output_dir: PathBuf::from("backup"),
            download_images: true,
            download_videos: true,
            download_audio: true,
            size_ceiling_bytes: Some(100 * 1024 * 1024),
            incremental_hours: Some(5),
            granularity: Granularity::PerPost,
            // Sydney standard time, matching the archive this grew out of.
            utc_offset_minutes: 600,
            playlist_queue: None,
        }
    }
}

/// The trait for loading configuration data.
pub trait Loader {
    /// Loads the configuration data.
    fn load(
        &self,
    ) -> impl Future<
        Output = core::result::Result<Config, Box<dyn std::error::Error + Send + Sync + 'static>>,
    > + Send;
}

/// The trait for saving configuration data.
pub trait Saver {
    /// Saves the configuration data.
    fn save(
        &self,
        config: &Config,
    ) -> impl Future<
        Output = core::result::Result<(), Box<dyn std::error::Error + Send + Sync + 'static>>,
    > + Send;
}

/// An implementation of [`Loader`] and [`Saver`] that reads and writes a
/// configuration file, dispatching on the file extension. Supports `.json`
/// and `.toml`.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl Loader for FileStore {
    async fn load(
        &self,
    ) -> core::result::Result<Config, Box<dyn std::error::Error + Send + Sync + 'static>> {
        match self.path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(serde_json::from_str(&std::fs::read_to_string(&self.path)?)?),
            Some("toml") => Ok(toml::from_str(&std::fs::read_to_string(&self.path)?)?),
            _ => Err(miette!("Unsupported config format").into()),
        }
    }
}

impl Saver for FileStore {
    async fn save(
        &self,
        config: &Config,
    ) -> core::result::Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
        match self.path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(std::fs::write(
                &self.path,
                serde_json::to_string_pretty(config)?,
            )?),
            Some("toml") => Ok(std::fs::write(&self.path, toml::to_string_pretty(config)?)?),
            _ => Err(miette!("Unsupported config format").into()),
        }
    }
}
