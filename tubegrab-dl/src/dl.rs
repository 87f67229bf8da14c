//! yt-dlp parameters and download outcomes.
//!
//! Type-safe mirror of the `YoutubeDL` parameters this crate sets. Field names
//! match the yt-dlp parameter keys, so the same value can be handed to the
//! Python API or translated into command-line flags.
//!
//! ```no_run
//! use std::sync::Arc;
//! use tubegrab_dl::dl::{DownloadOptions, Engine, OutputTemplates};
//! use tubegrab_dl::process::YtDlp;
//! use tubegrab_dl::progress::{LogLevel, Progress, Reporter};
//!
//! struct Silent;
//!
//! impl Reporter for Silent {
//!     fn progress(&self, _: &Progress) {}
//!     fn log(&self, _: LogLevel, _: &str) {}
//! }
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let opts = DownloadOptions {
//!     format: Some("bestaudio/best".to_string()),
//!     outtmpl: Some(OutputTemplates::simple("downloads/%(title)s.%(ext)s".to_string())),
//!     ..Default::default()
//! };
//!
//! let outcome = YtDlp::from_path()?.download("https://youtube.com/watch?v=example", &opts, Arc::new(Silent))?;
//! println!("{outcome:?}");
//! # Ok(())
//! # }
//! ```

use crate::error::Result;
use crate::progress::Reporter;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Filename templates using `%(field)s` syntax. Key `default` required.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OutputTemplates(pub BTreeMap<String, String>);

impl OutputTemplates {
    /// Create with a single default template.
    pub fn simple(default: String) -> Self {
        Self(BTreeMap::from([("default".to_string(), default)]))
    }

    /// The template used for the media file itself.
    pub fn default_template(&self) -> Option<&str> {
        self.0.get("default").map(String::as_str)
    }
}

/// Post-download operation: `key` (e.g., `"FFmpegExtractAudio"`) plus its arguments.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PostProcessor {
    pub key: String,
    pub preferredcodec: Option<String>,
    pub preferredquality: Option<String>,
}

impl PostProcessor {
    pub const EXTRACT_AUDIO: &'static str = "FFmpegExtractAudio";
    pub const METADATA: &'static str = "FFmpegMetadata";
    pub const EMBED_THUMBNAIL: &'static str = "EmbedThumbnail";

    /// Convert the downloaded stream to an audio-only file.
    pub fn extract_audio(codec: &str, quality: &str) -> Self {
        Self {
            key: Self::EXTRACT_AUDIO.to_string(),
            preferredcodec: Some(codec.to_string()),
            preferredquality: Some(quality.to_string()),
        }
    }

    /// Write title, artist and similar tags into the file.
    pub fn metadata() -> Self {
        Self::keyed(Self::METADATA)
    }

    /// Attach the thumbnail as cover art.
    pub fn embed_thumbnail() -> Self {
        Self::keyed(Self::EMBED_THUMBNAIL)
    }

    fn keyed(key: &str) -> Self {
        Self {
            key: key.to_string(),
            ..Default::default()
        }
    }
}

/// yt-dlp download configuration passed to `YoutubeDL(params)`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DownloadOptions {
    pub format: Option<String>,
    pub outtmpl: Option<OutputTemplates>,
    pub noplaylist: Option<bool>,
    pub nocheckcertificate: Option<bool>,
    pub restrictfilenames: Option<bool>,
    pub ignoreerrors: Option<bool>,
    pub concurrent_fragment_downloads: Option<u32>,
    pub quiet: Option<bool>,
    pub no_warnings: Option<bool>,
    pub verbose: Option<bool>,
    pub merge_output_format: Option<String>,
    pub postprocessors: Option<Vec<PostProcessor>>,
    pub writethumbnail: Option<bool>,
    pub retries: Option<u32>,
    pub file_access_retries: Option<u32>,
    pub fragment_retries: Option<u32>,
    pub socket_timeout: Option<u32>,
    pub ffmpeg_location: Option<String>,
}

impl DownloadOptions {
    /// Whether a post-processor with `key` is scheduled.
    pub fn has_postprocessor(&self, key: &str) -> bool {
        self.postprocessors
            .iter()
            .flatten()
            .any(|pp| pp.key == key)
    }

    /// Whether the run needs ffmpeg (audio conversion, stream merging, embedding).
    pub fn needs_ffmpeg(&self) -> bool {
        self.merge_output_format.is_some()
            || self.postprocessors.as_ref().is_some_and(|pps| !pps.is_empty())
    }
}

/// Essential metadata of one downloaded item.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct DownloadInfo {
    /// Video identifier
    pub id: Option<String>,
    /// Video title
    pub title: Option<String>,
    /// Final path of the media file after post-processing
    pub filepath: Option<PathBuf>,
}

/// Result of one `extract_info(url, download=True)` call.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    /// yt-dlp returned no info (every item failed under `ignoreerrors`)
    Nothing,
    Single(DownloadInfo),
    Playlist {
        title: Option<String>,
        entries: Vec<DownloadInfo>,
    },
}

/// Something that can run yt-dlp for a URL.
pub trait Engine {
    /// Download `url` with `opts`, streaming progress and messages to `reporter`.
    fn download(
        &self,
        url: &str,
        opts: &DownloadOptions,
        reporter: Arc<dyn Reporter>,
    ) -> Result<Outcome>;
}
