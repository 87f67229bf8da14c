//! Type-safe Rust interface to [yt-dlp](https://github.com/yt-dlp/yt-dlp).
//!
//! ## Modules
//!
//! - [`dl`] - `YoutubeDL` parameters, outcomes and the [`dl::Engine`] trait
//! - [`preset`] - Audio and video presets
//! - [`progress`] - Progress records and the [`progress::Reporter`] seam
//! - [`process`] - Engine running the `yt-dlp` executable
//! - `embedded` - Engine driving the `yt_dlp` Python package (feature `python`)
//!
//! ## Quick Start
//!
//! **Audio preset** (MP3, best quality):
//! ```no_run
//! use std::sync::Arc;
//! use tubegrab_dl::dl::{DownloadOptions, Engine};
//! use tubegrab_dl::preset::{AudioCodec, Media};
//! use tubegrab_dl::process::YtDlp;
//! use tubegrab_dl::progress::{LogLevel, Progress, Reporter};
//!
//! struct Print;
//!
//! impl Reporter for Print {
//!     fn progress(&self, p: &Progress) {
//!         println!("{:?} {:?}", p.status, p.percent);
//!     }
//!
//!     fn log(&self, _: LogLevel, message: &str) {
//!         println!("{message}");
//!     }
//! }
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let media = Media::Audio { codec: AudioCodec::Mp3, quality: 0 };
//! let opts = DownloadOptions {
//!     format: Some(media.format()),
//!     postprocessors: Some(media.postprocessors(true, false)),
//!     ..Default::default()
//! };
//!
//! YtDlp::from_path()?.download("https://youtube.com/watch?v=example", &opts, Arc::new(Print))?;
//! # Ok(())
//! # }
//! ```

pub mod dl;
#[cfg(feature = "python")]
pub mod embedded;
pub mod error;
pub mod preset;
pub mod process;
pub mod progress;

pub use error::{Error, Result};
