//! Download videos or audio with yt-dlp behind a small set of flags.
//!
//! - [`cli`] - clap arguments and engine selection
//! - [`config`] - resolved configuration and the flag-to-option mapping
//! - [`dl`] - per-URL driver and summary
//! - [`progress`] - single-line progress display

pub mod cli;
pub mod config;
pub mod dl;
pub mod progress;
