//! CLI argument definitions using clap.

use crate::config::Config;
use crate::progress::StatusLine;
use clap::{Args, Parser};
use color_eyre::Section;
use eyre::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tubegrab_dl::dl::Engine;
use tubegrab_dl::preset::AudioCodec;
use tubegrab_dl::process::YtDlp;

pub const DEFAULT_OUTPUT: &str = "./downloads";
pub const DEFAULT_TEMPLATE: &str = "%(title)s.%(ext)s";

pub const INSTALL_HINT: &str =
    "install yt-dlp with `pip install -U yt-dlp` (or `brew install yt-dlp` on macOS)";

#[derive(Debug, Parser)]
#[command(name = "tubegrab")]
#[command(about = "Download videos or audio with yt-dlp")]
#[command(version)]
pub struct Cli {
    /// Video or playlist URLs
    #[arg(required = true)]
    pub urls: Vec<String>,

    /// Output directory, created if missing
    #[arg(short, long, env = "TUBEGRAB_OUTPUT", default_value = DEFAULT_OUTPUT)]
    pub output: PathBuf,

    /// Filename template (yt-dlp output template)
    #[arg(short, long, default_value = DEFAULT_TEMPLATE)]
    pub template: String,

    /// Reduce yt-dlp output (show only progress, errors and the summary)
    #[arg(short, long)]
    pub quiet: bool,

    /// Show yt-dlp debug messages
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    #[command(flatten)]
    pub mode: ModeArgs,

    #[command(flatten)]
    pub audio: AudioArgs,

    /// Max video height (e.g. 1080)
    #[arg(short, long, value_name = "HEIGHT", value_parser = clap::value_parser!(u32).range(1..))]
    pub resolution: Option<u32>,

    /// Allow playlist downloads
    #[arg(long)]
    pub allow_playlist: bool,

    /// Restrict file names to ASCII and safe characters
    #[arg(long)]
    pub safe_names: bool,

    /// Continue on download errors in playlists and across URLs
    #[arg(long)]
    pub ignore_errors: bool,

    /// Embed metadata tags
    #[arg(long)]
    pub embed_meta: bool,

    /// Embed thumbnail into media file (needs ffmpeg)
    #[arg(long)]
    pub embed_thumb: bool,

    #[command(flatten)]
    pub network: NetworkArgs,

    #[command(flatten)]
    pub tools: ToolArgs,
}

#[derive(Args, Debug)]
#[group(multiple = false)]
pub struct ModeArgs {
    /// Download audio only
    #[arg(long)]
    pub audio: bool,

    /// Download video (default)
    #[arg(long)]
    pub video: bool,
}

#[derive(Args, Debug)]
#[command(next_help_heading = "Audio")]
pub struct AudioArgs {
    /// Audio format when using --audio
    #[arg(long, value_enum, default_value_t)]
    pub audio_format: AudioCodec,

    /// Audio bitrate/quality for conversion (0=best)
    #[arg(long, default_value_t = 0)]
    pub audio_quality: u32,
}

#[derive(Args, Debug)]
#[command(next_help_heading = "Network")]
pub struct NetworkArgs {
    /// Number of retries for network errors
    #[arg(long, default_value_t = 5)]
    pub retries: u32,

    /// Socket timeout in seconds
    #[arg(long, default_value_t = 30, value_name = "SECONDS")]
    pub timeout: u32,

    /// Concurrent fragment downloads for DASH/HLS
    #[arg(long, default_value_t = 4, value_parser = clap::value_parser!(u32).range(1..))]
    pub concurrent: u32,
}

#[derive(Args, Debug)]
#[command(next_help_heading = "Tools")]
pub struct ToolArgs {
    /// yt-dlp executable (default: search PATH)
    #[arg(long = "yt-dlp", env = "TUBEGRAB_YT_DLP", value_name = "PATH")]
    pub yt_dlp: Option<PathBuf>,

    /// ffmpeg binary or its directory
    #[arg(long, env = "TUBEGRAB_FFMPEG", value_name = "PATH")]
    pub ffmpeg_location: Option<PathBuf>,

    /// Run yt-dlp in-process through the embedded Python interpreter
    #[cfg(feature = "python")]
    #[arg(long, conflicts_with = "yt_dlp")]
    pub embedded: bool,
}

/// Execute CLI command - separated for testing.
pub fn run(cli: Cli) -> Result<()> {
    tracing::debug!(?cli, "parsed arguments");

    let config = Config::try_from(cli)?;
    let engine = engine(&config)?;
    let status = Arc::new(StatusLine::stdio(config.quiet, config.verbose));

    crate::dl::execute(&config, engine.as_ref(), status)
}

/// The engine selected by the tool options.
pub fn engine(config: &Config) -> Result<Box<dyn Engine>> {
    #[cfg(feature = "python")]
    if config.embedded {
        return Ok(Box::new(tubegrab_dl::embedded::Embedded));
    }

    let yt_dlp = match &config.yt_dlp {
        Some(program) => YtDlp::new(program),
        None => YtDlp::from_path()
            .wrap_err("yt-dlp is required")
            .suggestion(INSTALL_HINT)?,
    };

    tracing::debug!(program = %yt_dlp.program().display(), "using yt-dlp executable");

    Ok(Box::new(yt_dlp))
}
