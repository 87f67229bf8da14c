//! Configuration resolved from CLI arguments.
//!
//! [`Config`] is built from [`Cli`] via `TryFrom`; the flag-to-option mapping
//! lives in [`Config::download_options`].

use crate::cli::Cli;
use eyre::{OptionExt, Result, ensure};
use std::path::PathBuf;
use tubegrab_dl::dl::{DownloadOptions, OutputTemplates};
use tubegrab_dl::preset::Media;

/// Resolved options for one invocation.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub urls: Vec<String>,
    /// Output directory with `~` expanded
    pub output_dir: PathBuf,
    pub template: String,
    pub quiet: bool,
    pub verbose: bool,
    pub media: Media,
    pub allow_playlist: bool,
    pub safe_names: bool,
    pub ignore_errors: bool,
    pub embed_meta: bool,
    pub embed_thumb: bool,
    pub retries: u32,
    pub timeout: u32,
    pub concurrent: u32,
    pub yt_dlp: Option<PathBuf>,
    pub ffmpeg_location: Option<PathBuf>,
    pub embedded: bool,
}

impl TryFrom<Cli> for Config {
    type Error = eyre::Error;

    fn try_from(cli: Cli) -> Result<Self> {
        ensure!(
            !cli.template.trim().is_empty(),
            "filename template must not be empty"
        );

        let media = if cli.mode.audio {
            Media::Audio {
                codec: cli.audio.audio_format,
                quality: cli.audio.audio_quality,
            }
        } else {
            Media::Video {
                max_height: cli.resolution,
            }
        };

        Ok(Self {
            urls: cli.urls,
            output_dir: expand_home(cli.output)?,
            template: cli.template,
            quiet: cli.quiet,
            verbose: cli.verbose,
            media,
            allow_playlist: cli.allow_playlist,
            safe_names: cli.safe_names,
            ignore_errors: cli.ignore_errors,
            embed_meta: cli.embed_meta,
            embed_thumb: cli.embed_thumb,
            retries: cli.network.retries,
            timeout: cli.network.timeout,
            concurrent: cli.network.concurrent,
            yt_dlp: cli.tools.yt_dlp.map(expand_home).transpose()?,
            ffmpeg_location: cli.tools.ffmpeg_location.map(expand_home).transpose()?,
            #[cfg(feature = "python")]
            embedded: cli.tools.embedded,
            #[cfg(not(feature = "python"))]
            embedded: false,
        })
    }
}

impl Config {
    /// Translate the flags into yt-dlp parameters.
    pub fn download_options(&self) -> DownloadOptions {
        let outtmpl = self.output_dir.join(&self.template);
        let postprocessors = self
            .media
            .postprocessors(self.embed_meta, self.embed_thumb);

        DownloadOptions {
            format: Some(self.media.format()),
            outtmpl: Some(OutputTemplates::simple(
                outtmpl.to_string_lossy().into_owned(),
            )),
            noplaylist: Some(!self.allow_playlist),
            nocheckcertificate: Some(true),
            restrictfilenames: Some(self.safe_names),
            ignoreerrors: Some(self.ignore_errors),
            concurrent_fragment_downloads: Some(self.concurrent),
            quiet: Some(self.quiet),
            no_warnings: Some(self.quiet),
            verbose: self.verbose.then_some(true),
            merge_output_format: self.media.merge_output_format(),
            postprocessors: (!postprocessors.is_empty()).then_some(postprocessors),
            // EmbedThumbnail needs the thumbnail on disk
            writethumbnail: self.embed_thumb.then_some(true),
            retries: Some(self.retries),
            file_access_retries: Some(self.retries),
            fragment_retries: Some(self.retries),
            socket_timeout: Some(self.timeout),
            ffmpeg_location: self
                .ffmpeg_location
                .as_ref()
                .map(|path| path.to_string_lossy().into_owned()),
        }
    }
}

/// Expand a leading `~` component to the home directory.
fn expand_home(path: PathBuf) -> Result<PathBuf> {
    let Ok(rest) = path.strip_prefix("~") else {
        return Ok(path);
    };

    let home = dirs::home_dir().ok_or_eyre("cannot expand `~`: home directory unknown")?;

    if rest.as_os_str().is_empty() {
        Ok(home)
    } else {
        Ok(home.join(rest))
    }
}
