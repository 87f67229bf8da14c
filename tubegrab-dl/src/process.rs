//! Engine that runs the yt-dlp executable as a child process.
//!
//! [`DownloadOptions`] are translated into the equivalent command-line flags.
//! Progress and results are read back from marker lines that yt-dlp prints
//! through `--progress-template` and `--print`, each carrying a JSON object.

use crate::dl::{DownloadInfo, DownloadOptions, Engine, Outcome, PostProcessor};
use crate::error::{Error, Result};
use crate::progress::{LogLevel, Progress, Reporter};
use std::ffi::OsString;
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::thread;

/// Executable name searched on `PATH`.
pub const PROGRAM: &str = "yt-dlp";

const PROGRESS_MARKER: &str = "[tubegrab:progress]";
const SAVED_MARKER: &str = "[tubegrab:saved]";
const PLAYLIST_MARKER: &str = "[tubegrab:playlist]";

/// Exit status yt-dlp uses for command-line usage errors.
const USAGE_ERROR: i32 = 2;

/// A yt-dlp executable.
#[derive(Clone, Debug)]
pub struct YtDlp {
    program: PathBuf,
    prefix_args: Vec<OsString>,
}

impl YtDlp {
    /// Use an explicit executable.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            prefix_args: Vec::new(),
        }
    }

    /// Find `yt-dlp` on `PATH`.
    pub fn from_path() -> Result<Self> {
        which::which(PROGRAM)
            .map(Self::new)
            .map_err(|e| Error::NotInstalled(format!("{PROGRAM} not found in PATH ({e})")))
    }

    /// Arguments placed before the generated ones, for launchers such as
    /// `python3 -m yt_dlp`.
    pub fn with_prefix_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.prefix_args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn run(&self, url: &str, opts: &DownloadOptions, reporter: &dyn Reporter) -> Result<Outcome> {
        let args = command_args(url, opts)?;

        tracing::debug!(program = %self.program.display(), ?args, "spawning yt-dlp");

        let mut child = Command::new(&self.program)
            .args(&self.prefix_args)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => Error::NotInstalled(format!(
                    "failed to run {}: {e}",
                    self.program.display()
                )),
                _ => Error::Io(e),
            })?;

        let stdout = child.stdout.take().ok_or_else(|| missing_pipe("stdout"))?;
        let stderr = child.stderr.take().ok_or_else(|| missing_pipe("stderr"))?;

        let (out, err) = thread::scope(|s| {
            let out = s.spawn(move || drain(stdout, reporter));
            let err = s.spawn(move || drain(stderr, reporter));
            (join(out), join(err))
        });

        let collected = match out.and_then(|out| err.map(|err| out.merge(err))) {
            Ok(collected) => collected,
            Err(e) => {
                child.kill().ok();
                child.wait().ok();
                return Err(e);
            }
        };

        let status = child.wait()?;
        tracing::debug!(%status, saved = collected.saved.len(), "yt-dlp exited");

        finish(status, opts, collected, reporter)
    }
}

impl Engine for YtDlp {
    fn download(
        &self,
        url: &str,
        opts: &DownloadOptions,
        reporter: Arc<dyn Reporter>,
    ) -> Result<Outcome> {
        self.run(url, opts, reporter.as_ref())
    }
}

/// Full argument list for one URL: option flags, output markers, then the URL.
pub fn command_args(url: &str, opts: &DownloadOptions) -> Result<Vec<String>> {
    let mut args = option_args(opts)?;

    let progress = format!(
        "download:{PROGRESS_MARKER} %(progress.{{status,_percent_str,_speed_str,_eta_str,filename}})j"
    );
    let saved = format!("after_move:{SAVED_MARKER} %(.{{id,title,filepath}})j");
    let playlist = format!("playlist:{PLAYLIST_MARKER} %(.{{id,title}})j");

    args.extend(
        [
            "--newline",
            "--progress",
            "--progress-template",
            progress.as_str(),
            "--print",
            saved.as_str(),
            "--print",
            playlist.as_str(),
            "--no-simulate",
        ]
        .map(String::from),
    );

    // `--print` implies `--quiet`
    if opts.quiet != Some(true) {
        args.push("--no-quiet".to_string());
    }

    args.push("--".to_string());
    args.push(url.to_string());

    Ok(args)
}

/// Command-line equivalent of each `YoutubeDL` parameter.
fn option_args(opts: &DownloadOptions) -> Result<Vec<String>> {
    let mut args = Vec::new();
    let mut flag = |name: &str| args.push(name.to_string());

    match opts.noplaylist {
        Some(true) => flag("--no-playlist"),
        Some(false) => flag("--yes-playlist"),
        None => {}
    }
    if opts.nocheckcertificate == Some(true) {
        flag("--no-check-certificates");
    }
    if opts.restrictfilenames == Some(true) {
        flag("--restrict-filenames");
    }
    match opts.ignoreerrors {
        Some(true) => flag("--ignore-errors"),
        Some(false) => flag("--abort-on-error"),
        None => {}
    }
    if opts.quiet == Some(true) {
        flag("--quiet");
    }
    if opts.no_warnings == Some(true) {
        flag("--no-warnings");
    }
    if opts.verbose == Some(true) {
        flag("--verbose");
    }
    // `--embed-thumbnail` fetches the thumbnail itself and deletes it afterwards
    if opts.writethumbnail == Some(true) && !opts.has_postprocessor(PostProcessor::EMBED_THUMBNAIL)
    {
        flag("--write-thumbnail");
    }

    let mut valued = |name: &str, value: String| {
        args.push(name.to_string());
        args.push(value);
    };

    if let Some(format) = &opts.format {
        valued("--format", format.clone());
    }
    for (kind, template) in opts.outtmpl.iter().flat_map(|t| &t.0) {
        match kind.as_str() {
            "default" => valued("--output", template.clone()),
            _ => valued("--output", format!("{kind}:{template}")),
        }
    }
    if let Some(n) = opts.concurrent_fragment_downloads {
        valued("--concurrent-fragments", n.to_string());
    }
    if let Some(container) = &opts.merge_output_format {
        valued("--merge-output-format", container.clone());
    }
    if let Some(n) = opts.retries {
        valued("--retries", n.to_string());
    }
    if let Some(n) = opts.file_access_retries {
        valued("--file-access-retries", n.to_string());
    }
    if let Some(n) = opts.fragment_retries {
        valued("--fragment-retries", n.to_string());
    }
    if let Some(secs) = opts.socket_timeout {
        valued("--socket-timeout", secs.to_string());
    }
    if let Some(location) = &opts.ffmpeg_location {
        valued("--ffmpeg-location", location.clone());
    }

    for pp in opts.postprocessors.iter().flatten() {
        match pp.key.as_str() {
            PostProcessor::EXTRACT_AUDIO => {
                args.push("--extract-audio".to_string());
                if let Some(codec) = &pp.preferredcodec {
                    args.extend(["--audio-format".to_string(), codec.clone()]);
                }
                if let Some(quality) = &pp.preferredquality {
                    args.extend(["--audio-quality".to_string(), quality.clone()]);
                }
            }
            PostProcessor::METADATA => args.push("--embed-metadata".to_string()),
            PostProcessor::EMBED_THUMBNAIL => args.push("--embed-thumbnail".to_string()),
            other => return Err(Error::UnsupportedPostProcessor(other.to_string())),
        }
    }

    Ok(args)
}

/// One line of yt-dlp output.
#[derive(Debug, PartialEq)]
enum Line<'a> {
    Progress(Progress),
    Saved(DownloadInfo),
    Playlist(DownloadInfo),
    Message(LogLevel, &'a str),
}

fn parse_line(line: &str) -> Result<Line<'_>> {
    if let Some(json) = line.strip_prefix(PROGRESS_MARKER) {
        return Ok(Line::Progress(serde_json::from_str(json)?));
    }
    if let Some(json) = line.strip_prefix(SAVED_MARKER) {
        return Ok(Line::Saved(serde_json::from_str(json)?));
    }
    if let Some(json) = line.strip_prefix(PLAYLIST_MARKER) {
        return Ok(Line::Playlist(serde_json::from_str(json)?));
    }
    Ok(Line::Message(LogLevel::of_line(line), line))
}

/// What one output stream contributed.
#[derive(Debug, Default)]
struct Collected {
    saved: Vec<DownloadInfo>,
    playlist: Option<DownloadInfo>,
    last_error: Option<String>,
}

impl Collected {
    fn merge(mut self, other: Self) -> Self {
        self.saved.extend(other.saved);
        self.playlist = self.playlist.or(other.playlist);
        self.last_error = other.last_error.or(self.last_error);
        self
    }

    fn into_outcome(mut self) -> Outcome {
        match (self.playlist, self.saved.len()) {
            (Some(playlist), _) => Outcome::Playlist {
                title: playlist.title,
                entries: self.saved,
            },
            (None, 0) => Outcome::Nothing,
            (None, 1) => Outcome::Single(self.saved.remove(0)),
            (None, _) => Outcome::Playlist {
                title: None,
                entries: self.saved,
            },
        }
    }
}

/// Read `stream` to the end, forwarding progress and messages as they arrive.
fn drain(stream: impl Read, reporter: &dyn Reporter) -> Result<Collected> {
    let mut collected = Collected::default();

    for raw in BufReader::new(stream).split(b'\n') {
        let raw = raw?;
        let text = String::from_utf8_lossy(&raw);
        let line = text.trim_end_matches('\r');

        if line.trim().is_empty() {
            continue;
        }

        match parse_line(line) {
            Ok(Line::Progress(progress)) => reporter.progress(&progress),
            Ok(Line::Saved(info)) => collected.saved.push(info),
            Ok(Line::Playlist(info)) => collected.playlist = Some(info),
            Ok(Line::Message(level, message)) => {
                if level == LogLevel::Error {
                    collected.last_error = Some(message.to_string());
                }
                reporter.log(level, message);
            }
            Err(e) => {
                tracing::warn!(error = %e, line, "unreadable yt-dlp marker line");
                reporter.log(LogLevel::Info, line);
            }
        }
    }

    Ok(collected)
}

/// Map the exit status onto the library semantics of `ignoreerrors`.
fn finish(
    status: ExitStatus,
    opts: &DownloadOptions,
    collected: Collected,
    reporter: &dyn Reporter,
) -> Result<Outcome> {
    if status.success() {
        return Ok(collected.into_outcome());
    }

    let message = collected
        .last_error
        .as_deref()
        .map(|line| line.trim_start_matches("ERROR:").trim().to_string())
        .unwrap_or_else(|| format!("{PROGRAM} exited with {status}"));

    if status.code() == Some(USAGE_ERROR) {
        return Err(Error::InvalidOptions(message));
    }

    if opts.ignoreerrors == Some(true) {
        reporter.log(
            LogLevel::Warning,
            &format!("WARNING: some items failed and were skipped ({status})"),
        );
        return Ok(collected.into_outcome());
    }

    Err(Error::Download(message))
}

fn missing_pipe(name: &str) -> Error {
    Error::Io(io::Error::other(format!("yt-dlp {name} was not captured")))
}

fn join<T>(handle: thread::ScopedJoinHandle<'_, T>) -> T {
    handle
        .join()
        .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
}
