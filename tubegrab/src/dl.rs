//! Per-URL download driver and the post-download summary.

use crate::cli::INSTALL_HINT;
use crate::config::Config;
use crate::progress::StatusLine;
use color_eyre::Section;
use eyre::{Context, Report, Result, bail};
use std::io::Write;
use std::sync::Arc;
use tubegrab_dl::dl::{DownloadInfo, DownloadOptions, Engine, Outcome};
use tubegrab_dl::progress::{LogLevel, Reporter};

/// Download every URL in order, printing a summary after each.
///
/// With `ignore_errors`, a failed URL is reported and skipped, and the run
/// fails at the end instead.
pub fn execute<O, E>(
    config: &Config,
    engine: &dyn Engine,
    status: Arc<StatusLine<O, E>>,
) -> Result<()>
where
    O: Write + Send + 'static,
    E: Write + Send + 'static,
{
    std::fs::create_dir_all(&config.output_dir).wrap_err_with(|| {
        format!(
            "failed to create output directory {:?}",
            config.output_dir.display()
        )
    })?;

    let opts = config.download_options();
    check_ffmpeg(config, &opts, &*status, || which::which("ffmpeg").is_ok());

    let mut failed = Vec::new();

    for url in &config.urls {
        tracing::info!(url, "downloading");

        match engine.download(url, &opts, status.clone()) {
            Ok(outcome) => {
                tracing::debug!(url, ?outcome, "download complete");
                status.print(&summarize(&outcome));
            }
            Err(e @ tubegrab_dl::Error::Download(_)) if config.ignore_errors => {
                tracing::warn!(url, error = %e, "skipping failed url");
                status.log(LogLevel::Error, &format!("ERROR: {url}: {e}"));
                failed.push(url.as_str());
            }
            Err(e) => return Err(report(e).wrap_err(format!("failed to download {url}"))),
        }
    }

    if !failed.is_empty() {
        bail!(
            "{} of {} URLs failed: {}",
            failed.len(),
            config.urls.len(),
            failed.join(", ")
        );
    }

    Ok(())
}

/// Text printed after a URL finishes.
pub fn summarize(outcome: &Outcome) -> String {
    match outcome {
        Outcome::Nothing => "Nothing was downloaded.".to_string(),
        Outcome::Single(info) => entry(info),
        Outcome::Playlist { title, entries } => {
            let mut lines = vec![format!(
                "Playlist: {}",
                title.as_deref().unwrap_or("(unknown)")
            )];
            lines.extend(entries.iter().map(entry));
            lines.join("\n")
        }
    }
}

fn entry(info: &DownloadInfo) -> String {
    let title = info.title.as_deref().unwrap_or("Unknown Title");
    let path = info
        .filepath
        .as_deref()
        .map_or_else(|| "(unknown)".to_string(), |p| p.display().to_string());

    format!("Saved: {title}\n -> {path}")
}

/// Warn up front when the options need ffmpeg and none can be found.
fn check_ffmpeg(
    config: &Config,
    opts: &DownloadOptions,
    status: &dyn Reporter,
    on_path: impl FnOnce() -> bool,
) {
    if !opts.needs_ffmpeg() || config.ffmpeg_location.is_some() || on_path() {
        return;
    }

    tracing::warn!("ffmpeg not found");
    status.log(
        LogLevel::Warning,
        "WARNING: ffmpeg not found in PATH; merging and audio conversion will fail",
    );
}

fn report(err: tubegrab_dl::Error) -> Report {
    match err {
        e @ tubegrab_dl::Error::NotInstalled(_) => Report::new(e).suggestion(INSTALL_HINT),
        e => Report::new(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::sync::Mutex;

    /// Engine returning canned results per URL.
    #[derive(Default)]
    struct Canned {
        results: HashMap<&'static str, fn() -> tubegrab_dl::Result<Outcome>>,
        calls: Mutex<Vec<(String, DownloadOptions)>>,
    }

    impl Engine for Canned {
        fn download(
            &self,
            url: &str,
            opts: &DownloadOptions,
            _reporter: Arc<dyn Reporter>,
        ) -> tubegrab_dl::Result<Outcome> {
            self.calls
                .lock()
                .unwrap()
                .push((url.to_string(), opts.clone()));
            self.results.get(url).map_or(Ok(Outcome::Nothing), |result| result())
        }
    }

    fn info(title: Option<&str>, path: &str) -> DownloadInfo {
        DownloadInfo {
            id: None,
            title: title.map(String::from),
            filepath: Some(PathBuf::from(path)),
        }
    }

    fn run(args: &[&str], engine: &Canned) -> (Result<()>, String, String) {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out");
        let cli = Cli::parse_from(
            ["tubegrab", "-o", output.to_str().unwrap(), "--ffmpeg-location", "ffmpeg"]
                .iter()
                .chain(args),
        );
        let config = Config::try_from(cli).unwrap();
        let status = Arc::new(StatusLine::new(Vec::new(), Vec::new(), false, false));

        let result = execute(&config, engine, status.clone());
        assert!(output.is_dir());

        let status = Arc::try_unwrap(status).ok().unwrap();
        let (out, err) = status.into_inner();
        (
            result,
            String::from_utf8(out).unwrap(),
            String::from_utf8(err).unwrap(),
        )
    }

    #[test]
    fn summary_nothing() {
        assert_eq!(summarize(&Outcome::Nothing), "Nothing was downloaded.");
    }

    #[test]
    fn summary_single() {
        let outcome = Outcome::Single(info(Some("Me at the zoo"), "/d/Me at the zoo.mp4"));

        assert_eq!(
            summarize(&outcome),
            "Saved: Me at the zoo\n -> /d/Me at the zoo.mp4"
        );
    }

    #[test]
    fn summary_playlist_with_fallbacks() {
        let outcome = Outcome::Playlist {
            title: None,
            entries: vec![info(Some("One"), "/d/One.mp3"), info(None, "/d/x.mp3")],
        };

        assert_eq!(
            summarize(&outcome),
            "Playlist: (unknown)\nSaved: One\n -> /d/One.mp3\nSaved: Unknown Title\n -> /d/x.mp3"
        );
    }

    #[test]
    fn summary_empty_playlist() {
        let outcome = Outcome::Playlist {
            title: Some("Mix".to_string()),
            entries: Vec::new(),
        };

        assert_eq!(summarize(&outcome), "Playlist: Mix");
    }

    #[test]
    fn downloads_each_url_in_order() {
        let mut engine = Canned::default();
        engine.results.insert("https://a.example", || {
            Ok(Outcome::Single(info(Some("A"), "/d/A.mp4")))
        });

        let (result, out, err) = run(&["https://a.example", "https://b.example"], &engine);

        assert!(result.is_ok());
        assert_eq!(
            out,
            "Saved: A\n -> /d/A.mp4\nNothing was downloaded.\n"
        );
        assert!(err.is_empty(), "{err:?}");

        let calls = engine.calls.lock().unwrap();
        let urls: Vec<_> = calls.iter().map(|(url, _)| url.as_str()).collect();
        assert_eq!(urls, ["https://a.example", "https://b.example"]);
        assert_eq!(calls[0].1, calls[1].1);
    }

    #[test]
    fn failure_stops_the_run() {
        let mut engine = Canned::default();
        engine.results.insert("https://a.example", || {
            Err(tubegrab_dl::Error::Download("Video unavailable".to_string()))
        });

        let (result, out, _) = run(&["https://a.example", "https://b.example"], &engine);

        let err = result.unwrap_err();
        assert!(format!("{err:#}").contains("Video unavailable"), "{err:#}");
        assert!(out.is_empty());
        assert_eq!(engine.calls.lock().unwrap().len(), 1);
    }

    #[test]
    fn ignore_errors_continues_then_fails() {
        let mut engine = Canned::default();
        engine.results.insert("https://a.example", || {
            Err(tubegrab_dl::Error::Download("Video unavailable".to_string()))
        });

        let (result, out, err) = run(
            &["--ignore-errors", "https://a.example", "https://b.example"],
            &engine,
        );

        assert!(result.is_err());
        assert_eq!(out, "Nothing was downloaded.\n");
        assert!(err.contains("https://a.example"), "{err:?}");
        assert_eq!(engine.calls.lock().unwrap().len(), 2);
    }

    #[test]
    fn ignore_errors_still_aborts_on_setup_errors() {
        let mut engine = Canned::default();
        engine.results.insert("https://a.example", || {
            Err(tubegrab_dl::Error::NotInstalled("yt-dlp".to_string()))
        });

        let (result, _, _) = run(
            &["--ignore-errors", "https://a.example", "https://b.example"],
            &engine,
        );

        assert!(result.is_err());
        assert_eq!(engine.calls.lock().unwrap().len(), 1);
    }

    /// Run the ffmpeg check with no ffmpeg on PATH; returns the err stream.
    fn ffmpeg_warning(args: &[&str]) -> String {
        let cli = Cli::parse_from(["tubegrab", "u"].iter().chain(args));
        let config = Config::try_from(cli).unwrap();
        let status = StatusLine::new(Vec::new(), Vec::new(), config.quiet, false);

        check_ffmpeg(&config, &config.download_options(), &status, || false);

        let (_, err) = status.into_inner();
        String::from_utf8(err).unwrap()
    }

    #[test]
    fn warns_when_ffmpeg_missing() {
        let err = ffmpeg_warning(&["--audio"]);

        assert!(err.contains("WARNING: ffmpeg not found"), "{err:?}");
    }

    #[test]
    fn quiet_hides_ffmpeg_warning() {
        assert_eq!(ffmpeg_warning(&["--audio", "-q"]), "");
    }

    #[test]
    fn ffmpeg_location_skips_lookup() {
        assert_eq!(ffmpeg_warning(&["--audio", "--ffmpeg-location", "/opt/ffmpeg"]), "");
    }

    #[test]
    fn ffmpeg_lookup_only_when_needed() {
        let cli = Cli::parse_from(["tubegrab", "u"]);
        let config = Config::try_from(cli).unwrap();
        let mut opts = config.download_options();
        opts.merge_output_format = None;
        opts.postprocessors = None;
        let status = StatusLine::new(Vec::new(), Vec::new(), false, false);

        check_ffmpeg(&config, &opts, &status, || panic!("looked up ffmpeg"));

        let (_, err) = status.into_inner();
        assert!(err.is_empty());
    }
}
