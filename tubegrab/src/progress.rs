//! Single-line progress display.

use std::io::{self, Stderr, Stdout, Write};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tubegrab_dl::progress::{LogLevel, Progress, Reporter, Status};

/// Renders progress as one overwritten terminal line and forwards yt-dlp
/// messages around it.
///
/// All writes go through one lock, so hooks firing on yt-dlp's threads never
/// interleave with messages or the summary.
pub struct StatusLine<O, E> {
    inner: Mutex<Streams<O, E>>,
    quiet: bool,
    verbose: bool,
}

struct Streams<O, E> {
    out: O,
    err: E,
    /// A `\r` status line is on screen without its newline.
    open: bool,
}

impl<O: Write, E: Write> Streams<O, E> {
    fn close_line(&mut self) -> io::Result<()> {
        if self.open {
            self.open = false;
            writeln!(self.out)?;
            self.out.flush()?;
        }
        Ok(())
    }
}

impl StatusLine<Stdout, Stderr> {
    pub fn stdio(quiet: bool, verbose: bool) -> Self {
        Self::new(io::stdout(), io::stderr(), quiet, verbose)
    }
}

impl<O: Write, E: Write> StatusLine<O, E> {
    pub fn new(out: O, err: E, quiet: bool, verbose: bool) -> Self {
        Self {
            inner: Mutex::new(Streams {
                out,
                err,
                open: false,
            }),
            quiet,
            verbose,
        }
    }

    /// Print `text` on its own line(s) of standard output.
    pub fn print(&self, text: &str) {
        let mut streams = self.lock();
        let result = streams
            .close_line()
            .and_then(|()| writeln!(streams.out, "{text}"))
            .and_then(|()| streams.out.flush());
        log_write_error(result);
    }

    pub fn into_inner(self) -> (O, E) {
        let streams = self.inner.into_inner().unwrap_or_else(PoisonError::into_inner);
        (streams.out, streams.err)
    }

    fn shows(&self, level: LogLevel) -> bool {
        match level {
            LogLevel::Debug => self.verbose,
            LogLevel::Info | LogLevel::Warning => !self.quiet,
            LogLevel::Error => true,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Streams<O, E>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<O: Write + Send, E: Write + Send> Reporter for StatusLine<O, E> {
    fn progress(&self, progress: &Progress) {
        let mut streams = self.lock();

        let result = match progress.status {
            Status::Downloading => {
                streams.open = true;
                write!(streams.out, "{}", status_text(progress)).and_then(|()| streams.out.flush())
            }
            Status::Finished => streams.close_line().and_then(|()| {
                writeln!(streams.out, "Download finished, post-processing...")?;
                streams.out.flush()
            }),
            Status::Error => streams.close_line(),
        };

        log_write_error(result);
    }

    fn log(&self, level: LogLevel, message: &str) {
        if !self.shows(level) {
            return;
        }

        let mut streams = self.lock();
        let result = streams.close_line().and_then(|()| match level {
            LogLevel::Debug | LogLevel::Info => writeln!(streams.out, "{message}"),
            LogLevel::Warning | LogLevel::Error => writeln!(streams.err, "{message}"),
        });

        log_write_error(result);
    }
}

/// `\rDownloading:  42.0%  Speed: 1.20MiB/s  ETA:  00:07`
pub fn status_text(progress: &Progress) -> String {
    // yt-dlp colors the preformatted strings when it writes to a terminal
    let field = |value: &Option<String>| {
        strip_ansi_escapes::strip_str(value.as_deref().unwrap_or(""))
            .trim()
            .to_string()
    };

    format!(
        "\rDownloading: {:>6}  Speed: {:>8}  ETA: {:>6}",
        field(&progress.percent),
        field(&progress.speed),
        field(&progress.eta),
    )
}

fn log_write_error(result: io::Result<()>) {
    if let Err(e) = result {
        tracing::debug!(error = %e, "terminal write failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn downloading(percent: &str, speed: &str, eta: &str) -> Progress {
        Progress {
            status: Status::Downloading,
            percent: Some(percent.to_string()),
            speed: Some(speed.to_string()),
            eta: Some(eta.to_string()),
            filename: None,
        }
    }

    fn finished() -> Progress {
        Progress {
            status: Status::Finished,
            ..Default::default()
        }
    }

    fn output(status: StatusLine<Vec<u8>, Vec<u8>>) -> (String, String) {
        let (out, err) = status.into_inner();
        (
            String::from_utf8(out).unwrap(),
            String::from_utf8(err).unwrap(),
        )
    }

    #[test]
    fn formats_trimmed_fields() {
        let text = status_text(&downloading("  42.0%", "1.20MiB/s ", " 00:07"));

        assert_eq!(text, "\rDownloading:  42.0%  Speed: 1.20MiB/s  ETA:  00:07");
    }

    #[test]
    fn missing_fields_render_blank() {
        let text = status_text(&Progress::default());

        assert_eq!(text, "\rDownloading:         Speed:           ETA:       ");
    }

    #[test]
    fn strips_terminal_colors() {
        let text = status_text(&downloading("\x1b[0;94m 50.0%\x1b[0m", "1KiB/s", "00:01"));

        assert_eq!(text, "\rDownloading:  50.0%  Speed:   1KiB/s  ETA:  00:01");
    }

    #[test]
    fn strips_title_escapes() {
        let text = status_text(&downloading("\x1b]0;title\x07 50.0%", "1KiB/s", "00:01"));

        assert_eq!(text, "\rDownloading:  50.0%  Speed:   1KiB/s  ETA:  00:01");
    }

    #[test]
    fn progress_then_finished() {
        let status = StatusLine::new(Vec::new(), Vec::new(), false, false);

        status.progress(&downloading("10.0%", "1MiB/s", "00:09"));
        status.progress(&downloading("100.0%", "1MiB/s", "00:00"));
        status.progress(&finished());

        let (out, err) = output(status);
        assert_eq!(
            out,
            concat!(
                "\rDownloading:  10.0%  Speed:   1MiB/s  ETA:  00:09",
                "\rDownloading: 100.0%  Speed:   1MiB/s  ETA:  00:00",
                "\n",
                "Download finished, post-processing...\n",
            )
        );
        assert!(err.is_empty());
    }

    #[test]
    fn finished_without_progress_line() {
        let status = StatusLine::new(Vec::new(), Vec::new(), false, false);

        status.progress(&finished());

        let (out, _) = output(status);
        assert_eq!(out, "Download finished, post-processing...\n");
    }

    #[test]
    fn message_terminates_open_line() {
        let status = StatusLine::new(Vec::new(), Vec::new(), false, false);

        status.progress(&downloading("5.0%", "", ""));
        status.log(LogLevel::Info, "[Merger] Merging formats");
        status.log(LogLevel::Warning, "WARNING: retrying");

        let (out, err) = output(status);
        assert!(out.ends_with("\n[Merger] Merging formats\n"), "{out:?}");
        assert_eq!(err, "WARNING: retrying\n");
    }

    #[test]
    fn quiet_keeps_errors_and_progress() {
        let status = StatusLine::new(Vec::new(), Vec::new(), true, false);

        status.log(LogLevel::Info, "[youtube] Extracting URL");
        status.log(LogLevel::Warning, "WARNING: dropped");
        status.log(LogLevel::Error, "ERROR: kept");
        status.progress(&finished());

        let (out, err) = output(status);
        assert_eq!(out, "Download finished, post-processing...\n");
        assert_eq!(err, "ERROR: kept\n");
    }

    #[test]
    fn debug_only_when_verbose() {
        let quiet = StatusLine::new(Vec::new(), Vec::new(), false, false);
        quiet.log(LogLevel::Debug, "[debug] yt-dlp version");
        assert!(output(quiet).0.is_empty());

        let verbose = StatusLine::new(Vec::new(), Vec::new(), false, true);
        verbose.log(LogLevel::Debug, "[debug] yt-dlp version");
        assert_eq!(output(verbose).0, "[debug] yt-dlp version\n");
    }

    #[test]
    fn print_closes_status_line() {
        let status = StatusLine::new(Vec::new(), Vec::new(), true, false);

        status.progress(&downloading("1.0%", "", ""));
        status.print("Nothing was downloaded.");

        let (out, _) = output(status);
        assert!(out.ends_with("\nNothing was downloaded.\n"), "{out:?}");
    }
}
