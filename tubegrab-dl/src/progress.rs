//! Progress records and the reporter seam.
//!
//! yt-dlp calls its progress hooks from whatever thread performs the I/O, so
//! every [`Reporter`] must be `Send + Sync`.

use serde::Deserialize;

/// Download state carried by a progress hook record.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Downloading,
    Finished,
    Error,
}

/// Subset of the yt-dlp progress hook record.
///
/// `percent`, `speed` and `eta` hold the strings yt-dlp already formatted for
/// display (`_percent_str`, `_speed_str`, `_eta_str`).
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct Progress {
    pub status: Status,
    #[serde(rename = "_percent_str")]
    pub percent: Option<String>,
    #[serde(rename = "_speed_str")]
    pub speed: Option<String>,
    #[serde(rename = "_eta_str")]
    pub eta: Option<String>,
    pub filename: Option<String>,
}

/// Severity of a message forwarded from yt-dlp.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    /// Classify a line by the prefix yt-dlp puts on it.
    pub fn of_line(line: &str) -> Self {
        if line.starts_with("ERROR:") {
            Self::Error
        } else if line.starts_with("WARNING:") {
            Self::Warning
        } else if line.starts_with("[debug]") {
            Self::Debug
        } else {
            Self::Info
        }
    }
}

/// Receives progress records and messages, possibly from several threads.
pub trait Reporter: Send + Sync {
    fn progress(&self, progress: &Progress);

    fn log(&self, level: LogLevel, message: &str);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_hook_record() {
        let line = r#"{"status": "downloading", "_percent_str": " 42.0%", "_speed_str": "1.20MiB/s", "_eta_str": "00:07", "filename": "a.webm"}"#;
        let progress: Progress = serde_json::from_str(line).unwrap();

        assert_eq!(progress.status, Status::Downloading);
        assert_eq!(progress.percent.as_deref(), Some(" 42.0%"));
        assert_eq!(progress.speed.as_deref(), Some("1.20MiB/s"));
        assert_eq!(progress.eta.as_deref(), Some("00:07"));
        assert_eq!(progress.filename.as_deref(), Some("a.webm"));
    }

    #[test]
    fn missing_fields_are_none() {
        let progress: Progress = serde_json::from_str(r#"{"status": "finished"}"#).unwrap();

        assert!(matches!(
            progress,
            Progress {
                status: Status::Finished,
                percent: None,
                speed: None,
                eta: None,
                filename: None,
            }
        ));
    }

    #[test]
    fn classifies_line_prefixes() {
        assert_eq!(LogLevel::of_line("ERROR: [youtube] x: Video unavailable"), LogLevel::Error);
        assert_eq!(LogLevel::of_line("WARNING: unable to extract"), LogLevel::Warning);
        assert_eq!(LogLevel::of_line("[debug] Command-line config"), LogLevel::Debug);
        assert_eq!(LogLevel::of_line("[youtube] Extracting URL"), LogLevel::Info);
    }
}
