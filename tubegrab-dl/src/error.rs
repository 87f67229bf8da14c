//! Error types for tubegrab-dl.

use thiserror::Error;

/// Failures while preparing or running a yt-dlp download.
#[derive(Debug, Error)]
pub enum Error {
    /// yt-dlp could not be located or imported
    #[error("yt-dlp is not installed: {0}")]
    NotInstalled(String),

    /// yt-dlp ran but reported a download failure
    #[error("download failed: {0}")]
    Download(String),

    /// yt-dlp refused the generated options (usage error)
    #[error("yt-dlp rejected the options: {0}")]
    InvalidOptions(String),

    /// Post-processor key with no command-line equivalent
    #[error("unsupported post-processor: {0}")]
    UnsupportedPostProcessor(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Structured yt-dlp output could not be decoded
    #[error("malformed yt-dlp output: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "python")]
    #[error(transparent)]
    Python(#[from] pyo3::PyErr),
}

pub type Result<T> = std::result::Result<T, Error>;
