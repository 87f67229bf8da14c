//! In-process engine driving the `yt_dlp` Python package through pyo3.
//!
//! Requires yt-dlp to be importable by the embedded interpreter
//! (`pip install yt-dlp`).

use crate::dl::{DownloadInfo, DownloadOptions, Engine, Outcome, OutputTemplates, PostProcessor};
use crate::error::{Error, Result};
use crate::progress::{LogLevel, Progress, Reporter, Status};
use pyo3::exceptions::PyModuleNotFoundError;
use pyo3::prelude::*;
use pyo3::types::{PyDict, PyList};
use std::path::PathBuf;
use std::sync::Arc;

/// The `yt_dlp.YoutubeDL` class, imported in the embedded interpreter.
#[derive(Clone, Copy, Debug, Default)]
pub struct Embedded;

impl Engine for Embedded {
    fn download(
        &self,
        url: &str,
        opts: &DownloadOptions,
        reporter: Arc<dyn Reporter>,
    ) -> Result<Outcome> {
        Python::attach(|py| {
            extract_info(py, url, opts, reporter).map_err(|e| classify(py, e))
        })
    }
}

fn extract_info(
    py: Python<'_>,
    url: &str,
    opts: &DownloadOptions,
    reporter: Arc<dyn Reporter>,
) -> PyResult<Outcome> {
    let yt_dlp = py.import("yt_dlp")?;

    let params = opts.into_pyobject(py)?;
    params.set_item("noprogress", true)?;
    params.set_item(
        "progress_hooks",
        PyList::new(py, [Bound::new(py, HookBridge { reporter: reporter.clone() })?])?,
    )?;
    params.set_item("logger", Bound::new(py, LoggerBridge { reporter })?)?;

    tracing::debug!(url, "calling YoutubeDL.extract_info");

    let ydl = yt_dlp.getattr("YoutubeDL")?.call1((params,))?;

    let kwargs = PyDict::new(py);
    kwargs.set_item("download", true)?;

    let info = ydl.call_method("extract_info", (url,), Some(&kwargs));
    let closed = ydl.call_method0("close");
    let info = info?;
    closed?;

    outcome(&ydl, &info)
}

/// Turn the returned info dict into an [`Outcome`].
fn outcome(ydl: &Bound<'_, PyAny>, info: &Bound<'_, PyAny>) -> PyResult<Outcome> {
    if info.is_none() {
        return Ok(Outcome::Nothing);
    }

    if get_string(info, "_type")?.as_deref() == Some("playlist") {
        let mut entries = Vec::new();
        collect_entries(ydl, info, &mut entries)?;
        return Ok(Outcome::Playlist {
            title: get_string(info, "title")?,
            entries,
        });
    }

    Ok(Outcome::Single(entry_info(ydl, info)?))
}

/// Entries of a playlist, flattening nested playlists. `None` entries are
/// items that failed under `ignoreerrors`.
fn collect_entries(
    ydl: &Bound<'_, PyAny>,
    playlist: &Bound<'_, PyAny>,
    entries: &mut Vec<DownloadInfo>,
) -> PyResult<()> {
    let Some(items) = get(playlist, "entries")? else {
        return Ok(());
    };

    for entry in items.try_iter()? {
        let entry = entry?;
        if entry.is_none() {
            continue;
        }
        if get_string(&entry, "_type")?.as_deref() == Some("playlist") {
            collect_entries(ydl, &entry, entries)?;
        } else {
            entries.push(entry_info(ydl, &entry)?);
        }
    }

    Ok(())
}

/// Final path: the last requested download, then `filepath`, then the template.
fn entry_info(ydl: &Bound<'_, PyAny>, entry: &Bound<'_, PyAny>) -> PyResult<DownloadInfo> {
    let mut filepath = None;

    if let Some(requested) = get(entry, "requested_downloads")? {
        for download in requested.try_iter()? {
            filepath = get_string(&download?, "filepath")?.or(filepath);
        }
    }

    let filepath = match filepath.or(get_string(entry, "filepath")?) {
        Some(path) => path,
        None => ydl
            .call_method1("prepare_filename", (entry,))?
            .extract()?,
    };

    Ok(DownloadInfo {
        id: get_string(entry, "id")?,
        title: get_string(entry, "title")?,
        filepath: Some(PathBuf::from(filepath)),
    })
}

/// `dict.get(key)`, with Python `None` mapped to `None`.
fn get<'py>(dict: &Bound<'py, PyAny>, key: &str) -> PyResult<Option<Bound<'py, PyAny>>> {
    let value = dict.call_method1("get", (key,))?;
    Ok((!value.is_none()).then_some(value))
}

fn get_string(dict: &Bound<'_, PyAny>, key: &str) -> PyResult<Option<String>> {
    get(dict, key)?.map(|value| value.extract()).transpose()
}

fn classify(py: Python<'_>, err: PyErr) -> Error {
    if err.is_instance_of::<PyModuleNotFoundError>(py) {
        return Error::NotInstalled(err.value(py).to_string());
    }

    let download_error = py
        .import("yt_dlp.utils")
        .and_then(|utils| utils.getattr("DownloadError"));
    match download_error {
        Ok(class) if err.is_instance(py, &class) => {
            let message = err.value(py).to_string();
            Error::Download(message.trim_start_matches("ERROR:").trim().to_string())
        }
        _ => Error::Python(err),
    }
}

/// Progress hook handed to `progress_hooks`.
#[pyclass(frozen)]
struct HookBridge {
    reporter: Arc<dyn Reporter>,
}

#[pymethods]
impl HookBridge {
    fn __call__(&self, record: &Bound<'_, PyAny>) -> PyResult<()> {
        let status = match get_string(record, "status")?.as_deref() {
            Some("finished") => Status::Finished,
            Some("error") => Status::Error,
            _ => Status::Downloading,
        };
        let progress = Progress {
            status,
            percent: get_string(record, "_percent_str")?,
            speed: get_string(record, "_speed_str")?,
            eta: get_string(record, "_eta_str")?,
            filename: get_string(record, "filename")?,
        };

        self.reporter.progress(&progress);
        Ok(())
    }
}

/// Object passed as the `logger` parameter.
///
/// yt-dlp routes ordinary screen output through `debug` as well; only lines
/// tagged `[debug]` are real debug messages.
#[pyclass(frozen)]
struct LoggerBridge {
    reporter: Arc<dyn Reporter>,
}

#[pymethods]
impl LoggerBridge {
    fn debug(&self, msg: &str) {
        let level = if msg.starts_with("[debug] ") {
            LogLevel::Debug
        } else {
            LogLevel::Info
        };
        self.reporter.log(level, msg);
    }

    fn info(&self, msg: &str) {
        self.reporter.log(LogLevel::Info, msg);
    }

    fn warning(&self, msg: &str) {
        self.reporter.log(LogLevel::Warning, &tagged("WARNING:", msg));
    }

    fn error(&self, msg: &str) {
        self.reporter.log(LogLevel::Error, &tagged("ERROR:", msg));
    }
}

fn tagged(tag: &str, msg: &str) -> String {
    if msg.starts_with(tag) {
        msg.to_string()
    } else {
        format!("{tag} {msg}")
    }
}

impl<'py> IntoPyObject<'py> for &OutputTemplates {
    type Target = PyDict;
    type Output = Bound<'py, PyDict>;
    type Error = PyErr;

    fn into_pyobject(self, py: Python<'py>) -> PyResult<Self::Output> {
        let dict = PyDict::new(py);
        for (kind, template) in &self.0 {
            dict.set_item(kind, template)?;
        }
        Ok(dict)
    }
}

/// Only set keys are emitted: post-processor constructors reject unknown
/// keyword arguments.
impl<'py> IntoPyObject<'py> for &PostProcessor {
    type Target = PyDict;
    type Output = Bound<'py, PyDict>;
    type Error = PyErr;

    fn into_pyobject(self, py: Python<'py>) -> PyResult<Self::Output> {
        let dict = PyDict::new(py);
        dict.set_item("key", &self.key)?;
        set_some(&dict, "preferredcodec", self.preferredcodec.as_deref())?;
        set_some(&dict, "preferredquality", self.preferredquality.as_deref())?;
        Ok(dict)
    }
}

/// `YoutubeDL(params)` dict. Unset options are left out so yt-dlp applies
/// its own defaults.
impl<'py> IntoPyObject<'py> for &DownloadOptions {
    type Target = PyDict;
    type Output = Bound<'py, PyDict>;
    type Error = PyErr;

    fn into_pyobject(self, py: Python<'py>) -> PyResult<Self::Output> {
        let dict = PyDict::new(py);

        set_some(&dict, "format", self.format.as_deref())?;
        set_some(&dict, "outtmpl", self.outtmpl.as_ref())?;
        set_some(&dict, "noplaylist", self.noplaylist)?;
        set_some(&dict, "nocheckcertificate", self.nocheckcertificate)?;
        set_some(&dict, "restrictfilenames", self.restrictfilenames)?;
        set_some(&dict, "ignoreerrors", self.ignoreerrors)?;
        set_some(
            &dict,
            "concurrent_fragment_downloads",
            self.concurrent_fragment_downloads,
        )?;
        set_some(&dict, "quiet", self.quiet)?;
        set_some(&dict, "no_warnings", self.no_warnings)?;
        set_some(&dict, "verbose", self.verbose)?;
        set_some(&dict, "merge_output_format", self.merge_output_format.as_deref())?;
        if let Some(pps) = &self.postprocessors {
            dict.set_item("postprocessors", PyList::new(py, pps)?)?;
        }
        set_some(&dict, "writethumbnail", self.writethumbnail)?;
        set_some(&dict, "retries", self.retries)?;
        set_some(&dict, "file_access_retries", self.file_access_retries)?;
        set_some(&dict, "fragment_retries", self.fragment_retries)?;
        set_some(&dict, "socket_timeout", self.socket_timeout)?;
        set_some(&dict, "ffmpeg_location", self.ffmpeg_location.as_deref())?;

        Ok(dict)
    }
}

fn set_some<'py, T>(dict: &Bound<'py, PyDict>, key: &str, value: Option<T>) -> PyResult<()>
where
    T: IntoPyObject<'py>,
{
    match value {
        Some(value) => dict.set_item(key, value),
        None => Ok(()),
    }
}
