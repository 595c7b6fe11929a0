//! File logging for call tracing.
//!
//! Calls always emit `tracing` events; nothing is written anywhere until a
//! subscriber is installed. `log_to` installs one that appends plain-text
//! lines to a file.

use std::path::Path;

use tracing_subscriber::EnvFilter;

use crate::error::{Error, Result};

/// Send call tracing to the file at `path`.
///
/// Installs the process-wide subscriber, so it can succeed at most once.
/// `RUST_LOG` narrows the output when set; the default level is `info`.
pub fn log_to(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let file_name = path
        .file_name()
        .ok_or_else(|| Error::LogSink(format!("'{}' names no file", path.display())))?;
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let appender = tracing_appender::rolling::never(directory, file_name);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(appender)
        .with_ansi(false)
        .try_init()
        .map_err(|e| Error::LogSink(e.to_string()))
}

/// Cut `value` to `cutoff` characters, marking the cut with `...`.
pub(crate) fn truncate(value: &str, cutoff: usize) -> String {
    match value.char_indices().nth(cutoff) {
        Some((idx, _)) => format!("{}...", &value[..idx]),
        None => value.to_string(),
    }
}
