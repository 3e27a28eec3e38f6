//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber from `LoggingOptions`
//! - Route output to stdout or an append-only log file
//! - Text format for terminals, JSON for machine parsing
//!
//! # Design Decisions
//! - `RUST_LOG` overrides the configured level when set
//! - Initialization is fallible; a second call reports an error instead of panicking

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Mutex;
use thiserror::Error;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::options::{LogFormat, LogTarget, LoggingOptions};

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("cannot open log file: {0}")]
    Io(#[from] io::Error),

    #[error("logging already initialized: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),
}

/// Install the global tracing subscriber.
pub fn init_logging(opts: &LoggingOptions) -> Result<(), LoggingError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(opts.log_level.as_directive()));

    let writer = match opts.log_to {
        LogTarget::Stdout => BoxMakeWriter::new(io::stdout),
        LogTarget::File => BoxMakeWriter::new(Mutex::new(open_log_file(&opts.log_file)?)),
    };

    let fmt_layer = match opts.log_format {
        LogFormat::Text => fmt::layer()
            .with_writer(writer)
            .with_ansi(opts.log_to == LogTarget::Stdout)
            .boxed(),
        LogFormat::Json => fmt::layer().json().with_writer(writer).boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()?;
    Ok(())
}

/// Open `path` for appending, creating parent directories as needed.
pub fn open_log_file(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_open_log_file_creates_dirs_and_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/logs/dataplane.log");

        writeln!(open_log_file(&path).unwrap(), "first").unwrap();
        writeln!(open_log_file(&path).unwrap(), "second").unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "first\nsecond\n");
    }
}
