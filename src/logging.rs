//! Log sink construction.
//!
//! [`build`] turns a [`LoggingConfig`] into a [`Dispatch`] with up to two
//! layers:
//!
//! - **Console** (stderr) filtered by `RUST_LOG`, or `logging.level` when the
//!   variable is unset.
//! - **File** at `logging.file_level`, written to
//!   `<directory>/app_<YYYYmmdd_HHMMSS>.log` when `logging.directory` is set.
//!
//! The dispatch is returned, never installed globally. The binary hands it to
//! the [`Normalizer`](crate::normalize::Normalizer) and keeps the
//! [`LogHandle`] alive until exit so the file writer can flush.

use crate::config::LoggingConfig;
use chrono::{DateTime, Local};
use std::path::PathBuf;
use thiserror::Error;
use tracing::Dispatch;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("invalid log filter: {0}")]
    Filter(#[from] ParseError),
    #[error("cannot create log file: {0}")]
    File(#[from] InitError),
}

/// A ready-to-inject dispatch plus whatever must outlive it.
pub struct LogHandle {
    pub dispatch: Dispatch,
    /// Path of the log file, when file logging is enabled.
    pub file: Option<PathBuf>,
    _guard: Option<WorkerGuard>,
}

/// The log file stem `app_<YYYYmmdd_HHMMSS>` for a run started at `now`.
pub fn log_file_stem(now: DateTime<Local>) -> String {
    format!("app_{}", now.format("%Y%m%d_%H%M%S"))
}

/// Build the console (and optional file) dispatch for `config`.
pub fn build(config: &LoggingConfig) -> Result<LogHandle, LoggingError> {
    let console_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level)?,
    };
    let console = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(console_filter);

    let (file_layer, guard, file) = match &config.directory {
        Some(dir) => {
            let stem = log_file_stem(Local::now());
            let appender = RollingFileAppender::builder()
                .rotation(Rotation::NEVER)
                .filename_prefix(&stem)
                .filename_suffix("log")
                .build(dir)?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(EnvFilter::try_new(&config.file_level)?);
            (
                Some(layer),
                Some(guard),
                Some(dir.join(format!("{stem}.log"))),
            )
        }
        None => (None, None, None),
    };

    let subscriber = tracing_subscriber::registry()
        .with(console)
        .with(file_layer);

    Ok(LogHandle {
        dispatch: Dispatch::new(subscriber),
        file,
        _guard: guard,
    })
}
