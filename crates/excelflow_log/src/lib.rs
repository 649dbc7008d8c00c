//! `excelflow_log`:
//! Process-wide logger writing each record to stderr and an append-mode file.
//!
//! Line format: `YYYY-MM-DD HH:MM:SS,mmm | LEVEL | message`.
//! `RUST_LOG` takes precedence over the configured level.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;

use chrono::{Local, NaiveDateTime};
use env_logger::{Builder, Env, Target};
use log::{Level, LevelFilter};
use thiserror::Error;

/// Default log file, relative to the working directory.
pub const C_LOG_FILE_DEFAULT: &str = "app.log";
const C_LOG_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S,%3f";

////////////////////////////////////////////////////////////////////////////////
// #region LogConfig

/// Logger settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecLogConfig {
    /// Append-mode log file; `None` logs to stderr only.
    pub path_log_file: Option<PathBuf>,
    pub level: LevelFilter,
    /// Mirror records to stderr.
    pub if_stderr: bool,
}

impl Default for SpecLogConfig {
    fn default() -> Self {
        Self {
            path_log_file: Some(PathBuf::from(C_LOG_FILE_DEFAULT)),
            level: LevelFilter::Info,
            if_stderr: true,
        }
    }
}

#[derive(Error, Debug)]
pub enum LogInitError {
    #[error("Failed to open log file {}: {source}", path.display())]
    OpenLogFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("A global logger is already installed: {0}")]
    AlreadyInitialized(#[from] log::SetLoggerError),
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region TeeWriter

/// Copies every write to an optional file and optionally to stderr.
pub struct TeeWriter {
    file: Option<File>,
    if_stderr: bool,
}

impl TeeWriter {
    pub fn new(file: Option<File>, if_stderr: bool) -> Self {
        Self { file, if_stderr }
    }
}

impl Write for TeeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if let Some(file) = self.file.as_mut() {
            file.write_all(buf)?;
        }
        if self.if_stderr {
            io::stderr().write_all(buf)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if let Some(file) = self.file.as_mut() {
            file.flush()?;
        }
        if self.if_stderr {
            io::stderr().flush()?;
        }
        Ok(())
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Init

/// Render one log line (without the trailing newline).
pub fn format_log_line(timestamp: NaiveDateTime, level: Level, message: &str) -> String {
    format!(
        "{} | {} | {}",
        timestamp.format(C_LOG_TIMESTAMP_FORMAT),
        level,
        message
    )
}

/// Build the logger without installing it.
pub fn build_logger(cfg: &SpecLogConfig) -> Result<env_logger::Logger, LogInitError> {
    let file = match &cfg.path_log_file {
        Some(path) => Some(
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|source| LogInitError::OpenLogFile {
                    path: path.clone(),
                    source,
                })?,
        ),
        None => None,
    };

    let env = Env::default().default_filter_or(cfg.level.as_str());
    let logger = Builder::from_env(env)
        .format(|buf, record| {
            let line = format_log_line(
                Local::now().naive_local(),
                record.level(),
                &record.args().to_string(),
            );
            writeln!(buf, "{line}")
        })
        .target(Target::Pipe(Box::new(TeeWriter::new(file, cfg.if_stderr))))
        .build();
    Ok(logger)
}

/// Install the process-wide logger and emit the startup record.
pub fn init_logging(cfg: &SpecLogConfig) -> Result<(), LogInitError> {
    let logger = build_logger(cfg)?;
    let filter = logger.filter();
    log::set_boxed_logger(Box::new(logger))?;
    log::set_max_level(filter);
    log::info!("Application started");
    Ok(())
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
