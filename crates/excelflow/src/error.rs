//! Failure taxonomy of the save pipeline.

use std::error::Error as StdError;
use std::path::PathBuf;

use excelflow_io_table::{ReadTableError, SelectColumnsError};
use excelflow_io_xlsx::XlsxWriteError;
use thiserror::Error;

/// Terminal failure of one load or save attempt. Nothing is retried.
#[derive(Error, Debug)]
pub enum SaveError {
    #[error("No workbook path given.")]
    MissingWorkbook,

    #[error("Failed to read input: {0}")]
    InputRead(#[from] ReadTableError),

    #[error("Invalid column selection: {0}")]
    ColumnSelection(#[from] SelectColumnsError),

    #[error("Workbook {} is open or locked by another process.", path.display())]
    LockedTarget { path: PathBuf },

    #[error("Permission denied while writing {}: {source}", path.display())]
    Permission {
        path: PathBuf,
        #[source]
        source: XlsxWriteError,
    },

    #[error("Failed to write {}: {source}", path.display())]
    UnexpectedWrite {
        path: PathBuf,
        #[source]
        source: XlsxWriteError,
    },
}

impl SaveError {
    /// Classify a write-side failure by its root cause.
    pub fn from_write_error(path: PathBuf, source: XlsxWriteError) -> Self {
        if source.is_permission_denied() {
            Self::Permission { path, source }
        } else {
            Self::UnexpectedWrite { path, source }
        }
    }

    /// Short text for the user; details belong in the log.
    pub fn user_message(&self) -> String {
        match self {
            Self::MissingWorkbook => "Please enter or select a workbook".to_string(),
            Self::InputRead(_) => "Failed to read uploaded file".to_string(),
            Self::ColumnSelection(err) => err.to_string(),
            Self::LockedTarget { .. } => {
                "Excel file is open or locked. Close it and try again.".to_string()
            }
            Self::Permission { path, .. } => format!(
                "Permission denied writing {}. Check file permissions and app.log",
                path.display()
            ),
            Self::UnexpectedWrite {
                source: XlsxWriteError::InvalidSheetName { name, message },
                ..
            } => format!("Sheet name {name:?} cannot be used: {message}"),
            Self::UnexpectedWrite {
                source: XlsxWriteError::SheetExists(name),
                ..
            } => format!("Sheet {name:?} already exists in the workbook. Choose another name"),
            Self::UnexpectedWrite { .. } => "Failed to save file. Check app.log".to_string(),
        }
    }
}

/// `err: cause: cause ...` for log records.
pub fn derive_error_chain(err: &dyn StdError) -> String {
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}
