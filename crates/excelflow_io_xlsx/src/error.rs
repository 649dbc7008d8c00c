//! Error type for workbook inspection and writes.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure while reading sheet names or writing a sheet.
#[derive(Error, Debug)]
pub enum XlsxWriteError {
    #[error("{0}")]
    Io(#[from] io::Error),

    #[error("xlsx write error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("xml error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Failed to read workbook {}: {message}", path.display())]
    WorkbookRead { path: PathBuf, message: String },

    #[error("Workbook package is malformed ({part}): {message}")]
    InvalidPackage { part: String, message: String },

    #[error("Invalid sheet name {name:?}: {message}")]
    InvalidSheetName { name: String, message: String },

    #[error("Sheet {0:?} already exists in the workbook.")]
    SheetExists(String),

    #[error("Table of {n_rows} rows x {n_cols} columns exceeds Excel worksheet limits.")]
    TableTooLarge { n_rows: usize, n_cols: usize },

    #[error("Failed to read cell value: {0}")]
    CellRead(#[from] polars::prelude::PolarsError),
}

impl XlsxWriteError {
    /// Whether the failure bottoms out in a file-system permission refusal.
    pub fn is_permission_denied(&self) -> bool {
        match self {
            Self::Io(err) => err.kind() == io::ErrorKind::PermissionDenied,
            Self::Xlsx(rust_xlsxwriter::XlsxError::IoError(err)) => {
                err.kind() == io::ErrorKind::PermissionDenied
            }
            Self::Zip(zip::result::ZipError::Io(err)) => {
                err.kind() == io::ErrorKind::PermissionDenied
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::XlsxWriteError;

    #[test]
    fn permission_denied_is_detected_through_wrappers() {
        let err = XlsxWriteError::from(io::Error::new(io::ErrorKind::PermissionDenied, "no"));
        assert!(err.is_permission_denied());

        let err = XlsxWriteError::from(zip::result::ZipError::Io(io::Error::new(
            io::ErrorKind::PermissionDenied,
            "no",
        )));
        assert!(err.is_permission_denied());

        let err = XlsxWriteError::SheetExists("Output".to_string());
        assert!(!err.is_permission_denied());
    }
}
