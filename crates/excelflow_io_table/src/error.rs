//! Error types for table loading and column selection.

use std::io;
use std::path::PathBuf;

use polars::prelude::PolarsError;
use thiserror::Error;

/// Failure while turning an input file into a table.
#[derive(Error, Debug)]
pub enum ReadTableError {
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse {file_name}: {source}")]
    Parse {
        file_name: String,
        #[source]
        source: PolarsError,
    },

    #[error("Failed to open spreadsheet {file_name}: {message}")]
    Spreadsheet { file_name: String, message: String },

    #[error("{file_name} contains no columns")]
    Empty { file_name: String },
}

/// Failure while validating or applying a column selection.
#[derive(Error, Debug)]
pub enum SelectColumnsError {
    #[error("No columns selected.")]
    EmptySelection,

    #[error("Column {name:?} not found; available: {}", available.join(", "))]
    UnknownColumn { name: String, available: Vec<String> },

    #[error("Column {0:?} selected more than once.")]
    DuplicateColumn(String),

    #[error("Column {0:?} has position 0; positions start at 1.")]
    InvalidPosition(String),

    #[error("Cannot parse column choice {0:?}; expected NAME or NAME=POSITION.")]
    InvalidChoice(String),

    #[error(transparent)]
    Polars(#[from] PolarsError),
}
