//! Route a sheet write to the new-workbook writer or the package appender.

use std::path::Path;

use polars::prelude::DataFrame;

use crate::error::XlsxWriteError;
use crate::package::append_sheet_to_workbook;
use crate::spec::{EnumOutputMode, SpecSheetWriteReport, SpecXlsxWriteOptions};
use crate::writer::write_new_workbook;

/// Mode actually applied for a requested mode and target state.
///
/// `Append` against a missing file degrades to `New`.
pub fn derive_applied_mode(mode_requested: EnumOutputMode, if_target_exists: bool) -> EnumOutputMode {
    match mode_requested {
        EnumOutputMode::Append if if_target_exists => EnumOutputMode::Append,
        _ => EnumOutputMode::New,
    }
}

/// Write `df` as `sheet_name` into `path` under `mode_requested`.
///
/// `New` replaces the file with a one-sheet workbook. `Append` adds the
/// sheet after the existing ones, or creates the file when it is missing.
/// `write_options` style new workbooks only.
pub fn write_sheet_dispatch<P: AsRef<Path>>(
    path: P,
    sheet_name: &str,
    df: &DataFrame,
    mode_requested: EnumOutputMode,
    write_options: &SpecXlsxWriteOptions,
) -> Result<SpecSheetWriteReport, XlsxWriteError> {
    let path = path.as_ref();
    let mode_applied = derive_applied_mode(mode_requested, path.exists());
    if mode_applied != mode_requested {
        log::info!(
            "Workbook {} does not exist; writing a new workbook instead of appending",
            path.display()
        );
    }

    match mode_applied {
        EnumOutputMode::New => write_new_workbook(path, sheet_name, df, write_options),
        EnumOutputMode::Append => append_sheet_to_workbook(path, sheet_name, df),
    }
}
