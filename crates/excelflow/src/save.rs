//! The save pipeline: lock check, sheet-name resolution, write.

use std::path::{Path, PathBuf};

use excelflow_io_fs::is_file_locked;
use excelflow_io_table::{SpecColumnChoice, read_table, select_ordered_columns};
use excelflow_io_xlsx::{
    EnumOutputMode, derive_default_xlsx_write_options, resolve_sheet_name, write_sheet_dispatch,
};
use polars::prelude::DataFrame;

use crate::error::{SaveError, derive_error_chain};

/// One save action as entered by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecSaveRequest {
    pub workbook_path: PathBuf,
    pub mode: EnumOutputMode,
    /// Raw sheet-name input; blank or `None` means auto-generated.
    pub sheet_name_requested: Option<String>,
}

/// Outcome of a successful save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecSaveReport {
    pub workbook_path: PathBuf,
    pub sheet_name: String,
    pub mode_applied: EnumOutputMode,
    pub n_rows: usize,
    pub n_cols: usize,
}

/// Write `df` to the requested workbook as one new sheet.
pub fn save_table(df: &DataFrame, request: &SpecSaveRequest) -> Result<SpecSaveReport, SaveError> {
    let result = save_table_inner(df, request);
    if let Err(err) = &result {
        log::error!("Save failed: {}", derive_error_chain(err));
    }
    result
}

fn save_table_inner(
    df: &DataFrame,
    request: &SpecSaveRequest,
) -> Result<SpecSaveReport, SaveError> {
    let path = request.workbook_path.as_path();
    if path.as_os_str().to_string_lossy().trim().is_empty() {
        return Err(SaveError::MissingWorkbook);
    }
    if is_file_locked(path) {
        return Err(SaveError::LockedTarget {
            path: path.to_path_buf(),
        });
    }

    let sheet_name = resolve_sheet_name(path, request.sheet_name_requested.as_deref())
        .map_err(|err| SaveError::from_write_error(path.to_path_buf(), err))?;
    log::info!("Resolved sheet name {sheet_name:?} for {}", path.display());

    let report = write_sheet_dispatch(
        path,
        &sheet_name,
        df,
        request.mode,
        &derive_default_xlsx_write_options(),
    )
    .map_err(|err| SaveError::from_write_error(path.to_path_buf(), err))?;

    log::info!(
        "Data saved to sheet {:?} in {} ({}, {} rows x {} columns)",
        report.sheet_name,
        path.display(),
        report.mode_applied,
        report.n_rows,
        report.n_cols
    );
    Ok(SpecSaveReport {
        workbook_path: path.to_path_buf(),
        sheet_name: report.sheet_name,
        mode_applied: report.mode_applied,
        n_rows: report.n_rows,
        n_cols: report.n_cols,
    })
}

/// Load a table, logging failures with their cause chain.
pub fn load_table<P: AsRef<Path>>(input_path: P) -> Result<DataFrame, SaveError> {
    read_table(input_path.as_ref()).map_err(|err| {
        let err = SaveError::from(err);
        log::error!("Load failed: {}", derive_error_chain(&err));
        err
    })
}

/// Keep the chosen columns of `df` in position order, then save them.
pub fn save_selected_columns(
    df: &DataFrame,
    choices: &[SpecColumnChoice],
    request: &SpecSaveRequest,
) -> Result<SpecSaveReport, SaveError> {
    let df_selected = select_ordered_columns(df, choices).map_err(|err| {
        let err = SaveError::from(err);
        log::error!("Selection failed: {}", derive_error_chain(&err));
        err
    })?;
    save_table(&df_selected, request)
}
