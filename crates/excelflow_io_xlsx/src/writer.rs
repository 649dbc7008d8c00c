//! New-workbook writer: one DataFrame becomes the only sheet of a fresh file.

use std::path::{Path, PathBuf};

use polars::prelude::DataFrame;
use rust_xlsxwriter::{Format, Workbook, Worksheet};

use crate::error::XlsxWriteError;
use crate::spec::{
    EnumCellValue, EnumOutputMode, SpecAutofitCellsPolicy, SpecCellFormat, SpecSheetWriteReport,
    SpecXlsxWriteOptions,
};
use crate::util::{
    cast_col_num, cast_row_num, derive_column_names, estimate_width_len, read_cell,
    validate_sheet_name, validate_table_limits,
};

/// Workbook writer bound to one output path.
///
/// The workbook is buffered in memory until [`Self::close`] is called, and
/// `close` replaces whatever file is at the path.
pub struct XlsxWriter {
    path_file_out: PathBuf,
    workbook: Workbook,
    write_options: SpecXlsxWriteOptions,
    if_closed: bool,
}

impl XlsxWriter {
    /// Create writer bound to output path and options.
    pub fn new(path_file_out: PathBuf, write_options: SpecXlsxWriteOptions) -> Self {
        Self {
            path_file_out,
            workbook: Workbook::new(),
            write_options,
            if_closed: false,
        }
    }

    /// Flush workbook to disk. Idempotent.
    pub fn close(&mut self) -> Result<(), XlsxWriteError> {
        if self.if_closed {
            return Ok(());
        }
        self.workbook.save(&self.path_file_out)?;
        self.if_closed = true;
        Ok(())
    }

    /// Write `df` as a sheet named `sheet_name`: header row, then one row per
    /// record, no index column.
    pub fn write_sheet(
        &mut self,
        df: &DataFrame,
        sheet_name: &str,
    ) -> Result<SpecSheetWriteReport, XlsxWriteError> {
        if self.if_closed {
            return Err(XlsxWriteError::InvalidPackage {
                part: self.path_file_out.display().to_string(),
                message: "cannot write after close()".to_string(),
            });
        }
        validate_sheet_name(sheet_name)?;
        validate_table_limits(df)?;

        let l_colnames = derive_column_names(df);
        let n_height = df.height();
        let n_width = l_colnames.len();

        let fmt_header = derive_rust_xlsx_format(&self.write_options.fmt_header);

        let worksheet = self.workbook.add_worksheet();
        worksheet.set_name(sheet_name)?;

        let mut l_width_by_col = vec![0usize; n_width];
        for (n_idx_col, c_name) in l_colnames.iter().enumerate() {
            worksheet.write_string_with_format(
                0,
                cast_col_num(n_idx_col)?,
                c_name,
                &fmt_header,
            )?;
            l_width_by_col[n_idx_col] =
                estimate_width_len(&EnumCellValue::String(c_name.clone()));
        }

        for n_idx_row in 0..n_height {
            for n_idx_col in 0..n_width {
                let value = read_cell(df, n_idx_row, n_idx_col)?;
                write_cell(worksheet, n_idx_row + 1, n_idx_col, &value)?;
            }
        }

        apply_column_widths(worksheet, &l_width_by_col, &self.write_options.policy_autofit)?;

        Ok(SpecSheetWriteReport {
            sheet_name: sheet_name.to_string(),
            mode_applied: EnumOutputMode::New,
            n_rows: n_height,
            n_cols: n_width,
        })
    }
}

/// Write `df` to a brand-new workbook at `path`, replacing any existing file.
pub fn write_new_workbook<P: AsRef<Path>>(
    path: P,
    sheet_name: &str,
    df: &DataFrame,
    write_options: &SpecXlsxWriteOptions,
) -> Result<SpecSheetWriteReport, XlsxWriteError> {
    let mut writer = XlsxWriter::new(path.as_ref().to_path_buf(), write_options.clone());
    let report = writer.write_sheet(df, sheet_name)?;
    writer.close()?;
    Ok(report)
}

/// Final width of one column: header estimate plus padding, clamped.
fn derive_column_width(n_width: usize, policy_autofit: &SpecAutofitCellsPolicy) -> usize {
    let n_min = usize::max(1, policy_autofit.width_cell_min);
    let n_max = usize::min(255, usize::max(n_min, policy_autofit.width_cell_max));
    (n_width + policy_autofit.width_cell_padding).clamp(n_min, n_max)
}

fn apply_column_widths(
    worksheet: &mut Worksheet,
    l_width_by_col: &[usize],
    policy_autofit: &SpecAutofitCellsPolicy,
) -> Result<(), XlsxWriteError> {
    for (n_idx_col, n_width) in l_width_by_col.iter().enumerate() {
        let n_width_final = derive_column_width(*n_width, policy_autofit);
        worksheet.set_column_width(cast_col_num(n_idx_col)?, n_width_final as f64)?;
    }
    Ok(())
}

fn write_cell(
    worksheet: &mut Worksheet,
    row_idx: usize,
    col_idx: usize,
    value: &EnumCellValue,
) -> Result<(), XlsxWriteError> {
    let n_row = cast_row_num(row_idx)?;
    let n_col = cast_col_num(col_idx)?;
    match value {
        EnumCellValue::None => {}
        EnumCellValue::String(val) => {
            worksheet.write_string(n_row, n_col, val)?;
        }
        EnumCellValue::Number(val) => {
            worksheet.write_number(n_row, n_col, *val)?;
        }
        EnumCellValue::Boolean(val) => {
            worksheet.write_boolean(n_row, n_col, *val)?;
        }
    }
    Ok(())
}

fn derive_rust_xlsx_format(spec: &SpecCellFormat) -> Format {
    let mut format = Format::new();
    if spec.bold.unwrap_or(false) {
        format = format.set_bold();
    }
    format
}
